//! # Command Builders
//!
//! Host-to-printer frame builders. Each function returns the complete wire
//! bytes for one frame; [`raster_frames`] splits a raster buffer into as many
//! frames as the one-byte length field allows.
//!
//! Multi-byte values are little-endian.

use crate::error::RotuloError;
use crate::printer::PaperStyle;
use crate::protocol::frame::{self, Frame, kind};
use crate::render::RasterBuffer;

/// Start a print job with the given density and paper style.
///
/// Payload: `[density, paper_style]`
pub fn start_job(density: u8, paper: PaperStyle) -> Vec<u8> {
    Frame::new(kind::START_JOB, vec![density, paper.code()]).encode()
}

/// End the current job. Sent after the last raster frame of the last page.
pub fn end_job() -> Vec<u8> {
    Frame::new(kind::END_JOB, Vec::new()).encode()
}

/// Cancel the current job. Frames already delivered are not retracted; the
/// printer may finish the label it is physically printing.
pub fn cancel() -> Vec<u8> {
    Frame::new(kind::CANCEL, Vec::new()).encode()
}

/// Announce the total number of copies across all pages of the job.
///
/// Payload: `[total_lo, total_hi]`
pub fn set_quantity(total: u16) -> Vec<u8> {
    Frame::new(kind::SET_QUANTITY, total.to_le_bytes().to_vec()).encode()
}

/// Page dimensions in dots.
///
/// Payload: `[width_lo, width_hi, height_lo, height_hi]`
pub fn page_size(width: u16, height: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4);
    payload.extend_from_slice(&width.to_le_bytes());
    payload.extend_from_slice(&height.to_le_bytes());
    Frame::new(kind::PAGE_SIZE, payload).encode()
}

/// EPC payload to write to the label's embedded RFID tag.
///
/// Fails if the EPC does not fit a single frame.
pub fn write_rfid(epc: &str) -> Result<Vec<u8>, RotuloError> {
    let bytes = epc.as_bytes();
    if bytes.is_empty() || bytes.len() > frame::MAX_PAYLOAD {
        return Err(RotuloError::Protocol(format!(
            "EPC length {} outside 1..={}",
            bytes.len(),
            frame::MAX_PAYLOAD
        )));
    }
    Ok(Frame::new(kind::WRITE_RFID, bytes.to_vec()).encode())
}

/// Request a full telemetry report.
pub fn query_status() -> Vec<u8> {
    Frame::new(kind::QUERY_STATUS, Vec::new()).encode()
}

/// Request installed paper geometry.
pub fn query_paper() -> Vec<u8> {
    Frame::new(kind::QUERY_PAPER, Vec::new()).encode()
}

/// Link-liveness probe. The printer answers with a heartbeat ack.
pub fn heartbeat() -> Vec<u8> {
    Frame::new(kind::HEARTBEAT, Vec::new()).encode()
}

/// Split a raster buffer into transport-sized `RASTER_ROWS` frames.
///
/// Each frame payload is `[row_index: u16 LE, rows...]` with complete packed
/// rows only; the row index lets the printer detect dropped chunks. Returns
/// an error if a single row does not fit one frame (cannot happen for any
/// supported print width).
pub fn raster_frames(raster: &RasterBuffer) -> Result<Vec<Vec<u8>>, RotuloError> {
    let stride = raster.stride();
    if stride == 0 || raster.height == 0 {
        return Err(RotuloError::Protocol("empty raster buffer".to_string()));
    }
    let budget = frame::MAX_PAYLOAD - 2;
    if stride > budget {
        return Err(RotuloError::Protocol(format!(
            "raster stride {} exceeds frame budget {}",
            stride, budget
        )));
    }

    let rows_per_frame = (budget / stride).max(1) as u32;
    let mut frames = Vec::new();
    let mut row = 0u32;
    while row < raster.height {
        let count = rows_per_frame.min(raster.height - row);
        let mut payload = Vec::with_capacity(2 + count as usize * stride);
        payload.extend_from_slice(&(row as u16).to_le_bytes());
        for r in row..row + count {
            payload.extend_from_slice(raster.row(r));
        }
        frames.push(Frame::new(kind::RASTER_ROWS, payload).encode());
        row += count;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_job_payload() {
        let bytes = start_job(3, PaperStyle::Gap);
        // kind, len, density, paper code
        assert_eq!(bytes[2], kind::START_JOB);
        assert_eq!(bytes[3], 2);
        assert_eq!(&bytes[4..6], &[3, 1]);
    }

    #[test]
    fn test_page_size_little_endian() {
        let bytes = page_size(384, 0x0102);
        assert_eq!(&bytes[4..8], &[0x80, 0x01, 0x02, 0x01]);
    }

    #[test]
    fn test_write_rfid_bounds() {
        assert!(write_rfid("").is_err());
        assert!(write_rfid(&"E".repeat(256)).is_err());
        let ok = write_rfid("E28011700000020F1234ABCD").unwrap();
        assert_eq!(ok[2], kind::WRITE_RFID);
    }

    #[test]
    fn test_raster_frames_chunking() {
        // 384 dots = 48-byte stride; 253 / 48 = 5 rows per frame
        let raster = RasterBuffer::new(384, 12);
        let frames = raster_frames(&raster).unwrap();
        assert_eq!(frames.len(), 3); // 5 + 5 + 2 rows

        // First frame starts at row 0, third at row 10
        assert_eq!(&frames[0][4..6], &[0, 0]);
        assert_eq!(&frames[2][4..6], &[10, 0]);

        // Full frames carry 5 rows plus the index
        assert_eq!(frames[0][3] as usize, 2 + 5 * 48);
        assert_eq!(frames[2][3] as usize, 2 + 2 * 48);
    }

    #[test]
    fn test_raster_frames_empty_rejected() {
        let raster = RasterBuffer::new(0, 0);
        assert!(raster_frames(&raster).is_err());
    }
}
