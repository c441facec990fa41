//! # Frame Primitives
//!
//! One frame is one discrete unit of the device command/response protocol.
//! See the [module docs](crate::protocol) for the wire layout.

/// Frame header bytes
pub const HEAD: [u8; 2] = [0x55, 0x55];

/// Frame trailer bytes
pub const TAIL: [u8; 2] = [0xAA, 0xAA];

/// Bytes of framing overhead around a payload (head + kind + len + xor + tail)
pub const OVERHEAD: usize = 7;

/// Largest payload a single frame can carry (length field is one byte)
pub const MAX_PAYLOAD: usize = 255;

/// Frame kind bytes.
///
/// Host-to-printer kinds occupy the low range; the printer acknowledges a
/// command with `kind | 0x80`. Printer-initiated frames use the 0x70 range.
pub mod kind {
    /// Start a print job (density, paper style)
    pub const START_JOB: u8 = 0x01;
    /// End the current job after all pages are streamed
    pub const END_JOB: u8 = 0x02;
    /// Cancel the current job
    pub const CANCEL: u8 = 0x03;
    /// Announce total copies before raster data
    pub const SET_QUANTITY: u8 = 0x04;
    /// Page dimensions in dots
    pub const PAGE_SIZE: u8 = 0x05;
    /// One chunk of packed raster rows
    pub const RASTER_ROWS: u8 = 0x06;
    /// EPC payload to write to the label RFID tag
    pub const WRITE_RFID: u8 = 0x07;
    /// Request a full telemetry report
    pub const QUERY_STATUS: u8 = 0x08;
    /// Link-liveness probe
    pub const HEARTBEAT: u8 = 0x09;
    /// Request installed paper geometry
    pub const QUERY_PAPER: u8 = 0x0A;

    /// Set on a host kind to form its acknowledgment
    pub const ACK_FLAG: u8 = 0x80;

    /// Printer-initiated: per-copy progress report
    pub const PROGRESS: u8 = 0x70;
    /// Printer-initiated: telemetry key/value change
    pub const STATUS: u8 = 0x71;
    /// Printer-initiated: device error code
    pub const ERROR: u8 = 0x72;
    /// Reply to a paper geometry query
    pub const PAPER_INFO: u8 = 0x73;
}

/// XOR checksum over the kind byte, length byte and payload.
#[inline]
pub fn checksum(kind: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(kind ^ (payload.len() as u8), |acc, b| acc ^ b)
}

/// A decoded or to-be-encoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a frame. Payload must fit the one-byte length field.
    pub fn new(kind: u8, payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        Self { kind, payload }
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + OVERHEAD);
        out.extend_from_slice(&HEAD);
        out.push(self.kind);
        out.push(self.payload.len() as u8);
        out.extend_from_slice(&self.payload);
        out.push(checksum(self.kind, &self.payload));
        out.extend_from_slice(&TAIL);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty_payload() {
        // kind ^ len with no payload bytes
        assert_eq!(checksum(0x09, &[]), 0x09);
    }

    #[test]
    fn test_checksum_xor() {
        assert_eq!(checksum(0x01, &[0x03, 0x01]), 0x01 ^ 0x02 ^ 0x03 ^ 0x01);
    }

    #[test]
    fn test_encode_layout() {
        let frame = Frame::new(kind::START_JOB, vec![3, 1]);
        let bytes = frame.encode();
        assert_eq!(&bytes[..2], &HEAD);
        assert_eq!(bytes[2], kind::START_JOB);
        assert_eq!(bytes[3], 2);
        assert_eq!(&bytes[4..6], &[3, 1]);
        assert_eq!(bytes[6], checksum(kind::START_JOB, &[3, 1]));
        assert_eq!(&bytes[7..], &TAIL);
        assert_eq!(bytes.len(), 2 + OVERHEAD);
    }
}
