//! # Streaming Decoder
//!
//! Turns the inbound byte stream into typed [`DeviceEvent`]s.
//!
//! ## Resynchronization
//!
//! The decoder buffers bytes across calls and scans for the `0x55 0x55`
//! header. A frame is only emitted when its length, XOR checksum and trailer
//! all validate; any mismatch discards a single byte and rescans, so one
//! corrupt frame can never desynchronize the frames behind it. Incomplete
//! frames simply wait for more bytes.
//!
//! Unknown device error codes become [`DeviceEvent::UnknownDeviceStatus`]
//! and unknown telemetry keys become [`DeviceEvent::UnknownStatus`]; neither
//! aborts decoding.

use log::{debug, trace};

use crate::protocol::frame::{self, Frame, kind};
use crate::status::{DeviceError, PaperInfo, Progress, StatusEvent};

/// A decoded printer-to-host message.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Acknowledgment of a host command (`kind` is the host kind)
    Ack { kind: u8 },
    /// Reply to a heartbeat probe
    HeartbeatReply,
    /// Per-copy progress report
    Progress(Progress),
    /// Telemetry change
    Status(StatusEvent),
    /// Telemetry with a key outside the known set
    UnknownStatus { key: u8, value: u8 },
    /// Device error from the fixed taxonomy
    Error(DeviceError),
    /// Device error code outside the taxonomy
    UnknownDeviceStatus { code: u8 },
    /// Installed paper geometry
    PaperInfo(PaperInfo),
}

/// Streaming frame decoder with an internal reassembly buffer.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes, returning every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<DeviceEvent> {
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();

        loop {
            // Scan to the next possible header
            match find_head(&self.buf) {
                Some(0) => {}
                Some(pos) => {
                    trace!("decoder: skipping {} bytes to next header", pos);
                    self.buf.drain(..pos);
                }
                None => {
                    // Keep a trailing 0x55 in case its partner is in flight
                    let keep = if self.buf.last() == Some(&frame::HEAD[0]) {
                        1
                    } else {
                        0
                    };
                    let len = self.buf.len();
                    self.buf.drain(..len - keep);
                    return events;
                }
            }

            // Header at offset 0; need kind + len before sizing the frame
            if self.buf.len() < 4 {
                return events;
            }
            let frame_kind = self.buf[2];
            let payload_len = self.buf[3] as usize;
            let total = payload_len + frame::OVERHEAD;
            if self.buf.len() < total {
                return events;
            }

            let payload = &self.buf[4..4 + payload_len];
            let check = self.buf[4 + payload_len];
            let tail = &self.buf[5 + payload_len..total];

            if check != frame::checksum(frame_kind, payload) || tail != frame::TAIL {
                // Corrupt frame: drop one byte and rescan
                debug!("decoder: bad checksum/trailer for kind {:#04x}, resyncing", frame_kind);
                self.buf.drain(..1);
                continue;
            }

            let frame = Frame::new(frame_kind, payload.to_vec());
            self.buf.drain(..total);

            if let Some(event) = parse_frame(&frame) {
                events.push(event);
            }
        }
    }
}

fn find_head(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == frame::HEAD)
}

/// Interpret one validated frame. Unknown frame kinds are logged and skipped.
fn parse_frame(frame: &Frame) -> Option<DeviceEvent> {
    let p = &frame.payload;
    match frame.kind {
        kind::PROGRESS => Some(DeviceEvent::Progress(parse_progress(p))),
        kind::STATUS => {
            if p.len() < 2 {
                debug!("decoder: short status payload");
                return None;
            }
            match StatusEvent::from_raw(p[0], p[1]) {
                Some(event) => Some(DeviceEvent::Status(event)),
                None => Some(DeviceEvent::UnknownStatus {
                    key: p[0],
                    value: p[1],
                }),
            }
        }
        kind::ERROR => {
            let code = *p.first()?;
            match DeviceError::from_code(code) {
                Some(err) => Some(DeviceEvent::Error(err)),
                None => Some(DeviceEvent::UnknownDeviceStatus { code }),
            }
        }
        kind::PAPER_INFO => {
            if p.len() < 7 {
                debug!("decoder: short paper info payload");
                return None;
            }
            Some(DeviceEvent::PaperInfo(PaperInfo {
                paper_type: p[0],
                width_px: u16::from_le_bytes([p[1], p[2]]),
                height_px: u16::from_le_bytes([p[3], p[4]]),
                gap_px: u16::from_le_bytes([p[5], p[6]]),
            }))
        }
        k if k == kind::HEARTBEAT | kind::ACK_FLAG => Some(DeviceEvent::HeartbeatReply),
        k if k & kind::ACK_FLAG != 0 => Some(DeviceEvent::Ack {
            kind: k & !kind::ACK_FLAG,
        }),
        k => {
            debug!("decoder: ignoring unknown frame kind {:#04x}", k);
            None
        }
    }
}

/// Progress payload: `total: u16`, then optional `page_no: u16`,
/// `page_count: u16`, `carbon_used: u16` (zero = absent) and a trailing
/// UTF-8 TID.
fn parse_progress(p: &[u8]) -> Progress {
    let mut progress = Progress::default();
    if p.len() >= 2 {
        progress.total_count = u16::from_le_bytes([p[0], p[1]]) as u32;
    }
    if p.len() >= 4 {
        let v = u16::from_le_bytes([p[2], p[3]]);
        if v != 0 {
            progress.page_no = Some(v as u32);
        }
    }
    if p.len() >= 6 {
        let v = u16::from_le_bytes([p[4], p[5]]);
        if v != 0 {
            progress.page_count = Some(v as u32);
        }
    }
    if p.len() >= 8 {
        let v = u16::from_le_bytes([p[6], p[7]]);
        if v != 0 {
            progress.carbon_used = Some(v as u32);
        }
    }
    if p.len() > 8 {
        if let Ok(tid) = std::str::from_utf8(&p[8..]) {
            if !tid.is_empty() {
                progress.tid = Some(tid.to_string());
            }
        }
    }
    progress
}

// ============================================================================
// TESTS
// ============================================================================
