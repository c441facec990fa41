//! # Command Protocol Codec
//!
//! This module implements the framed command protocol spoken to the label
//! printer over Bluetooth RFCOMM or TCP.
//!
//! ## Frame Layout
//!
//! Every frame in both directions uses the same self-delimiting layout:
//!
//! ```text
//! | 0x55 0x55 | kind: u8 | len: u8 | payload[len] | xor: u8 | 0xAA 0xAA |
//! ```
//!
//! `xor` is the XOR of the kind byte, the length byte and every payload
//! byte. The explicit header, length, checksum and trailer make decoding
//! **resynchronizing**: a corrupt or truncated frame is discarded without
//! desynchronizing subsequent frame boundaries, and the decoder never relies
//! on transport message boundaries.
//!
//! ## Byte Order
//!
//! Multi-byte integers in payloads are **little-endian**.
//!
//! ## Modules
//!
//! - [`frame`]: frame constants, checksum, encode/parse of a single frame
//! - [`encode`]: host-to-printer command builders
//! - [`decode`]: streaming decoder producing typed [`DeviceEvent`]s

pub mod decode;
pub mod encode;
pub mod frame;

pub use decode::{Decoder, DeviceEvent};
pub use frame::Frame;
