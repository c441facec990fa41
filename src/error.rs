//! # Error Types
//!
//! This module defines error types used throughout the rotulo library.
//!
//! ## Propagation Policy
//!
//! - **Canvas** and **Queue** errors are returned synchronously from the call
//!   that caused them.
//! - **Transport** and **device-reported** errors surface asynchronously on
//!   the session event channel; fatal device errors additionally fail the
//!   active print job.
//! - Malformed inbound frames are discarded by the protocol decoder and never
//!   abort the session.

use thiserror::Error;

use crate::status::DeviceError;

/// Main error type for rotulo operations
#[derive(Debug, Error)]
pub enum RotuloError {
    /// Transport-level errors (discovery, connection, I/O)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Protocol-level errors (frame too large, invalid parameter)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Canvas validation or rendering error
    #[error("Canvas error: {0}")]
    Canvas(#[from] CanvasError),

    /// Job queue error
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Error reported by the printer
    #[error("Device error: {0}")]
    Device(DeviceError),

    /// Bounded operation did not resolve in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from canvas construction and draw operations.
///
/// Every draw operation validates before mutating the canvas: a failed call
/// leaves the primitive list unchanged.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Primitive does not fit inside the canvas bounds
    #[error("Primitive out of bounds: {0}")]
    OutOfBounds(String),

    /// Rotation must be one of 0, 90, 180, 270
    #[error("Invalid rotation: {0} (must be 0, 90, 180 or 270)")]
    InvalidRotation(i32),

    /// Canvas dimensions or draw parameters are invalid
    #[error("Invalid canvas parameter: {0}")]
    InvalidParam(String),

    /// Barcode content is not valid for the chosen symbology
    #[error("Invalid {symbology} content: {reason}")]
    InvalidContent {
        symbology: &'static str,
        reason: String,
    },

    /// Symbology type code is accepted but has no encoder
    #[error("Unsupported symbology: {0}")]
    UnsupportedSymbology(&'static str),

    /// Unknown 1D/2D symbology type code
    #[error("Unknown symbology type code: {0}")]
    UnknownTypeCode(u8),

    /// Image data could not be decoded
    #[error("Image error: {0}")]
    Image(String),

    /// Label JSON could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the job queue state machine.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The bounded job cache is full and the overflow policy is `Reject`
    #[error("Job cache is full")]
    CacheFull,

    /// Requested state change is not allowed by the job state machine
    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// The job has no pages or zero total copies
    #[error("Empty print job")]
    EmptyJob,

    /// Operation requires a connected session
    #[error("Not connected")]
    NotConnected,
}
