//! # Rotulo - Label Printer Session Engine
//!
//! Rotulo is a Rust library for driving thermal label printers over
//! Bluetooth RFCOMM or Wi-Fi. It provides:
//!
//! - **Canvas**: millimeter-based label design with text, barcodes, shapes
//!   and images
//! - **Rendering**: 1-bit rasterization with Bayer 8x8 ordered dithering
//! - **Protocol**: framed command codec with a self-resynchronizing decoder
//! - **Session**: job queue, progress accounting, heartbeats and link-loss
//!   detection
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use rotulo::{
//!     canvas::{Canvas, Rotation, Text},
//!     job::{Page, PrintJob},
//!     printer::{PaperStyle, PrinterConfig},
//!     session::{PrinterSession, SessionOptions},
//!     transport::{self, TransportKind},
//! };
//!
//! // Find a printer and open a session
//! let config = PrinterConfig::B21;
//! let devices = transport::discover(TransportKind::Bluetooth, Duration::from_secs(8))?;
//! let session = PrinterSession::connect(config, &devices[0], SessionOptions::default())?;
//!
//! // Design a 50x30mm label
//! let mut canvas = Canvas::new(50.0, 30.0, Rotation::R0, &config)?;
//! canvas.draw_text(Text {
//!     x: 2.0, y: 2.0, w: 46.0, h: 8.0,
//!     content: "Hello".to_string(),
//!     font_size: 4.0,
//!     ..Default::default()
//! })?;
//!
//! // Print three copies
//! let page = Page { raster: canvas.render(1.0)?, copies: 3 };
//! let job = PrintJob::new(vec![page], config.default_density, PaperStyle::Gap)?;
//! let _events = session.subscribe();
//! session.submit(job)?;
//! # Ok::<(), rotulo::error::RotuloError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`canvas`] | Label design surface and primitives |
//! | [`render`] | Dithering and packed raster buffers |
//! | [`protocol`] | Frame codec: command builders and streaming decoder |
//! | [`job`] | Print job queue, cache and progress tracking |
//! | [`session`] | Connected-printer orchestration |
//! | [`status`] | Device error taxonomy and telemetry |
//! | [`transport`] | Bluetooth, Wi-Fi and mock communication backends |
//! | [`printer`] | Printer model configurations |
//! | [`units`] | Millimeter/pixel conversions |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Built-in configurations cover the B21, B1, D110 and B32R models; other
//! printers of the same protocol family work with a custom
//! [`printer::PrinterConfig`].

pub mod canvas;
pub mod error;
pub mod job;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod session;
pub mod status;
pub mod transport;
pub mod units;

// Re-exports for convenience
pub use canvas::Canvas;
pub use error::RotuloError;
pub use printer::PrinterConfig;
pub use session::{PrinterSession, SessionEvent, SessionOptions};
