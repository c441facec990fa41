//! # Printer Configurations
//!
//! Hardware specifications for supported label printer models.

pub mod config;

pub use config::{PaperStyle, PrinterConfig};
