//! # Printer Transport Layer
//!
//! This module provides communication backends for the printer session.
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: Bluetooth RFCOMM for wireless printing (Linux)
//! - [`tcp`]: Wi-Fi printers over TCP, with UDP broadcast discovery
//! - [`mock`]: scriptable in-memory transport for tests
//!
//! One session drives exactly one [`Transport`] at a time. All transports
//! are byte streams: framing and flow control live in the protocol codec and
//! the session worker, not here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RotuloError;

pub mod bluetooth;
pub mod mock;
pub mod tcp;

pub use bluetooth::BluetoothTransport;
pub use mock::{MockHandle, MockTransport};
pub use tcp::TcpTransport;

/// Physical channel a device is reached over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Bluetooth,
    Wifi,
}

/// Connection lifecycle of the session's device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The link dropped underneath an open session
    Lost,
}

/// A discovered or connected printer.
///
/// For Bluetooth the address is the adapter MAC (or a bound RFCOMM device
/// path); for Wi-Fi it is `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub kind: TransportKind,
    pub address: String,
}

impl Device {
    /// Bluetooth device by name and MAC address.
    pub fn bluetooth(name: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TransportKind::Bluetooth,
            address: mac.into(),
        }
    }

    /// Wi-Fi device by host and port.
    pub fn wifi(name: impl Into<String>, host: &str, port: u16) -> Self {
        Self {
            name: name.into(),
            kind: TransportKind::Wifi,
            address: format!("{}:{}", host, port),
        }
    }
}

/// Wi-Fi discovery record: one responder to the broadcast probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiPrinter {
    /// IP address of the printer
    pub address: String,
    /// Advertised printer name
    pub name: String,
    /// TCP port accepting print connections
    pub port: u16,
    /// Remaining client connection slots
    pub available_clients: u8,
}

impl From<WifiPrinter> for Device {
    fn from(p: WifiPrinter) -> Self {
        Device::wifi(p.name.clone(), &p.address, p.port)
    }
}

/// A bidirectional byte stream to a printer.
///
/// `send` must deliver the full buffer or fail; `try_recv` drains whatever
/// inbound bytes have arrived without blocking (frame reassembly happens in
/// the protocol decoder).
pub trait Transport: Send {
    /// Write all bytes to the device.
    fn send(&mut self, data: &[u8]) -> Result<(), RotuloError>;

    /// Drain pending inbound bytes. `Ok(None)` means nothing arrived.
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, RotuloError>;

    /// Whether the link is still believed up.
    fn is_open(&self) -> bool;

    /// Tear down the link. Idempotent.
    fn close(&mut self);

    /// Physical channel of this transport.
    fn kind(&self) -> TransportKind;
}

/// Discover nearby printers on the given channel.
///
/// Bluetooth discovery returns names only; Wi-Fi discovery returns full
/// [`WifiPrinter`] records (use [`tcp::discover_wifi`] directly to see
/// ports and client slots). The scan always resolves within `timeout`.
pub fn discover(kind: TransportKind, timeout: Duration) -> Result<Vec<Device>, RotuloError> {
    match kind {
        TransportKind::Bluetooth => bluetooth::scan(timeout),
        TransportKind::Wifi => Ok(tcp::discover_wifi(timeout)?
            .into_iter()
            .map(Device::from)
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_wifi_address() {
        let d = Device::wifi("B21-1A2B", "192.168.1.50", 9100);
        assert_eq!(d.address, "192.168.1.50:9100");
        assert_eq!(d.kind, TransportKind::Wifi);
    }

    #[test]
    fn test_wifi_printer_record_json() {
        // Wire format of a discovery reply datagram
        let json = r#"{"address":"192.168.1.50","name":"B21-1A2B","port":9100,"available_clients":2}"#;
        let p: WifiPrinter = serde_json::from_str(json).unwrap();
        assert_eq!(p.port, 9100);
        assert_eq!(p.available_clients, 2);
        let d: Device = p.into();
        assert_eq!(d.name, "B21-1A2B");
    }
}
