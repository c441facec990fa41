//! # Wi-Fi (TCP) Transport
//!
//! Communication with Wi-Fi label printers over a plain TCP byte stream,
//! plus UDP broadcast discovery.
//!
//! ## Discovery
//!
//! A probe datagram is broadcast on UDP port 5555; printers on the subnet
//! answer with a JSON record (`{"address", "name", "port",
//! "available_clients"}`). Collection stops when the timeout elapses, so
//! discovery always resolves within the caller's window.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::error::RotuloError;
use crate::transport::{Transport, TransportKind, WifiPrinter};

/// UDP port printers listen on for discovery probes
pub const DISCOVERY_PORT: u16 = 5555;

/// Probe payload identifying this protocol family
const DISCOVERY_PROBE: &[u8] = b"ROTULO_DISCOVER_V1";

/// Default TCP port for print connections
pub const DEFAULT_PORT: u16 = 9100;

/// # TCP Printer Transport
///
/// A reader thread drains the socket into an internal channel so
/// [`Transport::try_recv`] never blocks the session worker.
pub struct TcpTransport {
    stream: TcpStream,
    rx: Receiver<Vec<u8>>,
    open: bool,
}

impl TcpTransport {
    /// Connect to `host:port` within `timeout`.
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, RotuloError> {
        let sock_addr: SocketAddr = addr
            .to_socket_addrs()
            .map_err(|e| RotuloError::Transport(format!("Bad address {}: {}", addr, e)))?
            .next()
            .ok_or_else(|| RotuloError::Transport(format!("Address {} did not resolve", addr)))?;

        let stream = TcpStream::connect_timeout(&sock_addr, timeout)
            .map_err(|e| RotuloError::Transport(format!("Connect to {} failed: {}", addr, e)))?;
        stream
            .set_nodelay(true)
            .map_err(|e| RotuloError::Transport(format!("set_nodelay failed: {}", e)))?;

        let reader = stream
            .try_clone()
            .map_err(|e| RotuloError::Transport(format!("Failed to clone stream: {}", e)))?;
        let rx = spawn_reader(reader);

        info!("tcp: connected to {}", addr);
        Ok(Self {
            stream,
            rx,
            open: true,
        })
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> Result<(), RotuloError> {
        if !self.open {
            return Err(RotuloError::Transport("link closed".to_string()));
        }
        let result = self
            .stream
            .write_all(data)
            .and_then(|_| self.stream.flush())
            .map_err(|e| RotuloError::Transport(format!("Write failed: {}", e)));
        if result.is_err() {
            self.open = false;
        }
        result
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, RotuloError> {
        match self.rx.try_recv() {
            Ok(bytes) => Ok(Some(bytes)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.open = false;
                Err(RotuloError::Transport("connection closed by peer".to_string()))
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        if self.open {
            let _ = self.stream.shutdown(std::net::Shutdown::Both);
            self.open = false;
        }
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Wifi
    }
}

fn spawn_reader(mut stream: TcpStream) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("rotulo-tcp-reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; 512];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) => {
                        debug!("tcp: peer closed connection");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("tcp: read failed: {}", e);
                        break;
                    }
                }
            }
        })
        .expect("failed to spawn tcp reader thread");
    rx
}

/// Broadcast a discovery probe and collect printer replies until `timeout`.
///
/// Replies that are not valid JSON records are skipped individually.
pub fn discover_wifi(timeout: Duration) -> Result<Vec<WifiPrinter>, RotuloError> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .map_err(|e| RotuloError::Transport(format!("UDP bind failed: {}", e)))?;
    socket
        .set_broadcast(true)
        .map_err(|e| RotuloError::Transport(format!("set_broadcast failed: {}", e)))?;
    socket
        .send_to(DISCOVERY_PROBE, ("255.255.255.255", DISCOVERY_PORT))
        .map_err(|e| RotuloError::Transport(format!("Probe send failed: {}", e)))?;

    let deadline = Instant::now() + timeout;
    let mut printers: Vec<WifiPrinter> = Vec::new();
    let mut buf = [0u8; 1024];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        socket
            .set_read_timeout(Some(remaining))
            .map_err(|e| RotuloError::Transport(format!("set_read_timeout failed: {}", e)))?;

        match socket.recv_from(&mut buf) {
            Ok((n, from)) => match serde_json::from_slice::<WifiPrinter>(&buf[..n]) {
                Ok(printer) => {
                    if !printers.iter().any(|p| p.address == printer.address) {
                        debug!("wifi: found {} at {}", printer.name, printer.address);
                        printers.push(printer);
                    }
                }
                Err(e) => debug!("wifi: ignoring malformed reply from {}: {}", from, e),
            },
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(e) => {
                return Err(RotuloError::Transport(format!(
                    "Discovery receive failed: {}",
                    e
                )));
            }
        }
    }

    Ok(printers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_connect_and_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            sock.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"ping");
            sock.write_all(b"pong").unwrap();
        });

        let mut transport =
            TcpTransport::connect(&addr.to_string(), Duration::from_secs(2)).unwrap();
        assert!(transport.is_open());
        transport.send(b"ping").unwrap();

        // Poll for the reply
        let mut got = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while got.len() < 4 && Instant::now() < deadline {
            if let Ok(Some(bytes)) = transport.try_recv() {
                got.extend(bytes);
            } else {
                thread::sleep(Duration::from_millis(5));
            }
        }
        assert_eq!(got, b"pong");

        transport.close();
        assert!(!transport.is_open());
        server.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Port 1 is essentially never listening
        let result = TcpTransport::connect("127.0.0.1:1", Duration::from_millis(200));
        assert!(result.is_err());
    }

    #[test]
    fn test_discovery_resolves_within_timeout() {
        let start = Instant::now();
        // No printers on the loopback-only test network; the call must
        // still return (empty) once the window closes.
        let result = discover_wifi(Duration::from_millis(150));
        assert!(start.elapsed() < Duration::from_secs(2));
        if let Ok(printers) = result {
            assert!(printers.iter().all(|p| !p.address.is_empty()));
        }
    }
}
