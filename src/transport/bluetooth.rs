//! # Bluetooth RFCOMM Transport
//!
//! Communication with label printers over Bluetooth Serial Port Profile
//! (SPP) via RFCOMM.
//!
//! ## Bluetooth Setup (Linux)
//!
//! Before using this transport, the printer must be paired and bound to an
//! RFCOMM device:
//!
//! ```bash
//! # 1. Find the printer's Bluetooth address
//! $ bluetoothctl
//! [bluetooth]# scan on
//! # Look for the printer model name, e.g. "B21-XXXXXXXX"
//! # Note the address, e.g. 03:26:03:XX:XX:XX
//!
//! # 2. Pair with the printer
//! [bluetooth]# pair 03:26:03:XX:XX:XX
//!
//! # 3. Bind to RFCOMM device
//! $ sudo rfcomm bind 0 03:26:03:XX:XX:XX
//! # This creates /dev/rfcomm0
//! ```
//!
//! [`setup_rfcomm`] automates steps the shell can do; [`scan`] lists paired
//! and recently seen printers by name.
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode so binary frames pass through
//! unmodified: no input/output processing, 8-bit characters, no echo, and
//! critically no XON/XOFF flow control (0x11/0x13 appear in raster data).
//!
//! ## Chunked Writes
//!
//! Large frames are written in chunks with a small delay to avoid
//! overflowing the Bluetooth buffer. Back-pressure beyond that is handled by
//! the session worker pacing raster frames against printer acknowledgments.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Command;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::RotuloError;
use crate::transport::{Device, Transport, TransportKind};

/// Default RFCOMM device path
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm0";

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// # Bluetooth Printer Transport
///
/// Manages a connection to a label printer over Bluetooth RFCOMM.
///
/// A reader thread drains the device into an internal channel so
/// [`Transport::try_recv`] never blocks the session worker.
pub struct BluetoothTransport {
    file: File,
    rx: Receiver<Vec<u8>>,
    open: bool,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl BluetoothTransport {
    /// Open a Bluetooth connection to the printer.
    ///
    /// ## Parameters
    ///
    /// - `device`: Path to the RFCOMM device (e.g., "/dev/rfcomm0")
    ///
    /// ## Errors
    ///
    /// Returns an error if the device doesn't exist, permission is denied
    /// (may need root or the dialout group), or TTY configuration fails.
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, RotuloError> {
        let path = device.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                RotuloError::Transport(format!("Failed to open {}: {}", path.display(), e))
            })?;

        configure_tty_raw(file.as_raw_fd())?;

        let reader = file.try_clone().map_err(|e| {
            RotuloError::Transport(format!("Failed to clone device handle: {}", e))
        })?;
        let rx = spawn_reader(reader);

        info!("bluetooth: opened {}", path.display());
        Ok(Self {
            file,
            rx,
            open: true,
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }

    /// Open with the default device path (/dev/rfcomm0).
    pub fn open_default() -> Result<Self, RotuloError> {
        Self::open(DEFAULT_DEVICE)
    }

    /// Set the chunk size for large writes. Default is 4096 bytes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the delay between chunks. Default is 2ms.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }
}

impl Transport for BluetoothTransport {
    fn send(&mut self, data: &[u8]) -> Result<(), RotuloError> {
        if !self.open {
            return Err(RotuloError::Transport("link closed".to_string()));
        }

        let result = (|| -> Result<(), RotuloError> {
            for chunk in data.chunks(self.chunk_size) {
                self.file
                    .write_all(chunk)
                    .map_err(|e| RotuloError::Transport(format!("Write failed: {}", e)))?;
                if data.len() > self.chunk_size && !self.chunk_delay.is_zero() {
                    thread::sleep(self.chunk_delay);
                }
            }
            self.file
                .flush()
                .map_err(|e| RotuloError::Transport(format!("Flush failed: {}", e)))
        })();

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
                Err(RotuloError::Transport("reader thread stopped".to_string()))
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Bluetooth
    }
}

/// Spawn the reader thread draining the device into a channel.
///
/// The thread exits when the device read fails (link dropped) or the
/// receiving side is gone.
fn spawn_reader(mut file: File) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("rotulo-bt-reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; 512];
            loop {
                match file.read(&mut buf) {
                    Ok(0) => {
                        debug!("bluetooth: device closed");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("bluetooth: read failed: {}", e);
                        break;
                    }
                }
            }
        })
        .expect("failed to spawn bluetooth reader thread");
    rx
}

/// Configure a file descriptor for raw TTY mode.
///
/// Disables all input/output processing so binary data passes through
/// unmodified. IXON/IXOFF/IXANY matter most: 0x11 (XON) and 0x13 (XOFF)
/// occur freely in packed raster rows.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> Result<(), RotuloError> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(RotuloError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(RotuloError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> Result<(), RotuloError> {
    Ok(())
}

// ============================================================================
// DISCOVERY & RFCOMM SETUP
// ============================================================================

/// Scan for nearby Bluetooth printers, returning names only.
///
/// Runs `bluetoothctl --timeout N scan on` then parses `bluetoothctl
/// devices`. Resolves within roughly `timeout` plus command overhead.
#[cfg(unix)]
pub fn scan(timeout: Duration) -> Result<Vec<Device>, RotuloError> {
    let secs = timeout.as_secs().max(1);
    // Let the controller populate its device list; output is irrelevant.
    let _ = Command::new("bluetoothctl")
        .arg("--timeout")
        .arg(secs.to_string())
        .arg("scan")
        .arg("on")
        .output()
        .map_err(|e| RotuloError::Transport(format!("Failed to run bluetoothctl: {}", e)))?;

    let output = Command::new("bluetoothctl")
        .arg("devices")
        .output()
        .map_err(|e| RotuloError::Transport(format!("Failed to run bluetoothctl: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut devices = Vec::new();
    for line in stdout.lines() {
        // Format: "Device XX:XX:XX:XX:XX:XX Name With Spaces"
        let mut parts = line.splitn(3, ' ');
        if parts.next() != Some("Device") {
            continue;
        }
        let (Some(mac), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        if !is_valid_mac(mac) {
            continue;
        }
        devices.push(Device::bluetooth(name.trim(), mac));
    }

    debug!("bluetooth: scan found {} device(s)", devices.len());
    Ok(devices)
}

#[cfg(not(unix))]
pub fn scan(_timeout: Duration) -> Result<Vec<Device>, RotuloError> {
    Err(RotuloError::Transport(
        "Bluetooth discovery not supported on this platform".to_string(),
    ))
}

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Checks `/proc/net/rfcomm` and falls back to the `rfcomm -a` command.
/// Returns the device path (e.g., "/dev/rfcomm0") if found.
#[cfg(unix)]
pub fn find_rfcomm_for_mac(mac: &str) -> Result<Option<String>, RotuloError> {
    let mac_upper = mac.to_uppercase();

    // /proc/net/rfcomm format: "rfcomm0: XX:XX:XX:XX:XX:XX channel N ..."
    if let Ok(contents) = fs::read_to_string("/proc/net/rfcomm") {
        if let Some(path) = match_rfcomm_line(&contents, &mac_upper) {
            return Ok(Some(path));
        }
    }

    let output = Command::new("rfcomm")
        .arg("-a")
        .output()
        .map_err(|e| RotuloError::Transport(format!("Failed to run 'rfcomm -a': {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(match_rfcomm_line(&stdout, &mac_upper))
}

#[cfg(unix)]
fn match_rfcomm_line(listing: &str, mac_upper: &str) -> Option<String> {
    for line in listing.lines() {
        if !line.to_uppercase().contains(mac_upper) {
            continue;
        }
        if let Some(dev_name) = line.split(':').next() {
            let device_path = format!("/dev/{}", dev_name.trim());
            if Path::new(&device_path).exists() {
                return Some(device_path);
            }
        }
    }
    None
}

#[cfg(not(unix))]
pub fn find_rfcomm_for_mac(_mac: &str) -> Result<Option<String>, RotuloError> {
    Ok(None)
}

/// Set up an RFCOMM device for a Bluetooth MAC address.
///
/// Runs:
/// 1. `bluetoothctl connect <MAC>` - connect to device
/// 2. `l2ping -c 1 <MAC>` - verify connectivity
/// 3. `rfcomm bind <channel> <MAC> 1` - create /dev/rfcommN
///
/// Returns the device path on success (e.g., "/dev/rfcomm0").
///
/// **Requires root privileges** for `rfcomm bind`.
#[cfg(unix)]
pub fn setup_rfcomm(mac: &str, channel: u8) -> Result<String, RotuloError> {
    let mac_upper = mac.to_uppercase();
    let device_path = format!("/dev/rfcomm{}", channel);

    info!("bluetooth: connecting to {}", mac_upper);
    let output = Command::new("bluetoothctl")
        .arg("connect")
        .arg(&mac_upper)
        .output()
        .map_err(|e| RotuloError::Transport(format!("Failed to run bluetoothctl: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("Connection successful") && !stdout.contains("already connected") {
        // l2ping below is the real connectivity check
        warn!("bluetooth: bluetoothctl returned: {}", stdout.trim());
    }

    thread::sleep(Duration::from_millis(500));

    let output = Command::new("l2ping")
        .arg("-c")
        .arg("1")
        .arg(&mac_upper)
        .output()
        .map_err(|e| RotuloError::Transport(format!("Failed to run l2ping: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RotuloError::Transport(format!(
            "Device {} not reachable: {}",
            mac_upper,
            stderr.trim()
        )));
    }

    info!("bluetooth: binding rfcomm{}", channel);
    let output = Command::new("rfcomm")
        .arg("bind")
        .arg(channel.to_string())
        .arg(&mac_upper)
        .arg("1") // RFCOMM channel 1 (standard for SPP)
        .output()
        .map_err(|e| RotuloError::Transport(format!("Failed to run rfcomm bind: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RotuloError::Transport(format!(
            "rfcomm bind failed: {}",
            stderr.trim()
        )));
    }

    thread::sleep(Duration::from_millis(500));

    if !Path::new(&device_path).exists() {
        return Err(RotuloError::Transport(format!(
            "Device {} was not created",
            device_path
        )));
    }

    info!("bluetooth: created {}", device_path);
    Ok(device_path)
}

#[cfg(not(unix))]
pub fn setup_rfcomm(_mac: &str, _channel: u8) -> Result<String, RotuloError> {
    Err(RotuloError::Transport(
        "RFCOMM setup not supported on this platform".to_string(),
    ))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_path() {
        assert_eq!(DEFAULT_DEVICE, "/dev/rfcomm0");
    }

    #[test]
    fn test_valid_mac_addresses() {
        assert!(is_valid_mac("00:11:22:33:44:55"));
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_invalid_mac_addresses() {
        assert!(!is_valid_mac("00:11:22:33:44")); // too short
        assert!(!is_valid_mac("00:11:22:33:44:55:66")); // too long
        assert!(!is_valid_mac("00-11-22-33-44-55")); // wrong separator
        assert!(!is_valid_mac("GG:HH:II:JJ:KK:LL")); // invalid hex
        assert!(!is_valid_mac("")); // empty
    }

    // Note: transport I/O tests require actual hardware; the session and
    // protocol suites cover the byte-stream contract via MockTransport.
}
