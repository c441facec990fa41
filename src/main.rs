//! # Rotulo CLI
//!
//! Command-line interface for label printing.
//!
//! ## Usage
//!
//! ```bash
//! # Find printers
//! rotulo discover
//! rotulo discover --wifi
//!
//! # Render a label description to PNG
//! rotulo preview label.json --out label.png --scale 4
//!
//! # Print a label
//! rotulo print label.json --device /dev/rfcomm0 --copies 3
//! rotulo print label.json --wifi --device 192.168.1.50:9100 --model B32R
//!
//! # Query device telemetry
//! rotulo status --device /dev/rfcomm0
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use rotulo::{
    Canvas, PrinterConfig, PrinterSession, RotuloError, SessionEvent, SessionOptions,
    job::{JobState, Page, PrintJob},
    printer::PaperStyle,
    transport::{self, Device, TransportKind},
};

/// Rotulo - label printer utility
#[derive(Parser, Debug)]
#[command(name = "rotulo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan for nearby printers
    Discover {
        /// Scan Wi-Fi instead of Bluetooth
        #[arg(long)]
        wifi: bool,

        /// Scan window in seconds
        #[arg(long, default_value = "8")]
        timeout: u64,
    },

    /// Render a label JSON description to a PNG image
    Preview {
        /// Label description file
        label: PathBuf,

        /// Output PNG path
        #[arg(long, default_value = "label.png")]
        out: PathBuf,

        /// Display magnification
        #[arg(long, default_value = "4.0")]
        scale: f32,
    },

    /// Print a label JSON description
    Print {
        /// Label description file
        label: PathBuf,

        /// Device address: /dev/rfcommN or MAC (Bluetooth), host:port (Wi-Fi)
        #[arg(long, default_value = "/dev/rfcomm0")]
        device: String,

        /// Connect over Wi-Fi instead of Bluetooth
        #[arg(long)]
        wifi: bool,

        /// Printer model
        #[arg(long, default_value = "B21")]
        model: String,

        /// Copies to print
        #[arg(long, default_value = "1")]
        copies: u32,

        /// Print density (defaults to the model's default)
        #[arg(long)]
        density: Option<u8>,

        /// Paper style code (1 = gap, 2 = black mark, 3 = continuous...)
        #[arg(long, default_value = "1")]
        paper: u8,
    },

    /// Query device telemetry and paper geometry
    Status {
        /// Device address
        #[arg(long, default_value = "/dev/rfcomm0")]
        device: String,

        /// Connect over Wi-Fi instead of Bluetooth
        #[arg(long)]
        wifi: bool,

        /// Printer model
        #[arg(long, default_value = "B21")]
        model: String,

        /// How long to wait for reports, in seconds
        #[arg(long, default_value = "3")]
        wait: u64,
    },
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RotuloError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Discover { wifi, timeout } => discover(wifi, timeout),
        Commands::Preview { label, out, scale } => preview(&label, &out, scale),
        Commands::Print {
            label,
            device,
            wifi,
            model,
            copies,
            density,
            paper,
        } => print(&label, &device, wifi, &model, copies, density, paper),
        Commands::Status {
            device,
            wifi,
            model,
            wait,
        } => status(&device, wifi, &model, wait),
    }
}

fn discover(wifi: bool, timeout: u64) -> Result<(), RotuloError> {
    let kind = if wifi {
        TransportKind::Wifi
    } else {
        TransportKind::Bluetooth
    };
    let devices = transport::discover(kind, Duration::from_secs(timeout))?;
    if devices.is_empty() {
        println!("No printers found");
        return Ok(());
    }
    for d in devices {
        println!("{}  {}", d.address, d.name);
    }
    Ok(())
}

fn preview(label: &PathBuf, out: &PathBuf, scale: f32) -> Result<(), RotuloError> {
    let json = std::fs::read_to_string(label)?;
    let canvas = Canvas::from_json(&json).map_err(RotuloError::Canvas)?;
    let image = canvas.preview(scale).map_err(RotuloError::Canvas)?;
    image
        .save(out)
        .map_err(|e| RotuloError::Canvas(rotulo::error::CanvasError::Image(e.to_string())))?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn model_config(model: &str) -> Result<PrinterConfig, RotuloError> {
    PrinterConfig::by_name(model)
        .ok_or_else(|| RotuloError::Protocol(format!("unknown printer model {}", model)))
}

fn open_session(
    device: &str,
    wifi: bool,
    model: &str,
) -> Result<PrinterSession, RotuloError> {
    let config = model_config(model)?;
    let target = if wifi {
        let (host, port) = device
            .rsplit_once(':')
            .and_then(|(h, p)| p.parse::<u16>().ok().map(|p| (h, p)))
            .unwrap_or((device, transport::tcp::DEFAULT_PORT));
        Device::wifi(config.name, host, port)
    } else {
        Device::bluetooth(config.name, device)
    };
    PrinterSession::connect(config, &target, SessionOptions::default())
}

fn print(
    label: &PathBuf,
    device: &str,
    wifi: bool,
    model: &str,
    copies: u32,
    density: Option<u8>,
    paper: u8,
) -> Result<(), RotuloError> {
    let json = std::fs::read_to_string(label)?;
    let canvas = Canvas::from_json(&json).map_err(RotuloError::Canvas)?;
    let raster = canvas.render(1.0).map_err(RotuloError::Canvas)?;

    let config = model_config(model)?;
    let paper = PaperStyle::from_code(paper)
        .ok_or_else(|| RotuloError::Protocol(format!("unknown paper style code {}", paper)))?;
    let job = PrintJob::new(
        vec![Page { raster, copies }],
        density.unwrap_or(config.default_density),
        paper,
    )?;
    let expected = job.total_copies();

    let session = open_session(device, wifi, model)?;
    let events = session.subscribe();
    let id = session.submit(job)?;
    println!("Printing {} ({} copies)...", label.display(), expected);

    let deadline = std::time::Instant::now() + Duration::from_secs(120);
    while std::time::Instant::now() < deadline {
        match events.recv_timeout(Duration::from_millis(500)) {
            Ok(SessionEvent::Progress {
                total_count,
                expected_total,
                ..
            }) => println!("  {}/{}", total_count, expected_total),
            Ok(SessionEvent::JobState { job, state }) if job == id => match state {
                JobState::Completed => {
                    println!("Done");
                    return Ok(());
                }
                JobState::Canceled => {
                    println!("Canceled");
                    return Ok(());
                }
                JobState::Failed(err) => {
                    return Err(RotuloError::Device(err));
                }
                _ => {}
            },
            Ok(SessionEvent::DeviceError(err)) => eprintln!("device: {}", err),
            Ok(SessionEvent::LinkLost) => {
                return Err(RotuloError::Transport("link lost".to_string()));
            }
            Ok(_) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Err(RotuloError::Timeout("print did not finish".to_string()))
}

fn status(device: &str, wifi: bool, model: &str, wait: u64) -> Result<(), RotuloError> {
    let session = open_session(device, wifi, model)?;
    let events = session.subscribe();
    session.query_status()?;
    session.query_paper()?;

    let deadline = std::time::Instant::now() + Duration::from_secs(wait);
    while std::time::Instant::now() < deadline {
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(SessionEvent::Status(s)) => println!("{:?}", s),
            Ok(SessionEvent::PaperInfo(p)) => println!(
                "paper: type {} {}x{}px gap {}px",
                p.paper_type, p.width_px, p.height_px, p.gap_px
            ),
            Ok(SessionEvent::DeviceError(err)) => println!("error: {}", err),
            Ok(_) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
