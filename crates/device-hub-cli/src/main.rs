//! device-hub CLI - Command-line interface for device inspection
//!
//! Usage:
//!     device-hub [OPTIONS] <COMMAND>
//!
//! Environment Variables:
//!     DEVICE_HUB_PLATFORM: Platform tag (default: AndroidADB)
//!     DEVICE_HUB_ADDRESS: Device address (serial, URL or fixture directory)
//!     DEVICE_HUB_ADB_PATH: adb binary (default: adb)
//!     RUST_LOG: Log filter (default: info)

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use device_hub::{list_devices, ConnectionType, Device, FixtureRecorder, Platform, Registry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Device Hub - inspect Android and iOS devices
#[derive(Parser, Debug)]
#[command(name = "device-hub")]
#[command(about = "Device Hub - screenshots and UI hierarchies from Android and iOS devices")]
#[command(after_help = r#"Examples:
    # List attached Android devices
    device-hub devices

    # Screenshot the only attached device over raw ADB
    device-hub screenshot --output screen.png

    # Dump the UI hierarchy through uiautomator2
    device-hub --platform Android --address emulator-5554 dump

    # Rich dump from WebDriverAgent
    device-hub --platform iOS --address http://localhost:8100 rich

    # Replay a fixture directory
    device-hub --platform AndroidMock --address ./fixtures rich

    # Record three captures as a new fixture session
    device-hub record --dir ./fixtures --count 3
"#)]
struct Cli {
    /// Platform tag: AndroidMock, Android, AndroidADB or iOS
    #[arg(short = 'p', long, global = true, env = "DEVICE_HUB_PLATFORM", default_value = "AndroidADB")]
    platform: String,

    /// Device address (empty selects the platform default)
    #[arg(short = 'a', long, global = true, env = "DEVICE_HUB_ADDRESS", default_value = "")]
    address: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List attached ADB devices and exit
    Devices,

    /// Save a screenshot as PNG
    Screenshot {
        /// Output file
        #[arg(short = 'o', long, default_value = "screenshot.png")]
        output: PathBuf,
    },

    /// Print the native UI hierarchy
    Dump,

    /// Print the rich hierarchy as JSON
    Rich,

    /// Record captures into a timestamped fixture directory
    Record {
        /// Base directory for fixture sessions
        #[arg(short = 'd', long, default_value = "fixtures")]
        dir: PathBuf,

        /// Number of captures (Enter between captures)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let registry = Registry::new();
    let result = run(&registry, &cli.platform, &cli.address, cli.command).await;
    registry.close_all().await;
    result
}

fn platform_tags() -> String {
    Platform::ALL
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Connect through the registry and hand back the shared device
async fn open_device(registry: &Registry, platform: &str, address: &str) -> Result<Arc<Device>> {
    let platform: Platform = platform
        .parse()
        .map_err(|e| anyhow!("{} (expected one of: {})", e, platform_tags()))?;

    let id = registry
        .connect_platform(platform, address)
        .await
        .with_context(|| format!("Failed to connect to {} device", platform))?;
    let device = registry.get(id.as_str()).await?;
    info!("Using {:?}", device);
    Ok(device)
}

async fn run(registry: &Registry, platform: &str, address: &str, command: Command) -> Result<()> {
    match command {
        Command::Devices => print_devices().await?,
        Command::Screenshot { output } => {
            let device = open_device(registry, platform, address).await?;
            let img = device.screenshot().await?;
            img.save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "\u{2705} Saved {}x{} screenshot to {}",
                img.width(),
                img.height(),
                output.display()
            );
        }
        Command::Dump => {
            let device = open_device(registry, platform, address).await?;
            println!("{}", device.dump_hierarchy().await?);
        }
        Command::Rich => {
            let device = open_device(registry, platform, address).await?;
            let rich = device.dump_hierarchy_rich().await?;
            println!("{}", serde_json::to_string_pretty(&rich)?);
        }
        Command::Record { dir, count } => {
            let device = open_device(registry, platform, address).await?;
            record(&device, &dir, count).await?;
        }
    }

    Ok(())
}

async fn record(device: &Device, dir: &Path, count: usize) -> Result<()> {
    let mut recorder = FixtureRecorder::new(dir).await?;
    println!("\u{1F4C1} Recording into {}", recorder.session_dir().display());

    for n in 0..count {
        if n > 0 {
            println!("Press Enter for capture {}/{}...", n + 1, count);
            tokio::task::spawn_blocking(|| {
                let mut line = String::new();
                std::io::stdin().read_line(&mut line).map(|_| ())
            })
            .await??;
        }
        let index = recorder.record(device).await?;
        println!("\u{2705} Captured {}", index);
    }

    println!(
        "Replay with: device-hub --platform AndroidMock --address {} rich",
        recorder.session_dir().display()
    );
    Ok(())
}

/// List ADB devices, checking the adb installation first
async fn print_devices() -> Result<()> {
    let config = &device_hub::CONFIG;
    let adb_path = &config.backend.adb_path;

    if which::which(adb_path).is_err() {
        println!("\u{274C} ADB is not installed or not in PATH ({})", adb_path);
        println!("   Solution: Install ADB:");
        println!("     - macOS: brew install android-platform-tools");
        println!("     - Linux: sudo apt install android-tools-adb");
        println!(
            "     - Windows: Download from https://developer.android.com/studio/releases/platform-tools"
        );
        return Err(anyhow!("adb not found"));
    }

    let devices = list_devices(adb_path, config.timing.command()).await?;
    if devices.is_empty() {
        println!("No devices connected.");
        return Ok(());
    }

    println!("Connected devices:");
    println!("{}", "-".repeat(60));
    for device in devices {
        let status_icon = if device.is_online() { "\u{2713}" } else { "\u{2717}" };
        let conn_type = match device.connection_type {
            ConnectionType::Usb => "USB",
            ConnectionType::Emulator => "Emulator",
            ConnectionType::Remote => "Remote",
        };
        let model_info = device
            .model
            .as_ref()
            .map(|m| format!(" ({})", m))
            .unwrap_or_default();
        println!(
            "  {} {:<30} [{}]{}",
            status_icon, device.device_id, conn_type, model_info
        );
    }

    Ok(())
}
