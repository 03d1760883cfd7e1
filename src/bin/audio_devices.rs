//! Audio device tool
//!
//! Lists devices, looks them up by name, and opens test streams.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_devices::audio::{CpalHost, Device, StreamContext};
use audio_devices::Config;

#[derive(Parser, Debug)]
#[command(name = "audio-devices")]
#[command(about = "Enumerate audio devices and open test streams")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, env = "AUDIO_DEVICES_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all available devices
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the index of the first device with this exact name
    Find { name: String },
    /// Open and run a stream, then stop and close it
    Probe {
        /// Input device name or index
        #[arg(short, long)]
        input: Option<String>,
        /// Output device name or index
        #[arg(short, long)]
        output: Option<String>,
        /// How long to keep the stream running
        #[arg(short, long, default_value = "2")]
        seconds: u64,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_default().context("Failed to load config")?,
    };

    let host = CpalHost::new();
    info!("Using audio host {}", host.name());

    match args.command {
        Command::List { json } => list(&host, json)?,
        Command::Find { name } => match Device::find_in(&host, &name) {
            Some(index) => println!("{}", index),
            None => {
                eprintln!("No device named {:?}", name);
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Probe {
            input,
            output,
            seconds,
        } => {
            let input = input.or(config.input_device.clone());
            let output = output.or(config.output_device.clone());
            probe(&host, &config, input, output, Duration::from_secs(seconds))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn list(host: &CpalHost, json: bool) -> Result<()> {
    let devices = Device::enumerate(host);

    if json {
        let infos: Vec<_> = devices.iter().map(Device::info).collect();
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!("\n=== Available Audio Devices ===");
    for (index, device) in devices.iter().enumerate() {
        let mut markers = Vec::new();
        if device.is_default_input() {
            markers.push("DEFAULT IN");
        }
        if device.is_default_output() {
            markers.push("DEFAULT OUT");
        }
        if !device.is_valid() {
            markers.push("UNPROBED");
        }
        let markers = if markers.is_empty() {
            String::new()
        } else {
            format!(" [{}]", markers.join(", "))
        };

        println!("  {:>2}: {}{}", index, device.name(), markers);
        println!(
            "      Channels: {} in / {} out / {} duplex",
            device.input_channels(),
            device.output_channels(),
            device.duplex_channels()
        );
    }
    println!();
    Ok(())
}

fn probe(
    host: &CpalHost,
    config: &Config,
    input: Option<String>,
    output: Option<String>,
    duration: Duration,
) -> Result<()> {
    let deadline = run_deadline(Instant::now(), duration)?;
    let input = input.map(|arg| resolve_device(host, &arg)).transpose()?;
    let mut output = output.map(|arg| resolve_device(host, &arg)).transpose()?;

    if input.is_none() && output.is_none() {
        output = Device::enumerate(host)
            .iter()
            .position(Device::is_default_output);
        if output.is_none() {
            bail!("No device given and no default output device found");
        }
    }

    let Some(mut stream) = StreamContext::create_with(host, input, output, config.stream) else {
        bail!("Could not create a stream for input {:?} / output {:?}", input, output);
    };

    if !stream.start() {
        bail!("Failed to start stream");
    }
    info!(
        "Stream running: input={:?} output={:?} settings={:?}",
        stream.input(),
        stream.output(),
        stream.settings()
    );

    while Instant::now() < deadline {
        while let Some(err) = stream.check_errors() {
            warn!("Stream error: {}", err);
        }
        thread::sleep(Duration::from_millis(50));
    }

    if !stream.stop() {
        warn!("Stream did not stop cleanly");
    }
    stream.close();
    info!("Stream closed");
    Ok(())
}

/// Accept either a device index or an exact device name
fn resolve_device(host: &CpalHost, arg: &str) -> Result<usize> {
    if let Ok(index) = arg.parse::<usize>() {
        return Ok(index);
    }
    Device::find_in(host, arg).with_context(|| format!("No device named {:?}", arg))
}

/// Point in time at which a stream started at `now` should be stopped
fn run_deadline(now: Instant, duration: Duration) -> Result<Instant> {
    now.checked_add(duration)
        .with_context(|| format!("Run time of {}s is too long", duration.as_secs()))
}
