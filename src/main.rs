//! AnalogKey GW - analog keyboard to MIDI gateway
//!
//! Reads continuous key-pressure samples from an analog keyboard sensor
//! and translates them into MIDI Note On/Off, CC, and Channel Aftertouch
//! on a user-selected output port.

use anyhow::Result;
use clap::Parser;
use colored::*;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use analogkey_gw::cli::{self, ReplContext};
use analogkey_gw::config::{watcher::ConfigWatcher, AppConfig};
use analogkey_gw::engine::TranslationEngine;
use analogkey_gw::input;
use analogkey_gw::midi_out::MidiOut;
use analogkey_gw::sensor::NullSensor;

/// AnalogKey Gateway - play MIDI from an analog keyboard's key pressure
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI output ports
    #[arg(long)]
    list_ports: bool,

    /// Run without the interactive REPL (stop with ctrl-c)
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting AnalogKey GW...");
    info!("Configuration file: {}", args.config);

    if args.list_ports {
        list_ports_formatted();
        return Ok(());
    }

    // A missing settings file falls back to defaults; a file that exists
    // but fails to parse or validate is fatal.
    let (config_watcher, initial_config) = if Path::new(&args.config).exists() {
        let (watcher, config) = ConfigWatcher::new(args.config.clone()).await?;
        (Some(watcher), (*config).clone())
    } else {
        info!("No config file at {}, using defaults", args.config);
        (None, AppConfig::default())
    };

    let keymap = initial_config.build_keymap()?;
    let engine = Arc::new(Mutex::new(TranslationEngine::new(
        initial_config.engine_config(),
        keymap,
    )));
    let midi_out = MidiOut::new();

    if !initial_config.midi.output_port.is_empty() {
        match midi_out.connect(&initial_config.midi.output_port) {
            Ok(name) => info!("MIDI output: {}", name),
            Err(e) => warn!("Could not open MIDI output ({}); continuing disconnected", e),
        }
    }

    let timing = initial_config.poller_timing();
    let config = Arc::new(Mutex::new(initial_config));

    // No hardware backend is compiled in; the worker idles on the null
    // sensor until an AnalogSensor implementation is wired in here.
    let poller = input::spawn(
        Box::new(NullSensor),
        engine.clone(),
        midi_out.clone(),
        timing,
    );

    // Apply hot-reloaded configs between cycles
    if let Some(mut watcher) = config_watcher {
        let config = config.clone();
        let engine = engine.clone();
        let midi_out = midi_out.clone();
        tokio::spawn(async move {
            while let Some(new_config) = watcher.next_config().await {
                apply_config_update(&config, &engine, &midi_out, new_config);
            }
        });
    }

    if args.headless {
        shutdown_signal().await;
    } else {
        let ctx = ReplContext {
            config_path: args.config.clone(),
            config: config.clone(),
            engine: engine.clone(),
            midi_out: midi_out.clone(),
            status: poller.status(),
        };
        cli::run_repl(ctx).await?;
    }

    info!("Shutting down...");
    poller.shutdown();
    midi_out.disconnect();
    info!("AnalogKey GW shutdown complete");

    Ok(())
}

/// Push a reloaded config into the running system
fn apply_config_update(
    config: &Arc<Mutex<AppConfig>>,
    engine: &Arc<Mutex<TranslationEngine>>,
    midi_out: &MidiOut,
    new_config: AppConfig,
) {
    let (port_changed, keymap_changed) = {
        let mut current = config.lock();
        let port_changed = current.midi.output_port != new_config.midi.output_port;
        let keymap_changed = current.keymap != new_config.keymap;
        *current = new_config.clone();
        (port_changed, keymap_changed)
    };

    engine.lock().apply_config(new_config.engine_config());

    if keymap_changed {
        warn!("Key table changes take effect after restart");
    }

    if port_changed {
        if new_config.midi.output_port.is_empty() {
            midi_out.disconnect();
        } else if let Err(e) = midi_out.connect(&new_config.midi.output_port) {
            warn!("Could not open MIDI output ({}); continuing disconnected", e);
        }
    }

    info!("Configuration applied");
}

fn list_ports_formatted() {
    match MidiOut::list_ports() {
        Ok(ports) if ports.is_empty() => println!("No MIDI output ports found"),
        Ok(ports) => {
            println!("{}", "MIDI output ports:".bold());
            for (i, name) in ports.iter().enumerate() {
                println!("  {}: {}", i, name);
            }
        }
        Err(e) => println!("{} {:#}", "error:".red().bold(), e),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
