//! Command-line interface and REPL
//!
//! The interactive control surface: device selection, octave windows,
//! channel, and send flags are adjusted live from here, and every change
//! is persisted to the settings file.

use anyhow::{bail, Result};
use colored::*;
use parking_lot::Mutex;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::config::AppConfig;
use crate::engine::{OctaveWindows, TranslationEngine};
use crate::input::SensorStatus;
use crate::midi_out::MidiOut;

/// Shared state the REPL operates on
pub struct ReplContext {
    pub config_path: String,
    pub config: Arc<Mutex<AppConfig>>,
    pub engine: Arc<Mutex<TranslationEngine>>,
    pub midi_out: MidiOut,
    pub status: watch::Receiver<SensorStatus>,
}

pub async fn run_repl(ctx: ReplContext) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!(
        "{}",
        "Type 'help' for commands, 'exit' to quit.".dimmed()
    );

    loop {
        let readline = rl.readline("analogkey> ");
        match readline {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);
                if line == "exit" || line == "quit" {
                    break;
                }
                if let Err(e) = handle_command(&line, &ctx).await {
                    println!("{} {:#}", "error:".red().bold(), e);
                }
            }
            Err(_) => break,
        }
    }

    Ok(())
}

async fn handle_command(line: &str, ctx: &ReplContext) -> Result<()> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    let args: Vec<&str> = parts.collect();

    match cmd {
        "help" => print_help(),
        "ports" => list_ports(ctx)?,
        "device" => select_device(ctx, &args).await?,
        "channel" => set_channel(ctx, &args).await?,
        "octave" => set_octave(ctx, &args).await?,
        "send" => set_send_flag(ctx, &args).await?,
        "status" => show_status(ctx),
        "save" => {
            persist(ctx).await?;
            println!("Settings saved to {}", ctx.config_path);
        }
        other => bail!("unknown command '{}', try 'help'", other),
    }

    Ok(())
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  {}                     list MIDI output ports", "ports".yellow());
    println!("  {}  connect to a port by name", "device <pattern>".yellow());
    println!("  {}    set the MIDI channel", "channel <0-15>".yellow());
    println!("  {}  move an octave window", "octave low|high <0-9>".yellow());
    println!("  {}  toggle a message class", "send note|at|cc on|off".yellow());
    println!("  {}                    sensor, port, and engine state", "status".yellow());
    println!("  {}                      persist settings now", "save".yellow());
    println!("  {}                      quit", "exit".yellow());
}

fn list_ports(ctx: &ReplContext) -> Result<()> {
    let ports = MidiOut::list_ports()?;
    if ports.is_empty() {
        println!("No MIDI output ports found");
        return Ok(());
    }

    let current = ctx.midi_out.current_port();
    println!("{}", "MIDI output ports:".bold());
    for (i, name) in ports.iter().enumerate() {
        if current.as_deref() == Some(name.as_str()) {
            println!("  {}: {} {}", i, name.green(), "(connected)".dimmed());
        } else {
            println!("  {}: {}", i, name);
        }
    }
    Ok(())
}

async fn select_device(ctx: &ReplContext, args: &[&str]) -> Result<()> {
    if args.is_empty() {
        bail!("usage: device <port name pattern>");
    }
    let pattern = args.join(" ");

    // connect() closes the old port before opening the new one, so the
    // polling worker never writes into a half-closed sink
    let name = ctx.midi_out.connect(&pattern)?;
    println!("Connected to {}", name.green());

    ctx.config.lock().midi.output_port = name;
    persist(ctx).await
}

async fn set_channel(ctx: &ReplContext, args: &[&str]) -> Result<()> {
    let channel: u8 = match args.first().and_then(|a| a.parse().ok()) {
        Some(c) if c <= 15 => c,
        _ => bail!("usage: channel <0-15>"),
    };

    ctx.config.lock().midi.channel = channel;
    apply_engine_config(ctx);
    info!("MIDI channel set to {}", channel);
    persist(ctx).await
}

async fn set_octave(ctx: &ReplContext, args: &[&str]) -> Result<()> {
    let target = args.first().copied();
    let value = args.get(1).and_then(|a| a.parse::<u8>().ok());
    let (which, value) = match (target, value) {
        (Some(w @ ("low" | "high")), Some(v)) if v <= OctaveWindows::MAX_OCTAVE => (w, v),
        _ => bail!("usage: octave low|high <0-9>"),
    };

    {
        let mut config = ctx.config.lock();
        match which {
            "low" => config.octaves.low = value,
            _ => config.octaves.high = value,
        }
    }
    apply_engine_config(ctx);
    info!("Octave window '{}' moved to {}", which, value);
    persist(ctx).await
}

async fn set_send_flag(ctx: &ReplContext, args: &[&str]) -> Result<()> {
    let (which, on) = match (args.first().copied(), args.get(1).copied()) {
        (Some(w @ ("note" | "at" | "cc")), Some(state @ ("on" | "off"))) => {
            (w, state == "on")
        }
        _ => bail!("usage: send note|at|cc on|off"),
    };

    {
        let mut config = ctx.config.lock();
        match which {
            "note" => config.send.note = on,
            "at" => config.send.aftertouch = on,
            _ => config.send.cc = on,
        }
    }
    apply_engine_config(ctx);
    info!("Send '{}' {}", which, if on { "enabled" } else { "disabled" });
    persist(ctx).await
}

fn show_status(ctx: &ReplContext) {
    let sensor = *ctx.status.borrow();
    let sensor_label = match sensor {
        SensorStatus::Connected => "connected".green(),
        SensorStatus::Disconnected => "disconnected".red(),
        SensorStatus::Error => "error".red().bold(),
    };
    println!("Sensor: {}", sensor_label);

    match ctx.midi_out.current_port() {
        Some(port) => println!("Output: {}", port.green()),
        None => println!("Output: {}", "none".red()),
    }

    let config = ctx.config.lock();
    println!(
        "Channel {} | octaves low={} high={} | note={} at={} cc={}",
        config.midi.channel,
        config.octaves.low,
        config.octaves.high,
        onoff(config.send.note),
        onoff(config.send.aftertouch),
        onoff(config.send.cc),
    );
    drop(config);

    let engine = ctx.engine.lock();
    let sounding: Vec<u8> = engine.sounding_notes().collect();
    if !sounding.is_empty() {
        println!("Sounding notes: {:?}", sounding);
    }
    let pressed: Vec<String> = engine
        .cc_entries()
        .filter(|(_, e)| e.pressure_percent() > 0.0)
        .map(|(slot, e)| format!("cc{} {}={:.0}%", slot, e.key_code(), e.pressure_percent()))
        .collect();
    if !pressed.is_empty() {
        println!("Pressed keys: {}", pressed.join(" "));
    }
}

fn onoff(value: bool) -> ColoredString {
    if value {
        "on".green()
    } else {
        "off".dimmed()
    }
}

fn apply_engine_config(ctx: &ReplContext) {
    let engine_config = ctx.config.lock().engine_config();
    ctx.engine.lock().apply_config(engine_config);
}

async fn persist(ctx: &ReplContext) -> Result<()> {
    let snapshot = ctx.config.lock().clone();
    snapshot.save(&ctx.config_path).await
}
