//! MIDI output port management
//!
//! Wraps a single `midir` output connection behind a lock shared with the
//! polling worker. Switching devices closes the old connection and opens
//! the new one under that same lock, so a cycle can never write into a
//! half-closed port.

use anyhow::{anyhow, Result};
use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::midi::format_hex;

const CLIENT_NAME: &str = "AnalogKey-GW";

/// Shared handle to the gateway's MIDI output sink.
///
/// Clones share the same underlying connection; all methods take `&self`.
#[derive(Clone, Default)]
pub struct MidiOut {
    conn: Arc<Mutex<Option<MidiOutputConnection>>>,
    port_name: Arc<Mutex<Option<String>>>,
}

impl MidiOut {
    pub fn new() -> Self {
        Self::default()
    }

    /// List available MIDI output ports
    pub fn list_ports() -> Result<Vec<String>> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("failed to create MIDI output handle: {}", e))?;

        let mut port_names = Vec::new();
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                port_names.push(name);
            }
        }

        Ok(port_names)
    }

    /// Find an output port by substring match (case-insensitive)
    fn find_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                if name.to_lowercase().contains(&pattern.to_lowercase()) {
                    debug!("Found port '{}' matching pattern '{}'", name, pattern);
                    return Some((port, name));
                }
            }
        }
        None
    }

    /// Connect to the first output port matching `pattern`.
    ///
    /// Any existing connection is closed first, inside the lock, before
    /// the new one opens. Returns the resolved port name.
    pub fn connect(&self, pattern: &str) -> Result<String> {
        let mut conn = self.conn.lock();

        if let Some(old) = conn.take() {
            old.close();
            *self.port_name.lock() = None;
            debug!("Closed previous MIDI output connection");
        }

        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("failed to create MIDI output handle: {}", e))?;

        let (port, name) = Self::find_port(&midi_out, pattern)
            .ok_or_else(|| anyhow!("output port '{}' not found", pattern))?;

        let connection = midi_out
            .connect(&port, CLIENT_NAME)
            .map_err(|e| anyhow!("failed to connect to output port '{}': {}", name, e))?;

        *conn = Some(connection);
        *self.port_name.lock() = Some(name.clone());
        info!("Connected to MIDI output port: {}", name);

        Ok(name)
    }

    /// Close the current connection, if any
    pub fn disconnect(&self) {
        if let Some(old) = self.conn.lock().take() {
            old.close();
            *self.port_name.lock() = None;
            info!("MIDI output disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.lock().is_some()
    }

    /// Name of the currently connected port
    pub fn current_port(&self) -> Option<String> {
        self.port_name.lock().clone()
    }

    /// Send raw MIDI bytes (2 or 3 per message) to the connected port
    pub fn send_raw(&self, data: &[u8]) -> Result<()> {
        let mut conn = self.conn.lock();
        let conn = conn
            .as_mut()
            .ok_or_else(|| anyhow!("no MIDI output port connected"))?;

        conn.send(data)
            .map_err(|e| anyhow!("failed to send MIDI message: {}", e))?;

        debug!("Sent: {}", format_hex(data));

        Ok(())
    }
}
