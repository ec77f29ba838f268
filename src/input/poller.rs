//! Polling worker: sensor poll -> translation -> MIDI emission
//!
//! One dedicated blocking thread owns the sensor and runs the cycle loop.
//! Cycles are strictly serialized: each poll's translation completes (and
//! its messages are delivered or dropped) before the next poll starts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::engine::TranslationEngine;
use crate::midi::RawMessage;
use crate::midi_out::MidiOut;
use crate::sensor::{AnalogSensor, PollStatus};

/// Connection state of the analog sensor, for the status surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    Connected,
    Disconnected,
    Error,
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorStatus::Connected => write!(f, "connected"),
            SensorStatus::Disconnected => write!(f, "disconnected"),
            SensorStatus::Error => write!(f, "error"),
        }
    }
}

/// Loop timing, taken from the sensor section of the config
#[derive(Debug, Clone, Copy)]
pub struct PollerTiming {
    /// Bounded sensor read per cycle
    pub poll_timeout: Duration,
    /// Backoff while the device is absent or erroring
    pub retry_delay: Duration,
    /// Inter-cycle throttle, applied regardless of outcome
    pub cycle_delay: Duration,
}

impl Default for PollerTiming {
    fn default() -> Self {
        PollerTiming {
            poll_timeout: Duration::from_millis(50),
            retry_delay: Duration::from_millis(500),
            cycle_delay: Duration::from_millis(2),
        }
    }
}

/// Handle to a running polling worker
pub struct PollerHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    status_rx: watch::Receiver<SensorStatus>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl PollerHandle {
    /// Subscribe to sensor status updates
    pub fn status(&self) -> watch::Receiver<SensorStatus> {
        self.status_rx.clone()
    }

    /// Stop the worker and wait for the loop to exit. In-flight messages
    /// are not drained; the loop just stops at the next iteration.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
    }
}

/// Start the polling worker on its own thread
pub fn spawn(
    sensor: Box<dyn AnalogSensor>,
    engine: Arc<Mutex<TranslationEngine>>,
    midi_out: MidiOut,
    timing: PollerTiming,
) -> PollerHandle {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let (status_tx, status_rx) = watch::channel(SensorStatus::Disconnected);

    let join = std::thread::spawn(move || {
        run_loop(sensor, engine, midi_out, timing, shutdown_rx, status_tx);
    });

    PollerHandle {
        shutdown_tx: Some(shutdown_tx),
        status_rx,
        join: Some(join),
    }
}

fn run_loop(
    mut sensor: Box<dyn AnalogSensor>,
    engine: Arc<Mutex<TranslationEngine>>,
    midi_out: MidiOut,
    timing: PollerTiming,
    mut shutdown_rx: mpsc::Receiver<()>,
    status_tx: watch::Sender<SensorStatus>,
) {
    info!("Sensor polling loop started");

    loop {
        // Check for shutdown signal (non-blocking)
        match shutdown_rx.try_recv() {
            Ok(_) | Err(mpsc::error::TryRecvError::Disconnected) => {
                info!("Sensor polling loop shutting down");
                break;
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
        }

        match sensor.poll(timing.poll_timeout) {
            Ok(poll) if poll.status == PollStatus::Ok => {
                publish_status(&status_tx, SensorStatus::Connected);

                // The whole cycle runs under the engine lock: translation
                // and delivery finish before a config change can land.
                let mut engine = engine.lock();
                let messages = engine.run_cycle(&poll.samples);
                deliver(&midi_out, messages);
            }
            Ok(_) => {
                publish_status(&status_tx, SensorStatus::Disconnected);
                std::thread::sleep(timing.retry_delay);
            }
            Err(e) => {
                warn!("Sensor read failed: {}", e);
                publish_status(&status_tx, SensorStatus::Error);
                std::thread::sleep(timing.retry_delay);
            }
        }

        std::thread::sleep(timing.cycle_delay);
    }
}

fn publish_status(tx: &watch::Sender<SensorStatus>, status: SensorStatus) {
    tx.send_if_modified(|current| {
        if *current == status {
            return false;
        }
        debug!("Sensor status: {} -> {}", current, status);
        *current = status;
        true
    });
}

/// Forward one cycle's messages to the sink. A missing or failing sink
/// drops the remainder of the cycle; nothing is buffered or retried.
fn deliver(midi_out: &MidiOut, messages: &[RawMessage]) {
    if messages.is_empty() {
        return;
    }

    if !midi_out.is_connected() {
        trace!("No output port; dropping {} message(s)", messages.len());
        return;
    }

    for msg in messages {
        if let Err(e) = midi_out.send_raw(msg.as_bytes()) {
            debug!("Output sink failed, dropping rest of cycle: {}", e);
            break;
        }
    }
}
