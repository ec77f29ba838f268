//! Analog sensor boundary
//!
//! The gateway never talks to keyboard hardware directly: acquisition is
//! behind the [`AnalogSensor`] trait, one blocking `poll` per cycle.
//! Hardware backends (vendor analog SDKs, HID readers) implement the trait
//! out of tree; tests drive the engine with a scripted double.

use std::time::Duration;

use thiserror::Error;

/// One analog sample: physical key identifier plus normalized pressure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySample {
    /// Sensor-reported key code (virtual-key code by default)
    pub key: u16,
    /// Pressure in [0.0, 1.0]; out-of-range values are clamped downstream
    pub pressure: f32,
}

/// Status of a completed poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Samples (possibly none) were read from a present device
    Ok,
    /// No analog devices are connected
    NoDevices,
}

/// One poll's outcome: the sample batch and the device status
#[derive(Debug, Clone)]
pub struct Poll {
    pub samples: Vec<KeySample>,
    pub status: PollStatus,
}

impl Poll {
    /// An empty successful poll (device present, no keys touched)
    pub fn empty() -> Self {
        Poll {
            samples: Vec::new(),
            status: PollStatus::Ok,
        }
    }

    /// A poll reporting device absence
    pub fn no_devices() -> Self {
        Poll {
            samples: Vec::new(),
            status: PollStatus::NoDevices,
        }
    }
}

/// Sensor-side failures. None of these are fatal: the polling worker backs
/// off and retries (see the loop in `input::poller`).
#[derive(Debug, Error)]
pub enum SensorError {
    /// The driver/capability is not available at all
    #[error("analog sensor unavailable")]
    Unavailable,

    /// The device is present but this read failed
    #[error("sensor read failed: {0}")]
    Read(String),
}

/// Blocking sample source for the polling worker.
///
/// `poll` may block up to `timeout` waiting for buffered samples, then
/// returns whatever arrived. Implementations are moved onto the worker
/// thread, hence `Send`.
pub trait AnalogSensor: Send {
    fn poll(&mut self, timeout: Duration) -> Result<Poll, SensorError>;
}

/// Placeholder sensor for builds without a hardware backend: always
/// reports device absence, so the gateway runs with a "disconnected"
/// indicator until a real `AnalogSensor` is wired in.
#[derive(Debug, Default)]
pub struct NullSensor;

impl AnalogSensor for NullSensor {
    fn poll(&mut self, _timeout: Duration) -> Result<Poll, SensorError> {
        Ok(Poll::no_devices())
    }
}
