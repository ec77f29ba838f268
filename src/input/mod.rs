//! Sensor-side input handling: the polling worker that drives
//! translation cycles.

pub mod poller;

pub use poller::{spawn, PollerHandle, PollerTiming, SensorStatus};
