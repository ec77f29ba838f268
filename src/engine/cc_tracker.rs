//! Per-slot Control Change emission with dirty-flag dedup
//!
//! Every cycle refreshes every tracked slot's pressure, but a CC message
//! goes out only once per activation (0 -> nonzero pressure edge), not
//! once per cycle. Controller numbers are the slot indices.

use crate::engine::keymap::SLOT_COUNT;
use crate::midi::{convert, MidiMessage, RawMessage};

/// One tracked slot's CC state
#[derive(Debug, Clone)]
pub struct CcKeyPress {
    key_code: String,
    pressure_percent: f64,
    /// Nonzero at the end of the previous cycle; steady-state pressure
    /// must not re-latch `active`
    was_pressed: bool,
    active: bool,
}

impl CcKeyPress {
    fn new(key_code: &str) -> Self {
        CcKeyPress {
            key_code: key_code.to_string(),
            pressure_percent: 0.0,
            was_pressed: false,
            active: false,
        }
    }

    /// Refresh the pressure reading. The 0 -> nonzero edge latches
    /// `active`; only emission clears it.
    fn set_pressure(&mut self, percent: f64) {
        let percent = percent.clamp(0.0, 100.0);
        if percent > 0.0 && !self.was_pressed {
            self.active = true;
        }
        self.pressure_percent = percent;
    }

    /// Diagnostic label of the originating key
    pub fn key_code(&self) -> &str {
        &self.key_code
    }

    pub fn pressure_percent(&self) -> f64 {
        self.pressure_percent
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Fixed-capacity bank of CC trackers, indexed by slot.
///
/// Entries are created on the first nonzero sample for a slot and persist
/// for the process lifetime.
#[derive(Debug)]
pub struct CcBank {
    slots: [Option<CcKeyPress>; SLOT_COUNT],
}

impl CcBank {
    pub fn new() -> Self {
        CcBank {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Cycle start: every tracked slot's pressure resets to 0, pending
    /// `active` flags untouched. The previous cycle's settled pressure is
    /// remembered so this reset does not look like a release-and-repress.
    pub fn begin_cycle(&mut self) {
        for entry in self.slots.iter_mut().flatten() {
            entry.was_pressed = entry.pressure_percent > 0.0;
            entry.pressure_percent = 0.0;
        }
    }

    /// Record this cycle's sample for a slot. Normalized pressure is
    /// stored as a percentage, matching the diagnostic surface.
    pub fn record(&mut self, slot: usize, label: &str, pressure: f64) {
        let percent = pressure.clamp(0.0, 1.0) * 100.0;
        match &mut self.slots[slot] {
            Some(entry) => entry.set_pressure(percent),
            None if percent > 0.0 => {
                let mut entry = CcKeyPress::new(label);
                entry.set_pressure(percent);
                self.slots[slot] = Some(entry);
            }
            None => {}
        }
    }

    /// Emission pass: one CC per slot whose `active` flag is set, clearing
    /// the flag afterwards. Steady pressure without a new activation emits
    /// nothing.
    pub fn emit(&mut self, channel: u8, out: &mut Vec<RawMessage>) {
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            let Some(entry) = entry else { continue };
            if !entry.active {
                continue;
            }
            out.push(
                MidiMessage::ControlChange {
                    channel,
                    cc: slot as u8,
                    value: convert::percent_to_7bit(entry.pressure_percent),
                }
                .into_raw(),
            );
            entry.active = false;
        }
    }

    /// Tracked entries, for diagnostics
    pub fn entries(&self) -> impl Iterator<Item = (usize, &CcKeyPress)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|e| (slot, e)))
    }
}

impl Default for CcBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_cycle(bank: &mut CcBank, slot: usize, pressure: f64) -> Vec<RawMessage> {
        let mut out = Vec::new();
        bank.begin_cycle();
        bank.record(slot, "Z", pressure);
        bank.emit(0, &mut out);
        out
    }

    #[test]
    fn test_one_cc_per_activation_not_per_cycle() {
        let mut bank = CcBank::new();
        let mut total = 0;

        // 0, 40%, 40%, 40%, 0, 40% -> exactly two activations
        for pressure in [0.0, 0.4, 0.4, 0.4, 0.0, 0.4] {
            total += run_cycle(&mut bank, 0, pressure).len();
        }

        assert_eq!(total, 2);
    }

    #[test]
    fn test_cc_value_and_controller_number() {
        let mut bank = CcBank::new();
        let out = run_cycle(&mut bank, 5, 0.4);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_bytes(), &[0xB0, 5, 51]);
    }

    #[test]
    fn test_entry_created_on_first_nonzero_sample() {
        let mut bank = CcBank::new();

        bank.begin_cycle();
        bank.record(3, "D", 0.0);
        assert_eq!(bank.entries().count(), 0);

        bank.begin_cycle();
        bank.record(3, "D", 0.2);
        assert_eq!(bank.entries().count(), 1);
        let (slot, entry) = bank.entries().next().unwrap();
        assert_eq!(slot, 3);
        assert_eq!(entry.key_code(), "D");
        assert!(entry.is_active());
    }

    #[test]
    fn test_pending_activation_survives_skipped_emission() {
        let mut bank = CcBank::new();

        bank.begin_cycle();
        bank.record(0, "Z", 0.6);
        // Emission pass skipped this cycle (CC sending disabled)

        // Key released; activation still pending
        bank.begin_cycle();
        bank.record(0, "Z", 0.0);

        let mut out = Vec::new();
        bank.emit(0, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_bytes(), &[0xB0, 0, 0]);

        // Cleared now: nothing further without a new activation
        let mut out = Vec::new();
        bank.emit(0, &mut out);
        assert!(out.is_empty());
    }
}
