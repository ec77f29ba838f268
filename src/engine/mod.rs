//! Translation engine: analog pressure cycles to MIDI message sequences
//!
//! One `run_cycle` per successful sensor poll. The emission order is
//! fixed - notes ascending, then CC by slot, then aftertouch - so the
//! output byte stream is reproducible for identical input samples.

mod cc_tracker;
mod keymap;
mod note_state;

#[cfg(test)]
mod tests;

pub use cc_tracker::{CcBank, CcKeyPress};
pub use keymap::{map_cycle, KeyDef, KeyMap, OctaveWindows, NOTE_COUNT, SLOT_COUNT};
pub use note_state::NoteState;

use tracing::trace;

use crate::midi::{convert, MidiMessage, RawMessage};
use crate::sensor::KeySample;

/// The engine's view of the settings: an explicit value, passed in at
/// construction and replaced via [`TranslationEngine::apply_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub channel: u8,
    pub windows: OctaveWindows,
    pub send_note: bool,
    pub send_aftertouch: bool,
    pub send_cc: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            channel: 0,
            windows: OctaveWindows::new(0, 1),
            send_note: true,
            send_aftertouch: true,
            send_cc: true,
        }
    }
}

/// Per-cycle translator from raw key samples to MIDI messages.
///
/// Owns the 128 note state machines, the CC bank, and the key table. All
/// storage is fixed-size; the cycle path allocates nothing once the
/// output buffer has grown to its working size.
pub struct TranslationEngine {
    config: EngineConfig,
    keymap: KeyMap,
    notes: Box<[NoteState; NOTE_COUNT]>,
    cc: CcBank,
    slot_pressures: [f64; SLOT_COUNT],
    out: Vec<RawMessage>,
}

impl TranslationEngine {
    pub fn new(config: EngineConfig, keymap: KeyMap) -> Self {
        let channel = config.channel & 0x0F;
        TranslationEngine {
            config,
            keymap,
            notes: Box::new(std::array::from_fn(|i| NoteState::new(i as u8, channel))),
            cc: CcBank::new(),
            slot_pressures: [0.0; SLOT_COUNT],
            // Worst case: 128 note edges + 24 CCs + 1 aftertouch
            out: Vec::with_capacity(NOTE_COUNT + SLOT_COUNT + 1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the active configuration. Takes effect on the next cycle;
    /// notes sounding in a moved window drain through their normal Note
    /// Off edge once their pressure maps to 0.
    pub fn apply_config(&mut self, config: EngineConfig) {
        if config.channel != self.config.channel {
            for note in self.notes.iter_mut() {
                note.set_channel(config.channel);
            }
        }
        self.config = config;
    }

    /// Run one full translation cycle over a poll's samples.
    ///
    /// Returns the emitted messages in the fixed order: Note On/Off edges
    /// by ascending note number, CC by ascending slot, then one Channel
    /// Aftertouch if enabled.
    pub fn run_cycle(&mut self, samples: &[KeySample]) -> &[RawMessage] {
        // 1-2. Reset per-cycle accumulators, then apply this poll's
        // samples; slots unseen this cycle stay at 0.
        self.out.clear();
        self.slot_pressures = [0.0; SLOT_COUNT];
        self.cc.begin_cycle();

        for sample in samples {
            let Some(slot) = self.keymap.slot_of(sample.key) else {
                continue;
            };
            let pressure = f64::from(sample.pressure).clamp(0.0, 1.0);
            self.slot_pressures[slot] = pressure;
            self.cc.record(slot, self.keymap.label(slot), pressure);
        }

        // 3. Window the slot pressures into note space.
        let mapped = map_cycle(&self.slot_pressures, self.config.windows);

        // 4. Note pass. With note sending off, every machine sees 0.0:
        // sounding notes release normally and nothing new triggers.
        for (i, note) in self.notes.iter_mut().enumerate() {
            let pressure = if self.config.send_note { mapped[i] } else { 0.0 };
            let msg = note.submit(pressure);
            if msg.is_valid() {
                self.out.push(msg);
            }
        }

        // 5. CC pass: pending activations only.
        if self.config.send_cc {
            self.cc.emit(self.config.channel, &mut self.out);
        }

        // 6. One aftertouch per cycle from the peak mapped pressure,
        // redundant updates included.
        if self.config.send_aftertouch {
            let peak = mapped.iter().copied().fold(0.0, f64::max);
            self.out.push(
                MidiMessage::ChannelPressure {
                    channel: self.config.channel,
                    pressure: convert::pressure_to_7bit(peak),
                }
                .into_raw(),
            );
        }

        trace!(
            samples = samples.len(),
            messages = self.out.len(),
            "translation cycle complete"
        );

        &self.out
    }

    /// Tracked CC entries, for the status surface
    pub fn cc_entries(&self) -> impl Iterator<Item = (usize, &CcKeyPress)> {
        self.cc.entries()
    }

    /// Note numbers currently sounding, for the status surface
    pub fn sounding_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.notes
            .iter()
            .filter(|n| n.is_sounding())
            .map(|n| n.note_id())
    }
}
