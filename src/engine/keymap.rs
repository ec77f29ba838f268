//! Physical key table and octave windowing
//!
//! Two rows of twelve keys cover two octaves; each row is assigned a
//! movable 12-note window in the 128-note MIDI space.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Number of physical analog key slots (two rows of twelve)
pub const SLOT_COUNT: usize = 24;

/// Number of MIDI notes
pub const NOTE_COUNT: usize = 128;

/// Width of one octave window in notes
const WINDOW_WIDTH: usize = 12;

/// One physical key: sensor-reported code plus a diagnostic label
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeyDef {
    pub code: u16,
    pub label: String,
}

/// Maps sensor key codes to the 24 analog slots.
///
/// Slot order is musical: slots 0-11 are the low row, 12-23 the high row,
/// each ascending chromatically.
#[derive(Debug, Clone)]
pub struct KeyMap {
    keys: Vec<KeyDef>,
}

// The original two-row QWERTY layout: ZSXDCVGBHNJM for the low octave,
// W3E4RT6Y7U8I for the high one, as virtual-key codes.
const DEFAULT_LAYOUT: [(u16, &str); SLOT_COUNT] = [
    (90, "Z"),
    (83, "S"),
    (88, "X"),
    (68, "D"),
    (67, "C"),
    (86, "V"),
    (71, "G"),
    (66, "B"),
    (72, "H"),
    (78, "N"),
    (74, "J"),
    (77, "M"),
    (87, "W"),
    (51, "3"),
    (69, "E"),
    (52, "4"),
    (82, "R"),
    (84, "T"),
    (54, "6"),
    (89, "Y"),
    (55, "7"),
    (85, "U"),
    (56, "8"),
    (73, "I"),
];

impl KeyMap {
    /// The built-in two-row QWERTY layout
    pub fn with_default_layout() -> Self {
        KeyMap {
            keys: DEFAULT_LAYOUT
                .iter()
                .map(|(code, label)| KeyDef {
                    code: *code,
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }

    /// Build from a user-supplied table; must cover all 24 slots
    pub fn from_defs(defs: Vec<KeyDef>) -> Result<Self> {
        if defs.len() != SLOT_COUNT {
            bail!(
                "keymap must define exactly {} keys, got {}",
                SLOT_COUNT,
                defs.len()
            );
        }
        Ok(KeyMap { keys: defs })
    }

    /// Resolve a sensor key code to its slot index, if mapped
    pub fn slot_of(&self, code: u16) -> Option<usize> {
        self.keys.iter().position(|k| k.code == code)
    }

    /// Diagnostic label for a slot
    pub fn label(&self, slot: usize) -> &str {
        &self.keys[slot].label
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::with_default_layout()
    }
}

/// The two independently movable octave windows.
///
/// Each window places one row of slots at `12 + 12 * octave` in note
/// space; octaves are clamped to 0-9 so both windows stay inside the
/// 128-note range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OctaveWindows {
    low: u8,
    high: u8,
}

impl OctaveWindows {
    pub const MAX_OCTAVE: u8 = 9;

    pub fn new(low: u8, high: u8) -> Self {
        OctaveWindows {
            low: low.min(Self::MAX_OCTAVE),
            high: high.min(Self::MAX_OCTAVE),
        }
    }

    pub fn low_octave(&self) -> u8 {
        self.low
    }

    pub fn high_octave(&self) -> u8 {
        self.high
    }

    /// First note of the low row's window
    pub fn low_base(&self) -> usize {
        12 + WINDOW_WIDTH * self.low as usize
    }

    /// First note of the high row's window
    pub fn high_base(&self) -> usize {
        12 + WINDOW_WIDTH * self.high as usize
    }
}

/// Map 24 slot pressures into the 128-note space.
///
/// Pure function, recomputed fresh every cycle. Notes outside both windows
/// read 0.0. When the windows overlap (the caller may move them freely),
/// the low window wins for the colliding notes - the explicit tie-break.
pub fn map_cycle(
    slot_pressures: &[f64; SLOT_COUNT],
    windows: OctaveWindows,
) -> [f64; NOTE_COUNT] {
    let low = windows.low_base();
    let high = windows.high_base();

    let mut notes = [0.0; NOTE_COUNT];
    for (i, note) in notes.iter_mut().enumerate() {
        if i >= low && i < low + WINDOW_WIDTH {
            *note = slot_pressures[i - low];
        } else if i >= high && i < high + WINDOW_WIDTH {
            *note = slot_pressures[i - high + WINDOW_WIDTH];
        }
    }
    notes
}
