//! MIDI message types and byte encoding
//!
//! Emission-side subset of the MIDI 1.0 channel voice messages, plus the
//! conversions from normalized pressure to 7-bit data bytes.

use std::fmt;

/// MIDI messages emitted by the translation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Channel Pressure (aftertouch): channel (0-15), pressure (0-127)
    ChannelPressure { channel: u8, pressure: u8 },
}

impl MidiMessage {
    /// Encode into a fixed-size raw message (2 or 3 bytes)
    pub fn into_raw(self) -> RawMessage {
        match self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                RawMessage::new3(0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                RawMessage::new3(0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                RawMessage::new3(0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                RawMessage::new2(0xD0 | (channel & 0x0F), pressure & 0x7F)
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                write!(f, "ChannelPressure ch:{} p:{}", channel + 1, pressure)
            }
        }
    }
}

/// A MIDI message in progress: validity flag plus up to three encoded bytes.
///
/// The engine produces one of these per state-machine edge; only messages
/// with `is_valid()` carry meaningful bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage {
    valid: bool,
    len: u8,
    bytes: [u8; 3],
}

impl RawMessage {
    /// The no-op message produced when no state transition occurred
    pub const INVALID: RawMessage = RawMessage {
        valid: false,
        len: 0,
        bytes: [0; 3],
    };

    fn new2(status: u8, data1: u8) -> Self {
        RawMessage {
            valid: true,
            len: 2,
            bytes: [status, data1, 0],
        }
    }

    fn new3(status: u8, data1: u8, data2: u8) -> Self {
        RawMessage {
            valid: true,
            len: 3,
            bytes: [status, data1, data2],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The encoded bytes (empty for invalid messages)
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Copy the encoded bytes into a caller-supplied buffer starting at
    /// offset 0. Returns the number of bytes written.
    pub fn write_to(&self, buf: &mut [u8; 3]) -> usize {
        let len = self.len as usize;
        buf[..len].copy_from_slice(&self.bytes[..len]);
        len
    }
}

/// Pressure and percentage conversions to 7-bit MIDI data bytes
pub mod convert {
    /// Convert normalized pressure (0.0-1.0) to Note On velocity (1-127).
    ///
    /// Rounds half away from zero; a nonzero pressure never maps below 1,
    /// so a Note On edge always carries an audible velocity.
    pub fn pressure_to_velocity(pressure: f64) -> u8 {
        let scaled = (pressure.clamp(0.0, 1.0) * 127.0).round() as u8;
        scaled.clamp(1, 127)
    }

    /// Convert normalized pressure (0.0-1.0) to a 7-bit value (0-127)
    pub fn pressure_to_7bit(pressure: f64) -> u8 {
        (pressure.clamp(0.0, 1.0) * 127.0).round() as u8
    }

    /// Convert a percentage (0-100) to a 7-bit value (0-127)
    pub fn percent_to_7bit(percent: f64) -> u8 {
        ((percent.clamp(0.0, 100.0) / 100.0) * 127.0).round() as u8
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
