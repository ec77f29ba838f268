//! Per-note press state machine
//!
//! One instance per MIDI note. Converts the note's pressure sample for a
//! cycle into Note On/Off edges and retains the pressure for aftertouch
//! aggregation.

use crate::midi::{convert, MidiMessage, RawMessage};

/// Analog state of one MIDI note.
///
/// `Silent` (pressure 0, not sounding) and `Sounding` (pressure > 0) are
/// the only states; transitions happen exactly on the 0 <-> nonzero
/// pressure edges, and each transition emits exactly one message.
#[derive(Debug, Clone)]
pub struct NoteState {
    note_id: u8,
    channel: u8,
    pressure: f64,
    is_sounding: bool,
}

impl NoteState {
    pub fn new(note_id: u8, channel: u8) -> Self {
        NoteState {
            note_id,
            channel,
            pressure: 0.0,
            is_sounding: false,
        }
    }

    pub fn note_id(&self) -> u8 {
        self.note_id
    }

    /// Current pressure as of the last `submit`
    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn is_sounding(&self) -> bool {
        self.is_sounding
    }

    /// Retarget the note's channel. Applies to the next emitted edge; a
    /// note sounding across a channel change releases on the new channel.
    pub fn set_channel(&mut self, channel: u8) {
        self.channel = channel & 0x0F;
    }

    /// Feed this cycle's pressure sample.
    ///
    /// Returns a valid message only on a state edge: Note On (velocity
    /// from the crossing pressure) when going Silent -> Sounding, Note Off
    /// when going Sounding -> Silent. Steady pressure, rising or falling,
    /// re-emits nothing - Note On is not a continuous-pressure primitive.
    pub fn submit(&mut self, pressure: f64) -> RawMessage {
        let pressure = pressure.clamp(0.0, 1.0);
        self.pressure = pressure;

        if !self.is_sounding && pressure > 0.0 {
            self.is_sounding = true;
            return MidiMessage::NoteOn {
                channel: self.channel,
                note: self.note_id,
                velocity: convert::pressure_to_velocity(pressure),
            }
            .into_raw();
        }

        if self.is_sounding && pressure == 0.0 {
            self.is_sounding = false;
            return MidiMessage::NoteOff {
                channel: self.channel,
                note: self.note_id,
                velocity: 0,
            }
            .into_raw();
        }

        RawMessage::INVALID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release_emit_one_edge_each() {
        let mut note = NoteState::new(60, 0);

        let on = note.submit(0.5);
        assert!(on.is_valid());
        assert_eq!(on.as_bytes(), &[0x90, 60, 64]);
        assert!(note.is_sounding());

        // Held, pressure varying: no re-emission
        assert!(!note.submit(0.5).is_valid());
        assert!(!note.submit(0.9).is_valid());
        assert!(!note.submit(0.1).is_valid());

        let off = note.submit(0.0);
        assert!(off.is_valid());
        assert_eq!(off.as_bytes(), &[0x80, 60, 0]);
        assert!(!note.is_sounding());

        // Released and quiet: nothing more
        assert!(!note.submit(0.0).is_valid());
    }

    #[test]
    fn test_never_two_note_ons_without_note_off() {
        let mut note = NoteState::new(40, 3);
        let mut ons = 0;
        let mut offs = 0;

        for p in [0.0, 0.3, 0.3, 0.0, 0.0, 0.7, 0.0] {
            let msg = note.submit(p);
            if !msg.is_valid() {
                continue;
            }
            match msg.as_bytes()[0] & 0xF0 {
                0x90 => {
                    ons += 1;
                    assert_eq!(ons, offs + 1, "Note On without intervening Note Off");
                }
                0x80 => offs += 1,
                other => panic!("unexpected status {:#04X}", other),
            }
        }

        assert_eq!(ons, 2);
        assert_eq!(offs, 2);
    }

    #[test]
    fn test_velocity_taken_at_crossing_instant() {
        let mut note = NoteState::new(12, 0);
        let on = note.submit(0.8);
        assert_eq!(on.as_bytes(), &[0x90, 12, 102]);
    }

    #[test]
    fn test_out_of_range_pressure_is_clamped() {
        let mut note = NoteState::new(12, 0);
        let on = note.submit(1.7);
        assert_eq!(on.as_bytes()[2], 127);
        assert_eq!(note.pressure(), 1.0);

        // Negative pressure behaves like release
        let off = note.submit(-0.3);
        assert_eq!(off.as_bytes()[0], 0x80);
        assert_eq!(note.pressure(), 0.0);
    }

    #[test]
    fn test_channel_change_applies_to_next_edge() {
        let mut note = NoteState::new(30, 0);
        note.submit(0.5);
        note.set_channel(5);
        let off = note.submit(0.0);
        assert_eq!(off.as_bytes(), &[0x85, 30, 0]);
    }
}
