//! Tests for the translation engine

use super::*;

fn sample(key: u16, pressure: f32) -> KeySample {
    KeySample { key, pressure }
}

fn notes_only() -> EngineConfig {
    EngineConfig {
        send_aftertouch: false,
        send_cc: false,
        ..EngineConfig::default()
    }
}

fn engine(config: EngineConfig) -> TranslationEngine {
    TranslationEngine::new(config, KeyMap::with_default_layout())
}

fn status_bytes(messages: &[RawMessage]) -> Vec<u8> {
    messages.iter().map(|m| m.as_bytes()[0] & 0xF0).collect()
}

// Key Z is slot 0 (low row), key X is slot 2, key W is slot 12 (high row).
const KEY_Z: u16 = 90;
const KEY_X: u16 = 88;
const KEY_W: u16 = 87;

#[test]
fn test_end_to_end_press_and_release() {
    let mut engine = engine(notes_only());

    // Low octave 0: slot 0 sounds as note 12
    let out = engine.run_cycle(&[sample(KEY_Z, 0.8)]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].as_bytes(), &[0x90, 12, 102]);

    let out = engine.run_cycle(&[]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].as_bytes(), &[0x80, 12, 0]);
}

#[test]
fn test_sustained_press_is_one_on_one_off() {
    let mut engine = engine(notes_only());
    let mut ons = 0;
    let mut offs = 0;

    for pressure in [0.0, 0.6, 0.6, 0.0] {
        let cycle: Vec<KeySample> = if pressure > 0.0 {
            vec![sample(KEY_Z, pressure)]
        } else {
            vec![]
        };
        for status in status_bytes(engine.run_cycle(&cycle)) {
            match status {
                0x90 => ons += 1,
                0x80 => offs += 1,
                other => panic!("unexpected status {:#04X}", other),
            }
        }
    }

    assert_eq!(ons, 1);
    assert_eq!(offs, 1);
}

#[test]
fn test_cc_dedup_across_cycles() {
    let config = EngineConfig {
        send_note: false,
        send_aftertouch: false,
        ..EngineConfig::default()
    };
    let mut engine = engine(config);
    let mut cc_messages = Vec::new();

    for pressure in [0.0, 0.4, 0.4, 0.4, 0.0, 0.4] {
        let cycle: Vec<KeySample> = if pressure > 0.0 {
            vec![sample(KEY_Z, pressure)]
        } else {
            vec![]
        };
        cc_messages.extend(engine.run_cycle(&cycle).iter().copied());
    }

    // One activation at each 0 -> nonzero edge: exactly two CCs, not four
    assert_eq!(cc_messages.len(), 2);
    for msg in &cc_messages {
        assert_eq!(msg.as_bytes(), &[0xB0, 0, 51]);
    }
}

#[test]
fn test_aftertouch_takes_peak_pressure() {
    let config = EngineConfig {
        send_note: false,
        send_cc: false,
        ..EngineConfig::default()
    };
    let mut engine = engine(config);

    let out = engine.run_cycle(&[sample(KEY_Z, 0.3), sample(KEY_X, 0.9)]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].as_bytes(), &[0xD0, 114]); // round(0.9 * 127)
}

#[test]
fn test_aftertouch_sent_every_cycle_even_unchanged() {
    let config = EngineConfig {
        send_note: false,
        send_cc: false,
        ..EngineConfig::default()
    };
    let mut engine = engine(config);

    let first = engine.run_cycle(&[sample(KEY_Z, 0.5)]).to_vec();
    let second = engine.run_cycle(&[sample(KEY_Z, 0.5)]).to_vec();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[test]
fn test_aftertouch_disabled_emits_nothing() {
    let config = EngineConfig {
        send_note: false,
        send_cc: false,
        send_aftertouch: false,
        ..EngineConfig::default()
    };
    let mut engine = engine(config);

    assert!(engine.run_cycle(&[sample(KEY_Z, 0.9)]).is_empty());
}

#[test]
fn test_octave_move_releases_old_window_first() {
    let mut engine = engine(notes_only());

    engine.run_cycle(&[sample(KEY_Z, 0.5)]);

    // Move the low window up one octave while the key is held
    let moved = EngineConfig {
        windows: OctaveWindows::new(1, 1),
        ..notes_only()
    };
    engine.apply_config(moved);

    let out: Vec<RawMessage> = engine.run_cycle(&[sample(KEY_Z, 0.5)]).to_vec();

    // Note 12 releases, note 24 starts sounding, off before on
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].as_bytes(), &[0x80, 12, 0]);
    assert_eq!(out[1].as_bytes(), &[0x90, 24, 64]);
}

#[test]
fn test_high_row_maps_through_high_window() {
    let mut engine = engine(notes_only());

    // Default windows: low octave 0 (base 12), high octave 1 (base 24)
    let out = engine.run_cycle(&[sample(KEY_W, 0.5)]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].as_bytes(), &[0x90, 24, 64]);
}

#[test]
fn test_note_disable_drains_sounding_notes() {
    let mut engine = engine(notes_only());

    engine.run_cycle(&[sample(KEY_Z, 0.5)]);

    let disabled = EngineConfig {
        send_note: false,
        ..notes_only()
    };
    engine.apply_config(disabled);

    // Exactly one Note Off even though the key is still held
    let out = engine.run_cycle(&[sample(KEY_Z, 0.5)]).to_vec();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].as_bytes(), &[0x80, 12, 0]);

    // And nothing while disabled
    assert!(engine.run_cycle(&[sample(KEY_Z, 0.5)]).is_empty());
}

#[test]
fn test_cc_disable_leaves_activation_pending() {
    let config = EngineConfig {
        send_note: false,
        send_aftertouch: false,
        send_cc: false,
        ..EngineConfig::default()
    };
    let mut engine = engine(config);

    // Activation lands while CC sending is off
    assert!(engine.run_cycle(&[sample(KEY_Z, 0.4)]).is_empty());
    assert!(engine.run_cycle(&[]).is_empty());

    // Re-enable: the pending activation emits exactly once
    let enabled = EngineConfig {
        send_cc: true,
        ..config
    };
    engine.apply_config(enabled);

    let out = engine.run_cycle(&[]).to_vec();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].as_bytes()[0], 0xB0);

    assert!(engine.run_cycle(&[]).is_empty());
}

#[test]
fn test_unmapped_keys_are_ignored() {
    let mut engine = engine(notes_only());
    assert!(engine.run_cycle(&[sample(999, 0.8)]).is_empty());
}

#[test]
fn test_emission_order_notes_cc_aftertouch() {
    let mut engine = engine(EngineConfig::default());

    let statuses = status_bytes(engine.run_cycle(&[sample(KEY_Z, 0.5)]));
    assert_eq!(statuses, vec![0x90, 0xB0, 0xD0]);
}

#[test]
fn test_channel_setting_reaches_all_message_kinds() {
    let config = EngineConfig {
        channel: 4,
        ..EngineConfig::default()
    };
    let mut engine = engine(config);

    let out = engine.run_cycle(&[sample(KEY_Z, 0.5)]).to_vec();
    assert_eq!(out[0].as_bytes()[0], 0x94);
    assert_eq!(out[1].as_bytes()[0], 0xB4);
    assert_eq!(out[2].as_bytes()[0], 0xD4);
}

#[test]
fn test_identical_cycles_produce_identical_streams() {
    let mut a = engine(EngineConfig::default());
    let mut b = engine(EngineConfig::default());

    let samples = [sample(KEY_Z, 0.7), sample(KEY_W, 0.2)];
    let first = a.run_cycle(&samples).to_vec();
    let second = b.run_cycle(&samples).to_vec();

    assert_eq!(first, second);
}
