use keysym_decoder::input::keycodes::{
    KEY_KP0, KEY_KP1, KEY_KP2, KEY_KP3, KEY_KP4, KEY_KP5, KEY_KP6, KEY_KP7, KEY_KP8, KEY_KP9,
    KEY_LEFTALT, KEY_LEFTSHIFT, KEY_RIGHTSHIFT,
};
use keysym_decoder::input::{shift, Decoder, KeyEvent, KeyPhase, KeyboardTables, ModifierSet};
use proptest::prelude::*;

fn shift_event() -> impl Strategy<Value = KeyEvent> {
    let keycode = prop_oneof![Just(KEY_LEFTSHIFT), Just(KEY_RIGHTSHIFT)];
    let phase = prop_oneof![
        Just(KeyPhase::Down),
        Just(KeyPhase::Up),
        Just(KeyPhase::Repeat)
    ];
    (keycode, phase).prop_map(|(keycode, phase)| KeyEvent { keycode, phase })
}

proptest! {
    #[test]
    fn prop_shift_follows_press_counter(events in proptest::collection::vec(shift_event(), 0..64)) {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);
        let mut held: u8 = 0;

        for event in events {
            prop_assert_eq!(decoder.handle_event(event), None);

            match event.phase {
                KeyPhase::Down => held = held.saturating_add(1),
                KeyPhase::Up => held = held.saturating_sub(1),
                KeyPhase::Repeat => {}
            }

            let modifiers = decoder.modifiers();
            prop_assert_eq!(modifiers.press_count(shift::SHIFT), held);
            prop_assert_eq!(modifiers.shift_state().contains(ModifierSet::SHIFT), held > 0);
        }
    }

    #[test]
    fn prop_commits_are_valid_bounded_text(
        digits in proptest::collection::vec(0u32..10, 1..8),
    ) {
        const KEYPAD: [u32; 10] = [
            KEY_KP0, KEY_KP1, KEY_KP2, KEY_KP3, KEY_KP4,
            KEY_KP5, KEY_KP6, KEY_KP7, KEY_KP8, KEY_KP9,
        ];

        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);

        decoder.handle_event(KeyEvent::down(KEY_LEFTALT));
        for digit in &digits {
            let keycode = KEYPAD[*digit as usize];
            prop_assert_eq!(decoder.handle_event(KeyEvent::down(keycode)), None);
            prop_assert_eq!(decoder.handle_event(KeyEvent::up(keycode)), None);
        }
        let commit = decoder.handle_event(KeyEvent::up(KEY_LEFTALT));

        let value = digits
            .iter()
            .fold(0u32, |acc, d| acc.saturating_mul(10).saturating_add(*d));
        let excluded = (0xD800..=0xDFFF).contains(&value) || value == 0xFFFF || value > 0x10FFFF;

        match commit {
            Some(commit) => {
                prop_assert!(!excluded);
                let mut chars = commit.text.chars();
                prop_assert_eq!(chars.next().map(|c| c as u32), Some(value));
                prop_assert_eq!(chars.next(), None);
            }
            None => prop_assert!(excluded),
        }
    }
}
