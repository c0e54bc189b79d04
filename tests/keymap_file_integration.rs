use keysym_decoder::config::Config;
use keysym_decoder::input::keycodes::{
    KEY_A, KEY_CAPSLOCK, KEY_E, KEY_F1, KEY_F2, KEY_F3, KEY_F4, KEY_GRAVE, KEY_LEFTALT,
    KEY_LEFTSHIFT, KEY_Q, KEY_RIGHTSHIFT, KEY_W, KEY_Z,
};
use keysym_decoder::input::{
    Decoder, HandlerType, KeyEvent, KeyboardTables, KeymapFile, Keysym, LedSet, ModifierSet,
};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const KEYMAP: &str = r#"
[leds]
caps_lock = false

[[page]]
index = 0
keys = [
    { code = 18, sym = "letter:e" },
    { code = 30, sym = "letter:a" },
    { code = 41, sym = "dead2:`" },
    { code = 42, sym = "shift:shift" },
    { code = 44, sym = 0xd800 },
    { code = 58, sym = "slock:shift" },
]

[[page]]
index = 1
keys = [
    { code = 18, sym = "letter:E" },
    { code = 30, sym = "letter:A" },
    { code = 42, sym = "shift:shift" },
    { code = 58, sym = "slock:shift" },
]

[[diacritic]]
diacr = "`"
base = "e"
result = "è"
"#;

/// Pages 0 and 1 only, so any Alt page is missing
const LOCKS_KEYMAP: &str = r#"
[leds]
num_lock = true

[[page]]
index = 0
keys = [
    { code = 30, sym = "letter:a" },
    { code = 42, sym = "slock:shift" },
    { code = 54, sym = "shift:capsshift" },
    { code = 56, sym = "slock:alt" },
    { code = 58, sym = "spec:capson" },
    { code = 59, sym = "spec:25" },
    { code = 60, sym = 0xf407 },
    { code = 61, sym = "pad:30" },
    { code = 62, sym = "pad:7" },
]

[[page]]
index = 1
keys = [
    { code = 30, sym = "letter:A" },
    { code = 42, sym = "slock:shift" },
    { code = 54, sym = "shift:capsshift" },
    { code = 58, sym = "spec:capson" },
]
"#;

fn keymap_file() -> NamedTempFile {
    let mut temp = NamedTempFile::new().unwrap();
    temp.write_all(KEYMAP.as_bytes()).unwrap();
    temp
}

fn locks_tables() -> KeyboardTables {
    let mut file = KeymapFile::parse(LOCKS_KEYMAP).unwrap();
    KeyboardTables::load(&mut file).unwrap()
}

fn commits(decoder: &mut Decoder<'_>, events: &[KeyEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| decoder.handle_event(*event))
        .map(|commit| commit.text)
        .collect()
}

fn tap(keycode: u32) -> [KeyEvent; 2] {
    [KeyEvent::down(keycode), KeyEvent::up(keycode)]
}

#[test]
fn test_config_loads_keymap_file() {
    let temp = keymap_file();
    let config = Config::default_config()
        .unwrap()
        .with_overrides(Some(temp.path().to_path_buf()), None);
    config.validate().unwrap();

    let tables = config.load_tables().unwrap();
    assert_eq!(tables.keymap.page_count(), 2);
    assert_eq!(tables.diacritics.len(), 1);

    let mut decoder = Decoder::new(&tables);
    let mut events = tap(KEY_GRAVE).to_vec();
    events.extend(tap(KEY_E));
    assert_eq!(commits(&mut decoder, &events), vec!["è"]);
}

#[test]
fn test_sticky_shift_applies_to_one_key() {
    let temp = keymap_file();
    let mut file = KeymapFile::load(temp.path()).unwrap();
    let tables = KeyboardTables::load(&mut file).unwrap();
    let mut decoder = Decoder::new(&tables);

    let mut events = tap(KEY_CAPSLOCK).to_vec();
    events.extend(tap(KEY_A));
    events.extend(tap(KEY_A));
    assert_eq!(commits(&mut decoder, &events), vec!["A", "a"]);
    assert!(decoder.modifiers().sticky_lock_state().is_empty());
}

#[test]
fn test_unmapped_keys_are_holes() {
    let temp = keymap_file();
    let mut file = KeymapFile::load(temp.path()).unwrap();
    let tables = KeyboardTables::load(&mut file).unwrap();
    let mut decoder = Decoder::new(&tables);

    decoder.handle_event(KeyEvent::down(KEY_LEFTSHIFT));
    assert_eq!(commits(&mut decoder, &tap(KEY_A)), vec!["A"]);
    decoder.handle_event(KeyEvent::up(KEY_LEFTSHIFT));

    // No entry on page 0 means a hole, which is not a lookup miss
    assert!(commits(&mut decoder, &tap(KEY_Q)).is_empty());
    assert_eq!(decoder.stats().lookup_misses, 0);

    // Shift plus a sticky shift still selects page 1
    decoder.handle_event(KeyEvent::down(KEY_LEFTSHIFT));
    commits(&mut decoder, &tap(KEY_CAPSLOCK));
    assert_eq!(commits(&mut decoder, &tap(KEY_E)), vec!["E"]);
}

#[test]
fn test_surrogate_keysym_is_rejected() {
    let temp = keymap_file();
    let mut file = KeymapFile::load(temp.path()).unwrap();
    let tables = KeyboardTables::load(&mut file).unwrap();
    let mut decoder = Decoder::new(&tables);

    assert!(commits(&mut decoder, &tap(KEY_Z)).is_empty());
    assert_eq!(decoder.stats().rejected, 1);
}

#[test]
fn test_led_overrides_beat_file_values() {
    let temp = keymap_file();
    let mut config = Config::default_config()
        .unwrap()
        .with_overrides(Some(temp.path().to_path_buf()), None);
    config.leds.caps_lock = Some(true);

    let tables = config.load_tables().unwrap();
    assert!(tables.initial.leds.contains(LedSet::CAPS));

    let mut decoder = Decoder::new(&tables);
    assert_eq!(commits(&mut decoder, &tap(KEY_E)), vec!["E"]);
}

#[test]
fn test_invalid_file_without_fallback_fails() {
    let mut temp = NamedTempFile::new().unwrap();
    writeln!(temp, "[[page]]\nindex = 0\nkeys = [{{ code = 1, sym = \"bogus:1\" }}]").unwrap();

    let mut config = Config::default_config()
        .unwrap()
        .with_overrides(Some(temp.path().to_path_buf()), None);
    config.keymap.fallback_to_builtin = false;

    let err = config.load_tables().unwrap_err();
    assert!(format!("{:#}", err).contains("bogus:1"));

    config.keymap.fallback_to_builtin = true;
    let tables = config.load_tables().unwrap();
    assert_eq!(tables.keymap.page_count(), 16);
}

#[test]
fn test_dump_and_reload_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("us.toml");

    let builtin = KeyboardTables::builtin();
    std::fs::write(&path, KeymapFile::from_tables(&builtin).to_toml().unwrap()).unwrap();

    let mut file = KeymapFile::load(&path).unwrap();
    let reloaded = KeyboardTables::load(&mut file).unwrap();

    let caps = reloaded.keymap.lookup(0, KEY_CAPSLOCK).unwrap();
    assert_eq!(caps, Keysym::new(HandlerType::Special, 7));

    let mut decoder = Decoder::new(&reloaded);
    let mut events = vec![KeyEvent::down(KEY_LEFTSHIFT)];
    events.extend(tap(KEY_W));
    events.push(KeyEvent::up(KEY_LEFTSHIFT));
    assert_eq!(commits(&mut decoder, &events), vec!["W"]);
}

#[test]
fn test_sticky_lock_onto_missing_page() {
    let tables = locks_tables();
    assert!(!tables.keymap.has_page(8));
    let mut decoder = Decoder::new(&tables);

    // The toggled lock page 8 does not exist, so the one-shot state is reset
    // to just the Alt bit
    assert_eq!(decoder.handle_event(KeyEvent::down(KEY_LEFTALT)), None);
    assert_eq!(decoder.modifiers().sticky_lock_state(), ModifierSet::ALT);
    assert_eq!(decoder.stats().lookup_misses, 0);

    // The next key resolves against page 8, is dropped and clears it
    assert_eq!(decoder.handle_event(KeyEvent::down(KEY_A)), None);
    assert_eq!(decoder.stats().lookup_misses, 1);
    assert!(decoder.modifiers().sticky_lock_state().is_empty());
}

#[test]
fn test_capson_sets_caps_lock() {
    let tables = locks_tables();
    let mut decoder = Decoder::new(&tables);
    assert!(!decoder.modifiers().led(LedSet::CAPS));

    commits(&mut decoder, &tap(KEY_CAPSLOCK));
    assert!(decoder.modifiers().led(LedSet::CAPS));
    assert_eq!(commits(&mut decoder, &tap(KEY_A)), vec!["A"]);

    // Sets rather than toggles
    commits(&mut decoder, &tap(KEY_CAPSLOCK));
    assert!(decoder.modifiers().led(LedSet::CAPS));

    // Caps lock inverts the one-shot shift for letters
    commits(&mut decoder, &tap(KEY_LEFTSHIFT));
    assert_eq!(commits(&mut decoder, &tap(KEY_A)), vec!["a"]);
    assert_eq!(commits(&mut decoder, &tap(KEY_A)), vec!["A"]);
}

#[test]
fn test_caps_shift_clears_caps_lock() {
    let tables = locks_tables();
    let mut decoder = Decoder::new(&tables);

    commits(&mut decoder, &tap(KEY_CAPSLOCK));
    assert!(decoder.modifiers().led(LedSet::CAPS));

    decoder.handle_event(KeyEvent::down(KEY_RIGHTSHIFT));
    assert!(!decoder.modifiers().led(LedSet::CAPS));
    assert_eq!(commits(&mut decoder, &tap(KEY_A)), vec!["A"]);
    decoder.handle_event(KeyEvent::up(KEY_RIGHTSHIFT));

    assert!(decoder.modifiers().shift_state().is_empty());
    assert_eq!(commits(&mut decoder, &tap(KEY_A)), vec!["a"]);
}

#[test]
fn test_out_of_table_values_are_silent() {
    let tables = locks_tables();
    let mut decoder = Decoder::new(&tables);
    let leds = decoder.modifiers().leds();

    // spec:25, dead value 7 and pad:30 all fall outside their tables
    for keycode in [KEY_F1, KEY_F2, KEY_F3] {
        assert!(commits(&mut decoder, &tap(keycode)).is_empty());
    }
    assert_eq!(decoder.composer().pending(), None);
    assert_eq!(decoder.modifiers().leds(), leds);
    assert_eq!(decoder.stats().lookup_misses, 0);

    // An in-range pad value still types with num lock on
    assert_eq!(commits(&mut decoder, &tap(KEY_F4)), vec!["7"]);
}
