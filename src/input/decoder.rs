//! Keyboard Decoder
//!
//! Turns `(keycode, phase)` events into committed UTF-8 text. Each event
//! resolves the current page from the modifier state, looks up the keysym and
//! dispatches it to exactly one handler; whatever text the handler queued is
//! committed once at the end of the event.

use crate::input::diacritic::Composer;
use crate::input::error::DecoderError;
use crate::input::keymap::KeyboardTables;
use crate::input::keysym::{DeadKey, HandlerType, SpecialFunction, Symbol};
use crate::input::modifiers::{LedSet, ModifierState};
use crate::input::numpad::NumpadEntry;
use crate::input::text::{TextBuffer, TextCommit, TextSink};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Characters produced by `pad` symbols while num lock is on
const PAD_CHARS: &[u8] = b"0123456789+-*/\r,.?()#";

/// Phase of a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPhase {
    /// Key pressed
    Down,
    /// Key released
    Up,
    /// Auto-repeat while held
    Repeat,
}

impl FromStr for KeyPhase {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "down" | "press" => Ok(Self::Down),
            "up" | "release" => Ok(Self::Up),
            "repeat" => Ok(Self::Repeat),
            _ => Err(DecoderError::InvalidEvent(s.to_string())),
        }
    }
}

impl fmt::Display for KeyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "down"),
            Self::Up => write!(f, "up"),
            Self::Repeat => write!(f, "repeat"),
        }
    }
}

/// One raw key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Linux evdev keycode
    pub keycode: u32,
    /// Press, release or repeat
    pub phase: KeyPhase,
}

impl KeyEvent {
    /// Key pressed
    pub fn down(keycode: u32) -> Self {
        Self {
            keycode,
            phase: KeyPhase::Down,
        }
    }

    /// Key released
    pub fn up(keycode: u32) -> Self {
        Self {
            keycode,
            phase: KeyPhase::Up,
        }
    }

    /// Key auto-repeat
    pub fn repeat(keycode: u32) -> Self {
        Self {
            keycode,
            phase: KeyPhase::Repeat,
        }
    }
}

impl FromStr for KeyEvent {
    type Err = DecoderError;

    /// Parse `<down|up|repeat> <keycode>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecoderError::InvalidEvent(s.to_string());

        let mut fields = s.split_whitespace();
        let (Some(phase), Some(keycode), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid());
        };

        Ok(Self {
            keycode: keycode.parse().map_err(|_| invalid())?,
            phase: phase.parse().map_err(|_| invalid())?,
        })
    }
}

/// What auto-repeat does for text-producing keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatPolicy {
    /// Repeat events produce no text
    #[default]
    Suppress,
    /// Repeat events produce text like a press; toggles and shifts still
    /// ignore them
    Emit,
}

/// Decoder counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    /// Events processed
    pub events: u64,
    /// Text commits delivered
    pub commits: u64,
    /// Events dropped because the page or keycode had no entry
    pub lookup_misses: u64,
    /// Code points dropped by the encoder's exclusion ranges
    pub rejected: u64,
    /// Code points dropped because the per-event buffer was full
    pub truncated: u64,
}

/// Per-keyboard decoder state
#[derive(Debug)]
pub struct Decoder<'t> {
    tables: &'t KeyboardTables,
    modifiers: ModifierState,
    composer: Composer,
    numpad: NumpadEntry,
    out: TextBuffer,
    repeat_policy: RepeatPolicy,

    events: u64,
    commits: u64,
    lookup_misses: u64,
}

impl<'t> Decoder<'t> {
    /// Create a decoder over shared tables
    pub fn new(tables: &'t KeyboardTables) -> Self {
        Self {
            tables,
            modifiers: ModifierState::new(tables.initial),
            composer: Composer::new(),
            numpad: NumpadEntry::new(),
            out: TextBuffer::new(),
            repeat_policy: RepeatPolicy::default(),
            events: 0,
            commits: 0,
            lookup_misses: 0,
        }
    }

    /// Set the auto-repeat policy
    pub fn with_repeat_policy(mut self, policy: RepeatPolicy) -> Self {
        self.repeat_policy = policy;
        self
    }

    /// Process one event, returning the text it committed
    pub fn handle_event(&mut self, event: KeyEvent) -> Option<TextCommit> {
        self.events += 1;
        self.process(event);

        let commit = self.out.take();
        if let Some(commit) = &commit {
            self.commits += 1;
            trace!("Commit {:?} for keycode {}", commit.text, event.keycode);
        }
        commit
    }

    /// Process one event, delivering any committed text to `sink`
    pub fn handle_event_into<S: TextSink + ?Sized>(&mut self, event: KeyEvent, sink: &mut S) {
        if let Some(commit) = self.handle_event(event) {
            sink.commit_text(&commit);
        }
    }

    fn process(&mut self, event: KeyEvent) {
        let rep = event.phase == KeyPhase::Repeat;
        let keymap = &self.tables().keymap;

        let shift_final = self.modifiers.shift_final();
        if !keymap.has_page(shift_final) {
            trace!("No keymap page {}, dropping keycode {}", shift_final, event.keycode);
            self.modifiers.clear_sticky();
            self.lookup_misses += 1;
            return;
        }

        let Some(keysym) = keymap.resolve(&self.modifiers, event.keycode) else {
            trace!("Keycode {} outside keymap", event.keycode);
            self.lookup_misses += 1;
            return;
        };

        let produces_text = match event.phase {
            KeyPhase::Down => true,
            KeyPhase::Repeat => self.repeat_policy == RepeatPolicy::Emit,
            KeyPhase::Up => false,
        };

        match keysym.symbol() {
            Symbol::Plain(code_point) => {
                if produces_text {
                    self.out.push_code_point(code_point);
                }
            }
            Symbol::Typed { handler, value } => {
                trace!(
                    "keycode {} page {} -> {} {} ({})",
                    event.keycode,
                    shift_final,
                    handler.name(),
                    value,
                    event.phase
                );
                self.dispatch(handler, value, !produces_text, rep);

                if handler != HandlerType::StickyLock {
                    self.modifiers.clear_sticky();
                }
            }
        }
    }

    fn dispatch(&mut self, handler: HandlerType, value: u8, up: bool, rep: bool) {
        match handler {
            HandlerType::SelfInsert => self.self_insert(value, up),
            HandlerType::Special => self.special(value, up, rep),
            HandlerType::Pad => self.pad(value, up),
            HandlerType::Dead => {
                if let Some(dead) = DeadKey::from_value(value) {
                    self.dead_unicode(dead.diacritic() as u32, up);
                }
            }
            HandlerType::Dead2 => self.dead_unicode(value as u32, up),
            HandlerType::Shift => self.shift(value, up, rep),
            HandlerType::Ascii => {
                if !up {
                    self.numpad.push_digit(value);
                }
            }
            HandlerType::Lock => {
                if !up && !rep {
                    self.modifiers.toggle_lock(value);
                }
            }
            HandlerType::StickyLock => self.sticky_lock(value, up, rep),
            HandlerType::Function
            | HandlerType::Console
            | HandlerType::Cursor
            | HandlerType::Meta
            | HandlerType::Letter
            | HandlerType::Braille
            | HandlerType::Ignore => {}
        }
    }

    fn self_insert(&mut self, value: u8, up: bool) {
        if up {
            return;
        }
        self.composer
            .feed_char(&self.tables.diacritics, value as u32, &mut self.out);
    }

    fn dead_unicode(&mut self, diacr: u32, up: bool) {
        if up {
            return;
        }
        self.composer
            .feed_dead(&self.tables.diacritics, diacr, &mut self.out);
    }

    fn special(&mut self, value: u8, up: bool, rep: bool) {
        if up {
            return;
        }
        let Some(function) = SpecialFunction::from_value(value) else {
            return;
        };

        match function {
            SpecialFunction::Enter => self.composer.flush(&mut self.out),
            SpecialFunction::CapsToggle => {
                if !rep {
                    self.modifiers.toggle_led(LedSet::CAPS);
                }
            }
            SpecialFunction::NumToggle | SpecialFunction::BareNumToggle => {
                if !rep {
                    self.modifiers.toggle_led(LedSet::NUM);
                }
            }
            SpecialFunction::CapsOn => {
                if !rep {
                    self.modifiers.set_led(LedSet::CAPS);
                }
            }
            SpecialFunction::Compose => self.composer.arm_compose(),
        }
    }

    fn pad(&mut self, value: u8, up: bool) {
        if up || !self.modifiers.led(LedSet::NUM) {
            return;
        }
        if let Some(c) = PAD_CHARS.get(value as usize) {
            self.out.push_code_point(*c as u32);
        }
    }

    fn shift(&mut self, value: u8, up: bool, rep: bool) {
        if rep {
            return;
        }
        if self.modifiers.press_shift(value, up) {
            if let Some(code_point) = self.numpad.finish() {
                trace!("Numeric entry finished: U+{:04X}", code_point);
                self.out.push_code_point(code_point);
            }
        }
    }

    fn sticky_lock(&mut self, value: u8, up: bool, rep: bool) {
        self.shift(value, up, rep);
        if up || rep {
            return;
        }

        self.modifiers.toggle_sticky(value);
        if !self.tables.keymap.has_page(self.modifiers.lock_page()) {
            self.modifiers.reset_sticky_to(value);
        }
    }

    /// Counters so far
    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            events: self.events,
            commits: self.commits,
            lookup_misses: self.lookup_misses,
            rejected: self.out.rejected_count(),
            truncated: self.out.truncated_count(),
        }
    }

    /// Return to the freshly constructed state, keeping tables and policy
    pub fn reset(&mut self) {
        self.modifiers = ModifierState::new(self.tables.initial);
        self.composer.reset();
        self.numpad = NumpadEntry::new();
        self.out.clear();
        self.events = 0;
        self.commits = 0;
        self.lookup_misses = 0;
    }

    /// Shared tables
    pub fn tables(&self) -> &'t KeyboardTables {
        self.tables
    }

    /// Modifier state
    pub fn modifiers(&self) -> &ModifierState {
        &self.modifiers
    }

    /// Dead-key state
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Numeric entry state
    pub fn numpad(&self) -> &NumpadEntry {
        &self.numpad
    }

    /// Active auto-repeat policy
    pub fn repeat_policy(&self) -> RepeatPolicy {
        self.repeat_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keycodes::{
        KEY_1, KEY_6, KEY_A, KEY_CAPSLOCK, KEY_COMPOSE, KEY_ENTER, KEY_H, KEY_I, KEY_KP1,
        KEY_KP4, KEY_KP5, KEY_KP7, KEY_KPDOT, KEY_KPENTER, KEY_LEFTALT, KEY_LEFTSHIFT,
        KEY_NUMLOCK, KEY_Q, KEY_RIGHTALT, KEY_S,
    };
    use crate::input::modifiers::{shift, InitialFlags};

    fn text(decoder: &mut Decoder<'_>, events: &[KeyEvent]) -> String {
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
    fn test_plain_typing() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);
        let events: Vec<_> = [KEY_H, KEY_I].iter().flat_map(|k| tap(*k)).collect();
        assert_eq!(text(&mut decoder, &events), "hi");
    }

    #[test]
    fn test_one_commit_per_event() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);
        assert_eq!(
            decoder.handle_event(KeyEvent::down(KEY_A)),
            Some(TextCommit {
                text: "a".to_string()
            })
        );
        assert_eq!(decoder.handle_event(KeyEvent::up(KEY_A)), None);
        assert_eq!(decoder.stats().commits, 1);
        assert_eq!(decoder.stats().events, 2);
    }

    #[test]
    fn test_repeat_policy() {
        let tables = KeyboardTables::builtin();

        let mut decoder = Decoder::new(&tables);
        assert_eq!(decoder.handle_event(KeyEvent::repeat(KEY_A)), None);

        let mut decoder = Decoder::new(&tables).with_repeat_policy(RepeatPolicy::Emit);
        assert_eq!(
            decoder.handle_event(KeyEvent::repeat(KEY_A)).map(|c| c.text),
            Some("a".to_string())
        );

        // Toggles still ignore repeats
        decoder.handle_event(KeyEvent::down(KEY_CAPSLOCK));
        decoder.handle_event(KeyEvent::repeat(KEY_CAPSLOCK));
        assert!(decoder.modifiers().led(LedSet::CAPS));
    }

    #[test]
    fn test_caps_toggle_and_letters() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);

        text(&mut decoder, &tap(KEY_CAPSLOCK));
        assert!(decoder.modifiers().led(LedSet::CAPS));
        assert_eq!(text(&mut decoder, &tap(KEY_Q)), "Q");
        // Digits are unaffected
        assert_eq!(text(&mut decoder, &tap(KEY_1)), "1");

        // Shift inverts caps lock for letters
        let events = [
            KeyEvent::down(KEY_LEFTSHIFT),
            KeyEvent::down(KEY_Q),
            KeyEvent::up(KEY_Q),
            KeyEvent::up(KEY_LEFTSHIFT),
        ];
        assert_eq!(text(&mut decoder, &events), "q");
    }

    #[test]
    fn test_pad_needs_num_lock() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);

        assert_eq!(text(&mut decoder, &tap(KEY_KP7)), "");
        text(&mut decoder, &tap(KEY_NUMLOCK));
        assert_eq!(text(&mut decoder, &tap(KEY_KP7)), "7");
        assert_eq!(text(&mut decoder, &tap(KEY_KPENTER)), "\r");
        assert_eq!(text(&mut decoder, &tap(KEY_KPDOT)), ".");
    }

    #[test]
    fn test_hex_code_point_entry() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);

        // AltGr + keypad enters hex: 4, 1 -> U+0041
        let events = [
            KeyEvent::down(KEY_RIGHTALT),
            KeyEvent::down(KEY_KP4),
            KeyEvent::up(KEY_KP4),
            KeyEvent::down(KEY_KP1),
            KeyEvent::up(KEY_KP1),
        ];
        assert_eq!(text(&mut decoder, &events), "");
        assert_eq!(decoder.numpad().base(), 16);
        assert_eq!(text(&mut decoder, &[KeyEvent::up(KEY_RIGHTALT)]), "A");
        assert!(!decoder.numpad().is_active());
    }

    #[test]
    fn test_compose_key() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);

        let mut events = tap(KEY_COMPOSE).to_vec();
        events.extend(tap(KEY_S));
        events.extend(tap(KEY_S));
        assert_eq!(text(&mut decoder, &events), "ß");
    }

    #[test]
    fn test_enter_flushes_pending_diacritic() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);

        let events = [
            KeyEvent::down(KEY_RIGHTALT),
            KeyEvent::down(KEY_6),
            KeyEvent::up(KEY_6),
            KeyEvent::up(KEY_RIGHTALT),
        ];
        assert_eq!(text(&mut decoder, &events), "");
        assert_eq!(decoder.composer().pending(), Some('^' as u32));
        assert_eq!(text(&mut decoder, &tap(KEY_ENTER)), "^");
        assert_eq!(decoder.composer().pending(), None);
    }

    #[test]
    fn test_missing_page_clears_sticky_and_misses() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);

        // Page 0x10 (shift_l bit) does not exist in the built-in map
        decoder.modifiers.press_shift(shift::SHIFT_L, false);
        decoder.modifiers.toggle_sticky(shift::CTRL);
        assert_eq!(decoder.handle_event(KeyEvent::down(KEY_A)), None);
        assert!(decoder.modifiers().sticky_lock_state().is_empty());
        assert_eq!(decoder.stats().lookup_misses, 1);
    }

    #[test]
    fn test_initial_flags_seed_state() {
        let mut tables = KeyboardTables::builtin();
        tables.initial = InitialFlags {
            leds: LedSet::NUM,
            ..InitialFlags::default()
        };
        let mut decoder = Decoder::new(&tables);
        assert_eq!(text(&mut decoder, &tap(KEY_KP5)), "5");
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables).with_repeat_policy(RepeatPolicy::Emit);

        decoder.handle_event(KeyEvent::down(KEY_LEFTSHIFT));
        decoder.handle_event(KeyEvent::down(KEY_CAPSLOCK));
        decoder.reset();

        assert!(decoder.modifiers().shift_state().is_empty());
        assert!(!decoder.modifiers().led(LedSet::CAPS));
        assert_eq!(decoder.stats(), DecoderStats::default());
        assert_eq!(decoder.repeat_policy(), RepeatPolicy::Emit);
    }

    #[test]
    fn test_reset_drops_pending_composition() {
        let tables = KeyboardTables::builtin();
        let mut decoder = Decoder::new(&tables);

        // Dead circumflex pending, compose armed, Alt numeric entry half done
        let events = [
            KeyEvent::down(KEY_RIGHTALT),
            KeyEvent::down(KEY_6),
            KeyEvent::up(KEY_6),
            KeyEvent::up(KEY_RIGHTALT),
            KeyEvent::down(KEY_COMPOSE),
            KeyEvent::up(KEY_COMPOSE),
            KeyEvent::down(KEY_LEFTALT),
            KeyEvent::down(KEY_KP1),
            KeyEvent::up(KEY_KP1),
        ];
        assert_eq!(text(&mut decoder, &events), "");
        assert!(decoder.composer().pending().is_some());
        assert!(decoder.numpad().is_active());

        decoder.out.push_code_point(0xD800);
        decoder.out.push_code_point('x' as u32);
        decoder.reset();

        assert_eq!(decoder.composer().pending(), None);
        assert!(!decoder.numpad().is_active());
        assert_eq!(decoder.stats().rejected, 0);
        assert!(decoder.out.is_empty());

        // Neither the dead key nor the armed compose touches the next letter
        assert_eq!(text(&mut decoder, &tap(KEY_A)), "a");
        assert_eq!(text(&mut decoder, &tap(KEY_A)), "a");
    }

    #[test]
    fn test_parse_events() {
        assert_eq!("down 30".parse::<KeyEvent>().unwrap(), KeyEvent::down(30));
        assert_eq!("UP 42".parse::<KeyEvent>().unwrap(), KeyEvent::up(42));
        assert_eq!("repeat 1".parse::<KeyEvent>().unwrap(), KeyEvent::repeat(1));
        assert!("down".parse::<KeyEvent>().is_err());
        assert!("down x".parse::<KeyEvent>().is_err());
        assert!("hold 30".parse::<KeyEvent>().is_err());
        assert!("down 30 extra".parse::<KeyEvent>().is_err());
    }
}
