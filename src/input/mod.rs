//! Keyboard Decoding
//!
//! Table-driven translation of raw keycodes plus press/release/repeat phase
//! into committed UTF-8 text, in the manner of the Linux virtual-terminal
//! keyboard driver.
//!
//! # Features
//!
//! - **Keymap Tables**
//!   - Up to 256 shift-state pages of 256 keysyms each
//!   - Built-in US layout, TOML keymap files, or the live Linux console keymap
//!   - Caps-lock override for letter keys
//!
//! - **Modifier Tracking**
//!   - Per-modifier press counters (two Shift keys, one release)
//!   - Persistent locks, one-shot (sticky) locks and LED flags
//!   - Toggles ignore auto-repeat
//!
//! - **Text Composition**
//!   - Dead keys with chaining and the Compose key
//!   - Alt + keypad decimal and AltGr + keypad hex code-point entry
//!   - UTF-8 output with surrogate/U+FFFF rejection and a 127-byte bound
//!
//! # Architecture
//!
//! ```text
//! KeyEvent (keycode, phase)
//!       ↓
//! ┌─────────────────────────┐
//! │  Decoder                │ ← one per keyboard
//! │  - page selection       │
//! │  - handler dispatch     │
//! └─────────────────────────┘
//!       ↓           ↓           ↓
//! ┌──────────┐ ┌──────────┐ ┌───────────┐
//! │ Modifier │ │ Composer │ │  Numpad   │
//! │  State   │ │          │ │  Entry    │
//! └──────────┘ └──────────┘ └───────────┘
//!       ↓
//! TextBuffer → TextCommit
//! ```
//!
//! `KeyboardTables` (keymap, diacritics, initial flags) is loaded once from a
//! [`KeymapSource`] and borrowed immutably by every decoder.
//!
//! # Usage Example
//!
//! ```rust
//! use keysym_decoder::input::{keycodes, Decoder, KeyEvent, KeyboardTables};
//!
//! let tables = KeyboardTables::builtin();
//! let mut decoder = Decoder::new(&tables);
//!
//! decoder.handle_event(KeyEvent::down(keycodes::KEY_LEFTSHIFT));
//! let commit = decoder.handle_event(KeyEvent::down(keycodes::KEY_A));
//! assert_eq!(commit.map(|c| c.text), Some("A".to_string()));
//! ```
//!
//! # Error Handling
//!
//! Only table loading fails. Decoding itself never returns an error; lookup
//! misses and unencodable code points are dropped and counted in
//! [`DecoderStats`].
//!
//! ```rust,no_run
//! use keysym_decoder::input::{ConsoleKeymap, KeyboardTables};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut console = ConsoleKeymap::open(Path::new("/dev/tty"))?;
//! let tables = KeyboardTables::load_or_builtin(&mut console, true)?;
//! # Ok(())
//! # }
//! ```

pub mod builtin;
#[cfg(target_os = "linux")]
pub mod console;
pub mod decoder;
pub mod diacritic;
pub mod error;
pub mod keycodes;
pub mod keymap;
pub mod keymap_file;
pub mod keysym;
pub mod modifiers;
pub mod numpad;
pub mod text;

pub use builtin::BuiltinKeymap;
#[cfg(target_os = "linux")]
pub use console::ConsoleKeymap;
pub use decoder::{Decoder, DecoderStats, KeyEvent, KeyPhase, RepeatPolicy};
pub use diacritic::{Composer, DiacriticEntry, DiacriticTable};
pub use error::{classify_error, recovery_action, DecoderError, ErrorType, RecoveryAction, Result};
pub use keymap::{KeyboardTables, KeymapSource, KeymapTable, MAX_PAGES, NR_KEYS};
pub use keymap_file::KeymapFile;
pub use keysym::{DeadKey, HandlerType, Keysym, SpecialFunction, Symbol};
pub use modifiers::{shift, InitialFlags, LedSet, ModifierSet, ModifierState};
pub use numpad::NumpadEntry;
pub use text::{TextBuffer, TextCommit, TextSink, TEXT_CAPACITY};
