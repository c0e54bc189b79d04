//! # keysym-decoder
//!
//! Table-driven keyboard decoder for Linux keymaps.
//!
//! Turns raw keycodes and key phases (down, up, repeat) into committed UTF-8
//! text using kernel-style keymap tables: modifier and lock state, dead keys
//! and compose, numeric pad code point entry, and Caps/Num Lock LEDs.
//!
//! # Architecture
//!
//! ```text
//! keysym-decoder
//!   ├─> Keymap sources (built-in US layout, TOML file, Linux console)
//!   ├─> Keyboard tables (keymap pages, diacritic table, initial LEDs)
//!   ├─> Decoder (modifier state, dead keys, numpad entry)
//!   └─> Text sink (one commit per key event)
//! ```
//!
//! # Data Flow
//!
//! **Load Path:** Config → Keymap source → Keyboard tables
//!
//! **Decode Path:** Key event → Keysym lookup → Handler → Text buffer → Commit

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Decoder configuration
pub mod config;

/// Keymap tables, keysym handlers and the decoder state machine
pub mod input;

/// Utility functions
pub mod utils;
