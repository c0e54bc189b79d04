//! Utility Functions
//!
//! User-friendly error formatting for the command-line tools.
//!
//! ```rust
//! use keysym_decoder::utils::format_user_error;
//!
//! let error = anyhow::anyhow!("Console keymap error: KDGKBMODE failed");
//! let message = format_user_error(&error);
//! assert!(message.contains("Console Keymap Error"));
//! ```
//!
//! Error categories with context-aware help:
//! - Console errors → VT requirements, tty permissions
//! - Keymap errors → file location, keysym syntax, index ranges
//! - Event script errors → line format
//! - Config errors → syntax, valid values

pub mod errors;

pub use errors::format_user_error;
