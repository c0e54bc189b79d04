//! Decoder Error Types
//!
//! Only table initialization can fail. Steady-state decoding never returns an
//! error: lookup misses and rejected code points are counted and dropped.

use thiserror::Error;
use tracing::debug;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Decoder module error types
#[derive(Error, Debug)]
pub enum DecoderError {
    /// The source produced no page at all (including any built-in fallback)
    #[error("No usable keymap: {0}")]
    NoUsableKeymap(String),

    /// A page read from a source failed
    #[error("Failed to load keymap page {page}: {reason}")]
    PageLoadFailed {
        /// Shift-state page index
        page: u8,
        /// Underlying cause
        reason: String,
    },

    /// A page had the wrong number of entries
    #[error("Keymap page {page} has {len} entries (expected {expected})")]
    InvalidPageLength {
        /// Shift-state page index
        page: u8,
        /// Entries provided
        len: usize,
        /// Entries required
        expected: usize,
    },

    /// Page index declared twice in a keymap file
    #[error("Keymap page {0} defined more than once")]
    DuplicatePage(u16),

    /// Page or keycode index outside the table
    #[error("{what} index {index} out of range (max {max})")]
    IndexOutOfRange {
        /// Which index overflowed ("page" or "keycode")
        what: &'static str,
        /// Offending index
        index: u32,
        /// Largest valid index
        max: u32,
    },

    /// Textual keysym could not be parsed
    #[error("Invalid keysym '{0}'")]
    InvalidKeysym(String),

    /// Scripted key event could not be parsed
    #[error("Invalid key event '{0}'")]
    InvalidEvent(String),

    /// Diacritic table read failed
    #[error("Failed to load diacritic table: {0}")]
    DiacriticLoadFailed(String),

    /// Console keymap access failed
    #[error("Console keymap error: {0}")]
    Console(String),

    /// Keymap file parse error
    #[error("Keymap parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Keymap file serialization error
    #[error("Keymap serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error classification for recovery strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Source could not be reached (device, file)
    Source,
    /// Source was reachable but its content was malformed
    Format,
    /// Nothing usable at all
    Fatal,
}

/// Classify error for recovery strategy selection
pub fn classify_error(error: &DecoderError) -> ErrorType {
    match error {
        DecoderError::Console(_)
        | DecoderError::Io(_)
        | DecoderError::PageLoadFailed { .. }
        | DecoderError::DiacriticLoadFailed(_) => ErrorType::Source,

        DecoderError::InvalidPageLength { .. }
        | DecoderError::DuplicatePage(_)
        | DecoderError::IndexOutOfRange { .. }
        | DecoderError::InvalidKeysym(_)
        | DecoderError::InvalidEvent(_)
        | DecoderError::Parse(_)
        | DecoderError::Serialize(_) => ErrorType::Format,

        DecoderError::NoUsableKeymap(_) => ErrorType::Fatal,
    }
}

/// Recovery action to take after an initialization error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry initialization with the built-in tables
    UseBuiltinKeymap,

    /// Give up and surface the error
    Abort,
}

/// Determine recovery action for an initialization error
///
/// `fallback_allowed` mirrors the `keymap.fallback_to_builtin` setting. Every
/// error class falls back when allowed; the class is only logged.
pub fn recovery_action(error: &DecoderError, fallback_allowed: bool) -> RecoveryAction {
    if !fallback_allowed {
        return RecoveryAction::Abort;
    }
    debug!(
        "{:?} error ({}), falling back to built-in keymap",
        classify_error(error),
        error
    );
    RecoveryAction::UseBuiltinKeymap
}
