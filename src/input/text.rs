//! Text Output
//!
//! UTF-8 encoding with exclusion ranges and the bounded per-event buffer that
//! collects committed text before it is handed to the host.

use serde::Serialize;
use tracing::trace;

/// Largest payload of one commit, in bytes
pub const TEXT_CAPACITY: usize = 127;

/// Code point accepted for output, or `None` if it must be dropped.
///
/// Surrogates, U+FFFF and anything past U+10FFFF never reach the host.
pub fn encodable(code_point: u32) -> Option<char> {
    if code_point == 0xFFFF {
        return None;
    }
    char::from_u32(code_point)
}

/// Encode `code_point` into `buf`, returning the used prefix.
///
/// Rejected code points encode to an empty slice.
pub fn encode_utf8(code_point: u32, buf: &mut [u8; 4]) -> &[u8] {
    match encodable(code_point) {
        Some(c) => {
            let encoded: &str = c.encode_utf8(buf);
            encoded.as_bytes()
        }
        None => &buf[..0],
    }
}

/// One flushed text payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextCommit {
    /// Committed text, at most [`TEXT_CAPACITY`] bytes
    pub text: String,
}

/// Receiver of committed text (the host's text-input path)
pub trait TextSink {
    /// Deliver one commit
    fn commit_text(&mut self, commit: &TextCommit);
}

impl TextSink for Vec<TextCommit> {
    fn commit_text(&mut self, commit: &TextCommit) {
        self.push(commit.clone());
    }
}

/// Bounded text queue for a single event.
///
/// Only whole code points are stored; one that does not fit is dropped so the
/// buffer always holds valid UTF-8.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    text: String,
    rejected: u64,
    truncated: u64,
}

impl TextBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            text: String::with_capacity(TEXT_CAPACITY),
            rejected: 0,
            truncated: 0,
        }
    }

    /// Encode and queue a code point
    pub fn push_code_point(&mut self, code_point: u32) {
        let Some(c) = encodable(code_point) else {
            trace!("Dropping unencodable code point 0x{:X}", code_point);
            self.rejected += 1;
            return;
        };

        if self.text.len() + c.len_utf8() > TEXT_CAPACITY {
            trace!("Text buffer full, dropping U+{:04X}", code_point);
            self.truncated += 1;
            return;
        }

        self.text.push(c);
    }

    /// Queued byte count
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Queued text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Take the queued text, leaving the buffer empty
    pub fn take(&mut self) -> Option<TextCommit> {
        if self.text.is_empty() {
            return None;
        }
        let text = std::mem::replace(&mut self.text, String::with_capacity(TEXT_CAPACITY));
        Some(TextCommit { text })
    }

    /// Drop queued text and zero the drop counters
    pub fn clear(&mut self) {
        self.text.clear();
        self.rejected = 0;
        self.truncated = 0;
    }

    /// Code points dropped because of the exclusion ranges
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Code points dropped because the buffer was full
    pub fn truncated_count(&self) -> u64 {
        self.truncated
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}
