//! Dead-Key Composition
//!
//! [`DiacriticTable`] holds `(diacritic, base) → result` triples, searched in
//! order. [`Composer`] keeps the pending diacritic between key presses and
//! resolves it against the next printable key or dead key.

use crate::input::builtin;
use crate::input::text::TextBuffer;
use serde::{Deserialize, Serialize};
use tracing::trace;

const SPACE: u32 = ' ' as u32;

/// One composition rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiacriticEntry {
    /// Pending diacritic code point
    pub diacr: u32,
    /// Following key's code point
    pub base: u32,
    /// Composed code point
    pub result: u32,
}

impl DiacriticEntry {
    /// Build an entry from characters
    pub const fn new(diacr: char, base: char, result: char) -> Self {
        Self {
            diacr: diacr as u32,
            base: base as u32,
            result: result as u32,
        }
    }
}

/// Ordered composition table; the first exact match wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiacriticTable {
    entries: Vec<DiacriticEntry>,
}

impl DiacriticTable {
    /// Wrap entries in lookup order
    pub fn new(entries: Vec<DiacriticEntry>) -> Self {
        Self { entries }
    }

    /// Composed code point for `(diacr, base)`
    pub fn lookup(&self, diacr: u32, base: u32) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.diacr == diacr && entry.base == base)
            .map(|entry| entry.result)
    }

    /// Entries in lookup order
    pub fn entries(&self) -> &[DiacriticEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DiacriticTable {
    fn default() -> Self {
        Self::new(builtin::default_diacritics())
    }
}

/// Pending dead-key state
#[derive(Debug, Clone, Default)]
pub struct Composer {
    pending: Option<u32>,
    dead_key_next: bool,
}

impl Composer {
    /// Create an idle composer
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending diacritic, if any
    pub fn pending(&self) -> Option<u32> {
        self.pending
    }

    /// Whether the next printable key will be captured as a diacritic
    pub fn compose_armed(&self) -> bool {
        self.dead_key_next
    }

    /// Combine the pending diacritic with `incoming`.
    ///
    /// Clears the pending diacritic. On a table hit the composed code point is
    /// returned. A space or a repeat of the diacritic returns the diacritic
    /// itself. Otherwise the diacritic is queued on its own and `incoming` is
    /// returned unchanged.
    fn combine(
        &mut self,
        table: &DiacriticTable,
        diacr: u32,
        incoming: u32,
        out: &mut TextBuffer,
    ) -> u32 {
        self.pending = None;

        if let Some(result) = table.lookup(diacr, incoming) {
            trace!("Composed U+{:04X} + U+{:04X} -> U+{:04X}", diacr, incoming, result);
            return result;
        }

        if incoming == SPACE || incoming == diacr {
            return diacr;
        }

        out.push_code_point(diacr);
        incoming
    }

    /// Handle a printable key press
    pub fn feed_char(&mut self, table: &DiacriticTable, value: u32, out: &mut TextBuffer) {
        let value = match self.pending {
            Some(diacr) => self.combine(table, diacr, value, out),
            None => value,
        };

        if self.dead_key_next {
            self.dead_key_next = false;
            self.pending = Some(value);
            return;
        }

        out.push_code_point(value);
    }

    /// Handle a dead key press standing for `diacr`
    pub fn feed_dead(&mut self, table: &DiacriticTable, diacr: u32, out: &mut TextBuffer) {
        self.pending = Some(match self.pending {
            Some(pending) => self.combine(table, pending, diacr, out),
            None => diacr,
        });
    }

    /// Emit the pending diacritic on its own
    pub fn flush(&mut self, out: &mut TextBuffer) {
        if let Some(diacr) = self.pending.take() {
            out.push_code_point(diacr);
        }
    }

    /// Capture the next printable key as a diacritic
    pub fn arm_compose(&mut self) {
        self.dead_key_next = true;
    }

    /// Forget pending state
    pub fn reset(&mut self) {
        self.pending = None;
        self.dead_key_next = false;
    }
}
