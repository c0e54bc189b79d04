//! Keymap Tables
//!
//! A keymap is up to 256 pages, one per shift-state combination, each mapping
//! the 256 keycodes to a [`Keysym`]. Pages are loaded once from a
//! [`KeymapSource`] and never mutated afterwards; decoders borrow them.

use crate::input::builtin::BuiltinKeymap;
use crate::input::diacritic::{DiacriticEntry, DiacriticTable};
use crate::input::error::{recovery_action, DecoderError, RecoveryAction, Result};
use crate::input::keysym::{HandlerType, Keysym};
use crate::input::modifiers::{InitialFlags, LedSet, ModifierSet, ModifierState};
use tracing::{debug, info, warn};

/// Number of shift-state pages
pub const MAX_PAGES: usize = 256;

/// Number of keycodes per page
pub const NR_KEYS: usize = 256;

/// Provider of keymap pages, diacritics and initial flags.
///
/// Implemented by the built-in table, keymap files and the Linux console.
#[cfg_attr(test, mockall::automock)]
pub trait KeymapSource {
    /// Short name for logs
    fn name(&self) -> String;

    /// Read one page; `Ok(None)` means the page is absent
    fn load_page(&mut self, index: u8) -> Result<Option<Vec<u16>>>;

    /// Read the composition table; `Ok(None)` means "use the default table"
    fn load_diacritics(&mut self) -> Result<Option<Vec<DiacriticEntry>>>;

    /// Initial shift/lock/LED flags
    fn initial_flags(&mut self) -> Result<InitialFlags> {
        Ok(InitialFlags::default())
    }
}

/// Immutable keycode → keysym pages
#[derive(Clone)]
pub struct KeymapTable {
    pages: Vec<Option<Box<[Keysym; NR_KEYS]>>>,
}

impl KeymapTable {
    /// Read every page from `source`.
    ///
    /// Any read error discards the whole table. A table without a single page
    /// is unusable and reported as [`DecoderError::NoUsableKeymap`].
    pub fn load(source: &mut dyn KeymapSource) -> Result<Self> {
        let mut pages = Vec::with_capacity(MAX_PAGES);

        for index in 0..MAX_PAGES {
            let page = match source.load_page(index as u8)? {
                Some(words) => Some(Self::build_page(index as u8, &words)?),
                None => None,
            };
            pages.push(page);
        }

        let table = Self { pages };
        if table.page_count() == 0 {
            return Err(DecoderError::NoUsableKeymap(format!(
                "source '{}' provided no pages",
                source.name()
            )));
        }

        debug!(
            "Loaded {} keymap pages from '{}'",
            table.page_count(),
            source.name()
        );
        Ok(table)
    }

    /// Assemble a table from pages that are already built
    pub(crate) fn from_pages(pages: Vec<Option<Box<[Keysym; NR_KEYS]>>>) -> Self {
        Self { pages }
    }

    fn build_page(index: u8, words: &[u16]) -> Result<Box<[Keysym; NR_KEYS]>> {
        if words.len() != NR_KEYS {
            return Err(DecoderError::InvalidPageLength {
                page: index,
                len: words.len(),
                expected: NR_KEYS,
            });
        }

        let mut page = Box::new([Keysym::HOLE; NR_KEYS]);
        for (slot, word) in page.iter_mut().zip(words) {
            *slot = Keysym::from_raw(*word);
        }
        Ok(page)
    }

    /// Whether page `index` exists
    pub fn has_page(&self, index: u8) -> bool {
        self.pages
            .get(index as usize)
            .is_some_and(|page| page.is_some())
    }

    /// Number of present pages
    pub fn page_count(&self) -> usize {
        self.pages.iter().filter(|page| page.is_some()).count()
    }

    /// Indices of present pages
    pub fn page_indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, page)| page.is_some())
            .map(|(index, _)| index as u8)
    }

    /// Entries of page `index`
    pub fn page(&self, index: u8) -> Option<&[Keysym; NR_KEYS]> {
        self.pages.get(index as usize)?.as_deref()
    }

    /// Raw lookup without caps-lock handling
    pub fn lookup(&self, shift_final: u8, keycode: u32) -> Option<Keysym> {
        let page = self.page(shift_final)?;
        page.get(usize::try_from(keycode).ok()?).copied()
    }

    /// Lookup with the caps-lock letter override.
    ///
    /// A `letter` symbol is re-read from the page with the shift bit flipped
    /// while the caps-lock LED is on; the result is always delivered as a
    /// printable `latin` symbol. If the alternate page is absent the original
    /// entry's value is kept.
    pub fn resolve(&self, modifiers: &ModifierState, keycode: u32) -> Option<Keysym> {
        let shift_final = modifiers.shift_final();
        let keysym = self.lookup(shift_final, keycode)?;

        if keysym.handler() != Some(HandlerType::Letter) {
            return Some(keysym);
        }

        let keysym = if modifiers.led(LedSet::CAPS) {
            self.lookup(shift_final ^ ModifierSet::SHIFT.bits(), keycode)
                .unwrap_or(keysym)
        } else {
            keysym
        };

        Some(Keysym::new(HandlerType::SelfInsert, keysym.value()))
    }
}

impl std::fmt::Debug for KeymapTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeymapTable")
            .field("pages", &self.page_indices().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything a decoder needs that never changes after initialization
#[derive(Debug, Clone)]
pub struct KeyboardTables {
    /// Keycode → keysym pages
    pub keymap: KeymapTable,
    /// Dead-key composition table
    pub diacritics: DiacriticTable,
    /// Flags new decoders start from
    pub initial: InitialFlags,
}

impl KeyboardTables {
    /// Initialize from a source
    pub fn load(source: &mut dyn KeymapSource) -> Result<Self> {
        let keymap = KeymapTable::load(source)?;

        let diacritics = match source.load_diacritics()? {
            Some(entries) => DiacriticTable::new(entries),
            None => {
                debug!("Source '{}' has no diacritic table, using default", source.name());
                DiacriticTable::default()
            }
        };

        let initial = source.initial_flags()?;

        info!(
            "Keyboard tables ready: source={}, pages={}, diacritics={}",
            source.name(),
            keymap.page_count(),
            diacritics.len()
        );

        Ok(Self {
            keymap,
            diacritics,
            initial,
        })
    }

    /// Built-in US tables; cannot fail
    pub fn builtin() -> Self {
        Self {
            keymap: BuiltinKeymap::new().table(),
            diacritics: DiacriticTable::default(),
            initial: InitialFlags::default(),
        }
    }

    /// Initialize from `source`, falling back to the built-in tables when
    /// `fallback_allowed` and the error is recoverable
    pub fn load_or_builtin(source: &mut dyn KeymapSource, fallback_allowed: bool) -> Result<Self> {
        match Self::load(source) {
            Ok(tables) => Ok(tables),
            Err(e) => match recovery_action(&e, fallback_allowed) {
                RecoveryAction::UseBuiltinKeymap => {
                    warn!(
                        "Keymap source '{}' failed: {}, using built-in tables",
                        source.name(),
                        e
                    );
                    Ok(Self::builtin())
                }
                RecoveryAction::Abort => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with(entries: &[(usize, u16)]) -> Vec<u16> {
        let mut page = vec![Keysym::HOLE.raw(); NR_KEYS];
        for (code, word) in entries {
            page[*code] = *word;
        }
        page
    }

    fn two_page_source() -> MockKeymapSource {
        let mut source = MockKeymapSource::new();
        source.expect_name().return_const("mock".to_string());
        source.expect_load_page().returning(|index| {
            Ok(match index {
                0 => Some(page_with(&[(30, 0xFB61), (2, 0xF031)])),
                1 => Some(page_with(&[(30, 0xFB41), (2, 0xF021)])),
                _ => None,
            })
        });
        source.expect_load_diacritics().returning(|| Ok(None));
        source
            .expect_initial_flags()
            .returning(|| Ok(InitialFlags::default()));
        source
    }

    #[test]
    fn test_load_and_lookup() {
        let table = KeymapTable::load(&mut two_page_source()).unwrap();
        assert_eq!(table.page_count(), 2);
        assert!(table.has_page(1));
        assert!(!table.has_page(2));
        assert_eq!(table.lookup(0, 30).map(Keysym::raw), Some(0xFB61));
        assert_eq!(table.lookup(2, 30), None);
        assert_eq!(table.lookup(0, 256), None);
        assert_eq!(table.lookup(0, u32::MAX), None);
    }

    #[test]
    fn test_caps_lock_override_letters_only() {
        let table = KeymapTable::load(&mut two_page_source()).unwrap();
        let caps = ModifierState::new(InitialFlags {
            leds: LedSet::CAPS,
            ..InitialFlags::default()
        });

        let letter = table.resolve(&caps, 30).unwrap();
        assert_eq!(letter, Keysym::new(HandlerType::SelfInsert, b'A'));

        // Digits are latin, not letters
        let digit = table.resolve(&caps, 2).unwrap();
        assert_eq!(digit.raw(), 0xF031);
    }

    #[test]
    fn test_caps_override_keeps_original_without_alternate_page() {
        let mut source = MockKeymapSource::new();
        source.expect_name().return_const("mock".to_string());
        source.expect_load_page().returning(|index| {
            Ok((index == 0).then(|| page_with(&[(30, 0xFB61)])))
        });

        let table = KeymapTable::load(&mut source).unwrap();
        let caps = ModifierState::new(InitialFlags {
            leds: LedSet::CAPS,
            ..InitialFlags::default()
        });
        assert_eq!(
            table.resolve(&caps, 30),
            Some(Keysym::new(HandlerType::SelfInsert, b'a'))
        );
    }

    #[test]
    fn test_empty_source_is_fatal() {
        let mut source = MockKeymapSource::new();
        source.expect_name().return_const("empty".to_string());
        source.expect_load_page().returning(|_| Ok(None));

        let err = KeymapTable::load(&mut source).unwrap_err();
        assert!(matches!(err, DecoderError::NoUsableKeymap(_)));
    }

    #[test]
    fn test_short_page_rejected() {
        let mut source = MockKeymapSource::new();
        source.expect_name().return_const("short".to_string());
        source
            .expect_load_page()
            .returning(|_| Ok(Some(vec![0xF200; 12])));

        let err = KeymapTable::load(&mut source).unwrap_err();
        assert!(matches!(
            err,
            DecoderError::InvalidPageLength { page: 0, len: 12, .. }
        ));
    }

    #[test]
    fn test_load_or_builtin_falls_back() {
        let mut source = MockKeymapSource::new();
        source.expect_name().return_const("broken".to_string());
        source.expect_load_page().returning(|index| {
            Err(DecoderError::PageLoadFailed {
                page: index,
                reason: "EIO".to_string(),
            })
        });

        let tables = KeyboardTables::load_or_builtin(&mut source, true).unwrap();
        assert!(tables.keymap.has_page(0));

        let mut source = MockKeymapSource::new();
        source.expect_name().return_const("broken".to_string());
        source
            .expect_load_page()
            .returning(|_| Err(DecoderError::Console("EPERM".to_string())));
        assert!(KeyboardTables::load_or_builtin(&mut source, false).is_err());
    }

    #[test]
    fn test_tables_use_default_diacritics() {
        let tables = KeyboardTables::load(&mut two_page_source()).unwrap();
        assert!(!tables.diacritics.is_empty());
    }
}
