//! TOML Keymap Files
//!
//! ```toml
//! [leds]
//! num_lock = true
//!
//! [[page]]
//! index = 0
//! keys = [
//!     { code = 30, sym = "letter:a" },
//!     { code = 41, sym = "dead:grave" },
//!     { code = 16, sym = 0xfb71 },
//! ]
//!
//! [[diacritic]]
//! diacr = "`"
//! base = "e"
//! result = "è"
//! ```
//!
//! Pages not listed are absent. Keys not listed in a page are holes. A `sym`
//! is either a raw keysym word or its textual form (see [`Keysym`]'s
//! `FromStr`). Diacritic fields accept a one-character string, `U+XXXX`, or a
//! number. Without any `[[diacritic]]` entries the default table is used.

use crate::input::diacritic::DiacriticEntry;
use crate::input::error::{DecoderError, Result};
use crate::input::keymap::{KeyboardTables, KeymapSource, MAX_PAGES, NR_KEYS};
use crate::input::keysym::Keysym;
use crate::input::modifiers::{InitialFlags, LedSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Keysym as written in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymSpec {
    /// Raw 16-bit word
    Raw(u16),
    /// Textual keysym
    Text(String),
}

impl SymSpec {
    /// Resolve to a keysym
    pub fn keysym(&self) -> Result<Keysym> {
        match self {
            SymSpec::Raw(word) => Ok(Keysym::from_raw(*word)),
            SymSpec::Text(text) => text.trim().parse(),
        }
    }
}

/// Code point as written in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodePointSpec {
    /// Numeric code point
    Number(u32),
    /// Single character or `U+XXXX`
    Text(String),
}

impl CodePointSpec {
    fn from_code_point(code_point: u32) -> Self {
        match char::from_u32(code_point) {
            Some(c) if !c.is_control() => CodePointSpec::Text(c.to_string()),
            _ => CodePointSpec::Number(code_point),
        }
    }

    /// Resolve to a code point
    pub fn code_point(&self) -> Result<u32> {
        match self {
            CodePointSpec::Number(n) => Ok(*n),
            CodePointSpec::Text(text) => {
                if let Some(hex) = text.strip_prefix("U+").or_else(|| text.strip_prefix("u+")) {
                    return u32::from_str_radix(hex, 16).map_err(|_| {
                        DecoderError::DiacriticLoadFailed(format!("invalid code point '{}'", text))
                    });
                }

                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c as u32),
                    _ => Err(DecoderError::DiacriticLoadFailed(format!(
                        "expected a single character, got '{}'",
                        text
                    ))),
                }
            }
        }
    }
}

/// One key of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    /// Keycode
    pub code: u32,
    /// Keysym for that keycode
    pub sym: SymSpec,
}

/// One shift-state page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Shift-state index
    pub index: u16,
    /// Non-hole entries
    #[serde(default)]
    pub keys: Vec<KeySpec>,
}

/// One composition rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiacriticSpec {
    /// Pending diacritic
    pub diacr: CodePointSpec,
    /// Following key
    pub base: CodePointSpec,
    /// Composed result
    pub result: CodePointSpec,
}

/// Initial LED state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedSpec {
    /// Caps lock on at startup
    pub caps_lock: bool,
    /// Num lock on at startup
    pub num_lock: bool,
    /// Scroll lock on at startup
    pub scroll_lock: bool,
}

impl LedSpec {
    /// LED bitmask
    pub fn to_set(self) -> LedSet {
        let mut set = LedSet::empty();
        set.set(LedSet::CAPS, self.caps_lock);
        set.set(LedSet::NUM, self.num_lock);
        set.set(LedSet::SCROLL, self.scroll_lock);
        set
    }

    /// LED flags from a bitmask
    pub fn from_set(set: LedSet) -> Self {
        Self {
            caps_lock: set.contains(LedSet::CAPS),
            num_lock: set.contains(LedSet::NUM),
            scroll_lock: set.contains(LedSet::SCROLL),
        }
    }
}

/// Parsed keymap file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeymapFile {
    /// Initial LEDs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leds: Option<LedSpec>,

    /// Pages
    #[serde(default, rename = "page")]
    pub pages: Vec<PageSpec>,

    /// Composition rules
    #[serde(default, rename = "diacritic")]
    pub diacritics: Vec<DiacriticSpec>,

    #[serde(skip)]
    origin: Option<PathBuf>,
}

impl KeymapFile {
    /// Load and validate a keymap file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut file = Self::parse(&contents)?;
        file.origin = Some(path.to_path_buf());
        debug!("Loaded keymap file {:?} ({} pages)", path, file.pages.len());
        Ok(file)
    }

    /// Parse and validate keymap text
    pub fn parse(contents: &str) -> Result<Self> {
        let file: Self = toml::from_str(contents)?;
        file.validate()?;
        Ok(file)
    }

    /// Check indices, duplicates and every keysym and diacritic
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for page in &self.pages {
            if page.index as usize >= MAX_PAGES {
                return Err(DecoderError::IndexOutOfRange {
                    what: "page",
                    index: page.index as u32,
                    max: MAX_PAGES as u32 - 1,
                });
            }
            if !seen.insert(page.index) {
                return Err(DecoderError::DuplicatePage(page.index));
            }
            self.page_words(page)?;
        }

        self.diacritic_entries()?;
        Ok(())
    }

    fn page_words(&self, page: &PageSpec) -> Result<Vec<u16>> {
        let mut words = vec![Keysym::HOLE.raw(); NR_KEYS];

        for key in &page.keys {
            let slot = words
                .get_mut(key.code as usize)
                .ok_or(DecoderError::IndexOutOfRange {
                    what: "keycode",
                    index: key.code,
                    max: NR_KEYS as u32 - 1,
                })?;
            *slot = key.sym.keysym()?.raw();
        }

        Ok(words)
    }

    fn diacritic_entries(&self) -> Result<Vec<DiacriticEntry>> {
        self.diacritics
            .iter()
            .map(|spec| {
                Ok(DiacriticEntry {
                    diacr: spec.diacr.code_point()?,
                    base: spec.base.code_point()?,
                    result: spec.result.code_point()?,
                })
            })
            .collect()
    }

    /// Describe loaded tables in file form
    pub fn from_tables(tables: &KeyboardTables) -> Self {
        let pages = tables
            .keymap
            .page_indices()
            .filter_map(|index| {
                let entries = tables.keymap.page(index)?;
                let keys = entries
                    .iter()
                    .enumerate()
                    .filter(|(_, keysym)| **keysym != Keysym::HOLE)
                    .map(|(code, keysym)| KeySpec {
                        code: code as u32,
                        sym: SymSpec::Text(keysym.to_string()),
                    })
                    .collect();
                Some(PageSpec {
                    index: index as u16,
                    keys,
                })
            })
            .collect();

        let diacritics = tables
            .diacritics
            .entries()
            .iter()
            .map(|entry| DiacriticSpec {
                diacr: CodePointSpec::from_code_point(entry.diacr),
                base: CodePointSpec::from_code_point(entry.base),
                result: CodePointSpec::from_code_point(entry.result),
            })
            .collect();

        let leds = (!tables.initial.leds.is_empty()).then(|| LedSpec::from_set(tables.initial.leds));

        Self {
            leds,
            pages,
            diacritics,
            origin: None,
        }
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl KeymapSource for KeymapFile {
    fn name(&self) -> String {
        match &self.origin {
            Some(path) => format!("file:{}", path.display()),
            None => "file".to_string(),
        }
    }

    fn load_page(&mut self, index: u8) -> Result<Option<Vec<u16>>> {
        self.pages
            .iter()
            .find(|page| page.index == index as u16)
            .map(|page| self.page_words(page))
            .transpose()
    }

    fn load_diacritics(&mut self) -> Result<Option<Vec<DiacriticEntry>>> {
        if self.diacritics.is_empty() {
            return Ok(None);
        }
        self.diacritic_entries().map(Some)
    }

    fn initial_flags(&mut self) -> Result<InitialFlags> {
        Ok(InitialFlags {
            leds: self.leds.map(LedSpec::to_set).unwrap_or_default(),
            ..InitialFlags::default()
        })
    }
}
