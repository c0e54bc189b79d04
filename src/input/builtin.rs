//! Built-in US Keymap
//!
//! Sixteen pages covering every combination of Shift, AltGr, Ctrl and Alt,
//! laid out like the stock Linux console `defkeymap`:
//!
//! - letters are `letter` symbols so caps lock applies, everything else
//!   printable is `latin`
//! - Ctrl turns printable keys into control characters, Alt into `meta`
//! - the keypad produces `pad` symbols; Alt + keypad digits enter a decimal
//!   code point, AltGr + keypad digits a hexadecimal one
//! - AltGr on `` ` ' 6 , `` (and shifted `` ` '``) gives dead keys
//! - the Compose key arms two-key composition
//!
//! The accompanying composition table covers the Latin-1 accented vowels and a
//! handful of compose pairs.

use crate::input::diacritic::DiacriticEntry;
use crate::input::error::Result;
use crate::input::keycodes::{
    KEY_0, KEY_1, KEY_2, KEY_3, KEY_4, KEY_5, KEY_6, KEY_7, KEY_8, KEY_9, KEY_A, KEY_APOSTROPHE,
    KEY_B, KEY_BACKSLASH, KEY_BACKSPACE, KEY_C, KEY_CAPSLOCK, KEY_COMMA, KEY_COMPOSE, KEY_D,
    KEY_DELETE, KEY_DOT, KEY_DOWN, KEY_E, KEY_END, KEY_ENTER, KEY_EQUAL, KEY_ESC, KEY_F, KEY_F1,
    KEY_F11, KEY_G, KEY_GRAVE, KEY_H, KEY_HOME, KEY_I, KEY_INSERT, KEY_J, KEY_K, KEY_KP0, KEY_KP1,
    KEY_KP2, KEY_KP3, KEY_KP4, KEY_KP5, KEY_KP6, KEY_KP7, KEY_KP8, KEY_KP9, KEY_KPASTERISK,
    KEY_KPCOMMA, KEY_KPDOT, KEY_KPENTER, KEY_KPMINUS, KEY_KPPLUS, KEY_KPSLASH, KEY_L, KEY_LEFT,
    KEY_LEFTALT, KEY_LEFTBRACE, KEY_LEFTCTRL, KEY_LEFTSHIFT, KEY_M, KEY_MINUS, KEY_N, KEY_NUMLOCK,
    KEY_O, KEY_P, KEY_PAGEDOWN, KEY_PAGEUP, KEY_Q, KEY_R, KEY_RIGHT, KEY_RIGHTALT, KEY_RIGHTBRACE,
    KEY_RIGHTCTRL, KEY_RIGHTSHIFT, KEY_S, KEY_SCROLLLOCK, KEY_SEMICOLON, KEY_SLASH, KEY_SPACE,
    KEY_T, KEY_TAB, KEY_U, KEY_UP, KEY_V, KEY_W, KEY_X, KEY_Y, KEY_Z,
};
use crate::input::keymap::{KeymapSource, KeymapTable, NR_KEYS};
use crate::input::keysym::{DeadKey, HandlerType, Keysym};
use crate::input::modifiers::shift;

/// Number of pages the built-in keymap populates
pub const BUILTIN_PAGES: u8 = 16;

/// Printable keys: (keycode, plain, shifted)
const PRINTABLE: &[(u32, char, char)] = &[
    (KEY_1, '1', '!'),
    (KEY_2, '2', '@'),
    (KEY_3, '3', '#'),
    (KEY_4, '4', '$'),
    (KEY_5, '5', '%'),
    (KEY_6, '6', '^'),
    (KEY_7, '7', '&'),
    (KEY_8, '8', '*'),
    (KEY_9, '9', '('),
    (KEY_0, '0', ')'),
    (KEY_MINUS, '-', '_'),
    (KEY_EQUAL, '=', '+'),
    (KEY_Q, 'q', 'Q'),
    (KEY_W, 'w', 'W'),
    (KEY_E, 'e', 'E'),
    (KEY_R, 'r', 'R'),
    (KEY_T, 't', 'T'),
    (KEY_Y, 'y', 'Y'),
    (KEY_U, 'u', 'U'),
    (KEY_I, 'i', 'I'),
    (KEY_O, 'o', 'O'),
    (KEY_P, 'p', 'P'),
    (KEY_LEFTBRACE, '[', '{'),
    (KEY_RIGHTBRACE, ']', '}'),
    (KEY_A, 'a', 'A'),
    (KEY_S, 's', 'S'),
    (KEY_D, 'd', 'D'),
    (KEY_F, 'f', 'F'),
    (KEY_G, 'g', 'G'),
    (KEY_H, 'h', 'H'),
    (KEY_J, 'j', 'J'),
    (KEY_K, 'k', 'K'),
    (KEY_L, 'l', 'L'),
    (KEY_SEMICOLON, ';', ':'),
    (KEY_APOSTROPHE, '\'', '"'),
    (KEY_GRAVE, '`', '~'),
    (KEY_BACKSLASH, '\\', '|'),
    (KEY_Z, 'z', 'Z'),
    (KEY_X, 'x', 'X'),
    (KEY_C, 'c', 'C'),
    (KEY_V, 'v', 'V'),
    (KEY_B, 'b', 'B'),
    (KEY_N, 'n', 'N'),
    (KEY_M, 'm', 'M'),
    (KEY_COMMA, ',', '<'),
    (KEY_DOT, '.', '>'),
    (KEY_SLASH, '/', '?'),
    (KEY_SPACE, ' ', ' '),
];

/// Keypad digit keys in payload order 0..9
const KEYPAD_DIGITS: [u32; 10] = [
    KEY_KP0, KEY_KP1, KEY_KP2, KEY_KP3, KEY_KP4, KEY_KP5, KEY_KP6, KEY_KP7, KEY_KP8, KEY_KP9,
];

/// Keypad operators: (keycode, pad payload)
const KEYPAD_OPERATORS: &[(u32, u8)] = &[
    (KEY_KPPLUS, 10),
    (KEY_KPMINUS, 11),
    (KEY_KPASTERISK, 12),
    (KEY_KPSLASH, 13),
    (KEY_KPENTER, 14),
    (KEY_KPCOMMA, 15),
    (KEY_KPDOT, 16),
];

/// Navigation keys: (keycode, keysym)
const NAVIGATION: &[(u32, Keysym)] = &[
    (KEY_DOWN, Keysym::new(HandlerType::Cursor, 0)),
    (KEY_LEFT, Keysym::new(HandlerType::Cursor, 1)),
    (KEY_RIGHT, Keysym::new(HandlerType::Cursor, 2)),
    (KEY_UP, Keysym::new(HandlerType::Cursor, 3)),
    (KEY_HOME, Keysym::new(HandlerType::Function, 20)),
    (KEY_INSERT, Keysym::new(HandlerType::Function, 21)),
    (KEY_DELETE, Keysym::new(HandlerType::Function, 22)),
    (KEY_END, Keysym::new(HandlerType::Function, 23)),
    (KEY_PAGEUP, Keysym::new(HandlerType::Function, 24)),
    (KEY_PAGEDOWN, Keysym::new(HandlerType::Function, 25)),
];

/// Modifier and lock keys, identical on every page
const MODIFIERS: &[(u32, Keysym)] = &[
    (KEY_LEFTSHIFT, Keysym::new(HandlerType::Shift, shift::SHIFT)),
    (KEY_RIGHTSHIFT, Keysym::new(HandlerType::Shift, shift::SHIFT)),
    (KEY_LEFTCTRL, Keysym::new(HandlerType::Shift, shift::CTRL)),
    (KEY_RIGHTCTRL, Keysym::new(HandlerType::Shift, shift::CTRL)),
    (KEY_LEFTALT, Keysym::new(HandlerType::Shift, shift::ALT)),
    (KEY_RIGHTALT, Keysym::new(HandlerType::Shift, shift::ALTGR)),
    (KEY_CAPSLOCK, Keysym::new(HandlerType::Special, 7)),
    (KEY_NUMLOCK, Keysym::new(HandlerType::Special, 8)),
    (KEY_SCROLLLOCK, Keysym::new(HandlerType::Special, 9)),
    (KEY_ENTER, Keysym::new(HandlerType::Special, 1)),
    (KEY_COMPOSE, Keysym::new(HandlerType::Special, 14)),
];

/// AltGr dead keys: (keycode, shifted, dead key)
const ALTGR_DEAD_KEYS: &[(u32, bool, DeadKey)] = &[
    (KEY_GRAVE, false, DeadKey::Grave),
    (KEY_GRAVE, true, DeadKey::Tilde),
    (KEY_APOSTROPHE, false, DeadKey::Acute),
    (KEY_APOSTROPHE, true, DeadKey::Diaeresis),
    (KEY_6, false, DeadKey::Circumflex),
    (KEY_6, true, DeadKey::Circumflex),
    (KEY_COMMA, false, DeadKey::Cedilla),
];

#[derive(Debug, Clone, Copy)]
struct PageModifiers {
    shift: bool,
    altgr: bool,
    ctrl: bool,
    alt: bool,
}

impl PageModifiers {
    fn of(page: u8) -> Self {
        Self {
            shift: page & (1 << shift::SHIFT) != 0,
            altgr: page & (1 << shift::ALTGR) != 0,
            ctrl: page & (1 << shift::CTRL) != 0,
            alt: page & (1 << shift::ALT) != 0,
        }
    }
}

/// Control character produced by Ctrl + `c`
fn control_code(c: char) -> Option<u8> {
    match c {
        ' ' | '@' | '2' => Some(0),
        'a'..='z' | 'A'..='Z' => Some(c as u8 & 0x1F),
        '[' | '3' => Some(0x1B),
        '\\' | '4' => Some(0x1C),
        ']' | '5' => Some(0x1D),
        '^' | '6' => Some(0x1E),
        '_' | '-' => Some(0x1F),
        '?' | '/' | '8' => Some(0x7F),
        _ => None,
    }
}

fn printable_keysym(keycode: u32, plain: char, shifted: char, mods: PageModifiers) -> Keysym {
    if mods.altgr && !mods.ctrl && !mods.alt {
        if let Some((_, _, dead)) = ALTGR_DEAD_KEYS
            .iter()
            .find(|(code, s, _)| *code == keycode && *s == mods.shift)
        {
            return Keysym::new(HandlerType::Dead, *dead as u8);
        }
    }

    let c = if mods.shift { shifted } else { plain };

    let byte = if mods.ctrl {
        match control_code(c) {
            Some(code) => code,
            None => return Keysym::HOLE,
        }
    } else {
        c as u8
    };

    if mods.alt {
        Keysym::new(HandlerType::Meta, byte)
    } else if !mods.ctrl && c.is_ascii_alphabetic() {
        Keysym::new(HandlerType::Letter, byte)
    } else {
        Keysym::new(HandlerType::SelfInsert, byte)
    }
}

fn keypad_digit_keysym(digit: u8, mods: PageModifiers) -> Keysym {
    if mods.altgr {
        Keysym::new(HandlerType::Ascii, 10 + digit)
    } else if mods.alt {
        Keysym::new(HandlerType::Ascii, digit)
    } else {
        Keysym::new(HandlerType::Pad, digit)
    }
}

/// Build one page of the built-in keymap
fn build_page(page: u8) -> Box<[Keysym; NR_KEYS]> {
    let mods = PageModifiers::of(page);
    let mut keys = Box::new([Keysym::HOLE; NR_KEYS]);

    for &(keycode, plain, shifted) in PRINTABLE {
        keys[keycode as usize] = printable_keysym(keycode, plain, shifted, mods);
    }

    let control = |byte: u8| {
        if mods.alt {
            Keysym::new(HandlerType::Meta, byte)
        } else {
            Keysym::new(HandlerType::SelfInsert, byte)
        }
    };
    keys[KEY_ESC as usize] = control(0x1B);
    keys[KEY_BACKSPACE as usize] = control(0x7F);
    keys[KEY_TAB as usize] = control(0x09);

    for n in 0..12u8 {
        let keycode = if n < 10 {
            KEY_F1 + n as u32
        } else {
            KEY_F11 + (n - 10) as u32
        };
        keys[keycode as usize] = if mods.alt {
            Keysym::new(HandlerType::Console, n)
        } else {
            Keysym::new(HandlerType::Function, n)
        };
    }

    for (digit, &keycode) in KEYPAD_DIGITS.iter().enumerate() {
        keys[keycode as usize] = keypad_digit_keysym(digit as u8, mods);
    }
    for &(keycode, value) in KEYPAD_OPERATORS {
        keys[keycode as usize] = Keysym::new(HandlerType::Pad, value);
    }

    for &(keycode, keysym) in NAVIGATION.iter().chain(MODIFIERS) {
        keys[keycode as usize] = keysym;
    }

    keys
}

/// Built-in US keymap source
#[derive(Debug, Clone, Default)]
pub struct BuiltinKeymap;

impl BuiltinKeymap {
    /// Create the source
    pub fn new() -> Self {
        Self
    }

    /// Generate the complete table
    pub fn table(&self) -> KeymapTable {
        let pages = (0..crate::input::keymap::MAX_PAGES)
            .map(|index| {
                u8::try_from(index)
                    .ok()
                    .filter(|page| *page < BUILTIN_PAGES)
                    .map(build_page)
            })
            .collect();
        KeymapTable::from_pages(pages)
    }
}

impl KeymapSource for BuiltinKeymap {
    fn name(&self) -> String {
        "builtin".to_string()
    }

    fn load_page(&mut self, index: u8) -> Result<Option<Vec<u16>>> {
        if index >= BUILTIN_PAGES {
            return Ok(None);
        }
        Ok(Some(build_page(index).iter().map(|k| k.raw()).collect()))
    }

    fn load_diacritics(&mut self) -> Result<Option<Vec<DiacriticEntry>>> {
        Ok(Some(default_diacritics()))
    }
}

/// Default composition table: Latin-1 accents plus compose pairs
pub fn default_diacritics() -> Vec<DiacriticEntry> {
    const ACCENTS: &[(char, &str, &str)] = &[
        ('`', "AEIOUaeiou", "ÀÈÌÒÙàèìòù"),
        ('\'', "AEIOUYaeiouy", "ÁÉÍÓÚÝáéíóúý"),
        ('^', "AEIOUaeiou", "ÂÊÎÔÛâêîôû"),
        ('~', "ANOano", "ÃÑÕãñõ"),
        ('"', "AEIOUaeiouy", "ÄËÏÖÜäëïöüÿ"),
        (',', "Cc", "Çç"),
    ];

    const COMPOSE: &[(char, char, char)] = &[
        ('a', 'e', 'æ'),
        ('A', 'E', 'Æ'),
        ('o', '/', 'ø'),
        ('O', '/', 'Ø'),
        ('s', 's', 'ß'),
        ('c', '/', '¢'),
        ('+', '-', '±'),
        ('<', '<', '«'),
        ('>', '>', '»'),
        ('1', '2', '½'),
        ('1', '4', '¼'),
        ('a', 'a', 'å'),
        ('A', 'A', 'Å'),
    ];

    let accents = ACCENTS.iter().flat_map(|(diacr, bases, results)| {
        bases
            .chars()
            .zip(results.chars())
            .map(move |(base, result)| DiacriticEntry::new(*diacr, base, result))
    });
    let compose = COMPOSE
        .iter()
        .map(|(diacr, base, result)| DiacriticEntry::new(*diacr, *base, *result));

    accents.chain(compose).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::diacritic::DiacriticTable;

    fn page(index: u8) -> Box<[Keysym; NR_KEYS]> {
        build_page(index)
    }

    #[test]
    fn test_plain_page() {
        let keys = page(0);
        assert_eq!(keys[KEY_A as usize].raw(), 0xFB61);
        assert_eq!(keys[KEY_1 as usize].raw(), 0xF031);
        assert_eq!(keys[KEY_SPACE as usize].raw(), 0xF020);
        assert_eq!(keys[KEY_ENTER as usize].raw(), 0xF201);
        assert_eq!(keys[KEY_LEFTSHIFT as usize].raw(), 0xF700);
        assert_eq!(keys[KEY_RIGHTALT as usize].raw(), 0xF701);
        assert_eq!(keys[KEY_CAPSLOCK as usize].raw(), 0xF207);
        assert_eq!(keys[KEY_KP7 as usize].raw(), 0xF307);
        assert_eq!(keys[KEY_KPENTER as usize].raw(), 0xF30E);
        assert_eq!(keys[KEY_UP as usize].raw(), 0xF603);
        assert_eq!(keys[KEY_COMPOSE as usize].raw(), 0xF20E);
        assert_eq!(keys[0], Keysym::HOLE);
    }

    #[test]
    fn test_shift_page() {
        let keys = page(1 << shift::SHIFT);
        assert_eq!(keys[KEY_A as usize].raw(), 0xFB41);
        assert_eq!(keys[KEY_1 as usize].raw(), 0xF021);
        assert_eq!(keys[KEY_SLASH as usize].raw(), 0xF03F);
    }

    #[test]
    fn test_ctrl_and_alt_pages() {
        let ctrl = page(1 << shift::CTRL);
        assert_eq!(ctrl[KEY_C as usize].raw(), 0xF003);
        assert_eq!(ctrl[KEY_LEFTBRACE as usize].raw(), 0xF01B);
        assert_eq!(ctrl[KEY_DOT as usize], Keysym::HOLE);

        let alt = page(1 << shift::ALT);
        assert_eq!(alt[KEY_X as usize].raw(), 0xF878);
        assert_eq!(alt[KEY_KP6 as usize].raw(), 0xF906);
        assert_eq!(alt[KEY_F1 as usize].raw(), 0xF500);
    }

    #[test]
    fn test_altgr_page() {
        let altgr = page(1 << shift::ALTGR);
        assert_eq!(altgr[KEY_GRAVE as usize].raw(), 0xF400);
        assert_eq!(altgr[KEY_APOSTROPHE as usize].raw(), 0xF401);
        assert_eq!(altgr[KEY_6 as usize].raw(), 0xF402);
        assert_eq!(altgr[KEY_COMMA as usize].raw(), 0xF405);
        assert_eq!(altgr[KEY_KP3 as usize].raw(), 0xF90D);

        let shifted = page((1 << shift::ALTGR) | (1 << shift::SHIFT));
        assert_eq!(shifted[KEY_GRAVE as usize].raw(), 0xF403);
        assert_eq!(shifted[KEY_APOSTROPHE as usize].raw(), 0xF404);
    }

    #[test]
    fn test_table_has_sixteen_pages() {
        let table = BuiltinKeymap::new().table();
        assert_eq!(table.page_count(), BUILTIN_PAGES as usize);
        assert!(!table.has_page(BUILTIN_PAGES));
    }

    #[test]
    fn test_source_matches_table() {
        let mut source = BuiltinKeymap::new();
        let loaded = KeymapTable::load(&mut source).unwrap();
        let built = source.table();
        for index in 0..BUILTIN_PAGES {
            assert_eq!(loaded.page(index), built.page(index));
        }
        assert_eq!(source.load_page(BUILTIN_PAGES).unwrap(), None);
    }

    #[test]
    fn test_default_diacritics() {
        let table = DiacriticTable::new(default_diacritics());
        let lookup = |d: char, b: char| table.lookup(d as u32, b as u32).and_then(char::from_u32);

        assert_eq!(lookup('`', 'e'), Some('è'));
        assert_eq!(lookup('\'', 'E'), Some('É'));
        assert_eq!(lookup('^', 'o'), Some('ô'));
        assert_eq!(lookup('~', 'n'), Some('ñ'));
        assert_eq!(lookup('"', 'u'), Some('ü'));
        assert_eq!(lookup(',', 'c'), Some('ç'));
        assert_eq!(lookup('a', 'e'), Some('æ'));
        assert_eq!(lookup('`', 'x'), None);
    }
}
