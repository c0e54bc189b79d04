//! Keysym Encoding
//!
//! A keymap entry is a 16-bit word. Words below `0xF000` are plain code points
//! that bypass every handler. Words at or above `0xF000` carry a handler type in
//! the low nibble of the high byte and a one-byte payload in the low byte:
//!
//! ```text
//!  15      12 11       8 7               0
//! ┌──────────┬──────────┬─────────────────┐
//! │   0xF    │ handler  │      value      │
//! └──────────┴──────────┴─────────────────┘
//! ```

use crate::input::error::DecoderError;
use crate::input::modifiers::shift;
use std::fmt;
use std::str::FromStr;

/// First word that carries a handler type
pub const TYPED_BASE: u16 = 0xF000;

/// Empty slot (`spec:hole`)
pub const K_HOLE: u16 = 0xF200;

/// Symbol handler type, one per dispatch slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandlerType {
    /// Printable character (value is a Latin-1 byte)
    SelfInsert = 0,
    /// Function key F1..
    Function = 1,
    /// Entry in the special function table
    Special = 2,
    /// Keypad character
    Pad = 3,
    /// Dead key, value indexes the dead-key table
    Dead = 4,
    /// Console switch
    Console = 5,
    /// Cursor key
    Cursor = 6,
    /// Shift-type modifier
    Shift = 7,
    /// Meta (Alt + printable)
    Meta = 8,
    /// Numeric code-point entry digit
    Ascii = 9,
    /// Persistent lock toggle
    Lock = 10,
    /// Printable character affected by caps lock
    Letter = 11,
    /// One-shot (sticky) lock
    StickyLock = 12,
    /// Dead key, value is the diacritic itself
    Dead2 = 13,
    /// Braille pattern key
    Braille = 14,
    /// Reserved slot
    Ignore = 15,
}

impl HandlerType {
    /// Map a type nibble to its handler
    pub fn from_index(index: u8) -> Self {
        match index & 0x0F {
            0 => Self::SelfInsert,
            1 => Self::Function,
            2 => Self::Special,
            3 => Self::Pad,
            4 => Self::Dead,
            5 => Self::Console,
            6 => Self::Cursor,
            7 => Self::Shift,
            8 => Self::Meta,
            9 => Self::Ascii,
            10 => Self::Lock,
            11 => Self::Letter,
            12 => Self::StickyLock,
            13 => Self::Dead2,
            14 => Self::Braille,
            _ => Self::Ignore,
        }
    }

    /// Name used in textual keysyms
    pub fn name(self) -> &'static str {
        match self {
            Self::SelfInsert => "latin",
            Self::Function => "fn",
            Self::Special => "spec",
            Self::Pad => "pad",
            Self::Dead => "dead",
            Self::Console => "cons",
            Self::Cursor => "cur",
            Self::Shift => "shift",
            Self::Meta => "meta",
            Self::Ascii => "ascii",
            Self::Lock => "lock",
            Self::Letter => "letter",
            Self::StickyLock => "slock",
            Self::Dead2 => "dead2",
            Self::Braille => "brl",
            Self::Ignore => "ignore",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        (0..16)
            .map(Self::from_index)
            .find(|handler| handler.name() == name)
    }

    /// Whether a single-character textual value means that character
    fn takes_char(self) -> bool {
        matches!(
            self,
            Self::SelfInsert | Self::Letter | Self::Meta | Self::Dead2
        )
    }
}

/// Decoded view of a keysym word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// Code point emitted as-is
    Plain(u32),
    /// Handler type plus payload
    Typed {
        /// Dispatch slot
        handler: HandlerType,
        /// One-byte payload
        value: u8,
    },
}

/// One keymap entry
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keysym(u16);

impl Keysym {
    /// The empty slot
    pub const HOLE: Keysym = Keysym(K_HOLE);

    /// Wrap a raw keymap word
    pub const fn from_raw(word: u16) -> Self {
        Keysym(word)
    }

    /// Build a typed keysym
    pub const fn new(handler: HandlerType, value: u8) -> Self {
        Keysym(TYPED_BASE | ((handler as u16) << 8) | value as u16)
    }

    /// Build a plain keysym, `None` if the code point collides with typed words
    pub fn plain(code_point: u32) -> Option<Self> {
        if code_point < TYPED_BASE as u32 {
            Some(Keysym(code_point as u16))
        } else {
            None
        }
    }

    /// Raw keymap word
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Split into plain code point or handler + payload
    pub fn symbol(self) -> Symbol {
        if self.0 < TYPED_BASE {
            Symbol::Plain(self.0 as u32)
        } else {
            Symbol::Typed {
                handler: HandlerType::from_index((self.0 >> 8) as u8 - 0xF0),
                value: (self.0 & 0xFF) as u8,
            }
        }
    }

    /// Handler type, `None` for plain symbols
    pub fn handler(self) -> Option<HandlerType> {
        match self.symbol() {
            Symbol::Typed { handler, .. } => Some(handler),
            Symbol::Plain(_) => None,
        }
    }

    /// Low byte payload
    pub const fn value(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl Default for Keysym {
    fn default() -> Self {
        Self::HOLE
    }
}

/// Dead keys with a fixed represented character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadKey {
    /// `` ` ``
    Grave,
    /// `'`
    Acute,
    /// `^`
    Circumflex,
    /// `~`
    Tilde,
    /// `"`
    Diaeresis,
    /// `,`
    Cedilla,
}

impl DeadKey {
    const ALL: [DeadKey; 6] = [
        DeadKey::Grave,
        DeadKey::Acute,
        DeadKey::Circumflex,
        DeadKey::Tilde,
        DeadKey::Diaeresis,
        DeadKey::Cedilla,
    ];

    /// Dead key for a `dead:` payload
    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Character this dead key stands for
    pub fn diacritic(self) -> char {
        match self {
            DeadKey::Grave => '`',
            DeadKey::Acute => '\'',
            DeadKey::Circumflex => '^',
            DeadKey::Tilde => '~',
            DeadKey::Diaeresis => '"',
            DeadKey::Cedilla => ',',
        }
    }

    fn name(self) -> &'static str {
        match self {
            DeadKey::Grave => "grave",
            DeadKey::Acute => "acute",
            DeadKey::Circumflex => "circumflex",
            DeadKey::Tilde => "tilde",
            DeadKey::Diaeresis => "diaeresis",
            DeadKey::Cedilla => "cedilla",
        }
    }
}

/// Entries of the special function table that do something
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialFunction {
    /// Flush a pending diacritic
    Enter,
    /// Toggle the caps-lock LED
    CapsToggle,
    /// Toggle the num-lock LED
    NumToggle,
    /// Set the caps-lock LED
    CapsOn,
    /// Capture the next printable key as a diacritic
    Compose,
    /// Toggle the num-lock LED (application keypad variant)
    BareNumToggle,
}

impl SpecialFunction {
    /// Table slot; indices without a function return `None`
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Enter),
            7 => Some(Self::CapsToggle),
            8 => Some(Self::NumToggle),
            13 => Some(Self::CapsOn),
            14 => Some(Self::Compose),
            19 => Some(Self::BareNumToggle),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::CapsToggle => "caps",
            Self::NumToggle => "num",
            Self::CapsOn => "capson",
            Self::Compose => "compose",
            Self::BareNumToggle => "barenum",
        }
    }

    fn value(self) -> u8 {
        match self {
            Self::Enter => 1,
            Self::CapsToggle => 7,
            Self::NumToggle => 8,
            Self::CapsOn => 13,
            Self::Compose => 14,
            Self::BareNumToggle => 19,
        }
    }
}

const SHIFT_NAMES: [(&str, u8); 9] = [
    ("shift", shift::SHIFT),
    ("altgr", shift::ALTGR),
    ("ctrl", shift::CTRL),
    ("alt", shift::ALT),
    ("shiftl", shift::SHIFT_L),
    ("shiftr", shift::SHIFT_R),
    ("ctrll", shift::CTRL_L),
    ("ctrlr", shift::CTRL_R),
    ("capsshift", shift::CAPS_SHIFT),
];

fn named_value(handler: HandlerType, token: &str) -> Option<u8> {
    match handler {
        HandlerType::Dead => DeadKey::ALL
            .iter()
            .find(|dead| dead.name() == token)
            .map(|dead| *dead as u8),
        HandlerType::Special => match token {
            "hole" => Some(0),
            _ => [1u8, 7, 8, 13, 14, 19]
                .into_iter()
                .filter_map(SpecialFunction::from_value)
                .find(|function| function.name() == token)
                .map(SpecialFunction::value),
        },
        HandlerType::Shift | HandlerType::Lock | HandlerType::StickyLock => SHIFT_NAMES
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, value)| *value),
        _ => None,
    }
}

fn value_name(handler: HandlerType, value: u8) -> Option<&'static str> {
    match handler {
        HandlerType::Dead => DeadKey::from_value(value).map(DeadKey::name),
        HandlerType::Special if value == 0 => Some("hole"),
        HandlerType::Special => SpecialFunction::from_value(value).map(SpecialFunction::name),
        HandlerType::Shift | HandlerType::Lock | HandlerType::StickyLock => SHIFT_NAMES
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| *name),
        _ => None,
    }
}

fn parse_number(token: &str) -> Option<u32> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

impl FromStr for Keysym {
    type Err = DecoderError;

    /// Parse `U+XXXX`, `<handler>:<value>` or a bare raw word (`0xf20e`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecoderError::InvalidKeysym(s.to_string());

        if let Some(hex) = s.strip_prefix("U+").or_else(|| s.strip_prefix("u+")) {
            let code_point = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
            return Keysym::plain(code_point).ok_or_else(invalid);
        }

        let Some((name, token)) = s.split_once(':') else {
            let word = parse_number(s).ok_or_else(invalid)?;
            return u16::try_from(word).map(Keysym).map_err(|_| invalid());
        };

        let handler = HandlerType::from_name(name).ok_or_else(invalid)?;

        let mut chars = token.chars();
        let value = match (chars.next(), chars.next()) {
            (Some(c), None) if handler.takes_char() => u8::try_from(c as u32).ok(),
            _ => named_value(handler, token)
                .or_else(|| parse_number(token).and_then(|n| u8::try_from(n).ok())),
        }
        .ok_or_else(invalid)?;

        Ok(Keysym::new(handler, value))
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Symbol::Plain(code_point) => write!(f, "U+{:04X}", code_point),
            Symbol::Typed { handler, value } => {
                if let Some(name) = value_name(handler, value) {
                    write!(f, "{}:{}", handler.name(), name)
                } else if handler.takes_char() && (0x21..=0x7E).contains(&value) {
                    write!(f, "{}:{}", handler.name(), value as char)
                } else if handler.takes_char() {
                    write!(f, "{}:0x{:02x}", handler.name(), value)
                } else {
                    write!(f, "{}:{}", handler.name(), value)
                }
            }
        }
    }
}

impl fmt::Debug for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keysym(0x{:04x} {})", self.0, self)
    }
}
