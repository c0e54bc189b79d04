//! Numeric Code-Point Entry
//!
//! Alt + keypad digits accumulate a decimal code point; AltGr + keypad hex
//! digits (payload 10 and up) accumulate a hexadecimal one. The value is only
//! committed when the holding modifier is released.

/// Accumulator for Alt-style code-point entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumpadEntry {
    accumulator: Option<u32>,
    base: u32,
}

impl NumpadEntry {
    /// Create an inactive accumulator
    pub fn new() -> Self {
        Self {
            accumulator: None,
            base: 10,
        }
    }

    /// Add one digit. Payloads below 10 are decimal digits, payloads from 10
    /// on are hex digits offset by 10.
    pub fn push_digit(&mut self, value: u8) {
        let (digit, base) = if value < 10 {
            (value as u32, 10)
        } else {
            ((value - 10) as u32, 16)
        };
        self.base = base;

        self.accumulator = Some(match self.accumulator {
            None => digit,
            Some(acc) => acc.saturating_mul(base).saturating_add(digit),
        });
    }

    /// Whether digits have been entered
    pub fn is_active(&self) -> bool {
        self.accumulator.is_some()
    }

    /// Current value
    pub fn value(&self) -> Option<u32> {
        self.accumulator
    }

    /// Base of the most recent digit
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Take the accumulated code point and deactivate
    pub fn finish(&mut self) -> Option<u32> {
        self.base = 10;
        self.accumulator.take()
    }
}

impl Default for NumpadEntry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_entry() {
        let mut entry = NumpadEntry::new();
        assert!(!entry.is_active());
        entry.push_digit(6);
        entry.push_digit(5);
        assert_eq!(entry.base(), 10);
        assert_eq!(entry.finish(), Some(65));
        assert!(!entry.is_active());
        assert_eq!(entry.finish(), None);
    }

    #[test]
    fn test_hex_entry() {
        let mut entry = NumpadEntry::new();
        // e, 9 as hex payloads
        entry.push_digit(10 + 0xE);
        entry.push_digit(10 + 0x9);
        assert_eq!(entry.base(), 16);
        assert_eq!(entry.value(), Some(0xE9));
    }

    #[test]
    fn test_leading_zero_counts() {
        let mut entry = NumpadEntry::new();
        entry.push_digit(0);
        assert!(entry.is_active());
        entry.push_digit(9);
        entry.push_digit(7);
        assert_eq!(entry.finish(), Some(97));
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let mut entry = NumpadEntry::new();
        for _ in 0..20 {
            entry.push_digit(9);
        }
        assert_eq!(entry.value(), Some(u32::MAX));
    }
}
