//! Modifier State
//!
//! Shift, lock, one-shot lock and LED bitmasks plus per-modifier press
//! counters. The page used for lookup is
//! `(shift_state | sticky_lock_state) ^ lock_state`.

use bitflags::bitflags;
use tracing::{debug, trace};

/// Shift-type modifier bit indices, as carried in keysym payloads
pub mod shift {
    /// Shift
    pub const SHIFT: u8 = 0;
    /// AltGr
    pub const ALTGR: u8 = 1;
    /// Control
    pub const CTRL: u8 = 2;
    /// Alt
    pub const ALT: u8 = 3;
    /// Left shift
    pub const SHIFT_L: u8 = 4;
    /// Right shift
    pub const SHIFT_R: u8 = 5;
    /// Left control
    pub const CTRL_L: u8 = 6;
    /// Right control
    pub const CTRL_R: u8 = 7;
    /// Shift that also cancels caps lock; folded into `SHIFT`
    pub const CAPS_SHIFT: u8 = 8;

    /// Number of press counters
    pub const COUNT: usize = 9;
}

bitflags! {
    /// Shift, lock or one-shot lock mask. Its bits form the page index.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ModifierSet: u8 {
        const SHIFT = 1 << shift::SHIFT;
        const ALTGR = 1 << shift::ALTGR;
        const CTRL = 1 << shift::CTRL;
        const ALT = 1 << shift::ALT;
        const SHIFT_L = 1 << shift::SHIFT_L;
        const SHIFT_R = 1 << shift::SHIFT_R;
        const CTRL_L = 1 << shift::CTRL_L;
        const CTRL_R = 1 << shift::CTRL_R;
    }
}

impl ModifierSet {
    /// The single bit named by a keysym payload; empty past bit 7
    pub fn from_index(index: u8) -> Self {
        Self::from_bits_retain(1u8.checked_shl(u32::from(index)).unwrap_or(0))
    }
}

bitflags! {
    /// Keyboard LED flags, laid out like the `KDGKBLED` byte
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct LedSet: u8 {
        const SCROLL = 1 << 0;
        const NUM = 1 << 1;
        const CAPS = 1 << 2;
    }
}

/// Initial flag values supplied by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitialFlags {
    /// Shift state at startup
    pub shift_state: ModifierSet,
    /// Persistent lock state at startup
    pub lock_state: ModifierSet,
    /// LED flags at startup
    pub leds: LedSet,
}

/// Live modifier state of one keyboard
#[derive(Debug, Clone, Default)]
pub struct ModifierState {
    /// Press counters, one per shift-type value
    shift_down: [u8; shift::COUNT],
    shift_state: ModifierSet,
    lock_state: ModifierSet,
    sticky_lock_state: ModifierSet,
    leds: LedSet,
}

impl ModifierState {
    /// Create state seeded from host flags
    pub fn new(initial: InitialFlags) -> Self {
        Self {
            shift_down: [0; shift::COUNT],
            shift_state: initial.shift_state,
            lock_state: initial.lock_state,
            sticky_lock_state: ModifierSet::empty(),
            leds: initial.leds,
        }
    }

    /// Page index for the next lookup
    pub fn shift_final(&self) -> u8 {
        ((self.shift_state | self.sticky_lock_state) ^ self.lock_state).bits()
    }

    /// Register a genuine press or release of a shift-type key.
    ///
    /// Returns `true` if the overall shift state changed on a release, which
    /// is the trigger that finalizes numeric code-point entry.
    pub fn press_shift(&mut self, value: u8, up: bool) -> bool {
        let old_state = self.shift_state;

        let value = if value == shift::CAPS_SHIFT {
            if !up {
                self.leds.remove(LedSet::CAPS);
            }
            shift::SHIFT
        } else {
            value
        };

        let Some(counter) = self.shift_down.get_mut(value as usize) else {
            trace!("Ignoring shift value {} with no counter", value);
            return false;
        };

        if up {
            *counter = counter.saturating_sub(1);
        } else {
            *counter = counter.saturating_add(1);
        }

        self.shift_state.set(ModifierSet::from_index(value), *counter > 0);

        up && self.shift_state != old_state
    }

    /// Flip a persistent lock bit
    pub fn toggle_lock(&mut self, value: u8) {
        self.lock_state.toggle(ModifierSet::from_index(value));
        debug!("Lock state now {:?}", self.lock_state);
    }

    /// Flip a one-shot lock bit
    pub fn toggle_sticky(&mut self, value: u8) {
        self.sticky_lock_state.toggle(ModifierSet::from_index(value));
    }

    /// Reset one-shot locks to exactly `value`
    pub fn reset_sticky_to(&mut self, value: u8) {
        self.sticky_lock_state = ModifierSet::from_index(value);
    }

    /// Drop every one-shot lock
    pub fn clear_sticky(&mut self) {
        self.sticky_lock_state = ModifierSet::empty();
    }

    /// Page formed by persistent and one-shot locks alone
    pub fn lock_page(&self) -> u8 {
        (self.lock_state ^ self.sticky_lock_state).bits()
    }

    /// Whether an LED flag is on
    pub fn led(&self, flag: LedSet) -> bool {
        self.leds.contains(flag)
    }

    /// Set an LED flag
    pub fn set_led(&mut self, flag: LedSet) {
        self.leds.insert(flag);
    }

    /// Flip an LED flag
    pub fn toggle_led(&mut self, flag: LedSet) {
        self.leds.toggle(flag);
        debug!("LEDs now {:?}", self.leds);
    }

    /// Current shift-state bitmask
    pub fn shift_state(&self) -> ModifierSet {
        self.shift_state
    }

    /// Current persistent lock bitmask
    pub fn lock_state(&self) -> ModifierSet {
        self.lock_state
    }

    /// Current one-shot lock bitmask
    pub fn sticky_lock_state(&self) -> ModifierSet {
        self.sticky_lock_state
    }

    /// Current LED bitmask
    pub fn leds(&self) -> LedSet {
        self.leds
    }

    /// How many keys currently hold shift-type `value`
    pub fn press_count(&self, value: u8) -> u8 {
        self.shift_down.get(value as usize).copied().unwrap_or(0)
    }
}
