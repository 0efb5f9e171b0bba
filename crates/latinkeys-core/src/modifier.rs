// Latinkeys Modifier State
// Modifier bitset carried by every key event (mirrors GdkModifierType)

use std::fmt;

bitflags::bitflags! {
    /// Modifier and pointer-button state at the time of a key event.
    ///
    /// Bit positions match `GdkModifierType`, so raw state words from GDK
    /// convert with [`ModifierState::from_bits_retain`] without loss.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierState: u32 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        /// Usually Alt
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
        const BUTTON1 = 1 << 8;
        const BUTTON2 = 1 << 9;
        const BUTTON3 = 1 << 10;
        const BUTTON4 = 1 << 11;
        const BUTTON5 = 1 << 12;
        const SUPER = 1 << 26;
        const HYPER = 1 << 27;
        const META = 1 << 28;

        const ALT = Self::MOD1.bits();
    }
}

impl ModifierState {
    /// Check whether any of the given hotkey modifiers is held
    #[inline]
    pub fn holds_any(self, hotkeys: ModifierState) -> bool {
        self.intersects(hotkeys)
    }
}

impl fmt::Display for ModifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.bits())
    }
}
