// Latinkeys Keysym Type
// Logical key values as reported by the windowing system (X11/GDK keysyms)

use std::fmt;
use std::ops::RangeInclusive;

/// First Latin letter keysym (`a`)
pub const LATIN_SMALL_A: u32 = 0x61;
/// Last Latin letter keysym (`z`)
pub const LATIN_SMALL_Z: u32 = 0x7a;

const LATIN_LOWER: RangeInclusive<u32> = LATIN_SMALL_A..=LATIN_SMALL_Z;

/// Keysyms in this range encode a Unicode code point directly
const UNICODE_OFFSET: u32 = 0x0100_0000;

/// Represents a logical key value (the symbol a key press produces).
///
/// This is a newtype wrapper around u32 for type safety. Values follow the
/// X11 keysym encoding used by GDK, so printable ASCII keysyms are equal to
/// their ASCII code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Keysym(pub u32);

impl Keysym {
    /// Get the raw keysym value
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Check whether this keysym is an ASCII digit or Latin letter.
    ///
    /// This is the whole classification used by direct classification:
    /// `0`-`9`, `A`-`Z` and `a`-`z`.
    pub const fn is_latin(self) -> bool {
        matches!(self.0, 0x30..=0x39 | 0x41..=0x5a | LATIN_SMALL_A..=LATIN_SMALL_Z)
    }

    /// Iterate over the lowercase Latin letter keysyms `a` to `z`
    pub fn latin_letters() -> impl Iterator<Item = Keysym> {
        LATIN_LOWER.map(Keysym)
    }

    /// Character this keysym produces, when it has a direct mapping
    pub fn to_char(self) -> Option<char> {
        match self.0 {
            v @ (0x20..=0x7e | 0xa0..=0xff) => char::from_u32(v),
            v if v > UNICODE_OFFSET => char::from_u32(v - UNICODE_OFFSET),
            _ => None,
        }
    }

    /// Keysym for a character, using the Unicode keysym range for anything
    /// outside Latin-1
    pub fn from_char(c: char) -> Self {
        let code = c as u32;
        match code {
            0x20..=0x7e | 0xa0..=0xff => Keysym(code),
            _ => Keysym(UNICODE_OFFSET + code),
        }
    }
}

impl From<u32> for Keysym {
    fn from(raw: u32) -> Self {
        Keysym(raw)
    }
}

impl From<Keysym> for u32 {
    fn from(keysym: Keysym) -> Self {
        keysym.0
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_char() {
            Some(c) if !c.is_control() => write!(f, "{:#06x} '{}'", self.0, c),
            _ => write!(f, "{:#06x}", self.0),
        }
    }
}
