use core::fmt;
use core::ops::RangeInclusive;

use crate::field::Field;

/// The bits of a register that software may touch.
///
/// A set bit is defined by the reference manual for general read-modify-write access; a clear
/// bit is reserved or hardware-fixed. Tables are written from the field list of the manual:
///
/// ```
/// use f411_regs::ValidBits;
///
/// // RCC_CR: bit 2, bits 20..=23 and 28..=31 are reserved
/// const CR: ValidBits = ValidBits::except(&[2..=2, 20..=23, 28..=31]);
/// assert!(CR.is_valid(24));
/// assert!(!CR.is_valid(2));
/// assert_eq!(CR.bits(), !((1 << 2) | 0x00F0_0000 | 0xF000_0000));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidBits(u32);

impl ValidBits {
    /// Every bit is usable.
    pub const ALL: Self = Self(u32::MAX);
    /// Nothing is usable.
    pub const NONE: Self = Self(0);

    /// Wraps a raw mask.
    #[inline]
    pub const fn from_bits(mask: u32) -> Self {
        Self(mask)
    }

    /// Only the bits in `ranges` are usable.
    ///
    /// # Panics
    /// If a range is empty or reaches past bit 31. Meant for `const` tables, where this is a
    /// compile-time error.
    pub const fn only(ranges: &[RangeInclusive<u8>]) -> Self {
        let mut mask = 0;
        let mut i = 0;
        while i < ranges.len() {
            let start = *ranges[i].start();
            let end = *ranges[i].end();
            assert!(start <= end && end < 32, "bit range out of the 32-bit register");
            let width = end - start + 1;
            mask |= if width == 32 {
                u32::MAX
            } else {
                ((1u32 << width) - 1) << start
            };
            i += 1;
        }
        Self(mask)
    }

    /// Every bit is usable, except those in `ranges`.
    ///
    /// # Panics
    /// Same as [`ValidBits::only`].
    pub const fn except(ranges: &[RangeInclusive<u8>]) -> Self {
        Self(!Self::only(ranges).0)
    }

    /// The raw mask.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// The reserved bits.
    #[inline]
    pub const fn reserved(self) -> u32 {
        !self.0
    }

    /// Whether `position` names a usable bit. Positions past 31 never do.
    #[inline]
    pub const fn is_valid(self, position: u8) -> bool {
        position < 32 && (self.0 >> position) & 1 == 1
    }

    /// Whether every bit set in `mask` is usable.
    #[inline]
    pub const fn covers(self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    /// Whether the whole span of `field` is usable.
    #[inline]
    pub const fn contains(self, field: Field) -> bool {
        self.covers(field.mask())
    }
}

impl fmt::Debug for ValidBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidBits({:#010x})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ValidBits {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ValidBits({=u32:#x})", self.0)
    }
}
