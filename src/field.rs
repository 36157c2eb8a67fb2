//! The bit-field access engine.
//!
//! All register accesses of this crate go through `read_span` and `write_span`: validate
//! the span against the register's [`ValidBits`], then do a single volatile read-modify-write
//! that leaves every bit outside the field untouched. Registers where a read or a write has a
//! side effect take one of the other [`WriteMode`]s instead.
//!
//! # Interrupts
//! The read-modify-write is not atomic. An interrupt handler that writes the same register
//! between the read and the write loses its update. Callers sharing a register with an
//! interrupt handler must serialize the accesses themselves.

use core::ptr::NonNull;

use crate::error::{Error, Result};
use crate::reg::{load, store};
use crate::valid::ValidBits;

/// Sentinel for callers that want a plain `u32` out of a failed read.
///
/// No field narrower than 32 bits can hold it, so it never looks like real data.
pub const ERROR_FLAG: u32 = 0xFFFF_FFFF;

/// Collapses a read result into a value, using [`ERROR_FLAG`] for errors.
///
/// ```
/// use f411_regs::field::{or_error_flag, ERROR_FLAG};
/// use f411_regs::Error;
///
/// assert_eq!(or_error_flag(Ok(3)), 3);
/// assert_eq!(or_error_flag(Err(Error::AccessDenied)), ERROR_FLAG);
/// ```
#[inline]
pub fn or_error_flag(result: Result<u32>) -> u32 {
    result.unwrap_or(ERROR_FLAG)
}

/// A span of bits inside a 32-bit register.
///
/// Always satisfies `width >= 1` and `position + width <= 32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    position: u8,
    width: u8,
}

impl Field {
    /// Checks and builds a span.
    pub const fn new(position: u8, width: u8) -> Result<Self> {
        if position > 31 || width == 0 || width > 32 || position as u32 + width as u32 > 32 {
            Err(Error::InvalidSpan { position, width })
        } else {
            Ok(Self { position, width })
        }
    }

    /// A single bit.
    pub const fn bit(position: u8) -> Result<Self> {
        Self::new(position, 1)
    }

    /// Builds a span for a `const` field table.
    ///
    /// # Panics
    /// If the span is invalid, which in a `const` item is a compile-time error.
    pub const fn at(position: u8, width: u8) -> Self {
        match Self::new(position, width) {
            Ok(field) => field,
            Err(_) => panic!("field does not fit in a 32-bit register"),
        }
    }

    /// First bit of the span.
    #[inline]
    pub const fn position(self) -> u8 {
        self.position
    }

    /// Number of bits in the span.
    #[inline]
    pub const fn width(self) -> u8 {
        self.width
    }

    /// Largest value the field can hold.
    #[inline]
    pub const fn max_value(self) -> u32 {
        if self.width == 32 {
            u32::MAX
        } else {
            (1 << self.width) - 1
        }
    }

    /// The span as a register mask.
    #[inline]
    pub const fn mask(self) -> u32 {
        self.max_value() << self.position
    }

    /// Whether `value` fits in the field.
    #[inline]
    pub const fn fits(self, value: u32) -> bool {
        value <= self.max_value()
    }

    /// Whether `position` falls inside the span.
    #[inline]
    pub const fn contains(self, position: u8) -> bool {
        position >= self.position && position < self.position + self.width
    }

    /// The field's value inside `word`.
    #[inline]
    pub const fn extract(self, word: u32) -> u32 {
        (word >> self.position) & self.max_value()
    }

    /// `word` with the field replaced by `value`. Bits of `value` past the width are dropped.
    #[inline]
    pub const fn insert(self, word: u32, value: u32) -> u32 {
        (word & !self.mask()) | ((value << self.position) & self.mask())
    }
}

/// How a validated write reaches the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteMode {
    /// Read, replace the field, write back.
    Modify,
    /// Write the field alone, zeros elsewhere. For write-only registers and registers where
    /// writing 1 has a side effect (write-1-to-clear flags).
    Direct,
    /// Validate, then leave the register alone (e.g. writing 0 to a write-1-to-clear flag).
    Skip,
    /// Write the field with every other valid bit set, no read. For flags cleared by writing 0,
    /// where writing 1 has no effect.
    ClearByZero,
}

fn check_span(valid: ValidBits, field: Field) -> Result<()> {
    if valid.contains(field) {
        Ok(())
    } else {
        Err(Error::ReservedBits {
            mask: field.mask() & valid.reserved(),
        })
    }
}

/// Validated volatile read of a field.
///
/// # Safety
/// `ptr` must be valid for volatile reads.
pub(crate) unsafe fn read_span(ptr: NonNull<u32>, valid: ValidBits, field: Field) -> Result<u32> {
    check_span(valid, field)?;
    // SAFETY: the caller promises `ptr` is readable
    Ok(field.extract(unsafe { load(ptr) }))
}

/// Validated volatile write of a field. Nothing is written unless every check passes.
///
/// # Safety
/// `ptr` must be valid for volatile writes, and for reads when `mode` is [`WriteMode::Modify`].
pub(crate) unsafe fn write_span(
    ptr: NonNull<u32>,
    valid: ValidBits,
    field: Field,
    value: u32,
    mode: WriteMode,
) -> Result<()> {
    if !field.fits(value) {
        return Err(Error::ValueTooWide {
            value,
            width: field.width(),
        });
    }
    check_span(valid, field)?;
    // SAFETY: the caller promises `ptr` is valid for the accesses `mode` performs
    unsafe {
        match mode {
            WriteMode::Modify => store(ptr, field.insert(load(ptr), value)),
            WriteMode::Direct => store(ptr, field.insert(0, value)),
            WriteMode::Skip => {}
            WriteMode::ClearByZero => store(ptr, field.insert(valid.bits(), value)),
        }
    }
    Ok(())
}
