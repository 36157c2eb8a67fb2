//! Peripheral dispatchers.
//!
//! A peripheral family (RCC, GPIO, I2C, ...) is described once by implementing [`Peripheral`]
//! for its instance type. [`Block`] then binds one instance to its register block and offers the
//! same access primitives for every family:
//!
//! - [`Block::read`] / [`Block::write`]: width taken from the family's field table,
//! - [`Block::read_field`] / [`Block::write_field`]: explicit width,
//! - [`Block::get`] / [`Block::set`]: a [`Field`] constant from the family module.
//!
//! Every call is checked against the register layout of that specific instance before the
//! engine touches the hardware.

use crate::error::{Error, Result};
use crate::field::{Field, WriteMode};
use crate::reg::{DynReg, Indexed, RegMapPtr, RegisterIndex};
use crate::valid::ValidBits;

/// A peripheral family, implemented by its instance type.
pub trait Peripheral: Copy + Eq + core::fmt::Debug + 'static {
    /// The logical register enum of the family.
    type Register: RegisterIndex;
    /// The derived pointer to the family's register block.
    type Ptr<'a>: Indexed<'a, Index = Self::Register>;

    /// Base address of this instance's register block.
    fn base_address(self) -> usize;

    /// The bits of `reg` usable on this instance, `None` if the instance lacks the register.
    fn valid_bits(self, reg: Self::Register) -> Option<ValidBits> {
        Some(reg.valid_bits())
    }

    /// Width of the field starting at `position`, `None` if that cannot be told from the
    /// position alone.
    fn field_width(self, reg: Self::Register, position: u8) -> Option<u8>;

    /// How a checked write of `value` into `field` must reach the register.
    fn write_mode(self, reg: Self::Register, field: Field, value: u32) -> Result<WriteMode> {
        let _ = (reg, field, value);
        Ok(WriteMode::Modify)
    }
}

/// Looks up the width of the field starting at `position` in a table of multi-bit fields.
///
/// Positions not covered by the table are single-bit flags. A position inside a multi-bit
/// field, but not at its start, is ambiguous.
pub(crate) fn width_in(table: &[Field], position: u8) -> Option<u8> {
    for field in table {
        if field.position() == position {
            return Some(field.width());
        }
        if field.contains(position) {
            return None;
        }
    }
    Some(1)
}

/// One peripheral instance bound to its register block.
///
/// ```
/// use f411_regs::i2c::{I2cBlock, I2cBus, I2cReg, I2cRegisters, I2cRegistersPtr};
/// use f411_regs::Error;
///
/// let mut regs = I2cRegisters::default();
/// let i2c = I2cBlock::new(I2cBus::I2c1, I2cRegistersPtr::from_mut(&mut regs));
///
/// // CR2.FREQ is a 6-bit field starting at bit 0
/// i2c.write(I2cReg::Cr2, 0, 42).unwrap();
/// assert_eq!(i2c.read(I2cReg::Cr2, 0), Ok(42));
///
/// // bit 14 of CR1 is reserved
/// assert!(matches!(i2c.write(I2cReg::Cr1, 14, 1), Err(Error::ReservedBits { .. })));
/// assert_eq!(regs.cr2, 42);
/// ```
///
/// Registers are only reached through the layout of the bound instance. The typed pointer,
/// whose accessors carry the layout shared by every instance of the family, stays inside:
/// ```compile_fail,E0599
/// # use f411_regs::timer::{TimRegisters, TimRegistersPtr, Timer, TimerBlock};
/// # let mut regs = TimRegisters::default();
/// let tim9 = TimerBlock::new(Timer::Tim9, TimRegistersPtr::from_mut(&mut regs));
/// tim9.regs().bdtr().write_field(0, 8, 5); // error[E0599]: no method named `regs`
/// ```
pub struct Block<'a, P: Peripheral> {
    instance: P,
    regs: P::Ptr<'a>,
}

impl<'a, P: Peripheral> Block<'a, P> {
    /// Binds `instance` to a register block, typically an in-memory one from `from_mut`.
    pub fn new(instance: P, regs: P::Ptr<'a>) -> Self {
        Self { instance, regs }
    }

    /// Binds `instance` to its hardware registers.
    ///
    /// # Safety
    /// The code must run on an STM32F411, and nothing else may access the block while the
    /// returned value is alive.
    pub unsafe fn take(instance: P) -> Self {
        let ptr = instance.base_address() as *mut <P::Ptr<'a> as RegMapPtr<'a>>::RegMap;
        // SAFETY: the base address comes from the reference manual, the caller promises the
        // target and exclusive use
        let regs = unsafe { <P::Ptr<'a> as RegMapPtr<'a>>::from_ptr(ptr) };
        Self::new(instance, regs)
    }

    /// The bound instance.
    #[inline]
    pub fn instance(&self) -> P {
        self.instance
    }

    /// The register, with this instance's valid bits.
    pub fn resolve(&self, reg: P::Register) -> Result<DynReg<'a>> {
        let valid = self
            .instance
            .valid_bits(reg)
            .ok_or(Error::Unimplemented {
                register: reg.name(),
            })?;
        Ok(self.regs.reg(reg).with_valid_bits(valid))
    }

    /// The field starting at `position`, with the width from the family's field table.
    pub fn field_at(&self, reg: P::Register, position: u8) -> Result<Field> {
        if position > 31 {
            return Err(Error::InvalidSpan { position, width: 1 });
        }
        let width = self
            .instance
            .field_width(reg, position)
            .ok_or(Error::AmbiguousWidth { position })?;
        Field::new(position, width)
    }

    /// Reads the field starting at `position`.
    pub fn read(&self, reg: P::Register, position: u8) -> Result<u32> {
        self.get(reg, self.field_at(reg, position)?)
    }

    /// Writes the field starting at `position`.
    pub fn write(&self, reg: P::Register, position: u8, value: u32) -> Result<()> {
        self.set(reg, self.field_at(reg, position)?, value)
    }

    /// Reads `width` bits starting at `position`.
    pub fn read_field(&self, reg: P::Register, position: u8, width: u8) -> Result<u32> {
        self.get(reg, Field::new(position, width)?)
    }

    /// Writes `width` bits starting at `position`.
    pub fn write_field(&self, reg: P::Register, position: u8, width: u8, value: u32) -> Result<()> {
        self.set(reg, Field::new(position, width)?, value)
    }

    /// Reads a field.
    pub fn get(&self, reg: P::Register, field: Field) -> Result<u32> {
        self.resolve(reg)?.get(field)
    }

    /// Writes a field.
    pub fn set(&self, reg: P::Register, field: Field, value: u32) -> Result<()> {
        let target = self.resolve(reg)?;
        let mode = match self.instance.write_mode(reg, field, value)? {
            WriteMode::Modify if !target.is_readable() => WriteMode::Direct,
            mode => mode,
        };
        target.set_with(field, value, mode)
    }

    /// Reads a single-bit flag.
    pub fn is_set(&self, reg: P::Register, field: Field) -> Result<bool> {
        Ok(self.get(reg, field)? != 0)
    }
}
