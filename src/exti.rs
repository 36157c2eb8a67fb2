//! External interrupt/event controller (EXTI).

use static_assertions::const_assert_eq;

use crate::dispatch::{Block, Peripheral};
use crate::error::Result;
use crate::field::{Field, WriteMode};
use crate::map::EXTI_BASE;
use crate::nvic::Interrupt;
use crate::valid::ValidBits;
use crate::RegMap;

/// Lines 0..=18, 21 and 22 exist on the F411; 19 and 20 are reserved.
pub const LINES: ValidBits = ValidBits::only(&[0..=18, 21..=22]);

/// The EXTI register block.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = ExtiReg)]
pub struct ExtiRegisters {
    /// Interrupt mask register.
    #[reg(valid = LINES)]
    pub imr: u32,
    /// Event mask register.
    #[reg(valid = LINES)]
    pub emr: u32,
    /// Rising trigger selection register.
    #[reg(valid = LINES)]
    pub rtsr: u32,
    /// Falling trigger selection register.
    #[reg(valid = LINES)]
    pub ftsr: u32,
    /// Software interrupt event register.
    #[reg(valid = LINES)]
    pub swier: u32,
    /// Pending register. Bits are cleared by writing 1.
    #[reg(valid = LINES)]
    pub pr: u32,
}

const_assert_eq!(ExtiReg::Pr.offset(), 0x14);

/// Edges that trigger a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    Rising,
    Falling,
    Both,
}

/// The EXTI controller. There is a single instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Exti;

impl Peripheral for Exti {
    type Register = ExtiReg;
    type Ptr<'a> = ExtiRegistersPtr<'a>;

    fn base_address(self) -> usize {
        EXTI_BASE
    }

    fn field_width(self, _reg: ExtiReg, _position: u8) -> Option<u8> {
        Some(1)
    }

    fn write_mode(self, reg: ExtiReg, _field: Field, value: u32) -> Result<WriteMode> {
        Ok(match reg {
            // write-1-to-clear: a read-modify-write would acknowledge every pending line
            ExtiReg::Pr if value == 0 => WriteMode::Skip,
            ExtiReg::Pr => WriteMode::Direct,
            _ => WriteMode::Modify,
        })
    }
}

/// The EXTI controller bound to its registers.
pub type ExtiBlock<'a> = Block<'a, Exti>;

/// The NVIC interrupt that `line` raises.
pub const fn line_interrupt(line: u8) -> Option<Interrupt> {
    Some(match line {
        0 => Interrupt::Exti0,
        1 => Interrupt::Exti1,
        2 => Interrupt::Exti2,
        3 => Interrupt::Exti3,
        4 => Interrupt::Exti4,
        5..=9 => Interrupt::Exti9_5,
        10..=15 => Interrupt::Exti15_10,
        16 => Interrupt::Pvd,
        17 => Interrupt::RtcAlarm,
        18 => Interrupt::OtgFsWkup,
        21 => Interrupt::TampStamp,
        22 => Interrupt::RtcWkup,
        _ => return None,
    })
}

impl ExtiBlock<'_> {
    /// Selects the trigger edges of `line` and unmasks its interrupt.
    ///
    /// Lines 0..=15 also need the port selected in `SYSCFG_EXTICR`, and the interrupt enabled
    /// in the NVIC.
    pub fn configure_line(&self, line: u8, trigger: Trigger) -> Result<()> {
        let field = Field::bit(line)?;
        let (rising, falling) = match trigger {
            Trigger::Rising => (1, 0),
            Trigger::Falling => (0, 1),
            Trigger::Both => (1, 1),
        };
        self.set(ExtiReg::Rtsr, field, rising)?;
        self.set(ExtiReg::Ftsr, field, falling)?;
        self.set(ExtiReg::Imr, field, 1)
    }

    /// Masks the interrupt of `line`.
    pub fn mask_line(&self, line: u8) -> Result<()> {
        self.set(ExtiReg::Imr, Field::bit(line)?, 0)
    }

    /// Whether `line` has a pending request.
    pub fn is_pending(&self, line: u8) -> Result<bool> {
        self.is_set(ExtiReg::Pr, Field::bit(line)?)
    }

    /// Acknowledges a pending request on `line`, leaving the other lines pending.
    pub fn clear_pending(&self, line: u8) -> Result<()> {
        self.set(ExtiReg::Pr, Field::bit(line)?, 1)
    }

    /// Raises `line` from software.
    pub fn trigger(&self, line: u8) -> Result<()> {
        self.set(ExtiReg::Swier, Field::bit(line)?, 1)
    }
}
