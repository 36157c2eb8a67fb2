//! General-purpose I/O ports.

use static_assertions::const_assert_eq;

use crate::dispatch::{Block, Peripheral};
use crate::error::Error;
use crate::map::{GPIOA_BASE, GPIOB_BASE, GPIOC_BASE, GPIOD_BASE, GPIOE_BASE, GPIOH_BASE};
use crate::rcc::Gate;
use crate::valid::ValidBits;
use crate::RegMap;

/// One bit per pin.
const PINS: ValidBits = ValidBits::only(&[0..=15]);

/// The register block of one GPIO port.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = GpioReg)]
pub struct GpioRegisters {
    /// Port mode register, 2 bits per pin.
    pub moder: u32,
    /// Output type register.
    #[reg(valid = PINS)]
    pub otyper: u32,
    /// Output speed register, 2 bits per pin.
    pub ospeedr: u32,
    /// Pull-up/pull-down register, 2 bits per pin.
    pub pupdr: u32,
    /// Input data register.
    #[reg(RO, valid = PINS)]
    pub idr: u32,
    /// Output data register.
    #[reg(valid = PINS)]
    pub odr: u32,
    /// Bit set/reset register: set in bits 0..=15, reset in bits 16..=31.
    #[reg(WO)]
    pub bsrr: u32,
    /// Configuration lock register.
    #[reg(valid = ValidBits::only(&[0..=16]))]
    pub lckr: u32,
    /// Alternate function low register, 4 bits per pin 0..=7.
    pub afrl: u32,
    /// Alternate function high register, 4 bits per pin 8..=15.
    pub afrh: u32,
}

const_assert_eq!(GpioReg::Afrh.offset(), 0x24);

/// The GPIO ports of the F411 (F, G and I are not bonded out).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioPort {
    A,
    B,
    C,
    D,
    E,
    H,
}

impl GpioPort {
    /// The port's clock gate.
    pub const fn gate(self) -> Gate {
        match self {
            Self::A => Gate::GpioA,
            Self::B => Gate::GpioB,
            Self::C => Gate::GpioC,
            Self::D => Gate::GpioD,
            Self::E => Gate::GpioE,
            Self::H => Gate::GpioH,
        }
    }
}

impl TryFrom<u8> for GpioPort {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self, Error> {
        Ok(match index {
            0 => Self::A,
            1 => Self::B,
            2 => Self::C,
            3 => Self::D,
            4 => Self::E,
            7 => Self::H,
            _ => return Err(Error::UnknownInstance(index)),
        })
    }
}

impl Peripheral for GpioPort {
    type Register = GpioReg;
    type Ptr<'a> = GpioRegistersPtr<'a>;

    fn base_address(self) -> usize {
        match self {
            Self::A => GPIOA_BASE,
            Self::B => GPIOB_BASE,
            Self::C => GPIOC_BASE,
            Self::D => GPIOD_BASE,
            Self::E => GPIOE_BASE,
            Self::H => GPIOH_BASE,
        }
    }

    fn field_width(self, reg: GpioReg, position: u8) -> Option<u8> {
        match reg {
            GpioReg::Moder | GpioReg::Ospeedr | GpioReg::Pupdr => {
                (position % 2 == 0).then_some(2)
            }
            GpioReg::Afrl | GpioReg::Afrh => (position % 4 == 0).then_some(4),
            _ => Some(1),
        }
    }
}

/// A GPIO port bound to its registers.
pub type GpioBlock<'a> = Block<'a, GpioPort>;
