//! Inter-integrated circuit (I2C) interfaces.
//!
//! Only bus timing is handled here. Start/stop generation and the transfer state machine
//! belong to the driver built on top.

use static_assertions::{const_assert, const_assert_eq};

use crate::dispatch::{Block, Peripheral, width_in};
use crate::error::{Error, Result};
use crate::field::{Field, WriteMode};
use crate::map::{I2C1_BASE, I2C2_BASE, I2C3_BASE};
use crate::rcc::{Gate, RccBlock};
use crate::valid::ValidBits;
use crate::RegMap;

/// The register block of one I2C interface. The upper halfwords are reserved everywhere.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = I2cReg)]
pub struct I2cRegisters {
    /// Control register 1.
    #[reg(valid = ValidBits::from_bits(0xBFFB))]
    pub cr1: u32,
    /// Control register 2.
    #[reg(valid = ValidBits::from_bits(0x1F3F))]
    pub cr2: u32,
    /// Own address register 1.
    #[reg(valid = ValidBits::from_bits(0x83FF))]
    pub oar1: u32,
    /// Own address register 2.
    #[reg(valid = ValidBits::from_bits(0x00FF))]
    pub oar2: u32,
    /// Data register.
    #[reg(valid = ValidBits::from_bits(0x00FF))]
    pub dr: u32,
    /// Status register 1. Error flags are cleared by writing 0.
    #[reg(valid = ValidBits::from_bits(0xDFDF))]
    pub sr1: u32,
    /// Status register 2.
    #[reg(RO, valid = ValidBits::from_bits(0xFFF7))]
    pub sr2: u32,
    /// Clock control register.
    #[reg(valid = ValidBits::from_bits(0xCFFF))]
    pub ccr: u32,
    /// Rise time register.
    #[reg(valid = ValidBits::from_bits(0x003F))]
    pub trise: u32,
    /// Noise filter register.
    #[reg(valid = ValidBits::from_bits(0x001F))]
    pub fltr: u32,
}

const_assert_eq!(I2cReg::Fltr.offset(), 0x24);
const_assert!(I2cReg::Ccr.valid_bits().contains(ccr::CCR));
const_assert!(I2cReg::Cr2.valid_bits().contains(cr2::FREQ));

/// Fields of `I2C_CR1`.
pub mod cr1 {
    use crate::field::Field;

    pub const PE: Field = Field::at(0, 1);
    pub const SMBUS: Field = Field::at(1, 1);
    pub const ENGC: Field = Field::at(6, 1);
    pub const NOSTRETCH: Field = Field::at(7, 1);
    pub const START: Field = Field::at(8, 1);
    pub const STOP: Field = Field::at(9, 1);
    pub const ACK: Field = Field::at(10, 1);
    pub const POS: Field = Field::at(11, 1);
    pub const SWRST: Field = Field::at(15, 1);
}

/// Fields of `I2C_CR2`.
pub mod cr2 {
    use crate::field::Field;

    pub const FREQ: Field = Field::at(0, 6);
    pub const ITERREN: Field = Field::at(8, 1);
    pub const ITEVTEN: Field = Field::at(9, 1);
    pub const ITBUFEN: Field = Field::at(10, 1);
    pub const DMAEN: Field = Field::at(11, 1);
    pub const LAST: Field = Field::at(12, 1);
}

/// Fields of `I2C_OAR1` and `I2C_OAR2`.
pub mod oar {
    use crate::field::Field;

    pub const ADD0: Field = Field::at(0, 1);
    pub const ADD7: Field = Field::at(1, 7);
    pub const ADD10_HIGH: Field = Field::at(8, 2);
    pub const ADDMODE: Field = Field::at(15, 1);
    pub const ENDUAL: Field = Field::at(0, 1);
}

/// Fields of `I2C_SR1` and `I2C_SR2`.
pub mod sr {
    use crate::field::Field;

    pub const SB: Field = Field::at(0, 1);
    pub const ADDR: Field = Field::at(1, 1);
    pub const BTF: Field = Field::at(2, 1);
    pub const RXNE: Field = Field::at(6, 1);
    pub const TXE: Field = Field::at(7, 1);
    pub const BERR: Field = Field::at(8, 1);
    pub const ARLO: Field = Field::at(9, 1);
    pub const AF: Field = Field::at(10, 1);
    pub const OVR: Field = Field::at(11, 1);
    pub const MSL: Field = Field::at(0, 1);
    pub const BUSY: Field = Field::at(1, 1);
    pub const PEC: Field = Field::at(8, 8);
}

/// Fields of `I2C_CCR`.
pub mod ccr {
    use crate::field::Field;

    pub const CCR: Field = Field::at(0, 12);
    pub const DUTY: Field = Field::at(14, 1);
    pub const FS: Field = Field::at(15, 1);
}

/// Field of `I2C_TRISE`.
pub const TRISE: Field = Field::at(0, 6);

/// Fields of `I2C_FLTR`.
pub mod fltr {
    use crate::field::Field;

    pub const DNF: Field = Field::at(0, 4);
    pub const ANOFF: Field = Field::at(4, 1);
}

/// The I2C interfaces of the F411.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cBus {
    I2c1,
    I2c2,
    I2c3,
}

impl I2cBus {
    /// The interface's clock gate.
    pub const fn gate(self) -> Gate {
        match self {
            Self::I2c1 => Gate::I2c1,
            Self::I2c2 => Gate::I2c2,
            Self::I2c3 => Gate::I2c3,
        }
    }
}

impl TryFrom<u8> for I2cBus {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        Ok(match index {
            1 => Self::I2c1,
            2 => Self::I2c2,
            3 => Self::I2c3,
            _ => return Err(Error::UnknownInstance(index)),
        })
    }
}

impl Peripheral for I2cBus {
    type Register = I2cReg;
    type Ptr<'a> = I2cRegistersPtr<'a>;

    fn base_address(self) -> usize {
        match self {
            Self::I2c1 => I2C1_BASE,
            Self::I2c2 => I2C2_BASE,
            Self::I2c3 => I2C3_BASE,
        }
    }

    fn field_width(self, reg: I2cReg, position: u8) -> Option<u8> {
        match reg {
            I2cReg::Cr2 => width_in(&[cr2::FREQ], position),
            I2cReg::Oar1 => width_in(&[oar::ADD7, oar::ADD10_HIGH], position),
            I2cReg::Oar2 => width_in(&[Field::at(1, 7)], position),
            I2cReg::Dr => width_in(&[Field::at(0, 8)], position),
            I2cReg::Sr2 => width_in(&[sr::PEC], position),
            I2cReg::Ccr => width_in(&[ccr::CCR], position),
            I2cReg::Trise => width_in(&[TRISE], position),
            I2cReg::Fltr => width_in(&[fltr::DNF], position),
            _ => Some(1),
        }
    }

    fn write_mode(self, reg: I2cReg, _field: Field, value: u32) -> Result<WriteMode> {
        match reg {
            // hardware sets SR1 flags, software may only clear them
            I2cReg::Sr1 if value != 0 => Err(Error::AccessDenied),
            I2cReg::Sr1 => Ok(WriteMode::ClearByZero),
            // reading DR consumes a received byte
            I2cReg::Dr => Ok(WriteMode::Direct),
            _ => Ok(WriteMode::Modify),
        }
    }
}

/// An I2C interface bound to its registers.
pub type I2cBlock<'a> = Block<'a, I2cBus>;

/// Highest SCL frequency in standard mode.
pub const STANDARD_MAX_HZ: u32 = 100_000;
/// Highest SCL frequency in fast mode.
pub const FAST_MAX_HZ: u32 = 400_000;
/// APB1 frequency range accepted by `CR2.FREQ`, in MHz.
pub const PCLK_MHZ: core::ops::RangeInclusive<u32> = 2..=50;

/// Bus speed and SCL duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cMode {
    /// Standard mode, up to 100 kHz, 1:1 duty cycle.
    Standard,
    /// Fast mode, up to 400 kHz, t_low/t_high = 2.
    FastDuty2,
    /// Fast mode, up to 400 kHz, t_low/t_high = 16/9.
    FastDuty16_9,
}

impl I2cMode {
    const fn is_fast(self) -> bool {
        !matches!(self, Self::Standard)
    }
}

/// Bus timing ready to be programmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cTiming {
    /// `CR2.FREQ`, the peripheral clock in MHz.
    pub freq_mhz: u32,
    /// `CCR.CCR`.
    pub ccr: u32,
    /// `TRISE.TRISE`.
    pub trise: u32,
}

/// The `CCR` value giving `scl_hz` in `mode` from a `pclk_hz` peripheral clock.
///
/// ```
/// use f411_regs::i2c::{ccr_value, I2cMode};
///
/// assert_eq!(ccr_value(I2cMode::Standard, 100_000, 16_000_000), Ok(80));
/// assert_eq!(ccr_value(I2cMode::FastDuty2, 400_000, 48_000_000), Ok(40));
/// assert!(ccr_value(I2cMode::Standard, 400_000, 16_000_000).is_err());
/// ```
pub fn ccr_value(mode: I2cMode, scl_hz: u32, pclk_hz: u32) -> Result<u32> {
    let max_hz = if mode.is_fast() { FAST_MAX_HZ } else { STANDARD_MAX_HZ };
    if scl_hz == 0 || scl_hz > max_hz {
        return Err(Error::InvalidConfig("I2C SCL frequency out of range for the mode"));
    }
    if !PCLK_MHZ.contains(&(pclk_hz / 1_000_000)) {
        return Err(Error::InvalidConfig("I2C peripheral clock outside 2..=50 MHz"));
    }
    let (divisor, min) = match mode {
        I2cMode::Standard => (2, 4),
        I2cMode::FastDuty2 => (3, 1),
        I2cMode::FastDuty16_9 => (25, 1),
    };
    let ccr = (pclk_hz / (divisor * scl_hz)).max(min);
    if ccr > ccr::CCR.max_value() {
        return Err(Error::InvalidConfig("I2C CCR does not fit in 12 bits"));
    }
    Ok(ccr)
}

/// Complete bus timing for `mode` at `scl_hz`, with `TRISE` for the mode's maximum rise time
/// (1000 ns standard, 300 ns fast).
pub fn timing(mode: I2cMode, scl_hz: u32, pclk_hz: u32) -> Result<I2cTiming> {
    let ccr = ccr_value(mode, scl_hz, pclk_hz)?;
    let freq_mhz = pclk_hz / 1_000_000;
    let trise = if mode.is_fast() {
        freq_mhz * 300 / 1000 + 1
    } else {
        freq_mhz + 1
    };
    Ok(I2cTiming {
        freq_mhz,
        ccr,
        trise,
    })
}

impl I2cBlock<'_> {
    /// Turns the interface clock on and programs the bus timing. The interface is left
    /// enabled.
    ///
    /// `PE` is cleared while the timing registers change, as they may only be written with the
    /// interface disabled.
    pub fn configure(
        &self,
        rcc: &RccBlock<'_>,
        mode: I2cMode,
        scl_hz: u32,
        pclk_hz: u32,
    ) -> Result<()> {
        let timing = timing(mode, scl_hz, pclk_hz)?;
        rcc.enable(self.instance().gate())?;
        self.set(I2cReg::Cr1, cr1::PE, 0)?;
        self.set(I2cReg::Cr2, cr2::FREQ, timing.freq_mhz)?;
        self.set(I2cReg::Ccr, ccr::FS, mode.is_fast().into())?;
        self.set(I2cReg::Ccr, ccr::DUTY, (mode == I2cMode::FastDuty16_9).into())?;
        self.set(I2cReg::Ccr, ccr::CCR, timing.ccr)?;
        self.set(I2cReg::Trise, TRISE, timing.trise)?;
        self.set(I2cReg::Cr1, cr1::PE, 1)
    }

    /// Sets the 7-bit own address.
    pub fn set_own_address(&self, address: u8) -> Result<()> {
        self.set(I2cReg::Oar1, oar::ADDMODE, 0)?;
        self.set(I2cReg::Oar1, oar::ADD7, address.into())
    }

    /// Clears the acknowledge-failure flag.
    pub fn clear_ack_failure(&self) -> Result<()> {
        self.set(I2cReg::Sr1, sr::AF, 0)
    }
}
