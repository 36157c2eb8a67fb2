//! Analog-to-digital converter (ADC1) and its internal temperature sensor.

use static_assertions::const_assert_eq;

use crate::dispatch::{Block, Peripheral, width_in};
use crate::error::{Error, Result};
use crate::field::{Field, WriteMode};
use crate::map::{ADC1_BASE, ADC_COMMON_BASE};
use crate::poll::wait_until;
use crate::rcc::{Gate, RccBlock};
use crate::valid::ValidBits;
use crate::RegMap;

const OFFSET: ValidBits = ValidBits::only(&[0..=11]);
const DATA: ValidBits = ValidBits::only(&[0..=15]);

/// The ADC1 register block.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = AdcReg)]
pub struct AdcRegisters {
    /// Status register. Flags are cleared by writing 0.
    #[reg(valid = ValidBits::only(&[0..=5]))]
    pub sr: u32,
    /// Control register 1.
    #[reg(valid = ValidBits::only(&[0..=15, 22..=26]))]
    pub cr1: u32,
    /// Control register 2.
    #[reg(valid = ValidBits::from_bits(0x7F7F_0F03))]
    pub cr2: u32,
    /// Sample time register 1, channels 10..=18.
    #[reg(valid = ValidBits::only(&[0..=26]))]
    pub smpr1: u32,
    /// Sample time register 2, channels 0..=9.
    #[reg(valid = ValidBits::only(&[0..=29]))]
    pub smpr2: u32,
    /// Injected channel data offset register 1.
    #[reg(valid = OFFSET)]
    pub jofr1: u32,
    /// Injected channel data offset register 2.
    #[reg(valid = OFFSET)]
    pub jofr2: u32,
    /// Injected channel data offset register 3.
    #[reg(valid = OFFSET)]
    pub jofr3: u32,
    /// Injected channel data offset register 4.
    #[reg(valid = OFFSET)]
    pub jofr4: u32,
    /// Watchdog higher threshold register.
    #[reg(valid = OFFSET)]
    pub htr: u32,
    /// Watchdog lower threshold register.
    #[reg(valid = OFFSET)]
    pub ltr: u32,
    /// Regular sequence register 1.
    #[reg(valid = ValidBits::only(&[0..=23]))]
    pub sqr1: u32,
    /// Regular sequence register 2.
    #[reg(valid = ValidBits::only(&[0..=29]))]
    pub sqr2: u32,
    /// Regular sequence register 3.
    #[reg(valid = ValidBits::only(&[0..=29]))]
    pub sqr3: u32,
    /// Injected sequence register.
    #[reg(valid = ValidBits::only(&[0..=21]))]
    pub jsqr: u32,
    /// Injected data register 1.
    #[reg(RO, valid = DATA)]
    pub jdr1: u32,
    /// Injected data register 2.
    #[reg(RO, valid = DATA)]
    pub jdr2: u32,
    /// Injected data register 3.
    #[reg(RO, valid = DATA)]
    pub jdr3: u32,
    /// Injected data register 4.
    #[reg(RO, valid = DATA)]
    pub jdr4: u32,
    /// Regular data register.
    #[reg(RO, valid = DATA)]
    pub dr: u32,
}

const_assert_eq!(AdcReg::Jsqr.offset(), 0x38);
const_assert_eq!(AdcReg::Dr.offset(), 0x4C);

/// The register block shared by all ADCs. The F411 only implements `ADC_CCR`.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = AdcCommonReg)]
pub struct AdcCommonRegisters {
    _reserved0: u32,
    /// Common control register.
    #[reg(valid = ValidBits::only(&[16..=17, 22..=23]))]
    pub ccr: u32,
}

const_assert_eq!(AdcCommonReg::Ccr.offset(), 0x04);

/// Fields of `ADC_SR`.
pub mod sr {
    use crate::field::Field;

    pub const AWD: Field = Field::at(0, 1);
    pub const EOC: Field = Field::at(1, 1);
    pub const JEOC: Field = Field::at(2, 1);
    pub const JSTRT: Field = Field::at(3, 1);
    pub const STRT: Field = Field::at(4, 1);
    pub const OVR: Field = Field::at(5, 1);
}

/// Fields of `ADC_CR1`.
pub mod cr1 {
    use crate::field::Field;

    pub const AWDCH: Field = Field::at(0, 5);
    pub const EOCIE: Field = Field::at(5, 1);
    pub const JEOCIE: Field = Field::at(7, 1);
    pub const SCAN: Field = Field::at(8, 1);
    pub const DISCNUM: Field = Field::at(13, 3);
    pub const RES: Field = Field::at(24, 2);
    pub const OVRIE: Field = Field::at(26, 1);
}

/// Fields of `ADC_CR2`.
pub mod cr2 {
    use crate::field::Field;

    pub const ADON: Field = Field::at(0, 1);
    pub const CONT: Field = Field::at(1, 1);
    pub const ALIGN: Field = Field::at(11, 1);
    pub const JEXTSEL: Field = Field::at(16, 4);
    pub const JEXTEN: Field = Field::at(20, 2);
    pub const JSWSTART: Field = Field::at(22, 1);
    pub const EXTSEL: Field = Field::at(24, 4);
    pub const EXTEN: Field = Field::at(28, 2);
    pub const SWSTART: Field = Field::at(30, 1);
}

/// Fields of `ADC_JSQR`.
pub mod jsqr {
    use crate::field::Field;

    pub const JSQ1: Field = Field::at(0, 5);
    pub const JSQ4: Field = Field::at(15, 5);
    pub const JL: Field = Field::at(20, 2);
}

/// Fields of `ADC_CCR`.
pub mod ccr {
    use crate::field::Field;

    pub const ADCPRE: Field = Field::at(16, 2);
    pub const VBATE: Field = Field::at(22, 1);
    pub const TSVREFE: Field = Field::at(23, 1);
}

/// `SQR1.L`, the regular sequence length.
pub const SQR1_LENGTH: Field = Field::at(20, 4);

/// Internal channel wired to the temperature sensor.
pub const TEMPERATURE_CHANNEL: u8 = 16;
/// `SMPRx` code for the longest sample time, 480 cycles.
pub const SAMPLE_480_CYCLES: u32 = 0b111;
/// Bound on the wait for an injected conversion.
pub const CONVERSION_TIMEOUT: u32 = 0x1_0000;

/// Sample time field of `channel`, in `SMPR1` for channels 10..=18 and `SMPR2` below.
pub fn sample_time_field(channel: u8) -> Result<(AdcReg, Field)> {
    match channel {
        0..=9 => Ok((AdcReg::Smpr2, Field::new(3 * channel, 3)?)),
        10..=18 => Ok((AdcReg::Smpr1, Field::new(3 * (channel - 10), 3)?)),
        _ => Err(Error::InvalidConfig("ADC channel above 18")),
    }
}

/// Width of a field in a register made of `width`-bit slots starting at bit 0.
fn slot(position: u8, width: u8) -> Option<u8> {
    (position % width == 0).then_some(width)
}

/// The F411 has a single converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Adc {
    Adc1,
}

impl TryFrom<u8> for Adc {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        match index {
            1 => Ok(Self::Adc1),
            _ => Err(Error::UnknownInstance(index)),
        }
    }
}

impl Peripheral for Adc {
    type Register = AdcReg;
    type Ptr<'a> = AdcRegistersPtr<'a>;

    fn base_address(self) -> usize {
        ADC1_BASE
    }

    fn field_width(self, reg: AdcReg, position: u8) -> Option<u8> {
        match reg {
            AdcReg::Cr1 => width_in(&[cr1::AWDCH, cr1::DISCNUM, cr1::RES], position),
            AdcReg::Cr2 => width_in(
                &[cr2::JEXTSEL, cr2::JEXTEN, cr2::EXTSEL, cr2::EXTEN],
                position,
            ),
            AdcReg::Smpr1 | AdcReg::Smpr2 => slot(position, 3),
            AdcReg::Sqr1 if position >= SQR1_LENGTH.position() => {
                width_in(&[SQR1_LENGTH], position)
            }
            AdcReg::Sqr1 | AdcReg::Sqr2 | AdcReg::Sqr3 => slot(position, 5),
            AdcReg::Jsqr if position >= jsqr::JL.position() => width_in(&[jsqr::JL], position),
            AdcReg::Jsqr => slot(position, 5),
            AdcReg::Jofr1
            | AdcReg::Jofr2
            | AdcReg::Jofr3
            | AdcReg::Jofr4
            | AdcReg::Htr
            | AdcReg::Ltr => width_in(&[Field::at(0, 12)], position),
            AdcReg::Jdr1 | AdcReg::Jdr2 | AdcReg::Jdr3 | AdcReg::Jdr4 | AdcReg::Dr => {
                width_in(&[Field::at(0, 16)], position)
            }
            AdcReg::Sr => Some(1),
        }
    }

    fn write_mode(self, reg: AdcReg, _field: Field, _value: u32) -> Result<WriteMode> {
        Ok(match reg {
            // flags are cleared by writing 0
            AdcReg::Sr => WriteMode::ClearByZero,
            _ => WriteMode::Modify,
        })
    }
}

/// The common ADC registers. There is a single instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcCommon;

impl Peripheral for AdcCommon {
    type Register = AdcCommonReg;
    type Ptr<'a> = AdcCommonRegistersPtr<'a>;

    fn base_address(self) -> usize {
        ADC_COMMON_BASE
    }

    fn field_width(self, _reg: AdcCommonReg, position: u8) -> Option<u8> {
        width_in(&[ccr::ADCPRE], position)
    }
}

/// ADC1 bound to its registers.
pub type AdcBlock<'a> = Block<'a, Adc>;
/// The common ADC registers bound to their block.
pub type AdcCommonBlock<'a> = Block<'a, AdcCommon>;

impl AdcBlock<'_> {
    /// Sets up a single injected conversion of the temperature sensor and powers the ADC on.
    ///
    /// The ADC clock is PCLK2 / 2, which stays under the 36 MHz limit for any valid PCLK2. The
    /// sensor needs 10 µs of sampling, so the longest sample time is used.
    pub fn init_temperature_sensor(
        &self,
        rcc: &RccBlock<'_>,
        common: &AdcCommonBlock<'_>,
    ) -> Result<()> {
        rcc.enable(Gate::Adc1)?;
        common.set(AdcCommonReg::Ccr, ccr::ADCPRE, 0)?;
        let (smpr, field) = sample_time_field(TEMPERATURE_CHANNEL)?;
        self.set(smpr, field, SAMPLE_480_CYCLES)?;
        // with JL = 0 the single injected conversion is taken from JSQ4
        self.set(AdcReg::Jsqr, jsqr::JL, 0)?;
        self.set(AdcReg::Jsqr, jsqr::JSQ4, TEMPERATURE_CHANNEL.into())?;
        common.set(AdcCommonReg::Ccr, ccr::TSVREFE, 1)?;
        self.set(AdcReg::Cr2, cr2::ADON, 1)
    }

    /// Runs one injected conversion and returns the raw 12-bit result.
    ///
    /// Gives up with [`Error::Timeout`] if the end-of-conversion flag is still clear after
    /// `limit` polls.
    pub fn read_injected(&self, limit: u32) -> Result<u16> {
        self.set(AdcReg::Cr2, cr2::JSWSTART, 1)?;
        let mut status = Ok(false);
        wait_until(limit, || {
            status = self.is_set(AdcReg::Sr, sr::JEOC);
            status != Ok(false)
        })?;
        status?;
        self.set(AdcReg::Sr, sr::JEOC, 0)?;
        // a 16-bit register always fits in u16
        Ok(self.get(AdcReg::Jdr1, Field::at(0, 16))? as u16)
    }

    /// Converts the temperature sensor once, in degrees Celsius.
    pub fn read_temperature(&self) -> Result<f32> {
        Ok(celsius(self.read_injected(CONVERSION_TIMEOUT)?))
    }
}

/// Temperature from a raw sensor reading, with a 3.0 V reference and the typical datasheet
/// calibration (0.76 V at 25 °C, 2.5 mV/°C).
///
/// ```
/// use f411_regs::adc::celsius;
///
/// // 0.76 V
/// assert!((celsius(1037) - 25.0).abs() < 0.5);
/// ```
pub fn celsius(raw: u16) -> f32 {
    let volts = f32::from(raw) * 3.0 / 4095.0;
    (volts - 0.76) / 0.0025 + 25.0
}
