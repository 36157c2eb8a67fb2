//! Universal synchronous/asynchronous receiver transmitters (USART).

use static_assertions::const_assert_eq;

use crate::dispatch::{Block, Peripheral, width_in};
use crate::error::{Error, Result};
use crate::field::{Field, WriteMode};
use crate::map::{USART1_BASE, USART2_BASE, USART6_BASE};
use crate::rcc::{Gate, RccBlock};
use crate::valid::ValidBits;
use crate::RegMap;

/// The register block of one USART.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = UsartReg)]
pub struct UsartRegisters {
    /// Status register.
    #[reg(valid = ValidBits::from_bits(0x03FF))]
    pub sr: u32,
    /// Data register.
    #[reg(valid = ValidBits::from_bits(0x01FF))]
    pub dr: u32,
    /// Baud rate register.
    #[reg(valid = ValidBits::only(&[0..=15]))]
    pub brr: u32,
    /// Control register 1.
    #[reg(valid = ValidBits::from_bits(0xBFFF))]
    pub cr1: u32,
    /// Control register 2.
    #[reg(valid = ValidBits::from_bits(0x7F6F))]
    pub cr2: u32,
    /// Control register 3.
    #[reg(valid = ValidBits::from_bits(0x0FFF))]
    pub cr3: u32,
    /// Guard time and prescaler register.
    #[reg(valid = ValidBits::only(&[0..=15]))]
    pub gtpr: u32,
}

const_assert_eq!(UsartReg::Gtpr.offset(), 0x18);

/// Fields of `USART_SR`.
pub mod sr {
    use crate::field::Field;

    pub const PE: Field = Field::at(0, 1);
    pub const FE: Field = Field::at(1, 1);
    pub const NF: Field = Field::at(2, 1);
    pub const ORE: Field = Field::at(3, 1);
    pub const IDLE: Field = Field::at(4, 1);
    pub const RXNE: Field = Field::at(5, 1);
    pub const TC: Field = Field::at(6, 1);
    pub const TXE: Field = Field::at(7, 1);
    pub const LBD: Field = Field::at(8, 1);
    pub const CTS: Field = Field::at(9, 1);
}

/// Fields of `USART_DR` and `USART_BRR`.
pub mod data {
    use crate::field::Field;

    pub const DR: Field = Field::at(0, 9);
    pub const DIV_FRACTION: Field = Field::at(0, 4);
    pub const DIV_MANTISSA: Field = Field::at(4, 12);
    pub const BRR: Field = Field::at(0, 16);
}

/// Fields of `USART_CR1`.
pub mod cr1 {
    use crate::field::Field;

    pub const SBK: Field = Field::at(0, 1);
    pub const RWU: Field = Field::at(1, 1);
    pub const RE: Field = Field::at(2, 1);
    pub const TE: Field = Field::at(3, 1);
    pub const IDLEIE: Field = Field::at(4, 1);
    pub const RXNEIE: Field = Field::at(5, 1);
    pub const TCIE: Field = Field::at(6, 1);
    pub const TXEIE: Field = Field::at(7, 1);
    pub const PEIE: Field = Field::at(8, 1);
    pub const PS: Field = Field::at(9, 1);
    pub const PCE: Field = Field::at(10, 1);
    pub const WAKE: Field = Field::at(11, 1);
    pub const M: Field = Field::at(12, 1);
    pub const UE: Field = Field::at(13, 1);
    pub const OVER8: Field = Field::at(15, 1);
}

/// Fields of `USART_CR2`.
pub mod cr2 {
    use crate::field::Field;

    pub const ADD: Field = Field::at(0, 4);
    pub const LBDL: Field = Field::at(5, 1);
    pub const LBDIE: Field = Field::at(6, 1);
    pub const LBCL: Field = Field::at(8, 1);
    pub const CPHA: Field = Field::at(9, 1);
    pub const CPOL: Field = Field::at(10, 1);
    pub const CLKEN: Field = Field::at(11, 1);
    pub const STOP: Field = Field::at(12, 2);
    pub const LINEN: Field = Field::at(14, 1);
}

/// Fields of `USART_GTPR`.
pub mod gtpr {
    use crate::field::Field;

    pub const PSC: Field = Field::at(0, 8);
    pub const GT: Field = Field::at(8, 8);
}

/// The USARTs of the F411.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Usart {
    Usart1,
    Usart2,
    Usart6,
}

impl Usart {
    /// The USART's clock gate.
    pub const fn gate(self) -> Gate {
        match self {
            Self::Usart1 => Gate::Usart1,
            Self::Usart2 => Gate::Usart2,
            Self::Usart6 => Gate::Usart6,
        }
    }
}

impl TryFrom<u8> for Usart {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        Ok(match index {
            1 => Self::Usart1,
            2 => Self::Usart2,
            6 => Self::Usart6,
            _ => return Err(Error::UnknownInstance(index)),
        })
    }
}

impl Peripheral for Usart {
    type Register = UsartReg;
    type Ptr<'a> = UsartRegistersPtr<'a>;

    fn base_address(self) -> usize {
        match self {
            Self::Usart1 => USART1_BASE,
            Self::Usart2 => USART2_BASE,
            Self::Usart6 => USART6_BASE,
        }
    }

    fn field_width(self, reg: UsartReg, position: u8) -> Option<u8> {
        match reg {
            UsartReg::Dr => width_in(&[data::DR], position),
            UsartReg::Brr => width_in(&[data::DIV_FRACTION, data::DIV_MANTISSA], position),
            UsartReg::Cr2 => width_in(&[cr2::ADD, cr2::STOP], position),
            UsartReg::Gtpr => width_in(&[gtpr::PSC, gtpr::GT], position),
            _ => Some(1),
        }
    }

    fn write_mode(self, reg: UsartReg, _field: Field, _value: u32) -> Result<WriteMode> {
        Ok(match reg {
            // CTS, LBD, TC and RXNE are cleared by writing 0, the other flags ignore writes
            UsartReg::Sr => WriteMode::ClearByZero,
            // reading DR pops a received frame
            UsartReg::Dr => WriteMode::Direct,
            _ => WriteMode::Modify,
        })
    }
}

/// A USART bound to its registers.
pub type UsartBlock<'a> = Block<'a, Usart>;

/// Receiver sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    #[default]
    By16,
    By8,
}

/// Parity bit handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// `CR2.STOP` encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StopBits {
    #[default]
    One = 0,
    Half = 1,
    Two = 2,
    OneAndHalf = 3,
}

/// Frame format and speed of a serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsartConfig {
    pub baud: u32,
    pub oversampling: Oversampling,
    /// 9 data bits instead of 8. The parity bit, if any, is the last of them.
    pub nine_bits: bool,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for UsartConfig {
    fn default() -> Self {
        Self {
            baud: 115_200,
            oversampling: Oversampling::By16,
            nine_bits: false,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// The `BRR` value for `baud` from a `pclk_hz` peripheral clock, rounded to nearest.
///
/// With 8x oversampling the fraction has three bits and is stored shifted right by one.
///
/// ```
/// use f411_regs::usart::{brr_value, Oversampling};
///
/// assert_eq!(brr_value(16_000_000, 9600, Oversampling::By16), Ok(0x683));
/// assert_eq!(brr_value(16_000_000, 115_200, Oversampling::By16), Ok(0x8B));
/// assert_eq!(brr_value(16_000_000, 115_200, Oversampling::By8), Ok(0x113));
/// ```
pub fn brr_value(pclk_hz: u32, baud: u32, oversampling: Oversampling) -> Result<u32> {
    if baud == 0 {
        return Err(Error::InvalidConfig("USART baud rate of zero"));
    }
    let (pclk, baud) = (u64::from(pclk_hz), u64::from(baud));
    let brr = match oversampling {
        Oversampling::By16 => (pclk + baud / 2) / baud,
        Oversampling::By8 => {
            let div8 = (2 * pclk + baud / 2) / baud;
            (div8 & !0xF) | ((div8 & 0xF) >> 1)
        }
    };
    // the divider must be at least 1.0
    if brr < 0x10 || brr > u64::from(data::BRR.max_value()) {
        return Err(Error::InvalidConfig("USART baud rate out of reach of the clock"));
    }
    // checked against the 16-bit maximum above
    Ok(brr as u32)
}

impl UsartBlock<'_> {
    /// Turns the USART clock on, programs `config` and enables the transmitter and receiver.
    pub fn configure(&self, rcc: &RccBlock<'_>, config: &UsartConfig, pclk_hz: u32) -> Result<()> {
        let brr = brr_value(pclk_hz, config.baud, config.oversampling)?;
        rcc.enable(self.instance().gate())?;
        self.set(UsartReg::Cr1, cr1::UE, 0)?;
        self.set(UsartReg::Cr1, cr1::OVER8, (config.oversampling == Oversampling::By8).into())?;
        self.set(UsartReg::Brr, data::BRR, brr)?;
        self.set(UsartReg::Cr1, cr1::M, config.nine_bits.into())?;
        self.set(UsartReg::Cr1, cr1::PCE, (config.parity != Parity::None).into())?;
        self.set(UsartReg::Cr1, cr1::PS, (config.parity == Parity::Odd).into())?;
        self.set(UsartReg::Cr2, cr2::STOP, config.stop_bits as u32)?;
        self.set(UsartReg::Cr1, cr1::TE, 1)?;
        self.set(UsartReg::Cr1, cr1::RE, 1)?;
        self.set(UsartReg::Cr1, cr1::UE, 1)
    }

    /// Whether the data register can take another frame.
    pub fn is_tx_empty(&self) -> Result<bool> {
        self.is_set(UsartReg::Sr, sr::TXE)
    }
}
