//! Serial peripheral interfaces (SPI), including the I2S registers they share.

use static_assertions::const_assert_eq;

use crate::dispatch::{Block, Peripheral, width_in};
use crate::error::{Error, Result};
use crate::field::{Field, WriteMode};
use crate::map::{SPI1_BASE, SPI2_BASE, SPI3_BASE, SPI4_BASE, SPI5_BASE};
use crate::rcc::{Gate, RccBlock};
use crate::valid::ValidBits;
use crate::RegMap;

const HALFWORD: ValidBits = ValidBits::only(&[0..=15]);

/// The register block of one SPI interface.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = SpiReg)]
pub struct SpiRegisters {
    /// Control register 1.
    #[reg(valid = HALFWORD)]
    pub cr1: u32,
    /// Control register 2.
    #[reg(valid = ValidBits::from_bits(0x00F7))]
    pub cr2: u32,
    /// Status register.
    #[reg(valid = ValidBits::from_bits(0x01FF))]
    pub sr: u32,
    /// Data register.
    #[reg(valid = HALFWORD)]
    pub dr: u32,
    /// CRC polynomial register.
    #[reg(valid = HALFWORD)]
    pub crcpr: u32,
    /// RX CRC register.
    #[reg(RO, valid = HALFWORD)]
    pub rxcrcr: u32,
    /// TX CRC register.
    #[reg(RO, valid = HALFWORD)]
    pub txcrcr: u32,
    /// I2S configuration register.
    #[reg(valid = ValidBits::from_bits(0x0FBF))]
    pub i2scfgr: u32,
    /// I2S prescaler register.
    #[reg(valid = ValidBits::from_bits(0x03FF))]
    pub i2spr: u32,
}

const_assert_eq!(SpiReg::I2spr.offset(), 0x20);

/// Fields of `SPI_CR1`.
pub mod cr1 {
    use crate::field::Field;

    pub const CPHA: Field = Field::at(0, 1);
    pub const CPOL: Field = Field::at(1, 1);
    pub const MSTR: Field = Field::at(2, 1);
    pub const BR: Field = Field::at(3, 3);
    pub const SPE: Field = Field::at(6, 1);
    pub const LSBFIRST: Field = Field::at(7, 1);
    pub const SSI: Field = Field::at(8, 1);
    pub const SSM: Field = Field::at(9, 1);
    pub const RXONLY: Field = Field::at(10, 1);
    pub const DFF: Field = Field::at(11, 1);
    pub const CRCNEXT: Field = Field::at(12, 1);
    pub const CRCEN: Field = Field::at(13, 1);
    pub const BIDIOE: Field = Field::at(14, 1);
    pub const BIDIMODE: Field = Field::at(15, 1);
}

/// Fields of `SPI_CR2`.
pub mod cr2 {
    use crate::field::Field;

    pub const RXDMAEN: Field = Field::at(0, 1);
    pub const TXDMAEN: Field = Field::at(1, 1);
    pub const SSOE: Field = Field::at(2, 1);
    pub const FRF: Field = Field::at(4, 1);
    pub const ERRIE: Field = Field::at(5, 1);
    pub const RXNEIE: Field = Field::at(6, 1);
    pub const TXEIE: Field = Field::at(7, 1);
}

/// Fields of `SPI_SR`.
pub mod sr {
    use crate::field::Field;

    pub const RXNE: Field = Field::at(0, 1);
    pub const TXE: Field = Field::at(1, 1);
    pub const CRCERR: Field = Field::at(4, 1);
    pub const MODF: Field = Field::at(5, 1);
    pub const OVR: Field = Field::at(6, 1);
    pub const BSY: Field = Field::at(7, 1);
    pub const FRE: Field = Field::at(8, 1);
}

/// Fields of `SPI_I2SCFGR` and `SPI_I2SPR`.
pub mod i2s {
    use crate::field::Field;

    pub const CHLEN: Field = Field::at(0, 1);
    pub const DATLEN: Field = Field::at(1, 2);
    pub const CKPOL: Field = Field::at(3, 1);
    pub const I2SSTD: Field = Field::at(4, 2);
    pub const PCMSYNC: Field = Field::at(7, 1);
    pub const I2SCFG: Field = Field::at(8, 2);
    pub const I2SE: Field = Field::at(10, 1);
    pub const I2SMOD: Field = Field::at(11, 1);
    pub const I2SDIV: Field = Field::at(0, 8);
    pub const ODD: Field = Field::at(8, 1);
    pub const MCKOE: Field = Field::at(9, 1);
}

/// A full 16-bit data or CRC word.
pub const WORD: Field = Field::at(0, 16);

/// The SPI interfaces of the F411.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiBus {
    Spi1,
    Spi2,
    Spi3,
    Spi4,
    Spi5,
}

impl SpiBus {
    /// The interface's clock gate.
    pub const fn gate(self) -> Gate {
        match self {
            Self::Spi1 => Gate::Spi1,
            Self::Spi2 => Gate::Spi2,
            Self::Spi3 => Gate::Spi3,
            Self::Spi4 => Gate::Spi4,
            Self::Spi5 => Gate::Spi5,
        }
    }
}

impl TryFrom<u8> for SpiBus {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        Ok(match index {
            1 => Self::Spi1,
            2 => Self::Spi2,
            3 => Self::Spi3,
            4 => Self::Spi4,
            5 => Self::Spi5,
            _ => return Err(Error::UnknownInstance(index)),
        })
    }
}

impl Peripheral for SpiBus {
    type Register = SpiReg;
    type Ptr<'a> = SpiRegistersPtr<'a>;

    fn base_address(self) -> usize {
        match self {
            Self::Spi1 => SPI1_BASE,
            Self::Spi2 => SPI2_BASE,
            Self::Spi3 => SPI3_BASE,
            Self::Spi4 => SPI4_BASE,
            Self::Spi5 => SPI5_BASE,
        }
    }

    fn field_width(self, reg: SpiReg, position: u8) -> Option<u8> {
        match reg {
            SpiReg::Cr1 => width_in(&[cr1::BR], position),
            SpiReg::Dr | SpiReg::Crcpr | SpiReg::Rxcrcr | SpiReg::Txcrcr => {
                width_in(&[WORD], position)
            }
            SpiReg::I2scfgr => width_in(&[i2s::DATLEN, i2s::I2SSTD, i2s::I2SCFG], position),
            SpiReg::I2spr => width_in(&[i2s::I2SDIV], position),
            _ => Some(1),
        }
    }

    fn write_mode(self, reg: SpiReg, _field: Field, _value: u32) -> Result<WriteMode> {
        Ok(match reg {
            // CRCERR is cleared by writing 0, the other flags ignore writes
            SpiReg::Sr => WriteMode::ClearByZero,
            // reading DR pops a received frame
            SpiReg::Dr => WriteMode::Direct,
            _ => WriteMode::Modify,
        })
    }
}

/// An SPI interface bound to its registers.
pub type SpiBlock<'a> = Block<'a, SpiBus>;

/// Which end drives SCK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    Master,
    Slave,
}

/// `CR1.BR`: SCK is the peripheral clock divided by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BaudRate {
    Div2 = 0,
    Div4 = 1,
    Div8 = 2,
    Div16 = 3,
    Div32 = 4,
    Div64 = 5,
    Div128 = 6,
    Div256 = 7,
}

impl BaudRate {
    /// The smallest divider keeping SCK at or below `max_sck_hz`.
    pub fn for_frequency(pclk_hz: u32, max_sck_hz: u32) -> Result<Self> {
        const ALL: [BaudRate; 8] = [
            BaudRate::Div2,
            BaudRate::Div4,
            BaudRate::Div8,
            BaudRate::Div16,
            BaudRate::Div32,
            BaudRate::Div64,
            BaudRate::Div128,
            BaudRate::Div256,
        ];
        ALL.into_iter()
            .find(|rate| pclk_hz / rate.divisor() <= max_sck_hz)
            .ok_or(Error::InvalidConfig("SPI clock too fast for the slowest divider"))
    }

    /// The division factor.
    pub const fn divisor(self) -> u32 {
        2 << self as u32
    }
}

/// Clock mode and framing of an SPI link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    pub role: Role,
    pub baud: BaudRate,
    /// SCK idles high.
    pub polarity_high: bool,
    /// Data is captured on the second clock edge.
    pub second_edge: bool,
    /// 16-bit frames instead of 8-bit.
    pub sixteen_bit: bool,
    /// Drive NSS from `SSI` instead of the pin.
    pub software_nss: bool,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            role: Role::Master,
            baud: BaudRate::Div8,
            polarity_high: false,
            second_edge: false,
            sixteen_bit: false,
            software_nss: true,
        }
    }
}

impl SpiBlock<'_> {
    /// Turns the interface clock on and programs `config`. `SPE` is set last.
    pub fn configure(&self, rcc: &RccBlock<'_>, config: &SpiConfig) -> Result<()> {
        rcc.enable(self.instance().gate())?;
        self.set(SpiReg::Cr1, cr1::SPE, 0)?;
        self.set(SpiReg::Cr1, cr1::BR, config.baud as u32)?;
        self.set(SpiReg::Cr1, cr1::CPOL, config.polarity_high.into())?;
        self.set(SpiReg::Cr1, cr1::CPHA, config.second_edge.into())?;
        self.set(SpiReg::Cr1, cr1::DFF, config.sixteen_bit.into())?;
        self.set(SpiReg::Cr1, cr1::SSM, config.software_nss.into())?;
        // with software NSS, SSI high keeps a master from faulting into slave mode
        let master = config.role == Role::Master;
        self.set(SpiReg::Cr1, cr1::SSI, (config.software_nss && master).into())?;
        self.set(SpiReg::Cr1, cr1::MSTR, master.into())?;
        self.set(SpiReg::Cr1, cr1::SPE, 1)
    }

    /// Whether the transmit buffer can take another frame.
    pub fn is_tx_empty(&self) -> Result<bool> {
        self.is_set(SpiReg::Sr, sr::TXE)
    }

    /// Whether a received frame is waiting.
    pub fn is_rx_ready(&self) -> Result<bool> {
        self.is_set(SpiReg::Sr, sr::RXNE)
    }
}
