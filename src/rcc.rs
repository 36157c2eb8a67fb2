//! Reset and clock control (RCC).
//!
//! The valid-bit tables follow the reserved-bit layout of RM0383 section 6.3, one entry per
//! register. The field constants double as the width table used by [`Block::read`] and
//! [`Block::write`].

use static_assertions::{const_assert, const_assert_eq};

use crate::dispatch::{Block, Peripheral, width_in};
use crate::error::Result;
use crate::map::RCC_BASE;
use crate::RegMap;

/// The RCC register block.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = RccReg)]
pub struct RccRegisters {
    /// Clock control register.
    #[reg(valid = mask::CR)]
    pub cr: u32,
    /// PLL configuration register.
    #[reg(valid = mask::PLLCFGR)]
    pub pllcfgr: u32,
    /// Clock configuration register.
    #[reg(valid = mask::CFGR)]
    pub cfgr: u32,
    /// Clock interrupt register.
    #[reg(valid = mask::CIR)]
    pub cir: u32,
    /// AHB1 peripheral reset register.
    #[reg(valid = mask::AHB1RSTR)]
    pub ahb1rstr: u32,
    /// AHB2 peripheral reset register.
    #[reg(valid = mask::AHB2)]
    pub ahb2rstr: u32,
    _reserved0: [u32; 2],
    /// APB1 peripheral reset register.
    #[reg(valid = mask::APB1)]
    pub apb1rstr: u32,
    /// APB2 peripheral reset register.
    #[reg(valid = mask::APB2)]
    pub apb2rstr: u32,
    _reserved1: [u32; 2],
    /// AHB1 peripheral clock enable register.
    #[reg(valid = mask::AHB1ENR)]
    pub ahb1enr: u32,
    /// AHB2 peripheral clock enable register.
    #[reg(valid = mask::AHB2)]
    pub ahb2enr: u32,
    _reserved2: [u32; 2],
    /// APB1 peripheral clock enable register.
    #[reg(valid = mask::APB1)]
    pub apb1enr: u32,
    /// APB2 peripheral clock enable register.
    #[reg(valid = mask::APB2)]
    pub apb2enr: u32,
    _reserved3: [u32; 2],
    /// AHB1 peripheral clock enable in low power mode register.
    #[reg(valid = mask::AHB1LPENR)]
    pub ahb1lpenr: u32,
    /// AHB2 peripheral clock enable in low power mode register.
    #[reg(valid = mask::AHB2)]
    pub ahb2lpenr: u32,
    _reserved4: [u32; 2],
    /// APB1 peripheral clock enable in low power mode register.
    #[reg(valid = mask::APB1)]
    pub apb1lpenr: u32,
    /// APB2 peripheral clock enable in low power mode register.
    #[reg(valid = mask::APB2)]
    pub apb2lpenr: u32,
    _reserved5: [u32; 2],
    /// Backup domain control register.
    #[reg(valid = mask::BDCR)]
    pub bdcr: u32,
    /// Clock control & status register.
    #[reg(valid = mask::CSR)]
    pub csr: u32,
    _reserved6: [u32; 2],
    /// Spread spectrum clock generation register.
    #[reg(valid = mask::SSCGR)]
    pub sscgr: u32,
    /// PLLI2S configuration register.
    #[reg(valid = mask::PLLI2SCFGR)]
    pub plli2scfgr: u32,
    _reserved7: u32,
    /// Dedicated clocks configuration register.
    #[reg(valid = mask::DCKCFGR)]
    pub dckcfgr: u32,
}

const_assert_eq!(RccReg::Ahb1enr.offset(), 0x30);
const_assert_eq!(RccReg::Bdcr.offset(), 0x70);
const_assert_eq!(RccReg::Dckcfgr.offset(), 0x8C);
const_assert_eq!(core::mem::size_of::<RccRegisters>(), 0x90);

const_assert!(mask::CR.contains(cr::HSITRIM) && mask::CR.contains(cr::PLLI2SRDY));
const_assert!(mask::PLLCFGR.contains(pllcfgr::PLLN) && mask::PLLCFGR.contains(pllcfgr::PLLQ));
const_assert!(mask::SSCGR.contains(sscgr::INCSTEP));
const_assert!(mask::PLLI2SCFGR.contains(plli2scfgr::PLLI2SR));

/// Valid bits of every RCC register.
pub mod mask {
    use crate::valid::ValidBits;

    pub const CR: ValidBits = ValidBits::except(&[2..=2, 20..=23, 28..=31]);
    pub const PLLCFGR: ValidBits = ValidBits::except(&[15..=15, 18..=21, 23..=23, 28..=31]);
    pub const CFGR: ValidBits = ValidBits::except(&[8..=9]);
    pub const CIR: ValidBits = ValidBits::except(&[6..=6, 14..=15, 22..=22, 24..=31]);
    pub const AHB1RSTR: ValidBits = ValidBits::only(&[0..=4, 7..=7, 12..=12, 21..=22]);
    /// AHB2 reset, enable and low-power enable: OTGFS only.
    pub const AHB2: ValidBits = ValidBits::only(&[7..=7]);
    /// APB1 reset, enable and low-power enable share one layout.
    pub const APB1: ValidBits = ValidBits::only(&[
        0..=3,
        11..=11,
        14..=15,
        17..=17,
        21..=23,
        28..=28,
    ]);
    /// APB2 reset, enable and low-power enable share one layout.
    pub const APB2: ValidBits = ValidBits::only(&[
        0..=0,
        4..=5,
        8..=8,
        11..=14,
        16..=18,
        20..=20,
    ]);
    pub const AHB1ENR: ValidBits = ValidBits::only(&[0..=4, 7..=7, 12..=12, 21..=22]);
    pub const AHB1LPENR: ValidBits = ValidBits::only(&[0..=4, 7..=7, 12..=12, 15..=16, 21..=22]);
    pub const BDCR: ValidBits = ValidBits::except(&[4..=7, 10..=14, 17..=31]);
    pub const CSR: ValidBits = ValidBits::except(&[2..=23]);
    pub const SSCGR: ValidBits = ValidBits::except(&[28..=29]);
    pub const PLLI2SCFGR: ValidBits = ValidBits::except(&[15..=27, 31..=31]);
    pub const DCKCFGR: ValidBits = ValidBits::only(&[24..=24]);
}

/// Fields of `RCC_CR`.
pub mod cr {
    use crate::field::Field;

    pub const HSION: Field = Field::at(0, 1);
    pub const HSIRDY: Field = Field::at(1, 1);
    pub const HSITRIM: Field = Field::at(3, 5);
    pub const HSICAL: Field = Field::at(8, 8);
    pub const HSEON: Field = Field::at(16, 1);
    pub const HSERDY: Field = Field::at(17, 1);
    pub const HSEBYP: Field = Field::at(18, 1);
    pub const CSSON: Field = Field::at(19, 1);
    pub const PLLON: Field = Field::at(24, 1);
    pub const PLLRDY: Field = Field::at(25, 1);
    pub const PLLI2SON: Field = Field::at(26, 1);
    pub const PLLI2SRDY: Field = Field::at(27, 1);
}

/// Fields of `RCC_PLLCFGR`.
pub mod pllcfgr {
    use crate::field::Field;

    pub const PLLM: Field = Field::at(0, 6);
    pub const PLLN: Field = Field::at(6, 9);
    pub const PLLP: Field = Field::at(16, 2);
    pub const PLLSRC: Field = Field::at(22, 1);
    pub const PLLQ: Field = Field::at(24, 4);
}

/// Fields of `RCC_CFGR`.
pub mod cfgr {
    use crate::field::Field;

    pub const SW: Field = Field::at(0, 2);
    pub const SWS: Field = Field::at(2, 2);
    pub const HPRE: Field = Field::at(4, 4);
    pub const PPRE1: Field = Field::at(10, 3);
    pub const PPRE2: Field = Field::at(13, 3);
    pub const RTCPRE: Field = Field::at(16, 5);
    pub const MCO1: Field = Field::at(21, 2);
    pub const I2SSRC: Field = Field::at(23, 1);
    pub const MCO1PRE: Field = Field::at(24, 3);
    pub const MCO2PRE: Field = Field::at(27, 3);
    pub const MCO2: Field = Field::at(30, 2);
}

/// Fields of `RCC_BDCR`.
pub mod bdcr {
    use crate::field::Field;

    pub const LSEON: Field = Field::at(0, 1);
    pub const LSERDY: Field = Field::at(1, 1);
    pub const LSEBYP: Field = Field::at(2, 1);
    pub const LSEMOD: Field = Field::at(3, 1);
    pub const RTCSEL: Field = Field::at(8, 2);
    pub const RTCEN: Field = Field::at(15, 1);
    pub const BDRST: Field = Field::at(16, 1);
}

/// Fields of `RCC_CSR`.
pub mod csr {
    use crate::field::Field;

    pub const LSION: Field = Field::at(0, 1);
    pub const LSIRDY: Field = Field::at(1, 1);
    pub const RMVF: Field = Field::at(24, 1);
    pub const BORRSTF: Field = Field::at(25, 1);
    pub const PINRSTF: Field = Field::at(26, 1);
    pub const PORRSTF: Field = Field::at(27, 1);
    pub const SFTRSTF: Field = Field::at(28, 1);
    pub const IWDGRSTF: Field = Field::at(29, 1);
    pub const WWDGRSTF: Field = Field::at(30, 1);
    pub const LPWRRSTF: Field = Field::at(31, 1);
}

/// Fields of `RCC_SSCGR`.
pub mod sscgr {
    use crate::field::Field;

    pub const MODPER: Field = Field::at(0, 13);
    pub const INCSTEP: Field = Field::at(13, 15);
    pub const SPREADSEL: Field = Field::at(30, 1);
    pub const SSCGEN: Field = Field::at(31, 1);
}

/// Fields of `RCC_PLLI2SCFGR`.
pub mod plli2scfgr {
    use crate::field::Field;

    pub const PLLI2SM: Field = Field::at(0, 6);
    pub const PLLI2SN: Field = Field::at(6, 9);
    pub const PLLI2SR: Field = Field::at(28, 3);
}

/// Fields of `RCC_DCKCFGR`.
pub mod dckcfgr {
    use crate::field::Field;

    pub const TIMPRE: Field = Field::at(24, 1);
}

/// The RCC. There is a single instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rcc;

impl Peripheral for Rcc {
    type Register = RccReg;
    type Ptr<'a> = RccRegistersPtr<'a>;

    fn base_address(self) -> usize {
        RCC_BASE
    }

    fn field_width(self, reg: RccReg, position: u8) -> Option<u8> {
        match reg {
            RccReg::Cr => width_in(&[cr::HSITRIM, cr::HSICAL], position),
            RccReg::Pllcfgr => width_in(
                &[pllcfgr::PLLM, pllcfgr::PLLN, pllcfgr::PLLP, pllcfgr::PLLQ],
                position,
            ),
            RccReg::Cfgr => width_in(
                &[
                    cfgr::SW,
                    cfgr::SWS,
                    cfgr::HPRE,
                    cfgr::PPRE1,
                    cfgr::PPRE2,
                    cfgr::RTCPRE,
                    cfgr::MCO1,
                    cfgr::MCO1PRE,
                    cfgr::MCO2PRE,
                    cfgr::MCO2,
                ],
                position,
            ),
            RccReg::Bdcr => width_in(&[bdcr::RTCSEL], position),
            RccReg::Sscgr => width_in(&[sscgr::MODPER, sscgr::INCSTEP], position),
            RccReg::Plli2scfgr => width_in(
                &[
                    plli2scfgr::PLLI2SM,
                    plli2scfgr::PLLI2SN,
                    plli2scfgr::PLLI2SR,
                ],
                position,
            ),
            _ => Some(1),
        }
    }
}

/// The RCC bound to its registers.
pub type RccBlock<'a> = Block<'a, Rcc>;

/// Clock gates of the peripherals driven by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gate {
    GpioA,
    GpioB,
    GpioC,
    GpioD,
    GpioE,
    GpioH,
    Crc,
    Dma1,
    Dma2,
    Tim2,
    Tim3,
    Tim4,
    Tim5,
    Wwdg,
    Spi2,
    Spi3,
    Usart2,
    I2c1,
    I2c2,
    I2c3,
    Pwr,
    Tim1,
    Usart1,
    Usart6,
    Adc1,
    Sdio,
    Spi1,
    Spi4,
    Syscfg,
    Tim9,
    Tim10,
    Tim11,
    Spi5,
}

impl Gate {
    /// Enable register, reset register and bit of the gate.
    pub const fn location(self) -> (RccReg, RccReg, u8) {
        use RccReg::*;
        let (enable, reset) = match self {
            Self::GpioA | Self::GpioB | Self::GpioC | Self::GpioD | Self::GpioE | Self::GpioH => {
                (Ahb1enr, Ahb1rstr)
            }
            Self::Crc | Self::Dma1 | Self::Dma2 => (Ahb1enr, Ahb1rstr),
            Self::Tim2
            | Self::Tim3
            | Self::Tim4
            | Self::Tim5
            | Self::Wwdg
            | Self::Spi2
            | Self::Spi3
            | Self::Usart2
            | Self::I2c1
            | Self::I2c2
            | Self::I2c3
            | Self::Pwr => (Apb1enr, Apb1rstr),
            _ => (Apb2enr, Apb2rstr),
        };
        let bit = match self {
            Self::GpioA => 0,
            Self::GpioB => 1,
            Self::GpioC => 2,
            Self::GpioD => 3,
            Self::GpioE => 4,
            Self::GpioH => 7,
            Self::Crc => 12,
            Self::Dma1 => 21,
            Self::Dma2 => 22,
            Self::Tim2 => 0,
            Self::Tim3 => 1,
            Self::Tim4 => 2,
            Self::Tim5 => 3,
            Self::Wwdg => 11,
            Self::Spi2 => 14,
            Self::Spi3 => 15,
            Self::Usart2 => 17,
            Self::I2c1 => 21,
            Self::I2c2 => 22,
            Self::I2c3 => 23,
            Self::Pwr => 28,
            Self::Tim1 => 0,
            Self::Usart1 => 4,
            Self::Usart6 => 5,
            Self::Adc1 => 8,
            Self::Sdio => 11,
            Self::Spi1 => 12,
            Self::Spi4 => 13,
            Self::Syscfg => 14,
            Self::Tim9 => 16,
            Self::Tim10 => 17,
            Self::Tim11 => 18,
            Self::Spi5 => 20,
        };
        (enable, reset, bit)
    }
}

impl RccBlock<'_> {
    /// Turns the peripheral clock on.
    pub fn enable(&self, gate: Gate) -> Result<()> {
        let (enable, _, bit) = gate.location();
        self.write_field(enable, bit, 1, 1)
    }

    /// Turns the peripheral clock off.
    pub fn disable(&self, gate: Gate) -> Result<()> {
        let (enable, _, bit) = gate.location();
        self.write_field(enable, bit, 1, 0)
    }

    /// Whether the peripheral clock is on.
    pub fn is_enabled(&self, gate: Gate) -> Result<bool> {
        let (enable, _, bit) = gate.location();
        Ok(self.read_field(enable, bit, 1)? == 1)
    }

    /// Pulses the peripheral reset line.
    pub fn reset(&self, gate: Gate) -> Result<()> {
        let (_, reset, bit) = gate.location();
        self.write_field(reset, bit, 1, 1)?;
        self.write_field(reset, bit, 1, 0)
    }

    /// The active system clock source, as reported by `CFGR.SWS`.
    pub fn system_clock_source(&self) -> Result<u32> {
        self.get(RccReg::Cfgr, cfgr::SWS)
    }
}
