//! Embedded flash memory interface.

use static_assertions::const_assert_eq;

use crate::dispatch::{Block, Peripheral, width_in};
use crate::error::{Error, Result};
use crate::field::{Field, WriteMode};
use crate::map::FLASH_BASE;
use crate::valid::ValidBits;
use crate::RegMap;

/// The flash interface register block.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = FlashReg)]
pub struct FlashRegisters {
    /// Access control register.
    #[reg(valid = ValidBits::only(&[0..=3, 8..=12]))]
    pub acr: u32,
    /// Key register.
    #[reg(WO)]
    pub keyr: u32,
    /// Option key register.
    #[reg(WO)]
    pub optkeyr: u32,
    /// Status register. Error flags are cleared by writing 1.
    #[reg(valid = ValidBits::only(&[0..=1, 4..=8, 16..=16]))]
    pub sr: u32,
    /// Control register.
    #[reg(valid = ValidBits::only(&[0..=6, 8..=9, 16..=16, 24..=25, 31..=31]))]
    pub cr: u32,
    /// Option control register.
    #[reg(valid = ValidBits::only(&[0..=3, 5..=23, 31..=31]))]
    pub optcr: u32,
}

const_assert_eq!(FlashReg::Optcr.offset(), 0x14);

/// Fields of `FLASH_ACR`.
pub mod acr {
    use crate::field::Field;

    pub const LATENCY: Field = Field::at(0, 4);
    pub const PRFTEN: Field = Field::at(8, 1);
    pub const ICEN: Field = Field::at(9, 1);
    pub const DCEN: Field = Field::at(10, 1);
    pub const ICRST: Field = Field::at(11, 1);
    pub const DCRST: Field = Field::at(12, 1);
}

/// Fields of `FLASH_SR`.
pub mod sr {
    use crate::field::Field;

    pub const EOP: Field = Field::at(0, 1);
    pub const OPERR: Field = Field::at(1, 1);
    pub const WRPERR: Field = Field::at(4, 1);
    pub const PGAERR: Field = Field::at(5, 1);
    pub const PGPERR: Field = Field::at(6, 1);
    pub const PGSERR: Field = Field::at(7, 1);
    pub const RDERR: Field = Field::at(8, 1);
    pub const BSY: Field = Field::at(16, 1);
}

/// Fields of `FLASH_CR`.
pub mod cr {
    use crate::field::Field;

    pub const PG: Field = Field::at(0, 1);
    pub const SER: Field = Field::at(1, 1);
    pub const MER: Field = Field::at(2, 1);
    pub const SNB: Field = Field::at(3, 4);
    pub const PSIZE: Field = Field::at(8, 2);
    pub const STRT: Field = Field::at(16, 1);
    pub const EOPIE: Field = Field::at(24, 1);
    pub const ERRIE: Field = Field::at(25, 1);
    pub const LOCK: Field = Field::at(31, 1);
}

/// Fields of `FLASH_OPTCR`.
pub mod optcr {
    use crate::field::Field;

    pub const OPTLOCK: Field = Field::at(0, 1);
    pub const OPTSTRT: Field = Field::at(1, 1);
    pub const BOR_LEV: Field = Field::at(2, 2);
    pub const WDG_SW: Field = Field::at(5, 1);
    pub const NRST_STOP: Field = Field::at(6, 1);
    pub const NRST_STDBY: Field = Field::at(7, 1);
    pub const RDP: Field = Field::at(8, 8);
    pub const NWRP: Field = Field::at(16, 8);
    pub const SPRMOD: Field = Field::at(31, 1);
}

/// The whole 32-bit key of `FLASH_KEYR` and `FLASH_OPTKEYR`.
pub const KEY: Field = Field::at(0, 32);

/// Highest latency the F411 supports.
pub const MAX_WAIT_STATES: u8 = 3;

/// The flash interface. There is a single instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Flash;

impl Peripheral for Flash {
    type Register = FlashReg;
    type Ptr<'a> = FlashRegistersPtr<'a>;

    fn base_address(self) -> usize {
        FLASH_BASE
    }

    fn field_width(self, reg: FlashReg, position: u8) -> Option<u8> {
        match reg {
            FlashReg::Acr => width_in(&[acr::LATENCY], position),
            FlashReg::Keyr | FlashReg::Optkeyr => width_in(&[KEY], position),
            FlashReg::Cr => width_in(&[cr::SNB, cr::PSIZE], position),
            FlashReg::Optcr => width_in(&[optcr::BOR_LEV, optcr::RDP, optcr::NWRP], position),
            FlashReg::Sr => Some(1),
        }
    }

    fn write_mode(self, reg: FlashReg, _field: Field, value: u32) -> Result<WriteMode> {
        Ok(match reg {
            // write-1-to-clear: a read-modify-write would clear every pending flag
            FlashReg::Sr if value == 0 => WriteMode::Skip,
            FlashReg::Sr => WriteMode::Direct,
            _ => WriteMode::Modify,
        })
    }
}

/// The flash interface bound to its registers.
pub type FlashBlock<'a> = Block<'a, Flash>;

/// Wait states needed to fetch at `hclk_hz` with a 2.7 V to 3.6 V supply (RM0383 table 5).
pub const fn wait_states_for(hclk_hz: u32) -> Option<u8> {
    match hclk_hz {
        0..=30_000_000 => Some(0),
        30_000_001..=64_000_000 => Some(1),
        64_000_001..=90_000_000 => Some(2),
        90_000_001..=100_000_000 => Some(3),
        _ => None,
    }
}

impl FlashBlock<'_> {
    /// Programs the access latency.
    pub fn set_latency(&self, wait_states: u8) -> Result<()> {
        if wait_states > MAX_WAIT_STATES {
            return Err(Error::InvalidConfig("flash latency above 3 wait states"));
        }
        self.set(FlashReg::Acr, acr::LATENCY, wait_states.into())
    }

    /// The programmed access latency.
    pub fn latency(&self) -> Result<u8> {
        // a 4-bit field always fits in u8
        Ok(self.get(FlashReg::Acr, acr::LATENCY)? as u8)
    }

    /// Turns prefetch, instruction cache and data cache on or off.
    pub fn set_caches(&self, prefetch: bool, icache: bool, dcache: bool) -> Result<()> {
        self.set(FlashReg::Acr, acr::PRFTEN, prefetch.into())?;
        self.set(FlashReg::Acr, acr::ICEN, icache.into())?;
        self.set(FlashReg::Acr, acr::DCEN, dcache.into())
    }
}
