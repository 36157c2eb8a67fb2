//! Nested vectored interrupt controller (NVIC), as far as the peripheral interrupts go.
//!
//! The set/clear banks take a plain word write: a read-modify-write of `ICER` or `ICPR` would
//! read back every enabled (or pending) line and clear all of them.

use static_assertions::const_assert_eq;

use crate::error::{Error, Result};
use crate::field::Field;
use crate::map::NVIC_BASE;
use crate::valid::ValidBits;
use crate::RegMap;

/// Number of priority levels implemented by the F411.
pub const PRIORITY_LEVELS: u8 = 16;

/// Only the upper nibble of each priority byte is implemented.
const PRIORITY_BITS: ValidBits = ValidBits::from_bits(0xF0F0_F0F0);

/// The NVIC register block, from `NVIC_ISER0` to the last priority register.
#[repr(C)]
#[derive(RegMap)]
pub struct NvicRegisters {
    /// Interrupt set-enable registers.
    pub iser: [u32; 8],
    _reserved0: [u32; 24],
    /// Interrupt clear-enable registers.
    pub icer: [u32; 8],
    _reserved1: [u32; 24],
    /// Interrupt set-pending registers.
    pub ispr: [u32; 8],
    _reserved2: [u32; 24],
    /// Interrupt clear-pending registers.
    pub icpr: [u32; 8],
    _reserved3: [u32; 24],
    /// Interrupt active bit registers.
    #[reg(RO)]
    pub iabr: [u32; 8],
    _reserved4: [u32; 56],
    /// Interrupt priority registers, one byte per interrupt.
    #[reg(valid = PRIORITY_BITS)]
    pub ipr: [u32; 60],
}

const_assert_eq!(core::mem::offset_of!(NvicRegisters, icer), 0x80);
const_assert_eq!(core::mem::offset_of!(NvicRegisters, ipr), 0x300);
const_assert_eq!(core::mem::size_of::<NvicRegisters>(), 0x3F0);

impl Default for NvicRegisters {
    fn default() -> Self {
        Self {
            iser: [0; 8],
            _reserved0: [0; 24],
            icer: [0; 8],
            _reserved1: [0; 24],
            ispr: [0; 8],
            _reserved2: [0; 24],
            icpr: [0; 8],
            _reserved3: [0; 24],
            iabr: [0; 8],
            _reserved4: [0; 56],
            ipr: [0; 60],
        }
    }
}

/// Peripheral interrupts of the F411 (RM0383 table 37), by position in the vector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Interrupt {
    Wwdg = 0,
    Pvd = 1,
    TampStamp = 2,
    RtcWkup = 3,
    Flash = 4,
    Rcc = 5,
    Exti0 = 6,
    Exti1 = 7,
    Exti2 = 8,
    Exti3 = 9,
    Exti4 = 10,
    Dma1Stream0 = 11,
    Dma1Stream1 = 12,
    Dma1Stream2 = 13,
    Dma1Stream3 = 14,
    Dma1Stream4 = 15,
    Dma1Stream5 = 16,
    Dma1Stream6 = 17,
    Adc = 18,
    Exti9_5 = 23,
    Tim1BrkTim9 = 24,
    Tim1UpTim10 = 25,
    Tim1TrgComTim11 = 26,
    Tim1Cc = 27,
    Tim2 = 28,
    Tim3 = 29,
    Tim4 = 30,
    I2c1Ev = 31,
    I2c1Er = 32,
    I2c2Ev = 33,
    I2c2Er = 34,
    Spi1 = 35,
    Spi2 = 36,
    Usart1 = 37,
    Usart2 = 38,
    Exti15_10 = 40,
    RtcAlarm = 41,
    OtgFsWkup = 42,
    Dma1Stream7 = 47,
    Sdio = 49,
    Tim5 = 50,
    Spi3 = 51,
    Dma2Stream0 = 56,
    Dma2Stream1 = 57,
    Dma2Stream2 = 58,
    Dma2Stream3 = 59,
    Dma2Stream4 = 60,
    OtgFs = 67,
    Dma2Stream5 = 68,
    Dma2Stream6 = 69,
    Dma2Stream7 = 70,
    Usart6 = 71,
    I2c3Ev = 72,
    I2c3Er = 73,
    Fpu = 81,
    Spi4 = 84,
    Spi5 = 85,
}

impl Interrupt {
    /// Position in the vector table, counted from the first peripheral interrupt.
    #[inline]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Bank index and bit of the interrupt in the 32-line enable/pending registers.
    #[inline]
    const fn line(self) -> (usize, u32) {
        ((self.number() / 32) as usize, 1 << (self.number() % 32))
    }

    /// Priority register index and the field holding the priority level.
    const fn priority_field(self) -> (usize, Field) {
        let n = self.number();
        ((n / 4) as usize, Field::at(8 * (n % 4) + 4, 4))
    }
}

/// The NVIC bound to its registers.
pub struct Nvic<'a> {
    regs: NvicRegistersPtr<'a>,
}

impl<'a> Nvic<'a> {
    /// Binds a register block, typically an in-memory one from `from_mut`.
    pub fn new(regs: NvicRegistersPtr<'a>) -> Self {
        Self { regs }
    }

    /// Binds the core's NVIC.
    ///
    /// # Safety
    /// The code must run on a Cortex-M4, and nothing else may touch the NVIC while the
    /// returned value is alive.
    pub unsafe fn take() -> Self {
        // SAFETY: architectural address, the caller promises exclusive use
        Self::new(unsafe { NvicRegistersPtr::from_ptr(NVIC_BASE as *mut NvicRegisters) })
    }

    /// The typed register-block pointer.
    #[inline]
    pub fn regs(&self) -> &NvicRegistersPtr<'a> {
        &self.regs
    }

    /// Unmasks `irq`.
    pub fn enable(&self, irq: Interrupt) -> Result<()> {
        let (bank, bit) = irq.line();
        let reg = self.regs.iser().get(bank).ok_or(Error::UnknownInstance(irq.number()))?;
        reg.write(bit)
    }

    /// Masks `irq`.
    pub fn disable(&self, irq: Interrupt) -> Result<()> {
        let (bank, bit) = irq.line();
        let reg = self.regs.icer().get(bank).ok_or(Error::UnknownInstance(irq.number()))?;
        reg.write(bit)
    }

    /// Whether `irq` is unmasked.
    pub fn is_enabled(&self, irq: Interrupt) -> bool {
        let (bank, bit) = irq.line();
        self.regs
            .iser()
            .get(bank)
            .is_some_and(|reg| reg.read() & bit != 0)
    }

    /// Marks `irq` pending from software.
    pub fn set_pending(&self, irq: Interrupt) -> Result<()> {
        let (bank, bit) = irq.line();
        let reg = self.regs.ispr().get(bank).ok_or(Error::UnknownInstance(irq.number()))?;
        reg.write(bit)
    }

    /// Drops a pending request of `irq`.
    pub fn clear_pending(&self, irq: Interrupt) -> Result<()> {
        let (bank, bit) = irq.line();
        let reg = self.regs.icpr().get(bank).ok_or(Error::UnknownInstance(irq.number()))?;
        reg.write(bit)
    }

    /// Whether `irq` is pending.
    pub fn is_pending(&self, irq: Interrupt) -> bool {
        let (bank, bit) = irq.line();
        self.regs
            .ispr()
            .get(bank)
            .is_some_and(|reg| reg.read() & bit != 0)
    }

    /// Whether the handler of `irq` is running.
    pub fn is_active(&self, irq: Interrupt) -> bool {
        let (bank, bit) = irq.line();
        self.regs
            .iabr()
            .get(bank)
            .is_some_and(|reg| reg.read() & bit != 0)
    }

    /// Sets the priority of `irq`, 0 being the most urgent.
    pub fn set_priority(&self, irq: Interrupt, level: u8) -> Result<()> {
        if level >= PRIORITY_LEVELS {
            return Err(Error::InvalidConfig("NVIC priority above 15"));
        }
        let (index, field) = irq.priority_field();
        let reg = self.regs.ipr().get(index).ok_or(Error::UnknownInstance(irq.number()))?;
        reg.set(field, level.into())
    }

    /// The priority of `irq`.
    pub fn priority(&self, irq: Interrupt) -> Result<u8> {
        let (index, field) = irq.priority_field();
        let reg = self.regs.ipr().get(index).ok_or(Error::UnknownInstance(irq.number()))?;
        // a 4-bit field always fits in u8
        Ok(reg.get(field)? as u8)
    }
}
