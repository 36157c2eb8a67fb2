//! Base addresses of the STM32F411 register blocks (RM0383, memory map).
//!
//! Register offsets inside a block come from the field order of its `#[repr(C)]` struct.

use crate::dispatch::Peripheral;
use crate::reg::RegisterIndex;

pub const TIM2_BASE: usize = 0x4000_0000;
pub const TIM3_BASE: usize = 0x4000_0400;
pub const TIM4_BASE: usize = 0x4000_0800;
pub const TIM5_BASE: usize = 0x4000_0C00;
pub const SPI2_BASE: usize = 0x4000_3800;
pub const SPI3_BASE: usize = 0x4000_3C00;
pub const USART2_BASE: usize = 0x4000_4400;
pub const I2C1_BASE: usize = 0x4000_5400;
pub const I2C2_BASE: usize = 0x4000_5800;
pub const I2C3_BASE: usize = 0x4000_5C00;

pub const TIM1_BASE: usize = 0x4001_0000;
pub const USART1_BASE: usize = 0x4001_1000;
pub const USART6_BASE: usize = 0x4001_1400;
pub const ADC1_BASE: usize = 0x4001_2000;
pub const ADC_COMMON_BASE: usize = 0x4001_2300;
pub const SPI1_BASE: usize = 0x4001_3000;
pub const SPI4_BASE: usize = 0x4001_3400;
pub const EXTI_BASE: usize = 0x4001_3C00;
pub const TIM9_BASE: usize = 0x4001_4000;
pub const TIM10_BASE: usize = 0x4001_4400;
pub const TIM11_BASE: usize = 0x4001_4800;
pub const SPI5_BASE: usize = 0x4001_5000;

pub const GPIOA_BASE: usize = 0x4002_0000;
pub const GPIOB_BASE: usize = 0x4002_0400;
pub const GPIOC_BASE: usize = 0x4002_0800;
pub const GPIOD_BASE: usize = 0x4002_0C00;
pub const GPIOE_BASE: usize = 0x4002_1000;
pub const GPIOH_BASE: usize = 0x4002_1C00;
pub const RCC_BASE: usize = 0x4002_3800;
pub const FLASH_BASE: usize = 0x4002_3C00;

pub const NVIC_BASE: usize = 0xE000_E100;

/// Address of `reg` on `instance`, or `None` if the instance does not implement it.
///
/// ```
/// use f411_regs::map::resolve;
/// use f411_regs::rcc::{Rcc, RccReg};
/// use f411_regs::timer::{TimReg, Timer};
///
/// assert_eq!(resolve(Rcc, RccReg::Cfgr), Some(0x4002_3808));
/// assert_eq!(resolve(Timer::Tim1, TimReg::Bdtr), Some(0x4001_0044));
/// assert_eq!(resolve(Timer::Tim9, TimReg::Bdtr), None);
/// ```
pub fn resolve<P: Peripheral>(instance: P, reg: P::Register) -> Option<usize> {
    instance
        .valid_bits(reg)
        .map(|_| instance.base_address() + reg.offset())
}
