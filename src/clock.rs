//! Clock tree bring-up: HSE, main PLL, bus prescalers, flash latency and the system clock switch.
//!
//! [`ClockTree`] walks the sequence one [`ClockState`] at a time. Every wait on hardware is a
//! bounded poll; when a bound runs out the walk stops where it is and reports the state that
//! timed out. Nothing after that state is touched, so the core keeps running from whatever
//! source was active before, HSI after a reset.
//!
//! ```
//! use f411_regs::clock::{ClockConfig, ClockState, ClockTree};
//! use f411_regs::flash::{Flash, FlashBlock, FlashRegisters, FlashRegistersPtr};
//! use f411_regs::rcc::{Rcc, RccBlock, RccRegisters, RccRegistersPtr};
//!
//! let mut rcc_regs = RccRegisters::default();
//! let mut flash_regs = FlashRegisters::default();
//! // simulated hardware: ready flags up and the switch already confirmed
//! rcc_regs.cr = (1 << 17) | (1 << 25);
//! rcc_regs.cfgr = 0b10 << 2;
//!
//! let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
//! let flash = FlashBlock::new(Flash, FlashRegistersPtr::from_mut(&mut flash_regs));
//! let mut tree = ClockTree::new(rcc, flash, ClockConfig::default()).unwrap();
//! let clocks = tree.run().unwrap();
//! assert_eq!(tree.state(), ClockState::Stable);
//! assert_eq!(clocks.sysclk, 100_000_000);
//! assert_eq!(clocks.apb1_timer(), 100_000_000);
//! ```

use core::fmt;

use crate::error::{Error, Result};
use crate::flash::{wait_states_for, Flash, FlashBlock};
use crate::poll::wait_until;
use crate::rcc::{cfgr, cr, pllcfgr, Rcc, RccBlock, RccReg};

/// Polls of `CR.HSERDY` before giving up on the external oscillator.
pub const HSE_READY_TIMEOUT: u32 = 0x2000;
/// Polls of `CR.PLLRDY` before giving up on the PLL lock.
pub const PLL_READY_TIMEOUT: u32 = 0x4000;
/// Polls of `CFGR.SWS` before giving up on the system clock switch.
pub const SWITCH_TIMEOUT: u32 = 0x4000;

/// `CFGR.SW` / `CFGR.SWS` code of the main PLL.
const SOURCE_PLL: u32 = 0b10;

const MAX_SYSCLK_HZ: u32 = 100_000_000;
const MAX_PCLK1_HZ: u32 = 50_000_000;
const MAX_PCLK2_HZ: u32 = 100_000_000;

/// Bounds of the waits on hardware, in polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeouts {
    pub hse_ready: u32,
    pub pll_ready: u32,
    pub switch: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            hse_ready: HSE_READY_TIMEOUT,
            pll_ready: PLL_READY_TIMEOUT,
            switch: SWITCH_TIMEOUT,
        }
    }
}

/// Division factor for the AHB clock, as encoded in `CFGR.HPRE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AhbPrescaler {
    Div1 = 0b0000,
    Div2 = 0b1000,
    Div4 = 0b1001,
    Div8 = 0b1010,
    Div16 = 0b1011,
    Div64 = 0b1100,
    Div128 = 0b1101,
    Div256 = 0b1110,
    Div512 = 0b1111,
}

impl AhbPrescaler {
    pub const fn divisor(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div64 => 64,
            Self::Div128 => 128,
            Self::Div256 => 256,
            Self::Div512 => 512,
        }
    }
}

/// Division factor for an APB clock, as encoded in `CFGR.PPRE1` and `CFGR.PPRE2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ApbPrescaler {
    Div1 = 0b000,
    Div2 = 0b100,
    Div4 = 0b101,
    Div8 = 0b110,
    Div16 = 0b111,
}

impl ApbPrescaler {
    pub const fn divisor(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
        }
    }
}

/// Division factor between the VCO and SYSCLK, as encoded in `PLLCFGR.PLLP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Pllp {
    Div2 = 0b00,
    Div4 = 0b01,
    Div6 = 0b10,
    Div8 = 0b11,
}

impl Pllp {
    pub const fn divisor(self) -> u32 {
        2 * (self as u32 + 1)
    }
}

/// The clock tree to bring up. Start from [`Default`] and adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Frequency of the external oscillator or crystal.
    pub hse_hz: u32,
    /// The HSE pin is driven by an external clock instead of a crystal.
    pub hse_bypass: bool,
    /// VCO input divider, 2..=63.
    pub pllm: u8,
    /// VCO multiplier, 50..=432.
    pub plln: u16,
    pub pllp: Pllp,
    /// Divider of the 48 MHz domain (USB OTG, SDIO), 2..=15.
    pub pllq: u8,
    pub ahb: AhbPrescaler,
    pub apb1: ApbPrescaler,
    pub apb2: ApbPrescaler,
    pub prefetch: bool,
    pub icache: bool,
    pub dcache: bool,
    pub timeouts: Timeouts,
}

impl Default for ClockConfig {
    /// 8 MHz HSE to a 100 MHz SYSCLK: 1 MHz VCO input, 200 MHz VCO, APB1 halved to 50 MHz.
    fn default() -> Self {
        Self {
            hse_hz: 8_000_000,
            hse_bypass: false,
            pllm: 8,
            plln: 200,
            pllp: Pllp::Div2,
            pllq: 4,
            ahb: AhbPrescaler::Div1,
            apb1: ApbPrescaler::Div2,
            apb2: ApbPrescaler::Div1,
            prefetch: true,
            icache: true,
            dcache: true,
            timeouts: Timeouts::default(),
        }
    }
}

impl ClockConfig {
    /// Checks every divider and frequency against the datasheet limits and returns the
    /// resulting bus clocks.
    pub fn validate(&self) -> core::result::Result<Clocks, ClockError> {
        if !(4_000_000..=26_000_000).contains(&self.hse_hz) {
            return Err(ClockError::InvalidConfig("HSE outside 4..=26 MHz"));
        }
        if !(2..=63).contains(&self.pllm) {
            return Err(ClockError::InvalidConfig("PLLM outside 2..=63"));
        }
        if !(50..=432).contains(&self.plln) {
            return Err(ClockError::InvalidConfig("PLLN outside 50..=432"));
        }
        if !(2..=15).contains(&self.pllq) {
            return Err(ClockError::InvalidConfig("PLLQ outside 2..=15"));
        }
        let vco_in = self.hse_hz / u32::from(self.pllm);
        if !(1_000_000..=2_000_000).contains(&vco_in) {
            return Err(ClockError::InvalidConfig("VCO input outside 1..=2 MHz"));
        }
        let vco = u64::from(self.hse_hz) * u64::from(self.plln) / u64::from(self.pllm);
        if !(100_000_000..=432_000_000).contains(&vco) {
            return Err(ClockError::InvalidConfig("VCO output outside 100..=432 MHz"));
        }
        // bounded by the VCO check
        let vco = vco as u32;
        let sysclk = vco / self.pllp.divisor();
        if sysclk > MAX_SYSCLK_HZ {
            return Err(ClockError::InvalidConfig("SYSCLK above 100 MHz"));
        }
        let hclk = sysclk / self.ahb.divisor();
        let pclk1 = hclk / self.apb1.divisor();
        if pclk1 > MAX_PCLK1_HZ {
            return Err(ClockError::InvalidConfig("APB1 clock above 50 MHz"));
        }
        let pclk2 = hclk / self.apb2.divisor();
        if pclk2 > MAX_PCLK2_HZ {
            return Err(ClockError::InvalidConfig("APB2 clock above 100 MHz"));
        }
        Ok(Clocks {
            sysclk,
            hclk,
            pclk1,
            pclk2,
            pll48: vco / u32::from(self.pllq),
            apb1_divided: self.apb1 != ApbPrescaler::Div1,
            apb2_divided: self.apb2 != ApbPrescaler::Div1,
        })
    }
}

/// Frozen clock frequencies, in hertz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    pub sysclk: u32,
    pub hclk: u32,
    pub pclk1: u32,
    pub pclk2: u32,
    /// The PLL48CLK domain (USB OTG FS, SDIO).
    pub pll48: u32,
    apb1_divided: bool,
    apb2_divided: bool,
}

impl Clocks {
    /// Kernel clock of the timers on APB1 (TIM2..=TIM5): doubled when APB1 is divided.
    pub const fn apb1_timer(&self) -> u32 {
        if self.apb1_divided {
            self.pclk1 * 2
        } else {
            self.pclk1
        }
    }

    /// Kernel clock of the timers on APB2 (TIM1, TIM9..=TIM11).
    pub const fn apb2_timer(&self) -> u32 {
        if self.apb2_divided {
            self.pclk2 * 2
        } else {
            self.pclk2
        }
    }
}

/// Steps of the bring-up sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockState {
    /// Turn the PLL off and start the HSE.
    Reset,
    /// Wait for `HSERDY`.
    WaitOscillatorReady,
    /// Select HSE as PLL input and program M, N, P and Q.
    ConfigurePll,
    /// Program the AHB and APB prescalers.
    ConfigureBusDividers,
    /// Turn the PLL on.
    EnablePll,
    /// Wait for `PLLRDY`.
    WaitPllLocked,
    /// Program the flash latency for the new HCLK, before it applies.
    ProgramFlashWaitStates,
    /// Select the PLL as system clock.
    SwitchSystemClock,
    /// Wait for `SWS` to report the PLL.
    WaitSwitchConfirmed,
    /// Running from the PLL.
    Stable,
}

impl ClockState {
    const fn next(self) -> Self {
        match self {
            Self::Reset => Self::WaitOscillatorReady,
            Self::WaitOscillatorReady => Self::ConfigurePll,
            Self::ConfigurePll => Self::ConfigureBusDividers,
            Self::ConfigureBusDividers => Self::EnablePll,
            Self::EnablePll => Self::WaitPllLocked,
            Self::WaitPllLocked => Self::ProgramFlashWaitStates,
            Self::ProgramFlashWaitStates => Self::SwitchSystemClock,
            Self::SwitchSystemClock => Self::WaitSwitchConfirmed,
            Self::WaitSwitchConfirmed | Self::Stable => Self::Stable,
        }
    }
}

/// Why the clock tree did not reach [`ClockState::Stable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// The configuration breaks a datasheet limit. Nothing was written.
    InvalidConfig(&'static str),
    /// Hardware did not confirm within `limit` polls; the sequence stopped in `state`.
    Timeout { state: ClockState, limit: u32 },
    /// A register access was refused.
    Register(Error),
}

impl From<Error> for ClockError {
    fn from(error: Error) -> Self {
        Self::Register(error)
    }
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(what) => write!(f, "invalid clock configuration: {what}"),
            Self::Timeout { state, limit } => {
                write!(f, "clock tree stuck in {state:?} after {limit} polls")
            }
            Self::Register(error) => write!(f, "clock tree register access failed: {error}"),
        }
    }
}

/// The bring-up sequence, bound to the RCC and flash interface it drives.
pub struct ClockTree<'a> {
    rcc: RccBlock<'a>,
    flash: FlashBlock<'a>,
    config: ClockConfig,
    clocks: Clocks,
    state: ClockState,
}

impl<'a> ClockTree<'a> {
    /// Validates `config` and prepares the sequence in [`ClockState::Reset`]. Nothing is written
    /// yet.
    pub fn new(
        rcc: RccBlock<'a>,
        flash: FlashBlock<'a>,
        config: ClockConfig,
    ) -> core::result::Result<Self, ClockError> {
        let clocks = config.validate()?;
        Ok(Self {
            rcc,
            flash,
            config,
            clocks,
            state: ClockState::Reset,
        })
    }

    /// The next step to run, or the step that failed.
    #[inline]
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// The frequencies the tree runs at once [`ClockState::Stable`] is reached.
    #[inline]
    pub fn clocks(&self) -> Clocks {
        self.clocks
    }

    /// Hands the blocks back.
    pub fn release(self) -> (RccBlock<'a>, FlashBlock<'a>) {
        (self.rcc, self.flash)
    }

    /// Runs the current step and moves to the next one.
    ///
    /// On error the state is left on the failed step.
    pub fn step(&mut self) -> core::result::Result<ClockState, ClockError> {
        let rcc = &self.rcc;
        let config = &self.config;
        match self.state {
            ClockState::Reset => {
                rcc.set(RccReg::Cr, cr::PLLON, 0)?;
                rcc.set(RccReg::Cr, cr::HSEBYP, config.hse_bypass.into())?;
                rcc.set(RccReg::Cr, cr::HSEON, 1)?;
            }
            ClockState::WaitOscillatorReady => {
                self.poll(config.timeouts.hse_ready, || rcc.is_set(RccReg::Cr, cr::HSERDY))?;
            }
            ClockState::ConfigurePll => {
                rcc.set(RccReg::Pllcfgr, pllcfgr::PLLSRC, 1)?;
                rcc.set(RccReg::Pllcfgr, pllcfgr::PLLM, config.pllm.into())?;
                rcc.set(RccReg::Pllcfgr, pllcfgr::PLLN, config.plln.into())?;
                rcc.set(RccReg::Pllcfgr, pllcfgr::PLLP, config.pllp as u32)?;
                rcc.set(RccReg::Pllcfgr, pllcfgr::PLLQ, config.pllq.into())?;
            }
            ClockState::ConfigureBusDividers => {
                rcc.set(RccReg::Cfgr, cfgr::HPRE, config.ahb as u32)?;
                rcc.set(RccReg::Cfgr, cfgr::PPRE1, config.apb1 as u32)?;
                rcc.set(RccReg::Cfgr, cfgr::PPRE2, config.apb2 as u32)?;
            }
            ClockState::EnablePll => {
                rcc.set(RccReg::Cr, cr::PLLON, 1)?;
            }
            ClockState::WaitPllLocked => {
                self.poll(config.timeouts.pll_ready, || rcc.is_set(RccReg::Cr, cr::PLLRDY))?;
            }
            ClockState::ProgramFlashWaitStates => {
                let wait_states = wait_states_for(self.clocks.hclk)
                    .ok_or(ClockError::InvalidConfig("HCLK above 100 MHz"))?;
                self.flash.set_latency(wait_states)?;
                self.flash
                    .set_caches(config.prefetch, config.icache, config.dcache)?;
            }
            ClockState::SwitchSystemClock => {
                rcc.set(RccReg::Cfgr, cfgr::SW, SOURCE_PLL)?;
            }
            ClockState::WaitSwitchConfirmed => {
                self.poll(config.timeouts.switch, || {
                    Ok(rcc.get(RccReg::Cfgr, cfgr::SWS)? == SOURCE_PLL)
                })?;
            }
            ClockState::Stable => return Ok(ClockState::Stable),
        }
        let next = self.state.next();
        debug!("clock tree: {} -> {}", self.state, next);
        self.state = next;
        Ok(next)
    }

    /// Runs the remaining steps and returns the frozen clocks.
    pub fn run(&mut self) -> core::result::Result<Clocks, ClockError> {
        while self.step()? != ClockState::Stable {}
        Ok(self.clocks)
    }

    fn poll(
        &self,
        limit: u32,
        mut ready: impl FnMut() -> Result<bool>,
    ) -> core::result::Result<(), ClockError> {
        let mut status = Ok(false);
        match wait_until(limit, || {
            status = ready();
            status != Ok(false)
        }) {
            Ok(spins) => {
                status?;
                debug!("clock tree: {} done after {} polls", self.state, spins);
                Ok(())
            }
            Err(timeout) => {
                warn!("clock tree: {} timed out after {} polls", self.state, timeout.limit);
                Err(ClockError::Timeout {
                    state: self.state,
                    limit: timeout.limit,
                })
            }
        }
    }
}

/// Brings the clock tree of the running chip up to the default 100 MHz configuration.
///
/// # Safety
/// The code must run on an STM32F411 with an 8 MHz HSE, and nothing else may touch the RCC or
/// the flash interface meanwhile.
pub unsafe fn init_clock_tree() -> core::result::Result<Clocks, ClockError> {
    // SAFETY: forwarded to the caller
    let (rcc, flash) = unsafe { (RccBlock::take(Rcc), FlashBlock::take(Flash)) };
    ClockTree::new(rcc, flash, ClockConfig::default())?.run()
}
