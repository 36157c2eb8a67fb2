//! Advanced and general-purpose timers.
//!
//! All F411 timers share one register layout, but each instance implements a different subset
//! of it. The `#[reg]` masks on [`TimRegisters`] are the union over every timer. The
//! [`Peripheral`] impl of [`Timer`] narrows them to what the instance actually has, keyed by
//! its [`TimerClass`].

use static_assertions::const_assert_eq;

use crate::dispatch::{Block, Peripheral, width_in};
use crate::error::{Error, Result};
use crate::field::{Field, WriteMode};
use crate::map::{
    TIM1_BASE, TIM2_BASE, TIM3_BASE, TIM4_BASE, TIM5_BASE, TIM9_BASE, TIM10_BASE, TIM11_BASE,
};
use crate::rcc::{Gate, RccBlock};
use crate::valid::ValidBits;
use crate::RegMap;

const HALFWORD: ValidBits = ValidBits::only(&[0..=15]);

/// The register block of a timer.
#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = TimReg)]
pub struct TimRegisters {
    /// Control register 1.
    #[reg(valid = ValidBits::from_bits(0x03FF))]
    pub cr1: u32,
    /// Control register 2.
    #[reg(valid = ValidBits::from_bits(0x7FFD))]
    pub cr2: u32,
    /// Slave mode control register.
    #[reg(valid = ValidBits::from_bits(0xFFF7))]
    pub smcr: u32,
    /// DMA/interrupt enable register.
    #[reg(valid = ValidBits::from_bits(0x7FFF))]
    pub dier: u32,
    /// Status register. Flags are cleared by writing 0.
    #[reg(valid = ValidBits::from_bits(0x1EFF))]
    pub sr: u32,
    /// Event generation register.
    #[reg(WO, valid = ValidBits::from_bits(0x00FF))]
    pub egr: u32,
    /// Capture/compare mode register 1.
    #[reg(valid = HALFWORD)]
    pub ccmr1: u32,
    /// Capture/compare mode register 2.
    #[reg(valid = HALFWORD)]
    pub ccmr2: u32,
    /// Capture/compare enable register.
    #[reg(valid = ValidBits::from_bits(0xBFFF))]
    pub ccer: u32,
    /// Counter.
    pub cnt: u32,
    /// Prescaler.
    #[reg(valid = HALFWORD)]
    pub psc: u32,
    /// Auto-reload register.
    pub arr: u32,
    /// Repetition counter register.
    #[reg(valid = ValidBits::from_bits(0x00FF))]
    pub rcr: u32,
    /// Capture/compare register 1.
    pub ccr1: u32,
    /// Capture/compare register 2.
    pub ccr2: u32,
    /// Capture/compare register 3.
    pub ccr3: u32,
    /// Capture/compare register 4.
    pub ccr4: u32,
    /// Break and dead-time register.
    #[reg(valid = HALFWORD)]
    pub bdtr: u32,
    /// DMA control register.
    #[reg(valid = ValidBits::from_bits(0x1F1F))]
    pub dcr: u32,
    /// DMA address for full transfer.
    pub dmar: u32,
    /// Option register (TIM2, TIM5 and TIM11 only).
    #[reg(valid = ValidBits::from_bits(0x0CC3))]
    pub or: u32,
}

const_assert_eq!(TimReg::Ccr1.offset(), 0x34);
const_assert_eq!(TimReg::Bdtr.offset(), 0x44);
const_assert_eq!(TimReg::Or.offset(), 0x50);
const_assert_eq!(core::mem::size_of::<TimRegisters>(), 0x54);

/// Fields of `TIMx_CR1`.
pub mod cr1 {
    use crate::field::Field;

    pub const CEN: Field = Field::at(0, 1);
    pub const UDIS: Field = Field::at(1, 1);
    pub const URS: Field = Field::at(2, 1);
    pub const OPM: Field = Field::at(3, 1);
    pub const DIR: Field = Field::at(4, 1);
    pub const CMS: Field = Field::at(5, 2);
    pub const ARPE: Field = Field::at(7, 1);
    pub const CKD: Field = Field::at(8, 2);
}

/// Fields of `TIMx_CR2`.
pub mod cr2 {
    use crate::field::Field;

    pub const CCPC: Field = Field::at(0, 1);
    pub const CCUS: Field = Field::at(2, 1);
    pub const CCDS: Field = Field::at(3, 1);
    pub const MMS: Field = Field::at(4, 3);
    pub const TI1S: Field = Field::at(7, 1);
}

/// Fields of `TIMx_SMCR`.
pub mod smcr {
    use crate::field::Field;

    pub const SMS: Field = Field::at(0, 3);
    pub const TS: Field = Field::at(4, 3);
    pub const MSM: Field = Field::at(7, 1);
    pub const ETF: Field = Field::at(8, 4);
    pub const ETPS: Field = Field::at(12, 2);
    pub const ECE: Field = Field::at(14, 1);
    pub const ETP: Field = Field::at(15, 1);
}

/// Fields of `TIMx_DIER`, `TIMx_SR` and `TIMx_EGR`: the update bit and the first channel.
pub mod event {
    use crate::field::Field;

    pub const UIE: Field = Field::at(0, 1);
    pub const UIF: Field = Field::at(0, 1);
    pub const UG: Field = Field::at(0, 1);
    pub const CC1: Field = Field::at(1, 1);
}

/// Fields of `TIMx_BDTR`.
pub mod bdtr {
    use crate::field::Field;

    pub const DTG: Field = Field::at(0, 8);
    pub const LOCK: Field = Field::at(8, 2);
    pub const OSSI: Field = Field::at(10, 1);
    pub const OSSR: Field = Field::at(11, 1);
    pub const BKE: Field = Field::at(12, 1);
    pub const BKP: Field = Field::at(13, 1);
    pub const AOE: Field = Field::at(14, 1);
    pub const MOE: Field = Field::at(15, 1);
}

/// Fields of `TIMx_DCR`.
pub mod dcr {
    use crate::field::Field;

    pub const DBA: Field = Field::at(0, 5);
    pub const DBL: Field = Field::at(8, 5);
}

/// `TIMx_PSC`.
pub const PRESCALER: Field = Field::at(0, 16);
/// `TIM1_RCR`.
pub const REPETITION: Field = Field::at(0, 8);

/// Feature subsets of the F411 timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerClass {
    /// TIM1: four channels, complementary outputs, break and repetition counter.
    Advanced,
    /// TIM2, TIM5: four channels and a 32-bit counter.
    Wide,
    /// TIM3, TIM4: four channels and a 16-bit counter.
    Narrow,
    /// TIM9: two channels, slave mode, no master mode.
    TwoChannel,
    /// TIM10, TIM11: one channel.
    OneChannel,
}

/// The timers of the F411.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timer {
    Tim1,
    Tim2,
    Tim3,
    Tim4,
    Tim5,
    Tim9,
    Tim10,
    Tim11,
}

impl Timer {
    /// The feature subset of the timer.
    pub const fn class(self) -> TimerClass {
        match self {
            Self::Tim1 => TimerClass::Advanced,
            Self::Tim2 | Self::Tim5 => TimerClass::Wide,
            Self::Tim3 | Self::Tim4 => TimerClass::Narrow,
            Self::Tim9 => TimerClass::TwoChannel,
            Self::Tim10 | Self::Tim11 => TimerClass::OneChannel,
        }
    }

    /// The timer's clock gate.
    pub const fn gate(self) -> Gate {
        match self {
            Self::Tim1 => Gate::Tim1,
            Self::Tim2 => Gate::Tim2,
            Self::Tim3 => Gate::Tim3,
            Self::Tim4 => Gate::Tim4,
            Self::Tim5 => Gate::Tim5,
            Self::Tim9 => Gate::Tim9,
            Self::Tim10 => Gate::Tim10,
            Self::Tim11 => Gate::Tim11,
        }
    }

    /// Width of the counter, auto-reload and capture/compare registers.
    pub const fn counter_width(self) -> u8 {
        match self.class() {
            TimerClass::Wide => 32,
            _ => 16,
        }
    }

    /// Largest auto-reload value.
    pub const fn counter_max(self) -> u32 {
        match self.counter_width() {
            32 => u32::MAX,
            _ => 0xFFFF,
        }
    }

    /// The remap field of `TIMx_OR`, on the timers that have one.
    pub const fn remap_field(self) -> Option<Field> {
        match self {
            Self::Tim2 => Some(Field::at(10, 2)),
            Self::Tim5 => Some(Field::at(6, 2)),
            Self::Tim11 => Some(Field::at(0, 2)),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Timer {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        Ok(match index {
            1 => Self::Tim1,
            2 => Self::Tim2,
            3 => Self::Tim3,
            4 => Self::Tim4,
            5 => Self::Tim5,
            9 => Self::Tim9,
            10 => Self::Tim10,
            11 => Self::Tim11,
            _ => return Err(Error::UnknownInstance(index)),
        })
    }
}

/// Valid bits of `reg` on a timer of `class`, `None` where the class lacks the register.
///
/// `TIMx_OR` is keyed by instance instead and handled by the caller.
const fn class_bits(class: TimerClass, reg: TimReg) -> Option<u32> {
    use TimReg::*;
    use TimerClass::*;

    let wide = matches!(class, Wide);
    let four_channels = matches!(class, Advanced | Wide | Narrow);
    let counter = if wide { u32::MAX } else { 0xFFFF };
    Some(match reg {
        Cr1 => match class {
            TwoChannel => 0x038F,
            OneChannel => 0x0387,
            _ => 0x03FF,
        },
        Cr2 => match class {
            Advanced => 0x7FFD,
            Wide | Narrow => 0x00F8,
            _ => return None,
        },
        Smcr => match class {
            OneChannel => return None,
            TwoChannel => 0x00F7,
            _ => 0xFFF7,
        },
        Dier => match class {
            Advanced => 0x7FFF,
            Wide | Narrow => 0x5F5F,
            TwoChannel => 0x0047,
            OneChannel => 0x0003,
        },
        Sr => match class {
            Advanced => 0x1EFF,
            Wide | Narrow => 0x1E5F,
            TwoChannel => 0x0647,
            OneChannel => 0x0203,
        },
        Egr => match class {
            Advanced => 0x00FF,
            Wide | Narrow => 0x005F,
            TwoChannel => 0x0047,
            OneChannel => 0x0003,
        },
        Ccmr1 => match class {
            OneChannel => 0x00FF,
            _ => 0xFFFF,
        },
        Ccmr2 | Ccr3 | Ccr4 if !four_channels => return None,
        Ccmr2 => 0xFFFF,
        Ccer => match class {
            Advanced => 0xBFFF,
            Wide | Narrow => 0xBBBB,
            TwoChannel => 0x00BB,
            OneChannel => 0x000B,
        },
        Cnt | Arr | Ccr1 | Ccr3 | Ccr4 => counter,
        Ccr2 => match class {
            OneChannel => return None,
            _ => counter,
        },
        Psc => 0xFFFF,
        Rcr | Bdtr if !matches!(class, Advanced) => return None,
        Rcr => 0x00FF,
        Bdtr => 0xFFFF,
        Dcr | Dmar if !four_channels => return None,
        Dcr => 0x1F1F,
        Dmar => match class {
            Advanced => u32::MAX,
            _ => 0xFFFF,
        },
        Or => return None,
    })
}

impl Peripheral for Timer {
    type Register = TimReg;
    type Ptr<'a> = TimRegistersPtr<'a>;

    fn base_address(self) -> usize {
        match self {
            Self::Tim1 => TIM1_BASE,
            Self::Tim2 => TIM2_BASE,
            Self::Tim3 => TIM3_BASE,
            Self::Tim4 => TIM4_BASE,
            Self::Tim5 => TIM5_BASE,
            Self::Tim9 => TIM9_BASE,
            Self::Tim10 => TIM10_BASE,
            Self::Tim11 => TIM11_BASE,
        }
    }

    fn valid_bits(self, reg: TimReg) -> Option<ValidBits> {
        let bits = match reg {
            TimReg::Or => self.remap_field().map(Field::mask),
            _ => class_bits(self.class(), reg),
        };
        bits.map(ValidBits::from_bits)
    }

    fn field_width(self, reg: TimReg, position: u8) -> Option<u8> {
        let counter = Field::at(0, self.counter_width());
        match reg {
            TimReg::Cr1 => width_in(&[cr1::CMS, cr1::CKD], position),
            TimReg::Cr2 => width_in(&[cr2::MMS], position),
            TimReg::Smcr => width_in(&[smcr::SMS, smcr::TS, smcr::ETF, smcr::ETPS], position),
            // input and output layouts overlap
            TimReg::Ccmr1 | TimReg::Ccmr2 => None,
            TimReg::Cnt
            | TimReg::Arr
            | TimReg::Ccr1
            | TimReg::Ccr2
            | TimReg::Ccr3
            | TimReg::Ccr4 => width_in(&[counter], position),
            TimReg::Psc => width_in(&[PRESCALER], position),
            TimReg::Rcr => width_in(&[REPETITION], position),
            TimReg::Bdtr => width_in(&[bdtr::DTG, bdtr::LOCK], position),
            TimReg::Dcr => width_in(&[dcr::DBA, dcr::DBL], position),
            TimReg::Dmar => match self.class() {
                TimerClass::Advanced => width_in(&[Field::at(0, 32)], position),
                _ => width_in(&[Field::at(0, 16)], position),
            },
            TimReg::Or => match self.remap_field() {
                Some(field) => width_in(&[field], position),
                None => Some(1),
            },
            _ => Some(1),
        }
    }

    fn write_mode(self, reg: TimReg, _field: Field, _value: u32) -> Result<WriteMode> {
        Ok(match reg {
            // flags are cleared by writing 0, writing 1 leaves them alone
            TimReg::Sr => WriteMode::ClearByZero,
            _ => WriteMode::Modify,
        })
    }
}

/// A timer bound to its registers.
pub type TimerBlock<'a> = Block<'a, Timer>;

/// Prescaler and auto-reload values for a periodic update event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerCalc {
    /// `PSC`: the counter clock is the timer clock divided by `psc + 1`.
    pub psc: u32,
    /// `ARR`: the counter wraps after `arr + 1` ticks.
    pub arr: u32,
    /// The update rate actually reached, rounded to the nearest hertz.
    pub actual_hz: u32,
}

/// Picks the smallest prescaler that lets `max_arr` reach `target_hz` from `clock_hz`, which
/// keeps the most resolution in the counter.
///
/// ```
/// use f411_regs::timer::compute_period;
///
/// let calc = compute_period(16_000_000, 1_000, 0xFFFF).unwrap();
/// assert_eq!((calc.psc, calc.arr, calc.actual_hz), (0, 15_999, 1_000));
///
/// let calc = compute_period(100_000_000, 1, 0xFFFF).unwrap();
/// assert_eq!((calc.psc, calc.arr, calc.actual_hz), (1_525, 65_530, 1));
/// ```
pub fn compute_period(clock_hz: u32, target_hz: u32, max_arr: u32) -> Result<TimerCalc> {
    if target_hz == 0 || clock_hz == 0 || max_arr == 0 {
        return Err(Error::InvalidConfig("timer clock, rate and reload must be non-zero"));
    }
    let (clock, target) = (u64::from(clock_hz), u64::from(target_hz));
    let ticks = (clock + target / 2) / target;
    if ticks < 2 {
        return Err(Error::InvalidConfig("timer update rate above half the timer clock"));
    }
    let prescale = ticks.div_ceil(u64::from(max_arr) + 1);
    if prescale > u64::from(PRESCALER.max_value()) + 1 {
        return Err(Error::InvalidConfig("timer update rate too slow for the prescaler"));
    }
    let reload = ((ticks + prescale / 2) / prescale).max(1);
    let period = prescale * reload;
    Ok(TimerCalc {
        // both bounded by the checks above
        psc: (prescale - 1) as u32,
        arr: (reload - 1) as u32,
        actual_hz: ((clock + period / 2) / period) as u32,
    })
}

impl TimerBlock<'_> {
    /// Turns the timer clock on and starts it counting up, raising an update interrupt
    /// request at `target_hz`.
    ///
    /// The counter is stopped while `PSC` and `ARR` change, then an update event loads them
    /// and its flag is cleared so no interrupt fires for it.
    pub fn start_periodic(
        &self,
        rcc: &RccBlock<'_>,
        clock_hz: u32,
        target_hz: u32,
    ) -> Result<TimerCalc> {
        let timer = self.instance();
        let calc = compute_period(clock_hz, target_hz, timer.counter_max())?;
        rcc.enable(timer.gate())?;
        self.set(TimReg::Cr1, cr1::CEN, 0)?;
        self.set(TimReg::Psc, PRESCALER, calc.psc)?;
        self.set(TimReg::Arr, Field::at(0, timer.counter_width()), calc.arr)?;
        self.set(TimReg::Egr, event::UG, 1)?;
        self.set(TimReg::Sr, event::UIF, 0)?;
        self.set(TimReg::Dier, event::UIE, 1)?;
        self.set(TimReg::Cr1, cr1::CEN, 1)?;
        Ok(calc)
    }

    /// Stops the counter and masks the update interrupt.
    pub fn stop(&self) -> Result<()> {
        self.set(TimReg::Cr1, cr1::CEN, 0)?;
        self.set(TimReg::Dier, event::UIE, 0)
    }

    /// Acknowledges a pending update event. Returns whether one was pending.
    pub fn clear_update(&self) -> Result<bool> {
        let pending = self.is_set(TimReg::Sr, event::UIF)?;
        if pending {
            self.set(TimReg::Sr, event::UIF, 0)?;
        }
        Ok(pending)
    }
}
