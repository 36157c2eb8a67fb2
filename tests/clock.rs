use f411_regs::clock::{
    ApbPrescaler, ClockConfig, ClockError, ClockState, ClockTree, Pllp, Timeouts,
};
use f411_regs::flash::{Flash, FlashBlock, FlashRegisters, FlashRegistersPtr};
use f411_regs::rcc::{Gate, Rcc, RccBlock, RccRegisters, RccRegistersPtr};

const HSERDY: u32 = 1 << 17;
const PLLRDY: u32 = 1 << 25;
const SWS_PLL: u32 = 0b10 << 2;

fn short_timeouts() -> ClockConfig {
    ClockConfig {
        timeouts: Timeouts {
            hse_ready: 16,
            pll_ready: 16,
            switch: 16,
        },
        ..Default::default()
    }
}

fn run(
    rcc_regs: &mut RccRegisters,
    flash_regs: &mut FlashRegisters,
    config: ClockConfig,
) -> (Result<(), ClockError>, ClockState) {
    let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(rcc_regs));
    let flash = FlashBlock::new(Flash, FlashRegistersPtr::from_mut(flash_regs));
    let mut tree = ClockTree::new(rcc, flash, config).unwrap();
    let result = tree.run().map(|_| ());
    (result, tree.state())
}

#[test]
fn default_tree_reaches_100_mhz() {
    let mut rcc_regs = RccRegisters::default();
    let mut flash_regs = FlashRegisters::default();
    rcc_regs.cr = HSERDY | PLLRDY;
    rcc_regs.cfgr = SWS_PLL;
    // reset value, bit 29 is reserved and must survive
    rcc_regs.pllcfgr = 0x2400_3010;

    let (result, state) = run(&mut rcc_regs, &mut flash_regs, ClockConfig::default());
    assert_eq!(result, Ok(()));
    assert_eq!(state, ClockState::Stable);

    // HSEON, HSERDY, PLLON, PLLRDY
    assert_eq!(rcc_regs.cr, (1 << 16) | HSERDY | (1 << 24) | PLLRDY);
    // M = 8, N = 200, P = /2, PLLSRC = HSE, Q = 4
    assert_eq!(
        rcc_regs.pllcfgr,
        (1 << 29) | (4 << 24) | (1 << 22) | (200 << 6) | 8
    );
    assert_eq!(rcc_regs.pllcfgr, 0x2440_3208);
    // SW = PLL, AHB /1, APB1 /2, APB2 /1
    assert_eq!(rcc_regs.cfgr, 0b10 | SWS_PLL | (0b100 << 10));
    // three wait states, prefetch and both caches on
    assert_eq!(flash_regs.acr, 3 | (1 << 8) | (1 << 9) | (1 << 10));
}

#[test]
fn step_by_step() {
    let mut rcc_regs = RccRegisters::default();
    let mut flash_regs = FlashRegisters::default();
    rcc_regs.cr = HSERDY | PLLRDY;
    rcc_regs.cfgr = SWS_PLL;

    let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
    let flash = FlashBlock::new(Flash, FlashRegistersPtr::from_mut(&mut flash_regs));
    let mut tree = ClockTree::new(rcc, flash, ClockConfig::default()).unwrap();
    assert_eq!(tree.state(), ClockState::Reset);

    let expected = [
        ClockState::WaitOscillatorReady,
        ClockState::ConfigurePll,
        ClockState::ConfigureBusDividers,
        ClockState::EnablePll,
        ClockState::WaitPllLocked,
        ClockState::ProgramFlashWaitStates,
        ClockState::SwitchSystemClock,
        ClockState::WaitSwitchConfirmed,
        ClockState::Stable,
    ];
    for state in expected {
        assert_eq!(tree.step(), Ok(state));
        assert_eq!(tree.state(), state);
    }
    assert_eq!(tree.step(), Ok(ClockState::Stable));
    assert_eq!(tree.clocks().sysclk, 100_000_000);
}

#[test]
fn release_hands_the_blocks_back() {
    let mut rcc_regs = RccRegisters::default();
    let mut flash_regs = FlashRegisters::default();
    rcc_regs.cr = HSERDY | PLLRDY;
    rcc_regs.cfgr = SWS_PLL;
    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
        let flash = FlashBlock::new(Flash, FlashRegistersPtr::from_mut(&mut flash_regs));
        let mut tree = ClockTree::new(rcc, flash, ClockConfig::default()).unwrap();
        tree.run().unwrap();

        let (rcc, flash) = tree.release();
        assert_eq!(rcc.system_clock_source(), Ok(0b10));
        assert_eq!(flash.latency(), Ok(3));
        rcc.enable(Gate::GpioA).unwrap();
    }
    assert_eq!(rcc_regs.ahb1enr, 1);
}

#[test]
fn hse_timeout_keeps_hsi() {
    let mut rcc_regs = RccRegisters::default();
    let mut flash_regs = FlashRegisters::default();

    let (result, state) = run(&mut rcc_regs, &mut flash_regs, short_timeouts());
    assert_eq!(
        result,
        Err(ClockError::Timeout {
            state: ClockState::WaitOscillatorReady,
            limit: 16
        })
    );
    assert_eq!(state, ClockState::WaitOscillatorReady);

    // only HSEON was written, the core still runs from HSI
    assert_eq!(rcc_regs.cr, 1 << 16);
    assert_eq!(rcc_regs.pllcfgr, 0);
    assert_eq!(rcc_regs.cfgr, 0);
    assert_eq!(flash_regs.acr, 0);
}

#[test]
fn pll_timeout_keeps_hsi() {
    let mut rcc_regs = RccRegisters::default();
    let mut flash_regs = FlashRegisters::default();
    rcc_regs.cr = HSERDY;

    let (result, state) = run(&mut rcc_regs, &mut flash_regs, short_timeouts());
    assert_eq!(
        result,
        Err(ClockError::Timeout {
            state: ClockState::WaitPllLocked,
            limit: 16
        })
    );
    assert_eq!(state, ClockState::WaitPllLocked);

    // the PLL is programmed and on, but neither the flash latency nor the switch happened
    assert_eq!(rcc_regs.cr, (1 << 16) | HSERDY | (1 << 24));
    assert_eq!(rcc_regs.cfgr & 0b11, 0);
    assert_eq!(flash_regs.acr, 0);
}

#[test]
fn switch_timeout() {
    let mut rcc_regs = RccRegisters::default();
    let mut flash_regs = FlashRegisters::default();
    rcc_regs.cr = HSERDY | PLLRDY;

    let (result, state) = run(&mut rcc_regs, &mut flash_regs, short_timeouts());
    assert_eq!(
        result,
        Err(ClockError::Timeout {
            state: ClockState::WaitSwitchConfirmed,
            limit: 16
        })
    );
    assert_eq!(state, ClockState::WaitSwitchConfirmed);
    assert_eq!(rcc_regs.cfgr & 0b11, 0b10);
    assert_eq!(flash_regs.acr & 0xF, 3);
}

#[test]
fn bypass_and_slow_bus() {
    let mut rcc_regs = RccRegisters::default();
    let mut flash_regs = FlashRegisters::default();
    rcc_regs.cr = HSERDY | PLLRDY;
    rcc_regs.cfgr = SWS_PLL;

    // 25 MHz external clock to 96 MHz, USB at 48 MHz
    let config = ClockConfig {
        hse_hz: 25_000_000,
        hse_bypass: true,
        pllm: 25,
        plln: 192,
        pllp: Pllp::Div2,
        pllq: 4,
        apb2: ApbPrescaler::Div2,
        dcache: false,
        ..Default::default()
    };
    let clocks = config.validate().unwrap();
    assert_eq!(clocks.sysclk, 96_000_000);
    assert_eq!(clocks.pclk1, 48_000_000);
    assert_eq!(clocks.pclk2, 48_000_000);
    assert_eq!(clocks.pll48, 48_000_000);
    assert_eq!(clocks.apb2_timer(), 96_000_000);

    let (result, _) = run(&mut rcc_regs, &mut flash_regs, config);
    assert_eq!(result, Ok(()));
    assert_eq!(rcc_regs.cr & (1 << 18), 1 << 18);
    assert_eq!((rcc_regs.pllcfgr >> 6) & 0x1FF, 192);
    assert_eq!((rcc_regs.cfgr >> 13) & 0b111, 0b100);
    assert_eq!(flash_regs.acr, 3 | (1 << 8) | (1 << 9));
}

#[test]
fn default_clocks() {
    let clocks = ClockConfig::default().validate().unwrap();
    assert_eq!(clocks.sysclk, 100_000_000);
    assert_eq!(clocks.hclk, 100_000_000);
    assert_eq!(clocks.pclk1, 50_000_000);
    assert_eq!(clocks.pclk2, 100_000_000);
    assert_eq!(clocks.pll48, 50_000_000);
    assert_eq!(clocks.apb1_timer(), 100_000_000);
    assert_eq!(clocks.apb2_timer(), 100_000_000);
}

#[test]
fn invalid_configs_touch_nothing() {
    let invalid = [
        ClockConfig {
            pllm: 1,
            ..Default::default()
        },
        ClockConfig {
            plln: 433,
            ..Default::default()
        },
        ClockConfig {
            pllq: 1,
            ..Default::default()
        },
        ClockConfig {
            hse_hz: 30_000_000,
            ..Default::default()
        },
        // 216 MHz SYSCLK
        ClockConfig {
            plln: 432,
            ..Default::default()
        },
        // 100 MHz on APB1
        ClockConfig {
            apb1: ApbPrescaler::Div1,
            ..Default::default()
        },
        // 4 MHz VCO input
        ClockConfig {
            pllm: 2,
            ..Default::default()
        },
    ];

    for config in invalid {
        let mut rcc_regs = RccRegisters::default();
        let mut flash_regs = FlashRegisters::default();
        {
            let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
            let flash = FlashBlock::new(Flash, FlashRegistersPtr::from_mut(&mut flash_regs));
            let error = ClockTree::new(rcc, flash, config).err();
            assert!(
                matches!(error, Some(ClockError::InvalidConfig(_))),
                "{config:?} gave {error:?}"
            );
        }
        assert_eq!(rcc_regs.cr, 0);
        assert_eq!(rcc_regs.pllcfgr, 0);
        assert_eq!(flash_regs.acr, 0);
    }
}

#[test]
fn error_messages() {
    let timeout = ClockError::Timeout {
        state: ClockState::WaitPllLocked,
        limit: 16,
    };
    assert_eq!(
        timeout.to_string(),
        "clock tree stuck in WaitPllLocked after 16 polls"
    );
    assert_eq!(
        ClockError::from(f411_regs::Error::AccessDenied),
        ClockError::Register(f411_regs::Error::AccessDenied)
    );
}
