use f411_regs::adc::{
    Adc, AdcBlock, AdcCommon, AdcCommonBlock, AdcCommonReg, AdcCommonRegisters,
    AdcCommonRegistersPtr, AdcRegisters, AdcRegistersPtr,
};
use f411_regs::exti::{
    line_interrupt, Exti, ExtiBlock, ExtiReg, ExtiRegisters, ExtiRegistersPtr, Trigger,
};
use f411_regs::flash::{
    sr, wait_states_for, Flash, FlashBlock, FlashReg, FlashRegisters, FlashRegistersPtr,
};
use f411_regs::gpio::{GpioBlock, GpioPort, GpioReg, GpioRegisters, GpioRegistersPtr};
use f411_regs::i2c::{I2cBlock, I2cBus, I2cMode, I2cReg, I2cRegisters, I2cRegistersPtr};
use f411_regs::map::resolve;
use f411_regs::nvic::{Interrupt, Nvic, NvicRegisters, NvicRegistersPtr};
use f411_regs::poll::Timeout;
use f411_regs::rcc::{Gate, Rcc, RccBlock, RccReg, RccRegisters, RccRegistersPtr};
use f411_regs::spi::{BaudRate, SpiBlock, SpiBus, SpiConfig, SpiReg, SpiRegisters, SpiRegistersPtr};
use f411_regs::timer::{TimReg, TimRegisters, TimRegistersPtr, Timer, TimerBlock};
use f411_regs::usart::{Usart, UsartBlock, UsartConfig, UsartReg, UsartRegisters, UsartRegistersPtr};
use f411_regs::{Error, Field};

#[test]
fn rcc_pll_enable_keeps_other_bits() {
    // bit 24 clear, reserved bits included
    const OTHERS: u32 = 0x5A5A_5A5A;
    let mut regs = RccRegisters::default();
    regs.cr = OTHERS;
    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut regs));
        rcc.write(RccReg::Cr, 24, 1).unwrap();
        assert_eq!(rcc.read(RccReg::Cr, 24), Ok(1));
        assert_eq!(
            rcc.write(RccReg::Cr, 20, 1),
            Err(Error::ReservedBits { mask: 1 << 20 })
        );
        // HSITRIM is five bits wide
        assert_eq!(rcc.read(RccReg::Cr, 3), Ok(0x0B));
        assert_eq!(rcc.read(RccReg::Cr, 4), Err(Error::AmbiguousWidth { position: 4 }));
    }
    assert_eq!(regs.cr, OTHERS | (1 << 24));

    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut regs));
        rcc.write(RccReg::Cr, 24, 0).unwrap();
        assert_eq!(rcc.read(RccReg::Cr, 24), Ok(0));
    }
    assert_eq!(regs.cr, OTHERS);
}

#[test]
fn whole_word_write_refuses_reserved_bits() {
    let mut regs = RccRegisters::default();
    {
        let ptr = RccRegistersPtr::from_mut(&mut regs);
        assert_eq!(
            ptr.cr().write(1 << 20),
            Err(Error::ReservedBits { mask: 1 << 20 })
        );
        assert_eq!(
            ptr.cr().write((1 << 16) | (0b11 << 29)),
            Err(Error::ReservedBits { mask: 0b11 << 29 })
        );
    }
    assert_eq!(regs.cr, 0);

    {
        let ptr = RccRegistersPtr::from_mut(&mut regs);
        ptr.cr().write(1 << 16).unwrap();
    }
    assert_eq!(regs.cr, 1 << 16);
}

#[test]
fn rcc_gates() {
    let mut regs = RccRegisters::default();
    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut regs));
        rcc.enable(Gate::GpioA).unwrap();
        rcc.enable(Gate::GpioH).unwrap();
        rcc.enable(Gate::Usart2).unwrap();
        rcc.enable(Gate::Spi5).unwrap();
        rcc.disable(Gate::GpioA).unwrap();
        assert_eq!(rcc.is_enabled(Gate::GpioH), Ok(true));
        assert_eq!(rcc.is_enabled(Gate::GpioA), Ok(false));
        rcc.reset(Gate::Tim1).unwrap();
    }
    assert_eq!(regs.ahb1enr, 1 << 7);
    assert_eq!(regs.apb1enr, 1 << 17);
    assert_eq!(regs.apb2enr, 1 << 20);
    assert_eq!(regs.apb2rstr, 0);
}

#[test]
fn gpio_field_widths() {
    let mut regs = GpioRegisters::default();
    {
        let gpio = GpioBlock::new(GpioPort::A, GpioRegistersPtr::from_mut(&mut regs));
        gpio.write(GpioReg::Moder, 10, 0b01).unwrap();
        gpio.write(GpioReg::Afrl, 4, 7).unwrap();
        gpio.write(GpioReg::Afrh, 28, 0xF).unwrap();
        gpio.write(GpioReg::Odr, 5, 1).unwrap();

        assert_eq!(
            gpio.write(GpioReg::Moder, 11, 1),
            Err(Error::AmbiguousWidth { position: 11 })
        );
        assert_eq!(
            gpio.read(GpioReg::Afrl, 6),
            Err(Error::AmbiguousWidth { position: 6 })
        );
        assert_eq!(
            gpio.write(GpioReg::Moder, 10, 4),
            Err(Error::ValueTooWide { value: 4, width: 2 })
        );
        assert_eq!(
            gpio.write(GpioReg::Odr, 16, 1),
            Err(Error::ReservedBits { mask: 1 << 16 })
        );
        assert_eq!(
            gpio.read(GpioReg::Moder, 32),
            Err(Error::InvalidSpan { position: 32, width: 1 })
        );
    }
    assert_eq!(regs.moder, 0b01 << 10);
    assert_eq!(regs.afrl, 7 << 4);
    assert_eq!(regs.afrh, 0xF << 28);
    assert_eq!(regs.odr, 1 << 5);
}

#[test]
fn gpio_permissions() {
    let mut regs = GpioRegisters {
        idr: 1 << 3,
        bsrr: 0xFFFF,
        ..Default::default()
    };
    {
        let gpio = GpioBlock::new(GpioPort::C, GpioRegistersPtr::from_mut(&mut regs));
        assert_eq!(gpio.read(GpioReg::Idr, 3), Ok(1));
        assert_eq!(gpio.write(GpioReg::Idr, 3, 0), Err(Error::AccessDenied));
        assert_eq!(gpio.read(GpioReg::Bsrr, 0), Err(Error::AccessDenied));
        // write-only: the field goes out alone
        gpio.write(GpioReg::Bsrr, 16 + 4, 1).unwrap();
        assert_eq!(
            gpio.write(GpioReg::Lckr, 17, 1),
            Err(Error::ReservedBits { mask: 1 << 17 })
        );
    }
    assert_eq!(regs.bsrr, 1 << 20);
    assert_eq!(regs.idr, 1 << 3);
}

#[test]
fn instance_lookup() {
    assert_eq!(GpioPort::try_from(7), Ok(GpioPort::H));
    assert_eq!(GpioPort::try_from(5), Err(Error::UnknownInstance(5)));
    assert_eq!(I2cBus::try_from(3), Ok(I2cBus::I2c3));
    assert_eq!(I2cBus::try_from(0), Err(Error::UnknownInstance(0)));
    assert_eq!(SpiBus::try_from(5), Ok(SpiBus::Spi5));
    assert_eq!(Usart::try_from(6), Ok(Usart::Usart6));
    assert_eq!(Usart::try_from(3), Err(Error::UnknownInstance(3)));
    assert_eq!(Timer::try_from(11), Ok(Timer::Tim11));
    assert_eq!(Timer::try_from(6), Err(Error::UnknownInstance(6)));
    assert_eq!(Adc::try_from(2), Err(Error::UnknownInstance(2)));
}

#[test]
fn register_addresses() {
    assert_eq!(resolve(GpioPort::H, GpioReg::Odr), Some(0x4002_1C14));
    assert_eq!(resolve(Exti, ExtiReg::Pr), Some(0x4001_3C14));
    assert_eq!(resolve(Flash, FlashReg::Acr), Some(0x4002_3C00));
    assert_eq!(resolve(Usart::Usart6, UsartReg::Brr), Some(0x4001_1408));
    assert_eq!(resolve(Timer::Tim2, TimReg::Or), Some(0x4000_0050));
    assert_eq!(resolve(Timer::Tim3, TimReg::Or), None);
    assert_eq!(resolve(AdcCommon, AdcCommonReg::Ccr), Some(0x4001_2304));
}

#[test]
fn exti_pending_is_write_one_to_clear() {
    let mut regs = ExtiRegisters {
        pr: (1 << 3) | (1 << 5),
        ..Default::default()
    };
    {
        let exti = ExtiBlock::new(Exti, ExtiRegistersPtr::from_mut(&mut regs));
        assert_eq!(exti.is_pending(5), Ok(true));
        assert_eq!(exti.is_pending(4), Ok(false));
        exti.clear_pending(3).unwrap();
    }
    // only the acknowledged line was written with 1
    assert_eq!(regs.pr, 1 << 3);

    regs.pr = 1 << 5;
    {
        let exti = ExtiBlock::new(Exti, ExtiRegistersPtr::from_mut(&mut regs));
        // writing 0 has no effect on the hardware and is skipped
        exti.write(ExtiReg::Pr, 5, 0).unwrap();
    }
    assert_eq!(regs.pr, 1 << 5);
}

#[test]
fn exti_line_configuration() {
    let mut regs = ExtiRegisters::default();
    {
        let exti = ExtiBlock::new(Exti, ExtiRegistersPtr::from_mut(&mut regs));
        exti.configure_line(0, Trigger::Both).unwrap();
        exti.configure_line(13, Trigger::Falling).unwrap();
        exti.configure_line(22, Trigger::Rising).unwrap();
        exti.mask_line(22).unwrap();
        exti.trigger(1).unwrap();
        assert_eq!(
            exti.configure_line(19, Trigger::Rising),
            Err(Error::ReservedBits { mask: 1 << 19 })
        );
        assert_eq!(
            exti.configure_line(32, Trigger::Rising),
            Err(Error::InvalidSpan { position: 32, width: 1 })
        );
    }
    assert_eq!(regs.rtsr, (1 << 0) | (1 << 22));
    assert_eq!(regs.ftsr, (1 << 0) | (1 << 13));
    assert_eq!(regs.imr, (1 << 0) | (1 << 13));
    assert_eq!(regs.swier, 1 << 1);

    assert_eq!(line_interrupt(12), Some(Interrupt::Exti15_10));
    assert_eq!(line_interrupt(7), Some(Interrupt::Exti9_5));
    assert_eq!(line_interrupt(19), None);
}

#[test]
fn nvic_enable_and_priority() {
    let mut regs = NvicRegisters::default();
    regs.iser[1] = 1 << 4;
    {
        let nvic = Nvic::new(NvicRegistersPtr::from_mut(&mut regs));
        nvic.enable(Interrupt::Usart2).unwrap();
        nvic.disable(Interrupt::Spi1).unwrap();
        nvic.set_pending(Interrupt::Spi5).unwrap();
        nvic.clear_pending(Interrupt::Exti0).unwrap();
        nvic.set_priority(Interrupt::Usart2, 5).unwrap();
        nvic.set_priority(Interrupt::Usart1, 15).unwrap();
        assert_eq!(
            nvic.set_priority(Interrupt::Usart1, 16),
            Err(Error::InvalidConfig("NVIC priority above 15"))
        );
        assert!(nvic.is_enabled(Interrupt::Usart2));
        assert!(nvic.is_pending(Interrupt::Spi5));
        assert!(!nvic.is_active(Interrupt::Spi5));
        assert_eq!(nvic.priority(Interrupt::Usart2), Ok(5));
        assert_eq!(nvic.priority(Interrupt::Usart1), Ok(15));
        assert_eq!(nvic.priority(Interrupt::Wwdg), Ok(0));
    }
    // enable banks take plain word writes
    assert_eq!(regs.iser[1], 1 << 6);
    assert_eq!(regs.icer[1], 1 << 3);
    assert_eq!(regs.ispr[2], 1 << 21);
    assert_eq!(regs.icpr[0], 1 << 6);
    // USART1 and USART2 share IPR9
    assert_eq!(regs.ipr[9], (0xF0 << 8) | (0x50 << 16));
}

#[test]
fn i2c_standard_mode() {
    let mut rcc_regs = RccRegisters::default();
    let mut regs = I2cRegisters::default();
    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
        let i2c = I2cBlock::new(I2cBus::I2c1, I2cRegistersPtr::from_mut(&mut regs));
        i2c.configure(&rcc, I2cMode::Standard, 100_000, 16_000_000).unwrap();
        i2c.set_own_address(0x42).unwrap();
    }
    assert_eq!(rcc_regs.apb1enr, 1 << 21);
    assert_eq!(regs.cr1, 1);
    assert_eq!(regs.cr2, 16);
    assert_eq!(regs.ccr, 80);
    assert_eq!(regs.trise, 17);
    assert_eq!(regs.oar1, 0x42 << 1);
}

#[test]
fn i2c_fast_mode() {
    let mut rcc_regs = RccRegisters::default();
    let mut regs = I2cRegisters::default();
    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
        let i2c = I2cBlock::new(I2cBus::I2c3, I2cRegistersPtr::from_mut(&mut regs));
        i2c.configure(&rcc, I2cMode::FastDuty2, 400_000, 48_000_000).unwrap();
        assert!(matches!(
            i2c.configure(&rcc, I2cMode::Standard, 100_000, 60_000_000),
            Err(Error::InvalidConfig(_))
        ));
    }
    assert_eq!(rcc_regs.apb1enr, 1 << 23);
    assert_eq!(regs.ccr, (1 << 15) | 40);
    assert_eq!(regs.trise, 15);
}

#[test]
fn i2c_status_flags_only_clear() {
    let mut regs = I2cRegisters {
        sr1: (1 << 10) | (1 << 7),
        ..Default::default()
    };
    {
        let i2c = I2cBlock::new(I2cBus::I2c2, I2cRegistersPtr::from_mut(&mut regs));
        assert_eq!(i2c.write(I2cReg::Sr1, 10, 1), Err(Error::AccessDenied));
        i2c.clear_ack_failure().unwrap();
        assert_eq!(i2c.write(I2cReg::Sr2, 0, 1), Err(Error::AccessDenied));
        assert_eq!(
            i2c.read(I2cReg::Sr2, 9),
            Err(Error::AmbiguousWidth { position: 9 })
        );
    }
    // AF written with 0, every other flag with 1, which leaves it alone
    assert_eq!(regs.sr1, 0xDFDF & !(1 << 10));
}

#[test]
fn spi_master_configuration() {
    let mut rcc_regs = RccRegisters::default();
    let mut regs = SpiRegisters::default();
    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
        let spi = SpiBlock::new(SpiBus::Spi1, SpiRegistersPtr::from_mut(&mut regs));
        spi.configure(&rcc, &SpiConfig::default()).unwrap();
        assert_eq!(spi.is_tx_empty(), Ok(false));
        assert_eq!(
            spi.write_field(SpiReg::Cr2, 3, 1, 1),
            Err(Error::ReservedBits { mask: 1 << 3 })
        );
    }
    assert_eq!(rcc_regs.apb2enr, 1 << 12);
    // BR = /8, SSM, SSI, MSTR, SPE
    assert_eq!(regs.cr1, (2 << 3) | (1 << 9) | (1 << 8) | (1 << 2) | (1 << 6));
}

#[test]
fn data_and_status_registers_are_not_read_back() {
    let mut regs = SpiRegisters {
        sr: 1 << 0,
        dr: 0x1200,
        ..Default::default()
    };
    {
        let spi = SpiBlock::new(SpiBus::Spi2, SpiRegistersPtr::from_mut(&mut regs));
        assert_eq!(spi.is_rx_ready(), Ok(true));
        assert_eq!(spi.is_tx_empty(), Ok(false));
        // a read of DR would pop the received frame
        spi.write_field(SpiReg::Dr, 0, 8, 0xAB).unwrap();
        // CRCERR is cleared by writing 0
        spi.write(SpiReg::Sr, 4, 0).unwrap();
    }
    assert_eq!(regs.dr, 0xAB);
    assert_eq!(regs.sr, 0x01FF & !(1 << 4));

    let mut regs = UsartRegisters {
        dr: 0x1FF,
        ..Default::default()
    };
    {
        let usart = UsartBlock::new(Usart::Usart1, UsartRegistersPtr::from_mut(&mut regs));
        usart.write_field(UsartReg::Dr, 0, 8, 0x41).unwrap();
        usart.write(UsartReg::Sr, 6, 0).unwrap();
    }
    assert_eq!(regs.dr, 0x41);
    assert_eq!(regs.sr, 0x03FF & !(1 << 6));

    let mut regs = I2cRegisters {
        dr: 0x5A,
        ..Default::default()
    };
    {
        let i2c = I2cBlock::new(I2cBus::I2c1, I2cRegistersPtr::from_mut(&mut regs));
        i2c.write_field(I2cReg::Dr, 0, 4, 0x3).unwrap();
    }
    assert_eq!(regs.dr, 0x3);
}

#[test]
fn spi_baud_rate() {
    assert_eq!(BaudRate::for_frequency(100_000_000, 10_000_000), Ok(BaudRate::Div16));
    assert_eq!(BaudRate::for_frequency(16_000_000, 8_000_000), Ok(BaudRate::Div2));
    assert!(BaudRate::for_frequency(100_000_000, 100_000).is_err());
    assert_eq!(BaudRate::Div256.divisor(), 256);
}

#[test]
fn usart_configuration() {
    let mut rcc_regs = RccRegisters::default();
    let mut regs = UsartRegisters::default();
    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
        let usart = UsartBlock::new(Usart::Usart2, UsartRegistersPtr::from_mut(&mut regs));
        usart.configure(&rcc, &UsartConfig::default(), 16_000_000).unwrap();
        let unreachable = UsartConfig {
            baud: 0,
            ..Default::default()
        };
        assert!(matches!(
            usart.configure(&rcc, &unreachable, 16_000_000),
            Err(Error::InvalidConfig(_))
        ));
    }
    assert_eq!(rcc_regs.apb1enr, 1 << 17);
    assert_eq!(regs.brr, 0x8B);
    // TE, RE, UE
    assert_eq!(regs.cr1, (1 << 3) | (1 << 2) | (1 << 13));
    assert_eq!(regs.cr2, 0);
}

#[test]
fn timer_register_presence() {
    let mut regs = TimRegisters::default();
    {
        let tim9 = TimerBlock::new(Timer::Tim9, TimRegistersPtr::from_mut(&mut regs));
        assert_eq!(
            tim9.read(TimReg::Bdtr, 0),
            Err(Error::Unimplemented { register: "BDTR" })
        );
        assert_eq!(
            tim9.write_field(TimReg::Bdtr, 0, 8, 5),
            Err(Error::Unimplemented { register: "BDTR" })
        );
        assert_eq!(
            tim9.write(TimReg::Ccr3, 0, 1),
            Err(Error::Unimplemented { register: "CCR3" })
        );
        assert_eq!(
            tim9.write(TimReg::Dier, 8, 1),
            Err(Error::ReservedBits { mask: 1 << 8 })
        );
        assert!(tim9.write(TimReg::Ccr2, 0, 0xFFFF).is_ok());
    }
    assert_eq!(regs.bdtr, 0);
    assert_eq!(regs.ccr2, 0xFFFF);

    let mut regs = TimRegisters::default();
    let tim3 = TimerBlock::new(Timer::Tim3, TimRegistersPtr::from_mut(&mut regs));
    assert_eq!(tim3.write(TimReg::Or, 10, 1), Err(Error::Unimplemented { register: "OR" }));

    let mut regs = TimRegisters::default();
    let tim11 = TimerBlock::new(Timer::Tim11, TimRegistersPtr::from_mut(&mut regs));
    assert_eq!(
        tim11.write(TimReg::Or, 10, 1),
        Err(Error::ReservedBits { mask: 1 << 10 })
    );
    assert!(tim11.write(TimReg::Or, 0, 0b11).is_ok());
}

#[test]
fn timer_counter_widths() {
    let mut regs = TimRegisters::default();
    {
        let tim2 = TimerBlock::new(Timer::Tim2, TimRegistersPtr::from_mut(&mut regs));
        tim2.write(TimReg::Arr, 0, 100_000).unwrap();
        tim2.write(TimReg::Or, 10, 0b01).unwrap();
        assert_eq!(
            tim2.write(TimReg::Ccmr1, 0, 1),
            Err(Error::AmbiguousWidth { position: 0 })
        );
        tim2.write_field(TimReg::Ccmr1, 0, 2, 0b01).unwrap();
    }
    assert_eq!(regs.arr, 100_000);
    assert_eq!(regs.or, 1 << 10);
    assert_eq!(regs.ccmr1, 0b01);

    let mut regs = TimRegisters::default();
    let tim3 = TimerBlock::new(Timer::Tim3, TimRegistersPtr::from_mut(&mut regs));
    assert_eq!(
        tim3.write(TimReg::Arr, 0, 100_000),
        Err(Error::ValueTooWide {
            value: 100_000,
            width: 16
        })
    );
    assert_eq!(
        tim3.write(TimReg::Dmar, 0, 0x1_0000),
        Err(Error::ValueTooWide {
            value: 0x1_0000,
            width: 16
        })
    );

    let mut regs = TimRegisters::default();
    let tim1 = TimerBlock::new(Timer::Tim1, TimRegistersPtr::from_mut(&mut regs));
    assert!(tim1.write(TimReg::Dmar, 0, 0x1_0000).is_ok());
    assert!(tim1.write(TimReg::Bdtr, 8, 0b11).is_ok());
}

const TIM2_SR_FLAGS: u32 = 0x1E5F;

#[test]
fn timer_periodic_update() {
    let mut rcc_regs = RccRegisters::default();
    let mut regs = TimRegisters::default();
    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
        let tim2 = TimerBlock::new(Timer::Tim2, TimRegistersPtr::from_mut(&mut regs));
        let calc = tim2.start_periodic(&rcc, 16_000_000, 1_000).unwrap();
        assert_eq!((calc.psc, calc.arr, calc.actual_hz), (0, 15_999, 1_000));
    }
    assert_eq!(rcc_regs.apb1enr, 1 << 0);
    assert_eq!(regs.psc, 0);
    assert_eq!(regs.arr, 15_999);
    assert_eq!(regs.egr, 1);
    assert_eq!(regs.dier, 1);
    assert_eq!(regs.cr1, 1);
    // UIF written with 0, every other TIM2 flag with 1, which leaves it alone
    assert_eq!(regs.sr, TIM2_SR_FLAGS & !1);

    regs.sr = 0b11;
    {
        let tim2 = TimerBlock::new(Timer::Tim2, TimRegistersPtr::from_mut(&mut regs));
        assert_eq!(tim2.clear_update(), Ok(true));
        assert_eq!(tim2.clear_update(), Ok(false));
        tim2.stop().unwrap();
    }
    assert_eq!(regs.sr, TIM2_SR_FLAGS & !1);
    assert_eq!(regs.cr1, 0);
    assert_eq!(regs.dier, 0);
}

#[test]
fn adc_temperature_sensor() {
    let mut rcc_regs = RccRegisters::default();
    let mut common_regs = AdcCommonRegisters::default();
    let mut regs = AdcRegisters::default();
    {
        let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut rcc_regs));
        let common_ptr = AdcCommonRegistersPtr::from_mut(&mut common_regs);
        let common = AdcCommonBlock::new(AdcCommon, common_ptr);
        let adc = AdcBlock::new(Adc::Adc1, AdcRegistersPtr::from_mut(&mut regs));
        adc.init_temperature_sensor(&rcc, &common).unwrap();
    }
    assert_eq!(rcc_regs.apb2enr, 1 << 8);
    assert_eq!(common_regs.ccr, 1 << 23);
    assert_eq!(regs.smpr1, 0b111 << 18);
    assert_eq!(regs.jsqr, 16 << 15);
    assert_eq!(regs.cr2, 1);
}

#[test]
fn adc_injected_conversion() {
    let mut regs = AdcRegisters {
        sr: 1 << 2,
        jdr1: 1037,
        ..Default::default()
    };
    {
        let adc = AdcBlock::new(Adc::Adc1, AdcRegistersPtr::from_mut(&mut regs));
        assert_eq!(adc.read_injected(10), Ok(1037));
        // the flag was consumed, the next conversion never completes
        assert_eq!(
            adc.read_injected(10),
            Err(Error::Timeout(Timeout { limit: 10 }))
        );
    }
    // JEOC written with 0, the other flags with 1
    assert_eq!(regs.sr, 0x3F & !(1 << 2));
    assert_eq!(regs.cr2, 1 << 22);
}

#[test]
fn flash_latency() {
    let mut regs = FlashRegisters {
        sr: 1 << 5,
        ..Default::default()
    };
    {
        let flash = FlashBlock::new(Flash, FlashRegistersPtr::from_mut(&mut regs));
        flash.set_latency(3).unwrap();
        flash.set_caches(true, true, false).unwrap();
        assert_eq!(flash.latency(), Ok(3));
        assert!(matches!(flash.set_latency(4), Err(Error::InvalidConfig(_))));
        // writing 0 to a write-1-to-clear flag leaves the register alone
        flash.set(FlashReg::Sr, sr::EOP, 0).unwrap();
        assert_eq!(flash.write(FlashReg::Keyr, 0, 0x4567_0123), Ok(()));
    }
    assert_eq!(regs.acr, 3 | (1 << 8) | (1 << 9));
    assert_eq!(regs.sr, 1 << 5);
    assert_eq!(regs.keyr, 0x4567_0123);

    assert_eq!(wait_states_for(16_000_000), Some(0));
    assert_eq!(wait_states_for(84_000_000), Some(2));
    assert_eq!(wait_states_for(100_000_000), Some(3));
    assert_eq!(wait_states_for(120_000_000), None);
}

#[test]
fn field_table_lookup() {
    let mut regs = RccRegisters::default();
    let rcc = RccBlock::new(Rcc, RccRegistersPtr::from_mut(&mut regs));
    assert_eq!(rcc.field_at(RccReg::Pllcfgr, 6), Ok(Field::at(6, 9)));
    assert_eq!(rcc.field_at(RccReg::Cfgr, 4), Ok(Field::at(4, 4)));
    assert_eq!(rcc.field_at(RccReg::Ahb1enr, 0), Ok(Field::at(0, 1)));
    assert_eq!(
        rcc.field_at(RccReg::Pllcfgr, 7),
        Err(Error::AmbiguousWidth { position: 7 })
    );
}
