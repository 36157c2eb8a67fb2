use f411_regs::field::or_error_flag;
use f411_regs::{Error, Field, Indexed, RegMap, RegisterIndex, ValidBits, ERROR_FLAG};

#[repr(C)]
#[derive(RegMap, Default)]
#[reg_map(index = SampleReg)]
struct Sample {
    ctrl: u32,
    #[reg(valid = ValidBits::only(&[0..=7, 16..=23]))]
    split: u32,
    #[reg(RO)]
    status: u32,
    #[reg(WO)]
    trigger: u32,
    _reserved: [u32; 4],
    table: [u32; 4],
}

#[test]
fn index_enum() {
    assert_eq!(SampleReg::ALL.len(), 4);
    assert_eq!(<SampleReg as RegisterIndex>::REGISTERS, &SampleReg::ALL);
    assert_eq!(SampleReg::Ctrl.offset(), 0x00);
    assert_eq!(SampleReg::Split.offset(), 0x04);
    assert_eq!(SampleReg::Status.offset(), 0x08);
    assert_eq!(SampleReg::Trigger.offset(), 0x0C);
    assert_eq!(core::mem::offset_of!(Sample, table), 0x20);

    assert_eq!(SampleReg::Split.valid_bits().bits(), 0x00FF_00FF);
    assert_eq!(SampleReg::Ctrl.valid_bits(), ValidBits::ALL);
    assert_eq!(SampleReg::Split.name(), "SPLIT");
    assert!(SampleReg::Status.is_readable() && !SampleReg::Status.is_writable());
    assert!(!SampleReg::Trigger.is_readable() && SampleReg::Trigger.is_writable());
}

#[test]
fn write_touches_only_the_field() {
    let mut regs = Sample::default();
    let ptr = SamplePtr::from_mut(&mut regs);
    let ctrl = ptr.ctrl();

    for width in 1..=32u8 {
        for position in 0..=(32 - width) {
            let field = Field::new(position, width).unwrap();

            ctrl.write(0xFFFF_FFFF).unwrap();
            ctrl.set(field, 0).unwrap();
            assert_eq!(ctrl.read(), !field.mask(), "clear {position}+{width}");

            ctrl.write(0).unwrap();
            ctrl.set(field, field.max_value()).unwrap();
            assert_eq!(ctrl.read(), field.mask(), "fill {position}+{width}");
        }
    }
}

#[test]
fn round_trip_keeps_neighbours() {
    let mut regs = Sample::default();
    {
        let ptr = SamplePtr::from_mut(&mut regs);
        ptr.ctrl().write(0xA5A5_A5A5).unwrap();
        ptr.ctrl().write_field(8, 4, 0x3).unwrap();
        assert_eq!(ptr.ctrl().read_field(8, 4), Ok(0x3));
        assert_eq!(ptr.ctrl().read_field(0, 8), Ok(0xA5));
        assert_eq!(ptr.ctrl().read_field(12, 20), Ok(0xA5A5A));
    }
    assert_eq!(regs.ctrl, 0xA5A5_A3A5);
}

#[test]
fn round_trip_on_patterned_background() {
    const BACKGROUND: u32 = 0xA5A5_A5A5;
    let mut regs = Sample::default();
    let ptr = SamplePtr::from_mut(&mut regs);
    let ctrl = ptr.ctrl();

    for width in 1..=32u8 {
        for position in 0..=(32 - width) {
            let field = Field::new(position, width).unwrap();
            let max = field.max_value();
            for value in [0, 1, max, max / 3, 0x5A5A_5A5A & max] {
                ctrl.write(BACKGROUND).unwrap();
                ctrl.set(field, value).unwrap();
                assert_eq!(ctrl.get(field), Ok(value), "{position}+{width} <- {value:#x}");
                assert_eq!(
                    ctrl.read() & !field.mask(),
                    BACKGROUND & !field.mask(),
                    "neighbours of {position}+{width}"
                );
            }
        }
    }
}

#[test]
fn repeated_write_is_idempotent() {
    let mut regs = Sample::default();
    let ptr = SamplePtr::from_mut(&mut regs);
    ptr.ctrl().write(0x0F00_0000).unwrap();
    ptr.ctrl().write_field(4, 3, 5).unwrap();
    let once = ptr.ctrl().read();
    ptr.ctrl().write_field(4, 3, 5).unwrap();
    assert_eq!(ptr.ctrl().read(), once);
}

#[test]
fn span_outside_register() {
    let mut regs = Sample::default();
    {
        let ptr = SamplePtr::from_mut(&mut regs);
        let ctrl = ptr.ctrl();
        assert_eq!(
            ctrl.write_field(30, 5, 0),
            Err(Error::InvalidSpan {
                position: 30,
                width: 5
            })
        );
        assert_eq!(
            ctrl.read_field(32, 1),
            Err(Error::InvalidSpan {
                position: 32,
                width: 1
            })
        );
        assert_eq!(
            ctrl.read_field(3, 0),
            Err(Error::InvalidSpan {
                position: 3,
                width: 0
            })
        );
        assert!(ctrl.read_field(0, 32).is_ok());
    }
    assert_eq!(regs.ctrl, 0);
}

#[test]
fn value_too_wide() {
    let mut regs = Sample::default();
    {
        let ptr = SamplePtr::from_mut(&mut regs);
        assert_eq!(
            ptr.ctrl().write_field(0, 3, 8),
            Err(Error::ValueTooWide { value: 8, width: 3 })
        );
        assert_eq!(ptr.ctrl().write_field(0, 3, 7), Ok(()));
    }
    assert_eq!(regs.ctrl, 7);
}

#[test]
fn reserved_bits_are_never_touched() {
    let mut regs = Sample::default();
    {
        let ptr = SamplePtr::from_mut(&mut regs);
        let split = ptr.split();
        assert_eq!(
            split.write_field(8, 1, 1),
            Err(Error::ReservedBits { mask: 1 << 8 })
        );
        assert_eq!(
            split.write_field(4, 8, 0),
            Err(Error::ReservedBits { mask: 0x0F00 })
        );
        assert_eq!(
            split.read_field(6, 4),
            Err(Error::ReservedBits { mask: 0x0300 })
        );
        split.write_field(16, 8, 0xAB).unwrap();
        split.write_field(0, 8, 0xCD).unwrap();
    }
    assert_eq!(regs.split, 0x00AB_00CD);
}

#[test]
fn whole_word_write_checks_valid_bits() {
    let mut regs = Sample::default();
    {
        let ptr = SamplePtr::from_mut(&mut regs);
        assert_eq!(
            ptr.split().write(0x0100_00FF),
            Err(Error::ReservedBits { mask: 0x0100_0000 })
        );
        assert_eq!(
            ptr.split().write(0xFFFF_FFFF),
            Err(Error::ReservedBits { mask: 0xFF00_FF00 })
        );
        ptr.split().write(0x00AB_00CD).unwrap();
        ptr.split().write(0x0012_0034).unwrap();
    }
    assert_eq!(regs.split, 0x0012_0034);
}

#[test]
fn dynamic_permissions() {
    let mut regs = Sample::default();
    {
        let ptr = SamplePtr::from_mut(&mut regs);
        let status = ptr.reg(SampleReg::Status);
        let trigger = ptr.reg(SampleReg::Trigger);
        assert!(status.is_readable() && !status.is_writable());

        assert_eq!(status.set(Field::at(0, 1), 1), Err(Error::AccessDenied));
        assert_eq!(trigger.get(Field::at(0, 4)), Err(Error::AccessDenied));
        assert_eq!(or_error_flag(trigger.get(Field::at(0, 4))), ERROR_FLAG);

        // write-only registers are written without reading them first
        ptr.trigger().write(0xF0).unwrap();
        trigger.set(Field::at(0, 1), 1).unwrap();
    }
    assert_eq!(regs.trigger, 1);
    assert_eq!(regs.status, 0);
}

#[test]
fn dynamic_register_matches_accessor() {
    let mut regs = Sample::default();
    let ptr = SamplePtr::from_mut(&mut regs);
    for reg in SampleReg::ALL {
        let dynamic = ptr.reg(reg);
        assert_eq!(dynamic.valid_bits(), reg.valid_bits());
        let offset = dynamic.as_ptr() as usize - ptr.as_ptr() as usize;
        assert_eq!(offset, reg.offset());
    }
}

#[test]
fn array_idx() {
    let mut regs = Sample::default();
    {
        let ptr = SamplePtr::from_mut(&mut regs);
        let table = ptr.table();
        assert_eq!(table.len(), 4);
        assert!(table.get(4).is_none());
        for (i, reg) in table.iter().enumerate() {
            reg.write(i as u32 * 10).unwrap();
        }
        table.get(2).unwrap().write_field(0, 4, 0xF).unwrap();
    }
    assert_eq!(regs.table, [0, 10, 0x1F, 30]);
}

#[test]
fn error_flag_is_out_of_reach() {
    for width in 1..32u8 {
        let field = Field::new(0, width).unwrap();
        assert!(!field.fits(ERROR_FLAG));
    }
    assert_eq!(or_error_flag(Ok(0x1234)), 0x1234);
}
