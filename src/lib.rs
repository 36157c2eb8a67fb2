//! Validated bit-field access to the STM32F411 peripheral registers, and clock bring-up.
//!
//! The register blocks are plain `#[repr(C)]` structs. The derive macro [`RegMap`] turns each
//! into a pointer type with volatile accessors and a logical register enum, and every field
//! access is checked against the bits the reference manual marks as implemented.
//!
//! **Table of contents**
//! - [Basic usage](#basic-usage)
//! - [Access permissions](#access-permissions)
//! - [Valid bits](#valid-bits)
//! - [Peripheral dispatchers](#peripheral-dispatchers)
//! - [Clock tree](#clock-tree)
//! - [Interrupts and thread safety](#interrupts-and-thread-safety)
//! - [Crate features](#crate-features)
//! - [Principle of operation](#principle-of-operation)
//!
//! # Basic usage
//!
//! ```rust
//! use f411_regs::gpio::{GpioRegisters, GpioRegistersPtr};
//! use f411_regs::Field;
//!
//! // an in-memory register block stands in for the hardware
//! let mut regs = GpioRegisters::default();
//! let ptr = GpioRegistersPtr::from_mut(&mut regs);
//!
//! // on the target you'd take the block at its base address instead
//! // let ptr = unsafe { GpioRegistersPtr::from_ptr(0x4002_0000 as *mut _) };
//!
//! // pin 5 as general-purpose output
//! ptr.moder().set(Field::at(10, 2), 0b01).unwrap();
//! ptr.odr().write_field(5, 1, 1).unwrap();
//!
//! assert_eq!(ptr.moder().get(Field::at(10, 2)), Ok(0b01));
//! assert_eq!(ptr.odr().read(), 1 << 5);
//! assert_eq!(regs.moder, 0b01 << 10);
//! ```
//!
//! # Access permissions
//!
//! Registers are read-write unless the struct field says otherwise with `#[reg(RO)]` or
//! `#[reg(WO)]`. Permissions are checked at compile time. The following code does not compile:
//! ```compile_fail,E0277
//! # use f411_regs::gpio::{GpioRegisters, GpioRegistersPtr};
//! # let mut regs = GpioRegisters::default();
//! # let ptr = GpioRegistersPtr::from_mut(&mut regs);
//! ptr.idr().write(1); // error[E0277]: cannot write to a read-only register
//! ptr.bsrr().read();  // error[E0277]: cannot read from a write-only register
//! ```
//!
//! Through the logical register enums the permission is only known at run time, and a refused
//! access returns [`Error::AccessDenied`].
//!
//! # Valid bits
//!
//! Each register carries a [`ValidBits`] mask given by `#[reg(valid = ...)]`. A field access
//! that overlaps a reserved bit, or a whole-word write with a reserved bit set, is refused with
//! [`Error::ReservedBits`] before the hardware is touched, so no reserved bit is ever written:
//! ```
//! use f411_regs::rcc::{RccRegisters, RccRegistersPtr};
//! use f411_regs::Error;
//!
//! let mut regs = RccRegisters::default();
//! let ptr = RccRegistersPtr::from_mut(&mut regs);
//!
//! // bits 20..=23 of RCC_CR are reserved
//! assert_eq!(ptr.cr().write_field(20, 1, 1), Err(Error::ReservedBits { mask: 1 << 20 }));
//! assert_eq!(ptr.cr().write(1 << 20), Err(Error::ReservedBits { mask: 1 << 20 }));
//! assert_eq!(regs.cr, 0);
//! ```
//!
//! # Peripheral dispatchers
//!
//! Each peripheral family implements [`Peripheral`] for its instance type, and [`Block`] binds
//! one instance to its registers. The family module holds the [`Field`] constants of its
//! registers and the multi-step sequences (bus configuration, timer start, ...) built on top:
//! [`rcc`], [`gpio`], [`exti`], [`nvic`], [`i2c`], [`spi`], [`usart`], [`timer`], [`adc`] and
//! [`flash`]. [`map`] holds the base addresses.
//!
//! Most writes are a read-modify-write. Registers where that would lose state take a different
//! [`WriteMode`]: write-1-to-clear flags get only the target bit, flags cleared by writing 0
//! get every other valid bit set, and data registers, where a read pops a received frame, are
//! written without reading them.
//!
//! # Clock tree
//!
//! [`clock::ClockTree`] brings the core from HSI to the PLL, one bounded step at a time. See the
//! [`clock`] module.
//!
//! # Interrupts and thread safety
//!
//! All reads and writes are volatile. In Rust, *"just like in C, whether an operation is
//! volatile has no bearing whatsoever on questions involving concurrent access from multiple
//! threads."* See safety docs for [`read_volatile`](core::ptr::read_volatile#safety) and
//! [`write_volatile`](core::ptr::write_volatile#safety).
//!
//! A field write is a read-modify-write of the whole register. It is not atomic: an interrupt
//! handler writing the same register in between loses its update. The pointers derived by
//! [`RegMap`] implement neither [`Send`] nor [`Sync`], and sharing a block with an interrupt
//! handler is the caller's business.
//!
//! # Crate features
//!
//! By default, no features are enabled. These features exist:
//!
//! - **std** -
//!   When enabled, this will cause `f411-regs` to use the standard library. Currently, this
//!   feature is only used as a dependency of other features.
//!
//! - **debug-trace** -
//!   When enabled, all register reads and writes print a debug trace to standard error. Depends
//!   on feature `std`. For example, setting `RCC_CR.HSEON` might print something like
//!   ```text
//!   F411-REGS READ  0x7ffc30c85c70 0x00000000
//!   F411-REGS WRITE 0x7ffc30c85c70 0x00010000
//!   ```
//!   Note that this feature only works on targets that support `std`.
//!
//! - **defmt** -
//!   Derives [`defmt::Format`](https://docs.rs/defmt) for the public types and logs the
//!   multi-step sequences (clock tree transitions, poll timeouts) through `defmt`.
//!
//! # Principle of operation
//!
//! The derive macro [`RegMap`] takes the definition of a register block (a `struct` of `u32`
//! and `[u32; N]` fields) and generates a custom pointer type wrapping a raw pointer to it. No
//! reference to the register memory is ever created: every access computes the field address
//! with [`addr_of_mut!`](core::ptr::addr_of_mut) and goes through a volatile read or write.
//!
//! With `#[reg_map(index = Name)]` the macro also generates the enum `Name`, one variant per
//! register in memory order, with the offset, valid bits, permissions and reference-manual name
//! of each. The pointer then implements [`Indexed`], which is what the dispatchers build on.
//!
//! A sample register block:
//! ```
//! # mod yoo {
//! use f411_regs::{RegMap, ValidBits};
//!
//! #[repr(C)]
//! #[derive(RegMap, Default)]
//! #[reg_map(index = DemoReg)]
//! pub struct Demo {
//!     #[reg(valid = ValidBits::only(&[0..=7]))]
//!     pub ctrl: u32,
//!     #[reg(RO)]
//!     pub status: u32,
//!     _reserved: [u32; 2],
//!     pub data: [u32; 4],
//! }
//! # } // mod yoo
//! # use yoo::{Demo, DemoPtr, DemoReg};
//! use f411_regs::{Indexed, RegisterIndex};
//!
//! assert_eq!(DemoReg::Data.offset(), 0x10);
//! assert!(!DemoReg::Status.is_writable());
//!
//! let mut demo = Demo::default();
//! let ptr = DemoPtr::from_mut(&mut demo);
//! ptr.data().get(3).unwrap().write(7).unwrap();
//! assert!(ptr.reg(DemoReg::Ctrl).write_field(8, 1, 1).is_err());
//! assert_eq!(demo.data[3], 7);
//! ```

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate self as f411_regs;

/// Derive macro to generate a pointer to a register block with checked volatile accesses.
///
/// See the [top-level documentation](crate) for usage information and examples.
pub use f411_regs_derive::RegMap;

#[macro_use]
mod log;

pub mod access;

mod arr;
pub use arr::RegArray;

pub mod error;
pub use error::{Error, Result};

pub mod field;
pub use field::{Field, WriteMode, ERROR_FLAG};

pub mod poll;

mod reg;
pub use reg::{DynReg, Indexed, Reg, RegMapPtr, RegisterIndex};

pub mod valid;
pub use valid::ValidBits;

pub mod dispatch;
pub use dispatch::{Block, Peripheral};

pub mod map;

pub mod adc;
pub mod clock;
pub mod exti;
pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod nvic;
pub mod rcc;
pub mod spi;
pub mod timer;
pub mod usart;
