//! Read/write permissions of registers.

use core::fmt::Debug;
use core::hash::Hash;

/// Zero-sized marker for registers that hardware only lets you read (e.g. `GPIOx_IDR`).
///
/// Implements the [`Readable`] trait.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReadOnly {}

/// Zero-sized marker for registers that hardware only lets you write (e.g. `GPIOx_BSRR`).
///
/// Implements the [`Writable`] trait.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WriteOnly {}

/// Zero-sized marker for ordinary read/write registers.
///
/// Implements the [`Readable`] and [`Writable`] traits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReadWrite {}

/// Marker trait required by traits [`Readable`] and [`Writable`].
///
/// The associated constants carry the permission into type-erased registers
/// ([`DynReg`](crate::DynReg)), where it is checked at run time.
///
/// ⚠️ This trait is sealed and cannot be implemented for types outside of this crate.
pub trait Access:
    Debug + Default + Copy + Eq + Ord + Hash + Sized + Send + Sync + 'static + private::Sealed
{
    /// The register can be read.
    const READABLE: bool;
    /// The register can be written.
    const WRITABLE: bool;
}

/// Marker trait for readable registers implemented by types [`ReadOnly`] and [`ReadWrite`].
///
/// ⚠️ This trait is sealed and cannot be implemented for types outside of this crate.
#[diagnostic::on_unimplemented(
    message = "cannot read from a write-only register",
    label = "method cannot be called on write-only registers",
    note = "the register is write only because it was annotated with the attribute
  `#[reg(WO)]` in the register-block definition"
)]
pub trait Readable: Access {}

/// Marker trait for writable registers implemented by types [`WriteOnly`] and [`ReadWrite`].
///
/// ⚠️ This trait is sealed and cannot be implemented for types outside of this crate.
#[diagnostic::on_unimplemented(
    message = "cannot write to a read-only register",
    label = "method cannot be called on read-only registers",
    note = "the register is read only because it was annotated with the attribute
  `#[reg(RO)]` in the register-block definition"
)]
pub trait Writable: Access {}

impl Access for ReadOnly {
    const READABLE: bool = true;
    const WRITABLE: bool = false;
}
impl Access for WriteOnly {
    const READABLE: bool = false;
    const WRITABLE: bool = true;
}
impl Access for ReadWrite {
    const READABLE: bool = true;
    const WRITABLE: bool = true;
}
impl Readable for ReadOnly {}
impl Readable for ReadWrite {}
impl Writable for WriteOnly {}
impl Writable for ReadWrite {}

mod private {
    pub trait Sealed {}
    impl Sealed for super::ReadOnly {}
    impl Sealed for super::WriteOnly {}
    impl Sealed for super::ReadWrite {}
}
