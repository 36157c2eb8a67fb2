use core::fmt::Debug;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::access::{self, Access};
use crate::error::{Error, Result};
use crate::field::{self, Field, WriteMode};
use crate::valid::ValidBits;

#[cfg(doc)]
use crate::access::{ReadOnly, ReadWrite, WriteOnly};
#[cfg(doc)]
use crate::RegMap;

/// Volatile read, traced with the `debug-trace` feature.
///
/// # Safety
/// `ptr` must be valid for volatile reads.
#[inline]
pub(crate) unsafe fn load(ptr: NonNull<u32>) -> u32 {
    // SAFETY: forwarded to the caller
    let value = unsafe { ptr.read_volatile() };
    #[cfg(feature = "debug-trace")]
    std::eprintln!("F411-REGS READ  {:p} {:#010x}", ptr, value);
    value
}

/// Volatile write, traced with the `debug-trace` feature.
///
/// # Safety
/// `ptr` must be valid for volatile writes.
#[inline]
pub(crate) unsafe fn store(ptr: NonNull<u32>, value: u32) {
    #[cfg(feature = "debug-trace")]
    std::eprintln!("F411-REGS WRITE {:p} {:#010x}", ptr, value);
    // SAFETY: forwarded to the caller
    unsafe { ptr.write_volatile(value) }
}

/// A pointer to a 32-bit register with volatile reads and writes.
///
/// # Access permissions
/// The read/write permission for the register is set by the generic parameter `A`:
/// - when `A` is [`ReadOnly`] or [`ReadWrite`], the register can be read from with
///   [`Reg::read`] and [`Reg::read_field`],
/// - when `A` is [`WriteOnly`] or [`ReadWrite`], the register can be written to with
///   [`Reg::write`] and [`Reg::write_field`].
///
/// Access permissions are defined by the derive macro [`RegMap`] using the `#[reg()]` attribute,
/// see [Access permissions](crate#access-permissions) in the crate documentation.
///
/// # Valid bits
/// Every write is checked against the register's [`ValidBits`]: a field overlapping a
/// reserved bit, or a whole word with a reserved bit set, is refused before the register is
/// touched. [`Reg::read`] returns the whole word as the hardware has it.
pub struct Reg<'a, A> {
    ptr: NonNull<u32>,
    valid: ValidBits,
    _ref: PhantomData<&'a u32>,
    _acs: PhantomData<A>,
}
impl<'a, A: Access> Reg<'a, A> {
    /// Creates a new `Reg`.
    ///
    /// ⚠️ This function is called by the field-access methods defined by the derive macro
    /// [`RegMap`]. Do *not* call this function directly. Changes to this function are not
    /// considered semver breaking.
    ///
    /// # Safety
    /// - `ptr` must be [valid for reads](core::ptr::read_volatile#safety) if `A: Readable`,
    /// - `ptr` must be [valid for writes](core::ptr::write_volatile#safety) if `A: Writable`,
    /// - `ptr` must be properly aligned;
    /// - `ptr` must be valid for the whole lifetime `'a`.
    #[doc(hidden)]
    #[allow(non_snake_case)]
    #[inline]
    pub const unsafe fn __MACRO_ONLY__from_ptr(ptr: *mut u32, valid: ValidBits) -> Self {
        unsafe { Self::from_nonnull(NonNull::new_unchecked(ptr), valid) }
    }
    #[inline]
    pub(crate) const unsafe fn from_nonnull(ptr: NonNull<u32>, valid: ValidBits) -> Self {
        Self {
            ptr,
            valid,
            _ref: PhantomData,
            _acs: PhantomData,
        }
    }
    /// Returns a raw pointer to the underlying register.
    #[inline]
    pub const fn as_ptr(&self) -> *mut u32 {
        self.ptr.as_ptr()
    }
    /// The bits of this register that the field accessors may touch.
    #[inline]
    pub const fn valid_bits(&self) -> ValidBits {
        self.valid
    }
    /// Perform a volatile read of the whole register.
    #[inline]
    pub fn read(&self) -> u32
    where
        A: access::Readable,
    {
        // SAFETY: readable by construction
        unsafe { load(self.ptr) }
    }
    /// Perform a volatile write of the whole register.
    ///
    /// Fails with [`Error::ReservedBits`], writing nothing, if `val` has a reserved bit set.
    #[inline]
    pub fn write(&self, val: u32) -> Result<()>
    where
        A: access::Writable,
    {
        let reserved = val & self.valid.reserved();
        if reserved != 0 {
            return Err(Error::ReservedBits { mask: reserved });
        }
        // SAFETY: writable by construction
        unsafe { store(self.ptr, val) };
        Ok(())
    }
    /// Reads `width` bits starting at bit `position`.
    #[inline]
    pub fn read_field(&self, position: u8, width: u8) -> Result<u32>
    where
        A: access::Readable,
    {
        self.get(Field::new(position, width)?)
    }
    /// Writes `value` into `width` bits starting at bit `position`, preserving the other bits.
    #[inline]
    pub fn write_field(&self, position: u8, width: u8, value: u32) -> Result<()>
    where
        A: access::Writable,
    {
        self.set(Field::new(position, width)?, value)
    }
    /// Reads a field.
    #[inline]
    pub fn get(&self, field: Field) -> Result<u32>
    where
        A: access::Readable,
    {
        // SAFETY: readable by construction
        unsafe { field::read_span(self.ptr, self.valid, field) }
    }
    /// Writes a field. Write-only registers are written without reading them first.
    #[inline]
    pub fn set(&self, field: Field, value: u32) -> Result<()>
    where
        A: access::Writable,
    {
        let mode = if A::READABLE {
            WriteMode::Modify
        } else {
            WriteMode::Direct
        };
        // SAFETY: writable by construction, readable when `Modify` is used
        unsafe { field::write_span(self.ptr, self.valid, field, value, mode) }
    }
    /// Forgets the access permission type, keeping it as a run-time flag.
    #[inline]
    pub fn erase(self) -> DynReg<'a> {
        DynReg {
            ptr: self.ptr,
            valid: self.valid,
            readable: A::READABLE,
            writable: A::WRITABLE,
            _ref: PhantomData,
        }
    }
}

/// A register whose access permission is checked at run time.
///
/// Obtained from [`Reg::erase`] or from [`Indexed::reg`], it is what the peripheral dispatchers
/// hand around when the register is chosen by a value instead of by a method call.
pub struct DynReg<'a> {
    ptr: NonNull<u32>,
    valid: ValidBits,
    readable: bool,
    writable: bool,
    _ref: PhantomData<&'a u32>,
}
impl<'a> DynReg<'a> {
    /// Returns a raw pointer to the underlying register.
    #[inline]
    pub const fn as_ptr(&self) -> *mut u32 {
        self.ptr.as_ptr()
    }
    /// The bits of this register that may be touched.
    #[inline]
    pub const fn valid_bits(&self) -> ValidBits {
        self.valid
    }
    /// Whether the register can be read.
    #[inline]
    pub const fn is_readable(&self) -> bool {
        self.readable
    }
    /// Whether the register can be written.
    #[inline]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }
    /// Replaces the valid bits, e.g. with the layout of one specific peripheral instance.
    #[inline]
    pub const fn with_valid_bits(mut self, valid: ValidBits) -> Self {
        self.valid = valid;
        self
    }
    /// Reads `width` bits starting at bit `position`.
    #[inline]
    pub fn read_field(&self, position: u8, width: u8) -> Result<u32> {
        self.get(Field::new(position, width)?)
    }
    /// Writes `value` into `width` bits starting at bit `position`, preserving the other bits.
    #[inline]
    pub fn write_field(&self, position: u8, width: u8, value: u32) -> Result<()> {
        self.set(Field::new(position, width)?, value)
    }
    /// Reads a field.
    pub fn get(&self, field: Field) -> Result<u32> {
        if !self.readable {
            return Err(Error::AccessDenied);
        }
        // SAFETY: the register was readable when it was erased
        unsafe { field::read_span(self.ptr, self.valid, field) }
    }
    /// Writes a field. Write-only registers are written without reading them first.
    pub fn set(&self, field: Field, value: u32) -> Result<()> {
        let mode = if self.readable {
            WriteMode::Modify
        } else {
            WriteMode::Direct
        };
        self.set_with(field, value, mode)
    }
    /// Writes a field the way `mode` says.
    pub fn set_with(&self, field: Field, value: u32, mode: WriteMode) -> Result<()> {
        if !self.writable || (mode == WriteMode::Modify && !self.readable) {
            return Err(Error::AccessDenied);
        }
        // SAFETY: writable when erased, and readable if `Modify` reads it
        unsafe { field::write_span(self.ptr, self.valid, field, value, mode) }
    }
}

/// Pointers to custom register blocks derived by [`RegMap`].
///
/// ⚠️ This trait is implemented by the derive macro [`RegMap`]. Do *not* implement this trait
/// directly. Adding new required items to this trait is not considered semver breaking.
///
/// # Safety
/// This trait should only be implemented through the derive macro [`RegMap`].
pub unsafe trait RegMapPtr<'a>: Sized + 'a {
    type RegMap;

    /// Creates a new pointer to `Self::RegMap`.
    ///
    /// # Safety
    /// - `ptr` must point to a valid instance of `Self::RegMap`;
    /// - `ptr` must be valid for the whole lifetime `'a`;
    /// - all fields of `Self::RegMap` must allow volatile reads/writes.
    unsafe fn from_nonnull(ptr: NonNull<Self::RegMap>) -> Self;

    /// Creates a new pointer to `Self::RegMap`.
    ///
    /// # Safety
    /// - `ptr` must not be null;
    /// - `ptr` must point to a valid instance of `Self::RegMap`;
    /// - `ptr` must be valid for the whole lifetime `'a`;
    /// - all fields of `Self::RegMap` must allow volatile reads/writes.
    unsafe fn from_ptr(ptr: *mut Self::RegMap) -> Self;

    /// Return a pointer to `Self::RegMap` from a mutable (exclusive) reference.
    fn from_mut(reg: &'a mut Self::RegMap) -> Self;

    /// Returns a raw pointer to the underlying register block.
    fn as_ptr(&self) -> *mut Self::RegMap;
}

/// Logical register enums generated by `#[reg_map(index = ...)]`.
pub trait RegisterIndex: Copy + Eq + Debug + 'static {
    /// Every register, in memory order.
    const REGISTERS: &'static [Self];

    /// Byte offset from the base address of the block.
    fn offset(self) -> usize;

    /// Bits usable on every instance of the block.
    fn valid_bits(self) -> ValidBits;

    /// Reference-manual name.
    fn name(self) -> &'static str;
}

/// Register-block pointers that can pick a register by its [`RegisterIndex`].
///
/// Implemented by the derive macro [`RegMap`] when the struct carries
/// `#[reg_map(index = ...)]`.
pub trait Indexed<'a>: RegMapPtr<'a> {
    /// The logical register enum of the block.
    type Index: RegisterIndex;

    /// The register named by `index`.
    fn reg(&self, index: Self::Index) -> DynReg<'a>;
}
