use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::access::Access;
use crate::reg::Reg;
use crate::valid::ValidBits;

#[cfg(doc)]
use crate::RegMap;

/// An array of 32-bit registers sharing one layout, like the NVIC enable and priority banks.
pub struct RegArray<'a, A, const N: usize> {
    ptr: NonNull<[u32; N]>,
    valid: ValidBits,
    _ref: PhantomData<&'a [u32; N]>,
    _acs: PhantomData<A>,
}
impl<'a, A: Access, const N: usize> RegArray<'a, A, N> {
    /// Creates a new `RegArray`.
    ///
    /// ⚠️ This function is called by the field-access methods defined by the derive macro
    /// [`RegMap`]. Do *not* call this function directly. Changes to this function are not
    /// considered semver breaking.
    ///
    /// # Safety
    /// - `ptr` must be properly aligned;
    /// - `ptr` must point to `N` contiguous registers;
    /// - `ptr` must be valid for the whole lifetime `'a`.
    #[doc(hidden)]
    #[allow(non_snake_case)]
    #[inline]
    pub const unsafe fn __MACRO_ONLY__from_ptr(ptr: *mut [u32; N], valid: ValidBits) -> Self {
        Self {
            // SAFETY: forwarded to the caller
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            valid,
            _ref: PhantomData,
            _acs: PhantomData,
        }
    }
    /// Returns a raw pointer to the underlying array.
    #[inline]
    pub const fn as_ptr(&self) -> *mut [u32; N] {
        self.ptr.as_ptr()
    }
    /// Returns the number of registers in the array.
    #[allow(clippy::len_without_is_empty)]
    #[inline]
    pub const fn len(&self) -> usize {
        N
    }
    /// The register at `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Reg<'a, A>> {
        if index < N {
            let base: NonNull<u32> = self.ptr.cast();
            // SAFETY: we checked index is in bounds
            Some(unsafe { Reg::from_nonnull(base.add(index), self.valid) })
        } else {
            None
        }
    }
    /// Returns an iterator over the registers of the array.
    pub fn iter(&self) -> impl Iterator<Item = Reg<'a, A>> + use<'a, A, N> {
        let base: NonNull<u32> = self.ptr.cast();
        let valid = self.valid;
        // SAFETY: every index below N is in bounds
        (0..N).map(move |index| unsafe { Reg::from_nonnull(base.add(index), valid) })
    }
}
