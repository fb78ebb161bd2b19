#[cfg(target_arch = "x86")]
use core::arch::x86 as arch;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64 as arch;

use super::Ramp;

/// Sixteen control bytes in an SSE2 register.
#[derive(Clone, Copy)]
pub(crate) struct Vector(arch::__m128i);

impl Vector {
    pub(crate) const BYTES: usize = 16;

    /// # Safety
    ///
    /// `ptr` must be valid for reads of [`Self::BYTES`] bytes.
    #[inline(always)]
    pub(crate) unsafe fn load(ptr: *const u8) -> Self {
        // SAFETY: Caller guarantees 16 readable bytes. The load is unaligned.
        unsafe { Vector(arch::_mm_loadu_si128(ptr.cast())) }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for writes of [`Self::BYTES`] bytes.
    #[inline(always)]
    pub(crate) unsafe fn store(self, ptr: *mut u8) {
        // SAFETY: Caller guarantees 16 writable bytes. The store is unaligned.
        unsafe { arch::_mm_storeu_si128(ptr.cast(), self.0) }
    }

    #[inline(always)]
    pub(crate) fn splat(pattern: u64) -> Self {
        // SAFETY: SSE2 is statically enabled for this module.
        unsafe { Vector(arch::_mm_set1_epi64x(pattern as i64)) }
    }

    /// `pattern` broadcast, plus the ramp added to every byte with signed
    /// saturation.
    #[inline(always)]
    pub(crate) fn ramp(ramp: &Ramp, pattern: u64) -> Self {
        // SAFETY: SSE2 is statically enabled and `Ramp` holds 32 bytes.
        unsafe {
            let steps = arch::_mm_loadu_si128(ramp.0.as_ptr().cast());
            Vector(arch::_mm_adds_epi8(
                steps,
                arch::_mm_set1_epi64x(pattern as i64),
            ))
        }
    }

    #[inline(always)]
    pub(crate) fn eq_mask(self, other: Self) -> u32 {
        // SAFETY: SSE2 is statically enabled for this module.
        unsafe { arch::_mm_movemask_epi8(arch::_mm_cmpeq_epi8(self.0, other.0)) as u32 }
    }

    /// Bytes of `self` that are less than those of `other`, compared signed.
    #[inline(always)]
    pub(crate) fn lt_mask(self, other: Self) -> u32 {
        // SAFETY: SSE2 is statically enabled for this module.
        unsafe { arch::_mm_movemask_epi8(arch::_mm_cmpgt_epi8(other.0, self.0)) as u32 }
    }

    /// Bytes with the high bit set.
    #[inline(always)]
    pub(crate) fn sign_mask(self) -> u32 {
        // SAFETY: SSE2 is statically enabled for this module.
        unsafe { arch::_mm_movemask_epi8(self.0) as u32 }
    }
}
