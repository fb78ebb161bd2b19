#[cfg(target_arch = "x86")]
use core::arch::x86 as arch;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64 as arch;

use super::Ramp;

/// Thirty-two control bytes in an AVX2 register.
#[derive(Clone, Copy)]
pub(crate) struct Vector(arch::__m256i);

impl Vector {
    pub(crate) const BYTES: usize = 32;

    /// # Safety
    ///
    /// `ptr` must be valid for reads of [`Self::BYTES`] bytes.
    #[inline(always)]
    pub(crate) unsafe fn load(ptr: *const u8) -> Self {
        // SAFETY: Caller guarantees 32 readable bytes. The load is unaligned.
        unsafe { Vector(arch::_mm256_loadu_si256(ptr.cast())) }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for writes of [`Self::BYTES`] bytes.
    #[inline(always)]
    pub(crate) unsafe fn store(self, ptr: *mut u8) {
        // SAFETY: Caller guarantees 32 writable bytes. The store is unaligned.
        unsafe { arch::_mm256_storeu_si256(ptr.cast(), self.0) }
    }

    #[inline(always)]
    pub(crate) fn splat(pattern: u64) -> Self {
        // SAFETY: AVX2 is statically enabled for this module.
        unsafe { Vector(arch::_mm256_set1_epi64x(pattern as i64)) }
    }

    #[inline(always)]
    pub(crate) fn ramp(ramp: &Ramp, pattern: u64) -> Self {
        // SAFETY: AVX2 is statically enabled and `Ramp` holds 32 bytes.
        unsafe {
            let steps = arch::_mm256_loadu_si256(ramp.0.as_ptr().cast());
            Vector(arch::_mm256_adds_epi8(
                steps,
                arch::_mm256_set1_epi64x(pattern as i64),
            ))
        }
    }

    #[inline(always)]
    pub(crate) fn eq_mask(self, other: Self) -> u32 {
        // SAFETY: AVX2 is statically enabled for this module.
        unsafe { arch::_mm256_movemask_epi8(arch::_mm256_cmpeq_epi8(self.0, other.0)) as u32 }
    }

    #[inline(always)]
    pub(crate) fn lt_mask(self, other: Self) -> u32 {
        // SAFETY: AVX2 is statically enabled for this module.
        unsafe { arch::_mm256_movemask_epi8(arch::_mm256_cmpgt_epi8(other.0, self.0)) as u32 }
    }

    #[inline(always)]
    pub(crate) fn sign_mask(self) -> u32 {
        // SAFETY: AVX2 is statically enabled for this module.
        unsafe { arch::_mm256_movemask_epi8(self.0) as u32 }
    }
}
