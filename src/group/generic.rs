use super::Ramp;

/// Sixteen control bytes compared one at a time.
///
/// Used when no vector extension is available and under Miri.
#[derive(Clone, Copy)]
pub(crate) struct Vector([u8; 16]);

impl Vector {
    pub(crate) const BYTES: usize = 16;

    /// # Safety
    ///
    /// `ptr` must be valid for reads of [`Self::BYTES`] bytes.
    #[inline(always)]
    pub(crate) unsafe fn load(ptr: *const u8) -> Self {
        // SAFETY: Caller guarantees 16 readable bytes.
        unsafe { Vector(ptr.cast::<[u8; 16]>().read_unaligned()) }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for writes of [`Self::BYTES`] bytes.
    #[inline(always)]
    pub(crate) unsafe fn store(self, ptr: *mut u8) {
        // SAFETY: Caller guarantees 16 writable bytes.
        unsafe { ptr.cast::<[u8; 16]>().write_unaligned(self.0) }
    }

    #[inline(always)]
    pub(crate) fn splat(pattern: u64) -> Self {
        let pattern = pattern.to_le_bytes();
        Vector(core::array::from_fn(|i| pattern[i % 8]))
    }

    #[inline(always)]
    pub(crate) fn ramp(ramp: &Ramp, pattern: u64) -> Self {
        let pattern = pattern.to_le_bytes();
        Vector(core::array::from_fn(|i| {
            (ramp.0[i] as i8).saturating_add(pattern[i % 8] as i8) as u8
        }))
    }

    #[inline(always)]
    fn collect(f: impl Fn(usize) -> bool) -> u32 {
        let mut mask = 0;
        for i in 0..Self::BYTES {
            mask |= (f(i) as u32) << i;
        }
        mask
    }

    #[inline(always)]
    pub(crate) fn eq_mask(self, other: Self) -> u32 {
        Self::collect(|i| self.0[i] == other.0[i])
    }

    #[inline(always)]
    pub(crate) fn lt_mask(self, other: Self) -> u32 {
        Self::collect(|i| (self.0[i] as i8) < (other.0[i] as i8))
    }

    #[inline(always)]
    pub(crate) fn sign_mask(self) -> u32 {
        Self::collect(|i| self.0[i] & 0x80 != 0)
    }
}
