//! Vectorized scans over runs of consecutive control cells.
//!
//! A group is as many cells as fit into one vector register. Matches are
//! reported as a [`BitMask`] of cell indices relative to the group start.

use core::marker::PhantomData;

use crate::control::{ControlCell, EMPTY_DIST, END_OF_DIST};

mod bitmask;

pub(crate) use bitmask::BitMask;

cfg_if::cfg_if! {
    if #[cfg(all(
        target_feature = "avx2",
        any(target_arch = "x86", target_arch = "x86_64"),
        not(miri)
    ))] {
        mod avx2;
        use avx2 as imp;
    } else if #[cfg(all(
        target_feature = "sse2",
        any(target_arch = "x86", target_arch = "x86_64"),
        not(miri)
    ))] {
        mod sse2;
        use sse2 as imp;
    } else {
        mod generic;
        use generic as imp;
    }
}

use imp::Vector;

/// Width in bytes of one group.
pub(crate) const GROUP_BYTES: usize = Vector::BYTES;

/// Per-cell distance offsets added to a probe target: cell `i` of a group
/// expects distance `d + i`.
#[repr(C, align(32))]
pub(crate) struct Ramp(pub(crate) [u8; 32]);

const fn ramp_for(cell_size: usize) -> Ramp {
    let mut bytes = [0u8; 32];
    let mut i = 0;
    while i * cell_size < bytes.len() {
        bytes[i * cell_size] = i as u8;
        i += 1;
    }
    Ramp(bytes)
}

/// Bits of a byte mask that hold the distance byte of a cell.
const fn lanes_for(cell_size: usize) -> u32 {
    let mut lanes = 0u32;
    let mut i = 0;
    while i < GROUP_BYTES {
        lanes |= 1 << i;
        i += cell_size;
    }
    lanes
}

/// One vector worth of control cells of type `C`.
#[derive(Clone, Copy)]
pub(crate) struct Group<C> {
    vector: Vector,
    _cell: PhantomData<C>,
}

impl<C: ControlCell> Group<C> {
    /// Number of cells in a group.
    pub(crate) const WIDTH: usize = GROUP_BYTES / C::SIZE;

    const LANES: u32 = lanes_for(C::SIZE);
    const RAMP: Ramp = ramp_for(C::SIZE);
    const SHIFT: u32 = C::SIZE.trailing_zeros();

    /// # Safety
    ///
    /// `ptr` must be valid for reads of [`Self::WIDTH`] cells.
    #[inline(always)]
    pub(crate) unsafe fn load(ptr: *const C) -> Self {
        Group {
            // SAFETY: Forwarded to the caller.
            vector: unsafe { Vector::load(ptr.cast()) },
            _cell: PhantomData,
        }
    }

    #[inline(always)]
    fn mask(bits: u32) -> BitMask {
        BitMask::new(bits & Self::LANES, Self::SHIFT)
    }

    /// Cells that are empty.
    #[cfg(any(test, feature = "stats"))]
    #[inline(always)]
    pub(crate) fn match_empty(&self) -> BitMask {
        let target = Vector::splat(C::splat(EMPTY_DIST as u8, 0));
        Self::mask(self.vector.eq_mask(target))
    }

    /// Cells holding an element.
    #[inline(always)]
    pub(crate) fn match_used(&self) -> BitMask {
        Self::mask(!self.vector.sign_mask())
    }

    /// Cells that are empty or end-of sentinels.
    #[cfg(any(test, feature = "stats"))]
    #[inline(always)]
    pub(crate) fn match_unused(&self) -> BitMask {
        Self::mask(self.vector.sign_mask())
    }

    /// Used cells carrying `fingerprint`. Only meaningful for cells with a
    /// fingerprint.
    #[inline(always)]
    pub(crate) fn match_hash(&self, fingerprint: u8) -> BitMask {
        debug_assert!(C::HAS_FINGERPRINT);
        let target = Vector::splat(C::splat(0, fingerprint));
        let eq = self.vector.eq_mask(target) >> 1;
        Self::mask(eq & !self.vector.sign_mask())
    }

    /// Compares the group against a probe for an element at distance `dist`
    /// from its home in the first cell, `dist + 1` in the second and so on.
    ///
    /// Returns `(stop, hits)`. `stop` marks cells whose distance is lower than
    /// the probe's: the first of them ends the probe sequence and is where a
    /// new element would go. `hits` marks cells with exactly the probe's
    /// distance and fingerprint; only hits before the first stop are live.
    #[inline(always)]
    pub(crate) fn match_hash_and_distance(&self, dist: u8, fingerprint: u8) -> (BitMask, BitMask) {
        debug_assert!(dist as i8 >= 0);
        let target = Vector::ramp(&Self::RAMP, C::splat(dist, fingerprint));
        let stop = self.vector.lt_mask(target);
        let eq = self.vector.eq_mask(target);
        let hits = if C::HAS_FINGERPRINT { eq & (eq >> 1) } else { eq };
        (Self::mask(stop), Self::mask(hits))
    }

    /// Cells where an element at distance `dist` (rising by one per cell)
    /// could be placed: empty cells and cells with a lower distance.
    #[inline(always)]
    pub(crate) fn match_empty_and_distance(&self, dist: u8) -> BitMask {
        debug_assert!(dist as i8 >= 0);
        let target = Vector::ramp(&Self::RAMP, C::splat(dist, 0));
        Self::mask(self.vector.lt_mask(target))
    }

    /// Cells whose distance byte is below `dist`, without a ramp.
    #[inline(always)]
    pub(crate) fn match_below(&self, dist: u8) -> BitMask {
        let target = Vector::splat(C::splat(dist, 0));
        Self::mask(self.vector.lt_mask(target))
    }

    /// # Safety
    ///
    /// `ptr` must be valid for writes of [`Self::WIDTH`] cells.
    #[inline(always)]
    pub(crate) unsafe fn fill_all_empty(ptr: *mut C) {
        let fill = Vector::splat(C::splat(EMPTY_DIST as u8, 0));
        // SAFETY: Forwarded to the caller.
        unsafe { fill.store(ptr.cast()) }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for writes of [`Self::WIDTH`] cells.
    #[inline(always)]
    pub(crate) unsafe fn fill_all_end_of(ptr: *mut C) {
        let fill = Vector::splat(C::splat(END_OF_DIST as u8, 0));
        // SAFETY: Forwarded to the caller.
        unsafe { fill.store(ptr.cast()) }
    }
}
