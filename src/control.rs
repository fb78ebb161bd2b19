//! Control cells: the per-slot metadata kept apart from element storage.
//!
//! Every cell stores the distance of its element from the element's home
//! bucket as a signed byte at offset 0. Negative distances are reserved for
//! the two sentinels, so a single signed comparison tells used cells from
//! unused ones. Wider cells add a fingerprint byte at offset 1 and, for the
//! indirect layout, a 32-bit index into the dense element arena.

use core::fmt::Debug;

/// Distance byte of an empty cell.
pub const EMPTY_DIST: i8 = -1;

/// Distance byte of the sentinel cells past the end of the probe region.
pub const END_OF_DIST: i8 = -128;

/// Largest distance any cell may record.
pub const MAX_DISTANCE: u8 = 126;

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A control cell of a fixed width.
///
/// This trait is sealed; the crate provides [`DistCtrl`], [`HashCtrl`] and
/// [`IndexCtrl`].
pub trait ControlCell: sealed::Sealed + Copy + Debug + 'static {
    /// Width of one cell in bytes. Always a power of two.
    const SIZE: usize;

    /// Whether the cell stores a fingerprint of the hash.
    const HAS_FINGERPRINT: bool;

    /// An empty cell.
    const EMPTY: Self;

    /// A sentinel cell past the tail of the table.
    const END_OF: Self;

    /// Builds a used cell.
    fn new(dist: u8, fingerprint: u8) -> Self;

    /// The raw distance byte. Negative for empty and end-of cells.
    fn dist(self) -> i8;

    /// The fingerprint byte, or zero when fingerprints are not stored.
    fn fingerprint(self) -> u8;

    /// Overwrites the distance byte.
    fn set_dist(&mut self, dist: i8);

    /// Eight bytes worth of cells carrying `dist` and `fingerprint`, in
    /// memory order when read as a little-endian word.
    fn splat(dist: u8, fingerprint: u8) -> u64;

    /// Whether the cell is the empty sentinel.
    #[inline(always)]
    fn is_empty(self) -> bool {
        self.dist() == EMPTY_DIST
    }

    /// Whether the cell is the end-of sentinel past the probe region.
    #[inline(always)]
    fn is_end_of(self) -> bool {
        self.dist() == END_OF_DIST
    }

    /// Whether the cell holds an element.
    #[inline(always)]
    fn is_used(self) -> bool {
        self.dist() >= 0
    }

    /// Turns the cell into the empty sentinel.
    #[inline(always)]
    fn set_empty(&mut self) {
        *self = Self::EMPTY;
    }

    /// Turns the cell into the end-of sentinel.
    #[inline(always)]
    fn set_end_of(&mut self) {
        *self = Self::END_OF;
    }

    /// Writes distance and fingerprint, keeping any other payload.
    fn set_value(&mut self, dist: u8, fingerprint: u8);

    /// Moves the element one cell further from home.
    #[inline(always)]
    fn inc_dist(&mut self) {
        debug_assert!(self.is_used() && (self.dist() as u8) < MAX_DISTANCE);
        self.set_dist(self.dist() + 1);
    }

    /// Moves the element one cell closer to home.
    #[inline(always)]
    fn dec_dist(&mut self) {
        debug_assert!(self.dist() > 0);
        self.set_dist(self.dist() - 1);
    }
}

const fn repeat_u8(byte: u8) -> u64 {
    byte as u64 * 0x0101_0101_0101_0101
}

const fn repeat_u16(word: u16) -> u64 {
    word as u64 * 0x0001_0001_0001_0001
}

fn fmt_cell(dist: i8, hash: Option<u8>, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match dist {
        EMPTY_DIST => f.write_str(".."),
        END_OF_DIST => f.write_str("##"),
        d => match hash {
            Some(h) => write!(f, "{d:02}:{h:02x}"),
            None => write!(f, "{d:02}"),
        },
    }
}

/// One-byte cell: distance only.
///
/// Every used cell whose distance equals the probe distance is a candidate,
/// so keys are compared directly. Suited to keys that are cheap to compare.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DistCtrl {
    dist: i8,
}

impl sealed::Sealed for DistCtrl {}

impl ControlCell for DistCtrl {
    const EMPTY: Self = DistCtrl { dist: EMPTY_DIST };
    const END_OF: Self = DistCtrl { dist: END_OF_DIST };
    const HAS_FINGERPRINT: bool = false;
    const SIZE: usize = 1;

    #[inline(always)]
    fn new(dist: u8, _fingerprint: u8) -> Self {
        debug_assert!(dist <= MAX_DISTANCE);
        DistCtrl { dist: dist as i8 }
    }

    #[inline(always)]
    fn dist(self) -> i8 {
        self.dist
    }

    #[inline(always)]
    fn fingerprint(self) -> u8 {
        0
    }

    #[inline(always)]
    fn set_dist(&mut self, dist: i8) {
        self.dist = dist;
    }

    #[inline(always)]
    fn splat(dist: u8, _fingerprint: u8) -> u64 {
        repeat_u8(dist)
    }

    #[inline(always)]
    fn set_value(&mut self, dist: u8, _fingerprint: u8) {
        debug_assert!(dist <= MAX_DISTANCE);
        self.dist = dist as i8;
    }
}

impl Debug for DistCtrl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_cell(self.dist, None, f)
    }
}

/// Two-byte cell: distance plus one byte of the hash.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(2))]
pub struct HashCtrl {
    dist: i8,
    hash: u8,
}

impl sealed::Sealed for HashCtrl {}

impl ControlCell for HashCtrl {
    const EMPTY: Self = HashCtrl {
        dist: EMPTY_DIST,
        hash: 0,
    };
    const END_OF: Self = HashCtrl {
        dist: END_OF_DIST,
        hash: 0,
    };
    const HAS_FINGERPRINT: bool = true;
    const SIZE: usize = 2;

    #[inline(always)]
    fn new(dist: u8, fingerprint: u8) -> Self {
        debug_assert!(dist <= MAX_DISTANCE);
        HashCtrl {
            dist: dist as i8,
            hash: fingerprint,
        }
    }

    #[inline(always)]
    fn dist(self) -> i8 {
        self.dist
    }

    #[inline(always)]
    fn fingerprint(self) -> u8 {
        self.hash
    }

    #[inline(always)]
    fn set_dist(&mut self, dist: i8) {
        self.dist = dist;
    }

    #[inline(always)]
    fn splat(dist: u8, fingerprint: u8) -> u64 {
        repeat_u16(u16::from_le_bytes([dist, fingerprint]))
    }

    #[inline(always)]
    fn set_value(&mut self, dist: u8, fingerprint: u8) {
        *self = HashCtrl::new(dist, fingerprint);
    }
}

impl Debug for HashCtrl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_cell(self.dist, Some(self.hash), f)
    }
}

/// Eight-byte cell: distance, fingerprint and the index of the element in
/// the dense arena of an indirect table.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct IndexCtrl {
    dist: i8,
    hash: u8,
    _pad: u16,
    index: u32,
}

impl sealed::Sealed for IndexCtrl {}

impl IndexCtrl {
    /// Position of the element in the dense arena.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline(always)]
    pub(crate) fn set_index(&mut self, index: usize) {
        debug_assert!(index <= u32::MAX as usize);
        self.index = index as u32;
    }
}

impl ControlCell for IndexCtrl {
    const EMPTY: Self = IndexCtrl {
        dist: EMPTY_DIST,
        hash: 0,
        _pad: 0,
        index: 0,
    };
    const END_OF: Self = IndexCtrl {
        dist: END_OF_DIST,
        hash: 0,
        _pad: 0,
        index: 0,
    };
    const HAS_FINGERPRINT: bool = true;
    const SIZE: usize = 8;

    #[inline(always)]
    fn new(dist: u8, fingerprint: u8) -> Self {
        debug_assert!(dist <= MAX_DISTANCE);
        IndexCtrl {
            dist: dist as i8,
            hash: fingerprint,
            _pad: 0,
            index: 0,
        }
    }

    #[inline(always)]
    fn dist(self) -> i8 {
        self.dist
    }

    #[inline(always)]
    fn fingerprint(self) -> u8 {
        self.hash
    }

    #[inline(always)]
    fn set_dist(&mut self, dist: i8) {
        self.dist = dist;
    }

    #[inline(always)]
    fn splat(dist: u8, fingerprint: u8) -> u64 {
        u16::from_le_bytes([dist, fingerprint]) as u64
    }

    #[inline(always)]
    fn set_value(&mut self, dist: u8, fingerprint: u8) {
        debug_assert!(dist <= MAX_DISTANCE);
        self.dist = dist as i8;
        self.hash = fingerprint;
    }
}

impl Debug for IndexCtrl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_cell(self.dist, Some(self.hash), f)?;
        if self.dist >= 0 {
            write!(f, "@{}", self.index)?;
        }
        Ok(())
    }
}
