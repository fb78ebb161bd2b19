/// A mask of cells within a group, one bit per cell.
///
/// Vector compares produce one bit per byte. Masks are reduced to the first
/// byte of every cell, so `shift` converts a bit position into a cell index.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct BitMask {
    bits: u32,
    shift: u32,
}

impl BitMask {
    #[inline(always)]
    pub(crate) const fn new(bits: u32, shift: u32) -> Self {
        BitMask { bits, shift }
    }

    /// Index of the first cell in the mask.
    #[inline(always)]
    pub(crate) fn lowest_set_bit(self) -> Option<usize> {
        if self.bits == 0 {
            None
        } else {
            Some((self.bits.trailing_zeros() >> self.shift) as usize)
        }
    }

    #[inline(always)]
    pub(crate) fn remove_lowest_bit(self) -> Self {
        BitMask {
            bits: self.bits & self.bits.wrapping_sub(1),
            shift: self.shift,
        }
    }

    /// Keeps only cells strictly before cell `index`.
    #[inline(always)]
    pub(crate) fn before(self, index: usize) -> Self {
        let bit = (index as u32) << self.shift;
        let bits = if bit >= u32::BITS {
            self.bits
        } else {
            self.bits & ((1u32 << bit) - 1)
        };
        BitMask {
            bits,
            shift: self.shift,
        }
    }

    /// Number of cells in the mask.
    #[cfg(any(test, feature = "stats"))]
    #[inline(always)]
    pub(crate) fn count(self) -> usize {
        self.bits.count_ones() as usize
    }
}

impl Iterator for BitMask {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        let bit = self.lowest_set_bit()?;
        *self = self.remove_lowest_bit();
        Some(bit)
    }
}
