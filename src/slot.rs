//! Raw element slots.
//!
//! Moves in Rust are always bitwise, so the only per-type decision left is
//! whether dropping an element does anything. Types without drop glue skip
//! every teardown loop.

use core::mem::{self, MaybeUninit};
use core::ptr;

/// How elements of a type are torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Strategy {
    /// No drop glue: moving is a copy and nothing needs destroying.
    Plain,
    /// Moving is a copy, but values must be dropped in place.
    Relocate,
}

/// Possibly-uninitialized storage for one element.
#[repr(transparent)]
pub(crate) struct Slot<T>(MaybeUninit<T>);

impl<T> Slot<T> {
    pub(crate) const STRATEGY: Strategy = if mem::needs_drop::<T>() {
        Strategy::Relocate
    } else {
        Strategy::Plain
    };

    /// # Safety
    ///
    /// `slot` must be valid for writes and must not hold a live value.
    #[inline(always)]
    pub(crate) unsafe fn write(slot: *mut Self, value: T) -> *mut T {
        // SAFETY: Caller guarantees `slot` is writable and vacant.
        unsafe {
            let target = slot.cast::<T>();
            target.write(value);
            target
        }
    }

    /// # Safety
    ///
    /// `slot` must hold a live value. The returned reference must not outlive
    /// it.
    #[inline(always)]
    pub(crate) unsafe fn get<'a>(slot: *const Self) -> &'a T {
        // SAFETY: Caller guarantees the slot is initialized.
        unsafe { &*slot.cast::<T>() }
    }

    /// # Safety
    ///
    /// `slot` must hold a live value and no other reference may alias it.
    #[inline(always)]
    pub(crate) unsafe fn get_mut<'a>(slot: *mut Self) -> &'a mut T {
        // SAFETY: Caller guarantees the slot is initialized and unaliased.
        unsafe { &mut *slot.cast::<T>() }
    }

    /// Moves the value out, leaving the slot logically vacant.
    ///
    /// # Safety
    ///
    /// `slot` must hold a live value, which the caller must then treat as
    /// moved.
    #[inline(always)]
    pub(crate) unsafe fn take(slot: *mut Self) -> T {
        // SAFETY: Caller guarantees the slot is initialized.
        unsafe { slot.cast::<T>().read() }
    }

    /// # Safety
    ///
    /// `slot` must hold a live value, which is dead afterwards.
    #[inline(always)]
    pub(crate) unsafe fn destroy(slot: *mut Self) {
        if Self::STRATEGY == Strategy::Relocate {
            // SAFETY: Caller guarantees the slot is initialized.
            unsafe { ptr::drop_in_place(slot.cast::<T>()) }
        }
    }

    /// Moves the value in `src` into the vacant `dst`.
    ///
    /// # Safety
    ///
    /// `src` must be live, `dst` vacant, and the two must not overlap.
    #[inline(always)]
    pub(crate) unsafe fn transfer(dst: *mut Self, src: *const Self) {
        // SAFETY: Caller guarantees both slots are valid and distinct.
        unsafe { ptr::copy_nonoverlapping(src, dst, 1) }
    }

    /// Swaps the value in `slot` with `carried`.
    ///
    /// # Safety
    ///
    /// `slot` must hold a live value; `carried` must be initialized.
    #[inline(always)]
    pub(crate) unsafe fn exchange(slot: *mut Self, carried: &mut MaybeUninit<T>) {
        // SAFETY: Caller guarantees `slot` is valid; `carried` is a local.
        unsafe { mem::swap(&mut (*slot).0, carried) }
    }

    /// Moves `count` live values starting at `base + 1` down by one slot.
    /// The slot at `base` must be vacant and the last slot of the run is
    /// vacant afterwards.
    ///
    /// # Safety
    ///
    /// All `count + 1` slots starting at `base` must be valid.
    #[inline(always)]
    pub(crate) unsafe fn shift_back(base: *mut Self, count: usize) {
        // SAFETY: Caller guarantees the range is in bounds.
        unsafe { ptr::copy(base.add(1), base, count) }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn strategy_follows_drop_glue() {
        assert_eq!(Slot::<u64>::STRATEGY, Strategy::Plain);
        assert_eq!(Slot::<(u32, [u8; 3])>::STRATEGY, Strategy::Plain);
        assert_eq!(Slot::<String>::STRATEGY, Strategy::Relocate);
        assert_eq!(Slot::<Vec<u8>>::STRATEGY, Strategy::Relocate);
    }

    #[test]
    fn shift_and_exchange_move_values() {
        let mut slots: [Slot<String>; 4] = [const { Slot(MaybeUninit::uninit()) }; 4];
        let base = slots.as_mut_ptr();
        unsafe {
            Slot::write(base.add(1), "b".to_string());
            Slot::write(base.add(2), "c".to_string());

            Slot::shift_back(base, 2);
            assert_eq!(Slot::get(base), "b");
            assert_eq!(Slot::get(base.add(1)), "c");

            let mut carried = MaybeUninit::new("z".to_string());
            Slot::exchange(base.add(1), &mut carried);
            assert_eq!(Slot::get(base.add(1)), "z");
            assert_eq!(carried.assume_init_ref(), "c");

            Slot::transfer(base.add(3), carried.as_ptr().cast());
            assert_eq!(Slot::take(base.add(3)), "c");
            assert_eq!(Slot::take(base), "b");
            Slot::destroy(base.add(1));
        }
    }
}
