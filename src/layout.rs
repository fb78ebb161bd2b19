//! Slot layouts: how control cells relate to element storage.

use crate::control::{ControlCell, DistCtrl, HashCtrl, IndexCtrl, sealed::Sealed};

/// Chooses the control cell width and where elements live.
///
/// Direct layouts keep one element slot per probe position, so moving a
/// control cell moves its element too. The indirect layout keeps elements
/// packed in a dense arena and only the eight-byte cells move around.
///
/// This trait is sealed.
pub trait SlotLayout: Sealed + 'static {
    /// Control cell stored for every probe position.
    type Ctrl: ControlCell;

    /// Whether elements are kept in a dense arena addressed by index.
    const INDIRECT: bool;

    /// Index of the element slot belonging to the cell at `pos`.
    fn slot_index(ctrl: Self::Ctrl, pos: usize) -> usize;

    /// Points `ctrl` at arena slot `slot`. A no-op for direct layouts.
    fn bind(ctrl: &mut Self::Ctrl, slot: usize);
}

/// One-byte cells, elements stored inline. Best for small keys that are
/// cheap to compare, such as integers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Compact;

/// Two-byte cells with a hash fingerprint, elements stored inline.
///
/// The default layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Inline;

/// Eight-byte cells pointing into a dense element arena. Displacement and
/// backward shifting only move cells, which pays off for large elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Indirect;

impl Sealed for Compact {}
impl Sealed for Inline {}
impl Sealed for Indirect {}

impl SlotLayout for Compact {
    type Ctrl = DistCtrl;

    const INDIRECT: bool = false;

    #[inline(always)]
    fn slot_index(_ctrl: DistCtrl, pos: usize) -> usize {
        pos
    }

    #[inline(always)]
    fn bind(_ctrl: &mut DistCtrl, _slot: usize) {}
}

impl SlotLayout for Inline {
    type Ctrl = HashCtrl;

    const INDIRECT: bool = false;

    #[inline(always)]
    fn slot_index(_ctrl: HashCtrl, pos: usize) -> usize {
        pos
    }

    #[inline(always)]
    fn bind(_ctrl: &mut HashCtrl, _slot: usize) {}
}

impl SlotLayout for Indirect {
    type Ctrl = IndexCtrl;

    const INDIRECT: bool = true;

    #[inline(always)]
    fn slot_index(ctrl: IndexCtrl, _pos: usize) -> usize {
        ctrl.index()
    }

    #[inline(always)]
    fn bind(ctrl: &mut IndexCtrl, slot: usize) {
        ctrl.set_index(slot);
    }
}
