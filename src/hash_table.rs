//! The raw Robin Hood table behind [`HashMap`](crate::HashMap) and
//! [`HashSet`](crate::HashSet).
//!
//! [`HashTable`] stores values of type `T` and knows nothing about keys: every
//! operation takes the value's `u64` hash and an equality predicate, and
//! operations that may grow the table also take a closure that re-hashes a
//! stored value.
//!
//! The control array holds `capacity + max_lookups` probe positions with no
//! wrap around, followed by one group of end-of cells so vector scans never
//! need a bounds check. Every element sits at most `max_lookups - 1` cells
//! past its home bucket; an insertion that would break that bound grows the
//! table instead. Removal shifts the rest of the probe run back by one, so
//! the table never holds tombstones.

use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop, MaybeUninit};
use core::ptr::{self, NonNull};

use crate::control::{ControlCell, MAX_DISTANCE};
use crate::error::{Fallibility, TryReserveError};
use crate::group::{BitMask, GROUP_BYTES, Group};
use crate::layout::{Inline, SlotLayout};
use crate::slot::{Slot, Strategy};

/// Smallest probe bound of any allocated table.
const MIN_LOOKUPS: usize = 16;

/// Largest probe bound. Distances must fit in the signed distance byte.
const MAX_LOOKUPS: usize = MAX_DISTANCE as usize + 1;

/// Smallest non-zero number of home buckets.
const MIN_CAPACITY: usize = 4;

/// Load factors are stored as fixed point with this scale.
const LOAD_FACTOR_ONE: u32 = 1 << 16;

/// Lowest accepted maximum load factor.
pub const MIN_LOAD_FACTOR: f32 = 0.2;

/// Highest accepted maximum load factor.
pub const MAX_LOAD_FACTOR: f32 = 0.8;

cfg_if::cfg_if! {
    if #[cfg(feature = "load-factor-seventy-five")] {
        const DEFAULT_LOAD_FACTOR: u32 = LOAD_FACTOR_ONE / 4 * 3;
    } else if #[cfg(feature = "load-factor-sixty-two-point-five")] {
        const DEFAULT_LOAD_FACTOR: u32 = LOAD_FACTOR_ONE / 8 * 5;
    } else {
        const DEFAULT_LOAD_FACTOR: u32 = LOAD_FACTOR_ONE / 2;
    }
}

/// Control array shared by every table that has not allocated yet. Reads as
/// all-empty cells of any width and is never written.
#[repr(C, align(32))]
struct EmptyControl([u8; 2 * GROUP_BYTES]);

static EMPTY_CONTROL: EmptyControl = EmptyControl([0xFF; 2 * GROUP_BYTES]);

/// Spreads the caller's hash so that weak hashes still reach every bucket.
#[inline(always)]
fn mix(hash: u64) -> u64 {
    let h = hash.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^ (h >> 32)
}

#[inline(always)]
fn fingerprint(mixed: u64) -> u8 {
    (mixed >> 56) as u8
}

#[inline(always)]
fn max_lookups_for(capacity: usize) -> usize {
    (2 * capacity.trailing_zeros() as usize).clamp(MIN_LOOKUPS, MAX_LOOKUPS)
}

#[inline(always)]
fn max_pop_for(capacity: usize, load_factor: u32) -> usize {
    ((capacity as u128 * load_factor as u128) >> 16) as usize
}

fn load_factor_from_f32(load_factor: f32) -> u32 {
    if load_factor.is_nan() {
        return DEFAULT_LOAD_FACTOR;
    }
    let clamped = load_factor.clamp(MIN_LOAD_FACTOR, MAX_LOAD_FACTOR);
    (clamped * LOAD_FACTOR_ONE as f32) as u32
}

#[inline]
fn infallible<R>(result: Result<R, TryReserveError>) -> R {
    match result {
        Ok(value) => value,
        // Infallible requests panic or abort before an error is returned.
        Err(_) => unreachable!(),
    }
}

#[derive(Debug, Clone, Copy)]
struct DataLayout {
    layout: Layout,
    slots_offset: usize,
    hashes_offset: usize,
}

impl DataLayout {
    const EMPTY: DataLayout = DataLayout {
        layout: Layout::new::<()>(),
        slots_offset: 0,
        hashes_offset: 0,
    };

    fn new<C, T>(ctrl_len: usize, slot_len: usize, hash_len: usize) -> Option<Self> {
        let ctrl = Layout::array::<C>(ctrl_len).ok()?.align_to(GROUP_BYTES).ok()?;
        let slots = Layout::array::<Slot<T>>(slot_len).ok()?;
        let hashes = Layout::array::<u64>(hash_len).ok()?;

        let (layout, slots_offset) = ctrl.extend(slots).ok()?;
        let (layout, hashes_offset) = layout.extend(hashes).ok()?;

        Some(DataLayout {
            layout: layout.pad_to_align(),
            slots_offset,
            hashes_offset,
        })
    }
}

/// Outcome of a probe for one hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// An element matched at this position.
    Found(usize),
    /// No match; a new element belongs at `pos`, `dist` cells from home.
    Vacant { pos: usize, dist: u8 },
    /// No match, and a new element would exceed the probe bound.
    Full,
}

/// A hash table using Robin Hood hashing with backward-shift deletion.
///
/// `HashTable<T, L>` stores values of type `T` in the storage layout `L` (see
/// [`SlotLayout`]). Like hashbrown's raw table, it requires the caller to
/// provide the hash and an equality predicate for each operation.
///
/// ## Performance Characteristics
///
/// - **Memory**: one control cell (1, 2 or 8 bytes depending on `L`) per probe
///   position, plus the element slots. The [`Indirect`](crate::Indirect)
///   layout additionally stores the full hash of every element.
/// - **Lookups** compare a whole group of control cells per step and stop at
///   the first cell closer to its home than the probe.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use robin_hash::hash_table::Entry;
/// # use robin_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// #[derive(Debug, PartialEq)]
/// struct Person {
///     id: u64,
///     name: String,
/// }
///
/// fn hash_id(id: u64) -> u64 {
///     let mut hasher = SipHasher::new();
///     id.hash(&mut hasher);
///     hasher.finish()
/// }
///
/// let mut table: HashTable<Person> = HashTable::with_capacity(100);
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p| p.id == 123, |p| hash_id(p.id)) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => unreachable!(),
/// }
///
/// assert_eq!(table.find(hash, |p| p.id == 123).map(|p| p.name.as_str()), Some("Alice"));
/// ```
pub struct HashTable<T, L: SlotLayout = Inline> {
    layout: DataLayout,
    alloc: NonNull<u8>,

    ctrl: NonNull<L::Ctrl>,
    slots: NonNull<Slot<T>>,
    hashes: NonNull<u64>,

    capacity: usize,
    bucket_mask: usize,
    max_lookups: usize,
    slot_len: usize,

    populated: usize,
    max_pop: usize,
    load_factor: u32,

    _phantom: PhantomData<T>,
}

// SAFETY: The table owns its elements; the raw pointers are never shared.
unsafe impl<T: Send, L: SlotLayout> Send for HashTable<T, L> {}
// SAFETY: Shared access only hands out shared references to elements.
unsafe impl<T: Sync, L: SlotLayout> Sync for HashTable<T, L> {}

impl<T, L: SlotLayout> Debug for HashTable<T, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut out = f.debug_struct("HashTable");
        out.field("populated", &self.populated)
            .field("capacity", &self.capacity)
            .field("max_lookups", &self.max_lookups);

        if self.capacity == 0 {
            out.field("ctrl", &"empty");
        } else {
            out.field(
                "ctrl",
                &self
                    .control_cells()
                    .chunks(Group::<L::Ctrl>::WIDTH)
                    .collect::<Vec<_>>(),
            );
        }

        out.finish()
    }
}

impl<T: Clone, L: SlotLayout> Clone for HashTable<T, L> {
    fn clone(&self) -> Self {
        let mut new_table = infallible(Self::new_uninitialized(
            self.capacity,
            self.load_factor,
            Fallibility::Infallible,
        ));

        // Elements are cloned one at a time and counted as they land, so a
        // panicking clone leaves `new_table` holding exactly the finished ones.
        // SAFETY: Both tables share capacity and therefore geometry.
        unsafe {
            if L::INDIRECT {
                ptr::copy_nonoverlapping(
                    self.ctrl.as_ptr(),
                    new_table.ctrl.as_ptr(),
                    self.usable(),
                );
                ptr::copy_nonoverlapping(
                    self.hashes.as_ptr(),
                    new_table.hashes.as_ptr(),
                    self.populated,
                );
                for index in 0..self.populated {
                    let value = Slot::get(self.slot_ptr(index)).clone();
                    Slot::write(new_table.slot_ptr(index), value);
                    new_table.populated += 1;
                }
            } else {
                for pos in RawIter::<L>::new(self.ctrl, self.populated) {
                    let value = Slot::get(self.slot_ptr(pos)).clone();
                    Slot::write(new_table.slot_ptr(pos), value);
                    *new_table.ctrl.as_ptr().add(pos) = self.ctrl_at(pos);
                    new_table.populated += 1;
                }
            }
        }

        debug_assert_eq!(new_table.populated, self.populated);
        new_table
    }
}

impl<T, L: SlotLayout> Drop for HashTable<T, L> {
    fn drop(&mut self) {
        // SAFETY: Live elements are tracked by `populated` and the control
        // array. The allocation is only freed when one exists.
        unsafe {
            self.drop_elements();

            if self.layout.layout.size() != 0 {
                alloc::alloc::dealloc(self.alloc.as_ptr(), self.layout.layout);
            }
        }
    }
}

impl<T, L: SlotLayout> Default for HashTable<T, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, L: SlotLayout> HashTable<T, L> {
    /// Creates an empty table. Does not allocate.
    pub fn new() -> Self {
        Self::empty(DEFAULT_LOAD_FACTOR)
    }

    /// Creates a table that can hold at least `capacity` elements without
    /// growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() as f32 * table.max_load_factor() >= 100.0);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let buckets = infallible(Self::buckets_for(
            capacity,
            DEFAULT_LOAD_FACTOR,
            Fallibility::Infallible,
        ));
        infallible(Self::new_uninitialized(
            buckets,
            DEFAULT_LOAD_FACTOR,
            Fallibility::Infallible,
        ))
    }

    fn empty(load_factor: u32) -> Self {
        Self {
            layout: DataLayout::EMPTY,
            alloc: NonNull::dangling(),
            ctrl: NonNull::from(&EMPTY_CONTROL).cast(),
            slots: NonNull::dangling(),
            hashes: NonNull::dangling(),
            capacity: 0,
            bucket_mask: 0,
            max_lookups: 0,
            slot_len: 0,
            populated: 0,
            max_pop: 0,
            load_factor,
            _phantom: PhantomData,
        }
    }

    /// Number of home buckets needed to hold `count` elements.
    fn buckets_for(
        count: usize,
        load_factor: u32,
        fallibility: Fallibility,
    ) -> Result<usize, TryReserveError> {
        if count == 0 {
            return Ok(0);
        }
        if L::INDIRECT && count > u32::MAX as usize {
            return Err(fallibility.capacity_overflow());
        }

        let scaled = ((count as u128) << 16).div_ceil(load_factor as u128);
        usize::try_from(scaled)
            .ok()
            .and_then(|buckets| buckets.max(MIN_CAPACITY).checked_next_power_of_two())
            .ok_or_else(|| fallibility.capacity_overflow())
    }

    /// Allocates a table with `capacity` home buckets and no elements.
    fn new_uninitialized(
        capacity: usize,
        load_factor: u32,
        fallibility: Fallibility,
    ) -> Result<Self, TryReserveError> {
        if capacity == 0 {
            return Ok(Self::empty(load_factor));
        }
        debug_assert!(capacity.is_power_of_two());

        let max_lookups = max_lookups_for(capacity);
        let usable = capacity + max_lookups;
        let ctrl_len = usable + Group::<L::Ctrl>::WIDTH;
        let max_pop = max_pop_for(capacity, load_factor);
        let (slot_len, hash_len) = if L::INDIRECT {
            (max_pop, max_pop)
        } else {
            (usable, 0)
        };

        let layout = DataLayout::new::<L::Ctrl, T>(ctrl_len, slot_len, hash_len)
            .ok_or_else(|| fallibility.capacity_overflow())?;

        // SAFETY: The layout is non-zero sized since it holds the control array.
        let alloc = unsafe { alloc::alloc::alloc(layout.layout) };
        let Some(alloc) = NonNull::new(alloc) else {
            return Err(fallibility.alloc_err(layout.layout));
        };

        // SAFETY: Offsets were computed by `DataLayout` for this allocation.
        let (slots, hashes) = unsafe {
            (
                alloc.add(layout.slots_offset).cast(),
                alloc.add(layout.hashes_offset).cast(),
            )
        };

        let mut table = Self {
            layout,
            alloc,
            ctrl: alloc.cast(),
            slots,
            hashes,
            capacity,
            bucket_mask: capacity - 1,
            max_lookups,
            slot_len,
            populated: 0,
            max_pop,
            load_factor,
            _phantom: PhantomData,
        };
        table.reset_ctrl();

        Ok(table)
    }

    /// Marks every probe position empty and writes the end-of padding.
    fn reset_ctrl(&mut self) {
        if self.capacity == 0 {
            return;
        }

        let usable = self.usable();
        let ctrl = self.ctrl.as_ptr();
        // SAFETY: The control array holds `usable + WIDTH` cells, so the last
        // group written from below `usable` and the padding group both fit.
        unsafe {
            let mut pos = 0;
            while pos < usable {
                Group::fill_all_empty(ctrl.add(pos));
                pos += Group::<L::Ctrl>::WIDTH;
            }
            Group::fill_all_end_of(ctrl.add(usable));
        }
    }

    /// Number of probe positions, excluding the end-of padding.
    #[inline(always)]
    fn usable(&self) -> usize {
        if self.capacity == 0 {
            0
        } else {
            self.capacity + self.max_lookups
        }
    }

    #[inline(always)]
    fn ctrl_at(&self, pos: usize) -> L::Ctrl {
        debug_assert!(pos < self.usable() + Group::<L::Ctrl>::WIDTH);
        // SAFETY: Callers stay within the control array.
        unsafe { *self.ctrl.as_ptr().add(pos) }
    }

    #[inline(always)]
    unsafe fn slot_ptr(&self, index: usize) -> *mut Slot<T> {
        debug_assert!(index < self.slot_len);
        // SAFETY: Caller guarantees `index < slot_len`.
        unsafe { self.slots.as_ptr().add(index) }
    }

    /// # Safety
    ///
    /// The cell at `pos` must be used.
    #[inline(always)]
    unsafe fn element_at(&self, pos: usize) -> &T {
        // SAFETY: A used cell always refers to a live slot.
        unsafe { Slot::get(self.slot_ptr(L::slot_index(self.ctrl_at(pos), pos))) }
    }

    /// # Safety
    ///
    /// The cell at `pos` must be used.
    #[inline(always)]
    unsafe fn element_at_mut(&mut self, pos: usize) -> &mut T {
        // SAFETY: A used cell always refers to a live slot.
        unsafe { Slot::get_mut(self.slot_ptr(L::slot_index(self.ctrl_at(pos), pos))) }
    }

    #[inline(always)]
    fn home(&self, mixed: u64) -> usize {
        mixed as usize & self.bucket_mask
    }

    /// Scans the probe sequence of `hash`.
    #[inline(always)]
    fn probe(&self, hash: u64, mut eq: impl FnMut(&T) -> bool) -> Probe {
        let mixed = mix(hash);
        let fp = fingerprint(mixed);
        let mut pos = self.home(mixed);
        let mut dist = 0;

        loop {
            // SAFETY: Probing stops at the first end-of cell, and a full group
            // of them follows the last probe position.
            let group = unsafe { Group::<L::Ctrl>::load(self.ctrl.as_ptr().add(pos)) };
            let (stop, hits) = group.match_hash_and_distance(dist.min(MAX_LOOKUPS) as u8, fp);

            let end = stop.lowest_set_bit();
            let live = match end {
                Some(end) => hits.before(end),
                None => hits,
            };
            for offset in live {
                // SAFETY: Hits are used cells.
                if eq(unsafe { self.element_at(pos + offset) }) {
                    return Probe::Found(pos + offset);
                }
            }

            if let Some(end) = end {
                let dist = dist + end;
                return if dist < self.max_lookups {
                    Probe::Vacant {
                        pos: pos + end,
                        dist: dist as u8,
                    }
                } else {
                    Probe::Full
                };
            }

            pos += Group::<L::Ctrl>::WIDTH;
            dist += Group::<L::Ctrl>::WIDTH;
        }
    }

    /// Finds where a new element with `hash` would go, ignoring equal
    /// elements.
    #[inline]
    fn probe_vacant(&self, hash: u64) -> Probe {
        let mut pos = self.home(mix(hash));
        let mut dist = 0;

        loop {
            // SAFETY: See `probe`.
            let group = unsafe { Group::<L::Ctrl>::load(self.ctrl.as_ptr().add(pos)) };
            if let Some(end) = group
                .match_empty_and_distance(dist.min(MAX_LOOKUPS) as u8)
                .lowest_set_bit()
            {
                let dist = dist + end;
                return if dist < self.max_lookups {
                    Probe::Vacant {
                        pos: pos + end,
                        dist: dist as u8,
                    }
                } else {
                    Probe::Full
                };
            }

            pos += Group::<L::Ctrl>::WIDTH;
            dist += Group::<L::Ctrl>::WIDTH;
        }
    }

    /// Walks the displacement chain an insertion at `pos` would start and
    /// reports whether every displaced element stays within the probe bound.
    fn displacement_fits(&self, pos: usize) -> bool {
        let cell = self.ctrl_at(pos);
        if cell.is_empty() {
            return true;
        }

        let mut carried = cell.dist() as usize + 1;
        let mut pos = pos + 1;
        loop {
            if carried >= self.max_lookups {
                return false;
            }
            let cell = self.ctrl_at(pos);
            if cell.is_empty() {
                return true;
            }
            if cell.is_end_of() {
                return false;
            }
            let dist = cell.dist() as usize;
            carried = if dist < carried { dist } else { carried } + 1;
            pos += 1;
        }
    }

    /// Places `value` at `pos` and carries every displaced element one cell
    /// further until an empty cell absorbs the chain. Returns the slot index
    /// of the new element.
    ///
    /// # Safety
    ///
    /// `pos` and `dist` must come from a vacant probe for `hash` on the
    /// current allocation, `displacement_fits(pos)` must hold and
    /// `populated < max_pop`.
    unsafe fn insert_at(&mut self, pos: usize, dist: u8, hash: u64, value: T) -> usize {
        debug_assert!(self.populated < self.max_pop);
        debug_assert!(self.displacement_fits(pos));

        let ctrl = self.ctrl.as_ptr();
        let mut carried = L::Ctrl::new(dist, fingerprint(mix(hash)));

        // SAFETY: The displacement chain ends on an empty cell below `usable`,
        // and every slot it passes holds a live element.
        unsafe {
            let index = if L::INDIRECT {
                let index = self.populated;
                L::bind(&mut carried, index);
                Slot::write(self.slot_ptr(index), value);
                self.hashes.as_ptr().add(index).write(hash);

                let mut pos = pos;
                loop {
                    let cell = &mut *ctrl.add(pos);
                    if cell.is_empty() {
                        *cell = carried;
                        break;
                    }
                    if cell.dist() < carried.dist() {
                        mem::swap(cell, &mut carried);
                    }
                    carried.inc_dist();
                    pos += 1;
                }
                index
            } else {
                let mut value = MaybeUninit::new(value);
                let mut cur = pos;
                loop {
                    let cell = &mut *ctrl.add(cur);
                    if cell.is_empty() {
                        *cell = carried;
                        Slot::write(self.slot_ptr(cur), value.assume_init());
                        break;
                    }
                    if cell.dist() < carried.dist() {
                        mem::swap(cell, &mut carried);
                        Slot::exchange(self.slot_ptr(cur), &mut value);
                    }
                    carried.inc_dist();
                    cur += 1;
                }
                pos
            };

            self.populated += 1;
            index
        }
    }

    /// First position after `start` that ends a backward shift: an empty,
    /// end-of, or home cell.
    #[inline]
    fn shift_run_end(&self, start: usize) -> usize {
        let mut pos = start;
        loop {
            // SAFETY: The end-of padding guarantees a match within bounds.
            let group = unsafe { Group::<L::Ctrl>::load(self.ctrl.as_ptr().add(pos)) };
            if let Some(offset) = group.match_below(1).lowest_set_bit() {
                return pos + offset;
            }
            pos += Group::<L::Ctrl>::WIDTH;
        }
    }

    /// Removes the element at `pos` and shifts the rest of its run back by one
    /// cell.
    ///
    /// # Safety
    ///
    /// The cell at `pos` must be used.
    unsafe fn erase_at(&mut self, pos: usize) -> T {
        let ctrl = self.ctrl.as_ptr();
        let index = L::slot_index(self.ctrl_at(pos), pos);

        // SAFETY: `pos` is used, and the shifted run lies within the probe
        // positions since it ends before the first end-of cell.
        unsafe {
            let value = Slot::take(self.slot_ptr(index));

            let end = self.shift_run_end(pos + 1);
            let count = end - pos - 1;
            ptr::copy(ctrl.add(pos + 1), ctrl.add(pos), count);
            for shifted in pos..pos + count {
                (*ctrl.add(shifted)).dec_dist();
            }
            (*ctrl.add(pos + count)).set_empty();
            if !L::INDIRECT {
                Slot::shift_back(self.slot_ptr(pos), count);
            }

            self.populated -= 1;
            if L::INDIRECT {
                self.compact(index);
            }

            value
        }
    }

    /// Moves the last arena element into the vacated slot `hole` and repoints
    /// its control cell.
    ///
    /// # Safety
    ///
    /// Slot `hole` must be vacant and `populated` must already count the
    /// removal.
    unsafe fn compact(&mut self, hole: usize) {
        let last = self.populated;
        if hole == last {
            return;
        }

        // SAFETY: `last` is the final live arena slot and `hole < last`.
        unsafe {
            Slot::transfer(self.slot_ptr(hole), self.slot_ptr(last));
            let hash = *self.hashes.as_ptr().add(last);
            *self.hashes.as_ptr().add(hole) = hash;

            let pos = self.locate_index(hash, last);
            L::bind(&mut *self.ctrl.as_ptr().add(pos), hole);
        }
    }

    /// Position of the control cell referring to arena slot `index`.
    fn locate_index(&self, hash: u64, index: usize) -> usize {
        debug_assert!(L::INDIRECT);
        let mixed = mix(hash);
        let fp = fingerprint(mixed);
        let mut pos = self.home(mixed);

        loop {
            debug_assert!(pos < self.usable());
            // SAFETY: The cell exists, so the scan ends within the probe region.
            let group = unsafe { Group::<L::Ctrl>::load(self.ctrl.as_ptr().add(pos)) };
            for offset in group.match_hash(fp) {
                if L::slot_index(self.ctrl_at(pos + offset), pos + offset) == index {
                    return pos + offset;
                }
            }
            pos += Group::<L::Ctrl>::WIDTH;
        }
    }

    /// Finds a vacant position for `hash`, growing until the insertion fits.
    fn prepare_insert(&mut self, hash: u64, hasher: &impl Fn(&T) -> u64) -> (usize, u8) {
        loop {
            if self.populated < self.max_pop {
                if let Probe::Vacant { pos, dist } = self.probe_vacant(hash) {
                    if self.displacement_fits(pos) {
                        return (pos, dist);
                    }
                }
            }
            self.grow(hasher);
        }
    }

    /// Grows for one more element: to the load-factor minimum when at the
    /// population threshold, otherwise to twice the current capacity.
    #[cold]
    #[inline(never)]
    fn grow(&mut self, hasher: &impl Fn(&T) -> u64) {
        let capacity = if self.populated >= self.max_pop {
            infallible(Self::buckets_for(
                self.populated + 1,
                self.load_factor,
                Fallibility::Infallible,
            ))
        } else {
            match self.capacity.checked_mul(2) {
                Some(capacity) => capacity,
                None => infallible(Err(Fallibility::Infallible.capacity_overflow())),
            }
        };
        infallible(self.resize(capacity, hasher, Fallibility::Infallible));
    }

    /// Moves every element into a new allocation with `capacity` buckets.
    ///
    /// Each element is hashed before it leaves the old table, so a panicking
    /// hasher drops the moved elements with the new table and the rest with
    /// this one.
    #[cold]
    #[inline(never)]
    fn resize(
        &mut self,
        capacity: usize,
        hasher: &impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        let mut new_table = Self::new_uninitialized(capacity, self.load_factor, fallibility)?;

        if L::INDIRECT {
            while self.populated > 0 {
                let last = self.populated - 1;
                // SAFETY: Arena slots below `populated` are live.
                let (hash, value) = unsafe {
                    (
                        *self.hashes.as_ptr().add(last),
                        Slot::take(self.slot_ptr(last)),
                    )
                };
                self.populated = last;
                new_table.insert_unique(hash, value, hasher);
            }
        } else {
            let mut pos = 0;
            while self.populated > 0 {
                // SAFETY: Live elements remain, so `pos` is below `usable`.
                let group = unsafe { Group::<L::Ctrl>::load(self.ctrl.as_ptr().add(pos)) };
                for offset in group.match_used() {
                    let at = pos + offset;
                    // SAFETY: `at` is used until marked empty below.
                    unsafe {
                        let hash = hasher(self.element_at(at));
                        let value = Slot::take(self.slot_ptr(at));
                        (*self.ctrl.as_ptr().add(at)).set_empty();
                        self.populated -= 1;
                        new_table.insert_unique(hash, value, hasher);
                    }
                }
                pos += Group::<L::Ctrl>::WIDTH;
            }
        }

        mem::swap(self, &mut new_table);
        Ok(())
    }

    /// Inserts a value known not to be present, growing as needed. Returns
    /// its slot index.
    fn insert_unique(&mut self, hash: u64, value: T, hasher: &impl Fn(&T) -> u64) -> usize {
        let (pos, dist) = self.prepare_insert(hash, hasher);
        // SAFETY: `prepare_insert` validated the position.
        unsafe { self.insert_at(pos, dist, hash, value) }
    }

    /// # Safety
    ///
    /// Elements are dropped but still marked live; the caller must reset the
    /// bookkeeping or free the table.
    unsafe fn drop_elements(&mut self) {
        if Slot::<T>::STRATEGY == Strategy::Plain || self.populated == 0 {
            return;
        }

        // SAFETY: Indices yielded by the iterator refer to live slots.
        unsafe {
            if L::INDIRECT {
                for index in 0..self.populated {
                    Slot::destroy(self.slot_ptr(index));
                }
            } else {
                for pos in RawIter::<L>::new(self.ctrl, self.populated) {
                    Slot::destroy(self.slot_ptr(pos));
                }
            }
        }
    }

    /// Returns an iterator over all values in the table.
    ///
    /// The iteration order is unspecified.
    pub fn iter(&self) -> Iter<'_, T, L> {
        Iter {
            table: self,
            raw: self.raw_iter(),
        }
    }

    /// Returns an iterator yielding mutable references to all values.
    pub fn iter_mut(&mut self) -> IterMut<'_, T, L> {
        IterMut {
            slots: self.slots,
            raw: self.raw_iter(),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn raw_iter(&self) -> RawIter<L> {
        RawIter::new(self.ctrl, self.populated)
    }

    /// Removes all values from the table and returns them as an iterator.
    ///
    /// The table keeps its allocation. If the iterator is leaked the table is
    /// left empty and the allocation leaks with it.
    pub fn drain(&mut self) -> Drain<'_, T, L> {
        let table = mem::replace(self, Self::empty(self.load_factor));
        Drain {
            raw: table.raw_iter(),
            table: ManuallyDrop::new(table),
            orig: self,
        }
    }

    /// Keeps only the values for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&mut T) -> bool) {
        if L::INDIRECT {
            let mut index = 0;
            while index < self.populated {
                // SAFETY: Arena slots below `populated` are live.
                if f(unsafe { Slot::get_mut(self.slot_ptr(index)) }) {
                    index += 1;
                    continue;
                }
                // SAFETY: Slot `index` is live, so its hash is recorded and its
                // cell exists. Erasing moves the last element into `index`.
                unsafe {
                    let hash = *self.hashes.as_ptr().add(index);
                    let pos = self.locate_index(hash, index);
                    drop(self.erase_at(pos));
                }
            }
        } else {
            let mut pos = 0;
            let mut remaining = self.populated;
            while remaining > 0 {
                if self.ctrl_at(pos).is_used() {
                    remaining -= 1;
                    // SAFETY: The cell is used.
                    if !f(unsafe { self.element_at_mut(pos) }) {
                        // The next element of the run shifts into `pos`.
                        // SAFETY: The cell is used.
                        drop(unsafe { self.erase_at(pos) });
                        continue;
                    }
                }
                pos += 1;
            }
        }
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Number of home buckets. Always zero or a power of two.
    ///
    /// The table grows once `len()` reaches
    /// `capacity() * max_load_factor()`.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current ratio of elements to home buckets.
    pub fn load_factor(&self) -> f32 {
        if self.capacity == 0 {
            0.0
        } else {
            self.populated as f32 / self.capacity as f32
        }
    }

    /// The population threshold, as a fraction of [`capacity`](Self::capacity),
    /// at which the table grows.
    pub fn max_load_factor(&self) -> f32 {
        self.load_factor as f32 / LOAD_FACTOR_ONE as f32
    }

    /// Sets the growth threshold, clamped to
    /// [`MIN_LOAD_FACTOR`]`..=`[`MAX_LOAD_FACTOR`]. Rebuilds the table when it
    /// no longer satisfies the new threshold.
    pub fn set_max_load_factor(&mut self, load_factor: f32, hasher: impl Fn(&T) -> u64) {
        self.load_factor = load_factor_from_f32(load_factor);
        let max_pop = max_pop_for(self.capacity, self.load_factor);

        if self.populated > max_pop {
            let capacity = infallible(Self::buckets_for(
                self.populated,
                self.load_factor,
                Fallibility::Infallible,
            ));
            infallible(self.resize(capacity, &hasher, Fallibility::Infallible));
        } else if L::INDIRECT && max_pop > self.slot_len {
            // The arena is sized for the old threshold.
            infallible(self.resize(self.capacity, &hasher, Fallibility::Infallible));
        } else {
            self.max_pop = max_pop;
        }
    }

    /// Removes all elements, keeping the allocation.
    pub fn clear(&mut self) {
        struct ResetGuard<'a, T, L: SlotLayout>(&'a mut HashTable<T, L>);

        impl<T, L: SlotLayout> Drop for ResetGuard<'_, T, L> {
            fn drop(&mut self) {
                self.0.reset_ctrl();
                self.0.populated = 0;
            }
        }

        // A panicking destructor leaks the remaining elements.
        let guard = ResetGuard(self);
        // SAFETY: The guard resets the bookkeeping afterwards.
        unsafe { guard.0.drop_elements() };
    }

    /// Shrinks the allocation as much as the current population allows.
    pub fn shrink_to_fit(&mut self, hasher: impl Fn(&T) -> u64) {
        self.shrink_to(0, hasher);
    }

    /// Shrinks the allocation, keeping room for at least `min_capacity`
    /// elements.
    pub fn shrink_to(&mut self, min_capacity: usize, hasher: impl Fn(&T) -> u64) {
        let capacity = infallible(Self::buckets_for(
            self.populated.max(min_capacity),
            self.load_factor,
            Fallibility::Infallible,
        ));
        if capacity < self.capacity {
            infallible(self.resize(capacity, &hasher, Fallibility::Infallible));
        }
    }

    /// Reserves room for at least `additional` more elements.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows; aborts on allocation failure.
    pub fn reserve(&mut self, additional: usize, hasher: impl Fn(&T) -> u64) {
        infallible(self.reserve_inner(additional, &hasher, Fallibility::Infallible));
    }

    /// Tries to reserve room for at least `additional` more elements.
    pub fn try_reserve(
        &mut self,
        additional: usize,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<(), TryReserveError> {
        self.reserve_inner(additional, &hasher, Fallibility::Fallible)
    }

    fn reserve_inner(
        &mut self,
        additional: usize,
        hasher: &impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        let required = self
            .populated
            .checked_add(additional)
            .ok_or_else(|| fallibility.capacity_overflow())?;
        if required <= self.max_pop {
            return Ok(());
        }

        let capacity = Self::buckets_for(required, self.load_factor, fallibility)?;
        self.resize(capacity, hasher, fallibility)
    }

    /// Rebuilds the table with at least `buckets` home buckets, or the
    /// minimum the current population needs if that is larger.
    pub fn rehash(&mut self, buckets: usize, hasher: impl Fn(&T) -> u64) {
        let minimum = infallible(Self::buckets_for(
            self.populated,
            self.load_factor,
            Fallibility::Infallible,
        ));
        let capacity = if buckets == 0 {
            minimum
        } else {
            match buckets.max(MIN_CAPACITY).checked_next_power_of_two() {
                Some(capacity) => capacity.max(minimum),
                None => infallible(Err(Fallibility::Infallible.capacity_overflow())),
            }
        };
        infallible(self.resize(capacity, &hasher, Fallibility::Infallible));
    }

    /// Gets the entry for `hash` and `eq`, for in-place manipulation.
    ///
    /// A vacant entry has already made room for one more element, growing the
    /// table with `hasher` if needed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::hash_table::{Entry, HashTable};
    /// #
    /// let mut table: HashTable<(u32, &str)> = HashTable::new();
    /// let hasher = |v: &(u32, &str)| v.0 as u64;
    ///
    /// table.entry(7, |v| v.0 == 7, hasher).or_insert((7, "seven"));
    /// match table.entry(7, |v| v.0 == 7, hasher) {
    ///     Entry::Occupied(entry) => assert_eq!(entry.get().1, "seven"),
    ///     Entry::Vacant(_) => unreachable!(),
    /// }
    /// ```
    pub fn entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
    ) -> Entry<'_, T, L> {
        match self.probe(hash, eq) {
            Probe::Found(pos) => return Entry::Occupied(OccupiedEntry { table: self, pos }),
            Probe::Vacant { pos, dist }
                if self.populated < self.max_pop && self.displacement_fits(pos) =>
            {
                return Entry::Vacant(VacantEntry {
                    table: self,
                    pos,
                    dist,
                    hash,
                });
            }
            _ => {}
        }

        let (pos, dist) = self.prepare_insert(hash, &hasher);
        Entry::Vacant(VacantEntry {
            table: self,
            pos,
            dist,
            hash,
        })
    }

    /// Inserts `value` without checking whether an equal value exists.
    pub fn insert_unique_with(
        &mut self,
        hash: u64,
        value: T,
        hasher: impl Fn(&T) -> u64,
    ) -> &mut T {
        let index = self.insert_unique(hash, value, &hasher);
        // SAFETY: The slot was just written.
        unsafe { Slot::get_mut(self.slot_ptr(index)) }
    }

    /// Finds a value by hash and equality predicate.
    pub fn find(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&T> {
        match self.probe(hash, eq) {
            // SAFETY: Found positions are used.
            Probe::Found(pos) => Some(unsafe { self.element_at(pos) }),
            _ => None,
        }
    }

    /// Finds a value by hash and equality predicate, returning a mutable
    /// reference.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&mut T> {
        match self.probe(hash, eq) {
            // SAFETY: Found positions are used.
            Probe::Found(pos) => Some(unsafe { self.element_at_mut(pos) }),
            _ => None,
        }
    }

    /// Removes and returns the value matching `hash` and `eq`.
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<T> {
        match self.probe(hash, eq) {
            // SAFETY: Found positions are used.
            Probe::Found(pos) => Some(unsafe { self.erase_at(pos) }),
            _ => None,
        }
    }

    /// The control cells of every probe position.
    pub(crate) fn control_cells(&self) -> &[L::Ctrl] {
        // SAFETY: The control array holds at least `usable` initialized cells;
        // an unallocated table yields an empty slice.
        unsafe { core::slice::from_raw_parts(self.ctrl.as_ptr(), self.usable()) }
    }

    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn max_lookups(&self) -> usize {
        self.max_lookups
    }

    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn allocation_size(&self) -> usize {
        self.layout.layout.size()
    }

    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn slot_len(&self) -> usize {
        self.slot_len
    }

    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn ctrl_ptr(&self) -> *const L::Ctrl {
        self.ctrl.as_ptr()
    }
}

/// Yields the slot index of every live element: probe positions for direct
/// layouts, arena indices for the indirect one.
struct RawIter<L: SlotLayout> {
    ctrl: *const L::Ctrl,
    base: usize,
    next_group: usize,
    mask: BitMask,
    remaining: usize,
}

impl<L: SlotLayout> RawIter<L> {
    fn new(ctrl: NonNull<L::Ctrl>, populated: usize) -> Self {
        RawIter {
            ctrl: ctrl.as_ptr(),
            base: 0,
            next_group: 0,
            mask: BitMask::new(0, 0),
            remaining: populated,
        }
    }
}

impl<L: SlotLayout> Iterator for RawIter<L> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        if L::INDIRECT {
            let index = self.next_group;
            self.next_group += 1;
            return Some(index);
        }

        loop {
            if let Some(offset) = self.mask.lowest_set_bit() {
                self.mask = self.mask.remove_lowest_bit();
                return Some(self.base + offset);
            }
            self.base = self.next_group;
            // SAFETY: A live element remains at or after `base`, so the group
            // lies within the control array.
            let group = unsafe { Group::<L::Ctrl>::load(self.ctrl.add(self.base)) };
            self.mask = group.match_used();
            self.next_group += Group::<L::Ctrl>::WIDTH;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, T, L: SlotLayout = Inline> {
    /// A vacant entry - no matching value is present in the table
    Vacant(VacantEntry<'a, T, L>),
    /// An occupied entry - a matching value is present in the table
    Occupied(OccupiedEntry<'a, T, L>),
}

impl<'a, T, L: SlotLayout> Entry<'a, T, L> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant. The closure is
    /// not called for occupied entries.
    pub fn or_insert_with(self, default: impl FnOnce() -> T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to an occupied entry's value and returns it. Returns
    /// `None` without inserting for vacant entries.
    pub fn and_modify(self, f: impl FnOnce(&mut T)) -> Option<&'a mut T> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `T::default()` if the entry is vacant.
    pub fn or_default(self) -> &'a mut T
    where
        T: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the hash table.
///
/// Room for the new value has already been made; inserting never grows.
pub struct VacantEntry<'a, T, L: SlotLayout = Inline> {
    table: &'a mut HashTable<T, L>,
    pos: usize,
    dist: u8,
    hash: u64,
}

impl<'a, T, L: SlotLayout> VacantEntry<'a, T, L> {
    /// Inserts `value` and returns a mutable reference to it.
    pub fn insert(self, value: T) -> &'a mut T {
        let table = self.table;
        // SAFETY: `entry` validated the position and capacity.
        unsafe {
            let index = table.insert_at(self.pos, self.dist, self.hash, value);
            Slot::get_mut(table.slot_ptr(index))
        }
    }
}

/// A view into an occupied entry in the hash table.
pub struct OccupiedEntry<'a, T, L: SlotLayout = Inline> {
    table: &'a mut HashTable<T, L>,
    pos: usize,
}

impl<'a, T, L: SlotLayout> OccupiedEntry<'a, T, L> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &T {
        // SAFETY: The entry's position is used.
        unsafe { self.table.element_at(self.pos) }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut T {
        // SAFETY: The entry's position is used.
        unsafe { self.table.element_at_mut(self.pos) }
    }

    /// Converts the entry into a mutable reference with the entry's lifetime.
    pub fn into_mut(self) -> &'a mut T {
        let table = self.table;
        // SAFETY: The entry's position is used.
        unsafe { table.element_at_mut(self.pos) }
    }

    /// Removes the value from the table and returns it.
    pub fn remove(self) -> T {
        // SAFETY: The entry's position is used.
        unsafe { self.table.erase_at(self.pos) }
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, T, L: SlotLayout = Inline> {
    table: &'a HashTable<T, L>,
    raw: RawIter<L>,
}

impl<'a, T, L: SlotLayout> Iterator for Iter<'a, T, L> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.raw.next()?;
        // SAFETY: Raw indices refer to live slots of the borrowed table.
        Some(unsafe { Slot::get(self.table.slot_ptr(index)) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<T, L: SlotLayout> ExactSizeIterator for Iter<'_, T, L> {}

impl<T, L: SlotLayout> Clone for Iter<'_, T, L> {
    fn clone(&self) -> Self {
        Iter {
            table: self.table,
            raw: RawIter {
                ctrl: self.raw.ctrl,
                base: self.raw.base,
                next_group: self.raw.next_group,
                mask: self.raw.mask,
                remaining: self.raw.remaining,
            },
        }
    }
}

/// A mutable iterator over the values in a [`HashTable`].
pub struct IterMut<'a, T, L: SlotLayout = Inline> {
    slots: NonNull<Slot<T>>,
    raw: RawIter<L>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, L: SlotLayout> Iterator for IterMut<'a, T, L> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.raw.next()?;
        // SAFETY: Each live slot is yielded once while the table is borrowed
        // mutably.
        Some(unsafe { Slot::get_mut(self.slots.as_ptr().add(index)) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<T, L: SlotLayout> ExactSizeIterator for IterMut<'_, T, L> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// Values not consumed are dropped along with the iterator.
pub struct Drain<'a, T, L: SlotLayout = Inline> {
    table: ManuallyDrop<HashTable<T, L>>,
    orig: &'a mut HashTable<T, L>,
    raw: RawIter<L>,
}

impl<T, L: SlotLayout> Iterator for Drain<'_, T, L> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.raw.next()?;
        // SAFETY: Each live slot is yielded once and then treated as moved.
        Some(unsafe { Slot::take(self.table.slot_ptr(index)) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<T, L: SlotLayout> ExactSizeIterator for Drain<'_, T, L> {}

impl<T, L: SlotLayout> Drop for Drain<'_, T, L> {
    fn drop(&mut self) {
        for value in self.by_ref() {
            drop(value);
        }

        self.table.populated = 0;
        self.table.reset_ctrl();
        mem::swap(self.orig, &mut *self.table);
    }
}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<T, L: SlotLayout = Inline> {
    table: HashTable<T, L>,
    raw: RawIter<L>,
}

impl<T, L: SlotLayout> Iterator for IntoIter<T, L> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.raw.next()?;
        // SAFETY: Each live slot is yielded once and then treated as moved.
        Some(unsafe { Slot::take(self.table.slot_ptr(index)) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<T, L: SlotLayout> ExactSizeIterator for IntoIter<T, L> {}

impl<T, L: SlotLayout> Drop for IntoIter<T, L> {
    fn drop(&mut self) {
        // The table only frees its allocation; remaining values are dropped
        // here, leaking the rest if one panics.
        self.table.populated = 0;
        if Slot::<T>::STRATEGY == Strategy::Relocate {
            while let Some(index) = self.raw.next() {
                // SAFETY: Each live slot is yielded once.
                unsafe { Slot::destroy(self.table.slot_ptr(index)) };
            }
        }
    }
}

impl<T, L: SlotLayout> IntoIterator for HashTable<T, L> {
    type IntoIter = IntoIter<T, L>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            raw: self.raw_iter(),
            table: self,
        }
    }
}

impl<'a, T, L: SlotLayout> IntoIterator for &'a HashTable<T, L> {
    type IntoIter = Iter<'a, T, L>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, L: SlotLayout> IntoIterator for &'a mut HashTable<T, L> {
    type IntoIter = IterMut<'a, T, L>;
    type Item = &'a mut T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
impl<T, L: SlotLayout> HashTable<T, L> {
    /// Asserts every structural invariant of the table.
    pub(crate) fn check_invariants(&self, hasher: impl Fn(&T) -> u64) {
        use alloc::vec;

        let cells = self.control_cells();
        let mut used = 0;
        let mut previous: Option<i8> = None;
        let mut seen = vec![false; self.slot_len];

        for (pos, cell) in cells.iter().enumerate() {
            if !cell.is_used() {
                assert!(cell.is_empty(), "unexpected sentinel at {pos}: {self:?}");
                previous = None;
                continue;
            }
            used += 1;

            let dist = cell.dist();
            assert!(
                (dist as usize) < self.max_lookups,
                "distance {dist} at {pos} exceeds bound {}",
                self.max_lookups
            );
            match previous {
                None => assert_eq!(dist, 0, "gap before {pos}: {self:?}"),
                Some(prev) => assert!(dist <= prev + 1, "ordering broken at {pos}: {self:?}"),
            }
            previous = Some(dist);

            let index = L::slot_index(*cell, pos);
            // SAFETY: Used cells refer to live slots.
            let value = unsafe { Slot::get(self.slot_ptr(index)) };
            let hash = hasher(value);
            let mixed = mix(hash);
            assert_eq!(self.home(mixed), pos - dist as usize, "wrong home at {pos}");
            if L::Ctrl::HAS_FINGERPRINT {
                assert_eq!(cell.fingerprint(), fingerprint(mixed));
            }
            if L::INDIRECT {
                assert!(index < self.populated);
                assert!(!seen[index], "arena slot {index} referenced twice");
                seen[index] = true;
                // SAFETY: Live arena slots have a recorded hash.
                assert_eq!(unsafe { *self.hashes.as_ptr().add(index) }, hash);
            }
        }

        assert_eq!(used, self.populated);
        assert!(self.populated <= self.max_pop);
        for pad in 0..Group::<L::Ctrl>::WIDTH {
            if self.capacity != 0 {
                assert!(self.ctrl_at(self.usable() + pad).is_end_of());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use core::cell::Cell;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::layout::{Compact, Indirect};

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn insert_item<L: SlotLayout>(
        table: &mut HashTable<Item, L>,
        state: &HashState,
        key: u64,
        value: i32,
    ) -> bool {
        let hash = hash_key(state, key);
        match table.entry(hash, |v| v.key == key, |v| hash_key(state, v.key)) {
            Entry::Vacant(entry) => {
                entry.insert(Item { key, value });
                true
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().value = value;
                false
            }
        }
    }

    fn find_item<'a, L: SlotLayout>(
        table: &'a HashTable<Item, L>,
        state: &HashState,
        key: u64,
    ) -> Option<&'a Item> {
        table.find(hash_key(state, key), |v| v.key == key)
    }

    fn insert_and_find<L: SlotLayout>() {
        let state = HashState::default();
        let mut table: HashTable<Item, L> = HashTable::new();
        for k in 0..512u64 {
            assert!(insert_item(&mut table, &state, k, k as i32 * 2));
            assert_eq!(
                find_item(&table, &state, k),
                Some(&Item {
                    key: k,
                    value: k as i32 * 2
                }),
                "{table:#?}"
            );
        }
        assert_eq!(table.len(), 512);
        table.check_invariants(|v| hash_key(&state, v.key));

        for k in 0..512u64 {
            assert_eq!(find_item(&table, &state, k).map(|v| v.value), Some(k as i32 * 2));
        }
        assert!(find_item(&table, &state, 9999).is_none());
    }

    #[test]
    fn insert_and_find_all_layouts() {
        insert_and_find::<Compact>();
        insert_and_find::<Inline>();
        insert_and_find::<Indirect>();
    }

    #[test]
    fn empty_table_does_not_allocate() {
        let state = HashState::default();
        let table: HashTable<Item> = HashTable::new();
        assert_eq!(table.capacity(), 0);
        assert_eq!(table.allocation_size(), 0);
        assert!(find_item(&table, &state, 1).is_none());
        assert_eq!(table.iter().count(), 0);
        assert_eq!(table.load_factor(), 0.0);

        let mut table: HashTable<Item, Indirect> = HashTable::with_capacity(0);
        assert_eq!(table.allocation_size(), 0);
        assert!(table.remove(hash_key(&state, 1), |v| v.key == 1).is_none());
        table.clear();
        table.shrink_to_fit(|v| hash_key(&state, v.key));
        assert_eq!(table.capacity(), 0);
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        assert!(insert_item(&mut table, &state, 42, 7));
        assert!(!insert_item(&mut table, &state, 42, 11));
        assert_eq!(table.len(), 1);
        assert_eq!(find_item(&table, &state, 42).map(|v| v.value), Some(11));
    }

    fn remove_keeps_survivors<L: SlotLayout>() {
        let state = HashState::default();
        let mut table: HashTable<Item, L> = HashTable::new();
        for k in 0..300u64 {
            insert_item(&mut table, &state, k, k as i32);
        }

        for k in (0..300u64).step_by(3) {
            let removed = table.remove(hash_key(&state, k), |v| v.key == k);
            assert_eq!(removed.map(|v| v.key), Some(k));
            table.check_invariants(|v| hash_key(&state, v.key));
        }
        assert_eq!(table.len(), 200);

        for k in 0..300u64 {
            let found = find_item(&table, &state, k).is_some();
            assert_eq!(found, k % 3 != 0, "key {k}");
        }
        assert!(table.remove(hash_key(&state, 0), |v| v.key == 0).is_none());
        assert_eq!(table.len(), 200);
    }

    #[test]
    fn remove_keeps_survivors_all_layouts() {
        remove_keeps_survivors::<Compact>();
        remove_keeps_survivors::<Inline>();
        remove_keeps_survivors::<Indirect>();
    }

    fn colliding_hashes<L: SlotLayout>() {
        // Every key shares a hash: one long run from a single home bucket.
        let mut table: HashTable<u64, L> = HashTable::new();
        for k in 0..12u64 {
            table.entry(5, |&v| v == k, |_| 5).or_insert(k);
            table.check_invariants(|_| 5);
        }
        assert_eq!(table.len(), 12);
        for k in 0..12u64 {
            assert_eq!(table.find(5, |&v| v == k), Some(&k));
        }

        assert_eq!(table.remove(5, |&v| v == 0), Some(0));
        assert_eq!(table.remove(5, |&v| v == 6), Some(6));
        table.check_invariants(|_| 5);
        for k in (1..12u64).filter(|&k| k != 6) {
            assert_eq!(table.find(5, |&v| v == k), Some(&k));
        }
    }

    #[test]
    fn colliding_hashes_all_layouts() {
        colliding_hashes::<Compact>();
        colliding_hashes::<Inline>();
        colliding_hashes::<Indirect>();
    }

    #[test]
    fn displacement_respects_distance_bound() {
        // Two hashes that share a home bucket in a small table force long
        // displacement chains.
        let mut table: HashTable<u64> = HashTable::with_capacity(8);
        let hasher = |v: &u64| v % 2;
        for k in 0..14u64 {
            table.entry(k % 2, |&v| v == k, hasher).or_insert(k);
            table.check_invariants(hasher);
        }
        let bound = table.max_lookups() as i8;
        assert!(table.control_cells().iter().all(|c| c.dist() < bound));
    }

    #[test]
    fn growth_keeps_load_factor() {
        let state = HashState::default();
        for lf in [0.2f32, 0.35, 0.5, 0.65, 0.8] {
            let mut table: HashTable<Item> = HashTable::new();
            table.set_max_load_factor(lf, |v| hash_key(&state, v.key));
            for k in 0..1000u64 {
                insert_item(&mut table, &state, k, 0);
                assert!(
                    table.len() as f32 <= table.capacity() as f32 * table.max_load_factor(),
                    "lf {lf} len {} capacity {}",
                    table.len(),
                    table.capacity()
                );
            }
        }
    }

    #[test]
    fn load_factor_is_clamped() {
        let mut table: HashTable<u64> = HashTable::new();
        table.set_max_load_factor(0.95, |&v| v);
        assert!((table.max_load_factor() - MAX_LOAD_FACTOR).abs() < 1e-4);
        table.set_max_load_factor(0.01, |&v| v);
        assert!((table.max_load_factor() - MIN_LOAD_FACTOR).abs() < 1e-4);
        table.set_max_load_factor(f32::NAN, |&v| v);
        assert!((table.max_load_factor() - DEFAULT_LOAD_FACTOR as f32 / 65536.0).abs() < 1e-4);
    }

    fn lowering_load_factor_rebuilds<L: SlotLayout>() {
        let state = HashState::default();
        let mut table: HashTable<Item, L> = HashTable::new();
        table.set_max_load_factor(0.8, |v| hash_key(&state, v.key));
        for k in 0..100u64 {
            insert_item(&mut table, &state, k, 1);
        }
        let before = table.capacity();
        table.set_max_load_factor(0.2, |v| hash_key(&state, v.key));
        assert!(table.capacity() > before);
        assert!(table.len() as f32 <= table.capacity() as f32 * 0.2);
        table.check_invariants(|v| hash_key(&state, v.key));

        // Raising again must leave room for the larger population.
        table.set_max_load_factor(0.8, |v| hash_key(&state, v.key));
        for k in 100..400u64 {
            insert_item(&mut table, &state, k, 1);
        }
        table.check_invariants(|v| hash_key(&state, v.key));
        assert_eq!(table.len(), 400);
    }

    #[test]
    fn lowering_load_factor_rebuilds_all_layouts() {
        lowering_load_factor_rebuilds::<Inline>();
        lowering_load_factor_rebuilds::<Indirect>();
    }

    #[test]
    fn reserve_and_rehash_keep_contents() {
        let state = HashState::default();
        let mut table: HashTable<Item, Indirect> = HashTable::new();
        for k in 0..50u64 {
            insert_item(&mut table, &state, k, k as i32);
        }

        let mut before: Vec<_> = table.iter().cloned().map(|v| (v.key, v.value)).collect();
        before.sort_unstable();

        table.reserve(1000, |v| hash_key(&state, v.key));
        let capacity = table.capacity();
        for k in 50..1050u64 {
            insert_item(&mut table, &state, k, k as i32);
        }
        assert_eq!(table.capacity(), capacity, "reserve must avoid regrowth");
        for k in 50..1050u64 {
            table.remove(hash_key(&state, k), |v| v.key == k);
        }

        table.rehash(4096, |v| hash_key(&state, v.key));
        assert_eq!(table.capacity(), 4096);
        let mut after: Vec<_> = table.iter().map(|v| (v.key, v.value)).collect();
        after.sort_unstable();
        assert_eq!(before, after);

        table.shrink_to_fit(|v| hash_key(&state, v.key));
        assert!(table.capacity() < 4096);
        table.check_invariants(|v| hash_key(&state, v.key));
    }

    #[test]
    fn try_reserve_reports_overflow() {
        let mut table: HashTable<u64> = HashTable::new();
        assert_eq!(
            table.try_reserve(usize::MAX, |&v| v),
            Err(TryReserveError::CapacityOverflow)
        );
        assert!(table.try_reserve(10, |&v| v).is_ok());
        assert!(table.capacity() >= 16);
    }

    #[test]
    fn clear_and_reuse() {
        let state = HashState::default();
        let mut table: HashTable<String> = HashTable::new();
        for k in 0..64u64 {
            let s = k.to_string();
            let hash = hash_key(&state, k);
            table
                .entry(hash, |v| *v == s, |v| hash_key(&state, v.parse().unwrap()))
                .or_insert(s.clone());
        }
        let capacity = table.capacity();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.iter().count(), 0);

        let hash = hash_key(&state, 3);
        table
            .entry(hash, |v| v == "3", |v| hash_key(&state, v.parse().unwrap()))
            .or_insert("3".to_string());
        assert_eq!(table.find(hash, |v| v == "3").map(String::as_str), Some("3"));
    }

    #[test]
    fn iter_yields_every_value_once() {
        let state = HashState::default();
        let mut table: HashTable<Item, Compact> = HashTable::new();
        for k in 0..200u64 {
            insert_item(&mut table, &state, k, 1);
        }
        let iter = table.iter();
        assert_eq!(iter.len(), 200);
        let mut keys: Vec<_> = iter.map(|v| v.key).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..200).collect::<Vec<_>>());

        for item in table.iter_mut() {
            item.value += 1;
        }
        assert!(table.iter().all(|v| v.value == 2));
    }

    #[test]
    fn drain_empties_and_keeps_allocation() {
        let state = HashState::default();
        let mut table: HashTable<Item, Indirect> = HashTable::new();
        for k in 0..100u64 {
            insert_item(&mut table, &state, k, 1);
        }
        let capacity = table.capacity();

        let mut drained: Vec<_> = table.drain().map(|v| v.key).collect();
        drained.sort_unstable();
        assert_eq!(drained, (0..100).collect::<Vec<_>>());
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);

        insert_item(&mut table, &state, 5, 5);
        {
            // Dropping a partially consumed drain still empties the table.
            let mut drain = table.drain();
            assert!(drain.next().is_some());
        }
        assert!(table.is_empty());
        table.check_invariants(|v| hash_key(&state, v.key));
    }

    fn retain_filters<L: SlotLayout>() {
        let state = HashState::default();
        let mut table: HashTable<Item, L> = HashTable::new();
        for k in 0..400u64 {
            insert_item(&mut table, &state, k, k as i32);
        }
        let mut visited = 0;
        table.retain(|v| {
            visited += 1;
            v.key % 4 == 0
        });
        assert_eq!(visited, 400);
        assert_eq!(table.len(), 100);
        table.check_invariants(|v| hash_key(&state, v.key));
        for k in 0..400u64 {
            assert_eq!(find_item(&table, &state, k).is_some(), k % 4 == 0);
        }
    }

    #[test]
    fn retain_filters_all_layouts() {
        retain_filters::<Compact>();
        retain_filters::<Inline>();
        retain_filters::<Indirect>();
    }

    #[test]
    fn into_iter_drops_remaining() {
        let state = HashState::default();
        let mut table: HashTable<String> = HashTable::new();
        for k in 0..30u64 {
            let s = k.to_string();
            table
                .entry(hash_key(&state, k), |v| *v == s, |v| {
                    hash_key(&state, v.parse().unwrap())
                })
                .or_insert(s.clone());
        }
        let mut iter = table.into_iter();
        assert_eq!(iter.len(), 30);
        iter.next();
        iter.next();
        assert_eq!(iter.len(), 28);
    }

    #[derive(Debug)]
    struct DropCounter<'a> {
        key: u64,
        drops: &'a Cell<usize>,
    }

    impl Drop for DropCounter<'_> {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn drops_each_value_once<L: SlotLayout>() {
        let drops = Cell::new(0);
        {
            let mut table: HashTable<DropCounter<'_>, L> = HashTable::new();
            let hasher = |v: &DropCounter<'_>| v.key.wrapping_mul(31);
            for k in 0..100u64 {
                table
                    .entry(k.wrapping_mul(31), |v| v.key == k, hasher)
                    .or_insert(DropCounter { key: k, drops: &drops });
            }
            assert_eq!(drops.get(), 0, "growth must move, not drop");

            for k in 0..10u64 {
                drop(table.remove(k.wrapping_mul(31), |v| v.key == k));
            }
            assert_eq!(drops.get(), 10);

            table.retain(|v| v.key >= 20);
            assert_eq!(drops.get(), 20);
        }
        assert_eq!(drops.get(), 100);
    }

    #[test]
    fn drops_each_value_once_all_layouts() {
        drops_each_value_once::<Compact>();
        drops_each_value_once::<Inline>();
        drops_each_value_once::<Indirect>();
    }

    struct Tracked<'a> {
        key: u64,
        live: &'a Cell<usize>,
        clones_left: &'a Cell<usize>,
    }

    impl Clone for Tracked<'_> {
        fn clone(&self) -> Self {
            let left = self.clones_left.get();
            if left == 0 {
                panic!("clone failed");
            }
            self.clones_left.set(left - 1);
            self.live.set(self.live.get() + 1);
            Tracked {
                key: self.key,
                live: self.live,
                clones_left: self.clones_left,
            }
        }
    }

    impl Drop for Tracked<'_> {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    fn tracked_table<'a, L: SlotLayout>(
        live: &'a Cell<usize>,
        clones_left: &'a Cell<usize>,
    ) -> HashTable<Tracked<'a>, L> {
        let mut table = HashTable::new();
        for k in 0..50u64 {
            live.set(live.get() + 1);
            table
                .entry(
                    k.wrapping_mul(31),
                    |v: &Tracked<'_>| v.key == k,
                    |v: &Tracked<'_>| v.key.wrapping_mul(31),
                )
                .or_insert(Tracked {
                    key: k,
                    live,
                    clones_left,
                });
        }
        table
    }

    #[cfg(feature = "std")]
    fn panicking_clone_drops_partial_copy<L: SlotLayout>() {
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let live = Cell::new(0);
        let clones_left = Cell::new(19);
        {
            let table = tracked_table::<L>(&live, &clones_left);
            assert_eq!(live.get(), 50);

            let result = catch_unwind(AssertUnwindSafe(|| table.clone()));
            assert!(result.is_err());
            assert_eq!(live.get(), 50);
            assert_eq!(table.len(), 50);

            clones_left.set(usize::MAX);
            let copy = table.clone();
            assert_eq!(live.get(), 100);
            drop(copy);
            assert_eq!(live.get(), 50);
        }
        assert_eq!(live.get(), 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn panicking_clone_drops_partial_copy_all_layouts() {
        panicking_clone_drops_partial_copy::<Compact>();
        panicking_clone_drops_partial_copy::<Inline>();
        panicking_clone_drops_partial_copy::<Indirect>();
    }

    #[cfg(feature = "std")]
    fn panicking_hasher_during_rehash<L: SlotLayout>() {
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let live = Cell::new(0);
        let clones_left = Cell::new(0);
        {
            let mut table = tracked_table::<L>(&live, &clones_left);
            let calls = Cell::new(0);
            let result = catch_unwind(AssertUnwindSafe(|| {
                table.rehash(1024, |v: &Tracked<'_>| {
                    calls.set(calls.get() + 1);
                    if calls.get() == 10 {
                        panic!("hasher failed");
                    }
                    v.key.wrapping_mul(31)
                })
            }));
            assert!(result.is_err());
            // Elements already moved went down with the new allocation; the
            // rest are still owned by the table.
            assert_eq!(live.get(), table.len());
            assert!(table.len() < 50);
        }
        assert_eq!(live.get(), 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn panicking_hasher_during_rehash_direct_layouts() {
        panicking_hasher_during_rehash::<Compact>();
        panicking_hasher_during_rehash::<Inline>();
    }

    #[test]
    fn clone_is_deep() {
        let state = HashState::default();
        let mut table: HashTable<Item, Indirect> = HashTable::new();
        for k in 0..64u64 {
            insert_item(&mut table, &state, k, k as i32);
        }
        let mut copy = table.clone();
        copy.check_invariants(|v| hash_key(&state, v.key));
        assert_eq!(copy.len(), 64);

        insert_item(&mut copy, &state, 1, -1);
        assert_eq!(find_item(&table, &state, 1).map(|v| v.value), Some(1));
        assert_eq!(find_item(&copy, &state, 1).map(|v| v.value), Some(-1));

        let mut inline: HashTable<Item> = HashTable::new();
        for k in 0..64u64 {
            insert_item(&mut inline, &state, k, k as i32);
        }
        let copy = inline.clone();
        copy.check_invariants(|v| hash_key(&state, v.key));
        assert_eq!(copy.iter().count(), 64);
    }

    #[test]
    fn entry_helpers() {
        let mut table: HashTable<(u64, u32)> = HashTable::new();
        let hasher = |v: &(u64, u32)| v.0;

        assert!(table.entry(1, |v| v.0 == 1, hasher).and_modify(|v| v.1 += 1).is_none());
        table.entry(1, |v| v.0 == 1, hasher).or_insert((1, 10));
        assert_eq!(
            table.entry(1, |v| v.0 == 1, hasher).and_modify(|v| v.1 += 1),
            Some(&mut (1, 11))
        );
        table
            .entry(2, |v| v.0 == 2, hasher)
            .or_insert_with(|| (2, 20));
        table
            .entry(2, |v| v.0 == 2, hasher)
            .or_insert_with(|| panic!("occupied entry must not call the closure"));

        match table.entry(2, |v| v.0 == 2, hasher) {
            Entry::Occupied(entry) => assert_eq!(entry.remove(), (2, 20)),
            Entry::Vacant(_) => unreachable!(),
        }
        assert_eq!(table.len(), 1);

        let mut defaults: HashTable<u32> = HashTable::new();
        *defaults.entry(0, |&v| v == 0, |&v| v as u64).or_default() += 0;
        assert_eq!(defaults.len(), 1);
    }

    #[test]
    fn debug_dumps_control_cells() {
        let mut table: HashTable<u64> = HashTable::new();
        assert!(alloc::format!("{table:?}").contains("empty"));
        table.entry(0, |&v| v == 0, |&v| v).or_insert(0);
        let dump = alloc::format!("{table:?}");
        assert!(dump.contains(".."), "{dump}");
        assert!(dump.contains("populated: 1"), "{dump}");
    }

    #[test]
    fn zero_sized_values() {
        let mut table: HashTable<()> = HashTable::new();
        table.entry(9, |_| true, |_| 9).or_insert(());
        assert_eq!(table.len(), 1);
        assert_eq!(table.find(9, |_| true), Some(&()));
        assert_eq!(table.remove(9, |_| true), Some(()));
        assert!(table.is_empty());
    }

    #[test]
    fn insert_unique_with_skips_lookup() {
        let hasher = |&v: &u64| v.wrapping_mul(7);
        let mut table: HashTable<u64> = HashTable::new();
        for k in 0..40u64 {
            assert_eq!(*table.insert_unique_with(hasher(&k), k, hasher), k);
        }
        table.check_invariants(hasher);
        assert_eq!(table.len(), 40);
        assert_eq!(table.find(hasher(&4), |&v| v == 4), Some(&4));
    }
}
