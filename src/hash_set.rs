use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::hash_table;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::layout::{Inline, SlotLayout};

#[inline]
fn make_hasher<T: Hash, S: BuildHasher>(hash_builder: &S) -> impl Fn(&T) -> u64 + '_ {
    move |value| hash_builder.hash_one(value)
}

/// A hash set implemented using the Robin Hood [`HashTable`] as the
/// underlying storage.
///
/// `HashSet<T, S, L>` stores values of type `T` where `T` implements
/// `Hash + Eq` and uses a configurable hasher builder `S` to hash values. The
/// slot layout `L` is described on [`SlotLayout`].
///
/// # Performance Characteristics
///
/// - **Memory**: 2 bytes of control per probe position with the default
///   [`Inline`] layout, plus the size of `T` per probe position.
pub struct HashSet<T, S = DefaultHashBuilder, L: SlotLayout = Inline> {
    table: HashTable<T, L>,
    hash_builder: S,
}

impl<T: Clone, S: Clone, L: SlotLayout> Clone for HashSet<T, S, L> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }
}

impl<T, S, L> PartialEq for HashSet<T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, L> Eq for HashSet<T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
}

impl<T: Debug, S, L: SlotLayout> Debug for HashSet<T, S, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S, L: SlotLayout> HashSet<T, S, L> {
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hash::HashSet;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let set: HashSet<i32, _> = HashSet::with_hasher(SimpleHasher);
    /// assert!(set.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates a new hash set that holds at least `capacity` values without
    /// growing.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of home buckets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Current ratio of elements to home buckets.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// The load factor at which the set grows.
    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor()
    }

    /// Removes all elements from the set, keeping the allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// An iterator visiting all elements in arbitrary order.
    pub fn iter(&self) -> Iter<'_, T, L> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all elements as an iterator.
    pub fn drain(&mut self) -> Drain<'_, T, L> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use robin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=4).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// # }
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|value| f(value));
    }
}

impl<T, S, L> HashSet<T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    /// Sets the load factor at which the set grows, clamped to `[0.2, 0.8]`.
    pub fn set_max_load_factor(&mut self, load_factor: f32) {
        self.table
            .set_max_load_factor(load_factor, make_hasher(&self.hash_builder));
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, make_hasher(&self.hash_builder));
    }

    /// Tries to reserve capacity for at least `additional` more elements.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table
            .try_reserve(additional, make_hasher(&self.hash_builder))
    }

    /// Shrinks the set as much as its current length allows.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit(make_hasher(&self.hash_builder));
    }

    /// Shrinks the set, keeping room for at least `min_capacity` elements.
    pub fn shrink_to(&mut self, min_capacity: usize) {
        self.table
            .shrink_to(min_capacity, make_hasher(&self.hash_builder));
    }

    /// Rebuilds the set with at least `buckets` home buckets, or as many as
    /// its length requires if that is more.
    pub fn rehash(&mut self, buckets: usize) {
        self.table.rehash(buckets, make_hasher(&self.hash_builder));
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An equal value already
    /// in the set is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use robin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert!(set.insert(2));
    /// assert!(!set.insert(2));
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.hash_builder.hash_one(&value);
        match self
            .table
            .entry(hash, |v| *v == value, make_hasher(&self.hash_builder))
        {
            TableEntry::Occupied(_) => false,
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Adds a value to the set, replacing and returning an equal value if one
    /// is present.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = self.hash_builder.hash_one(&value);
        match self
            .table
            .entry(hash, |v| *v == value, make_hasher(&self.hash_builder))
        {
            TableEntry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns `true` if the set contains a value.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(value).is_some()
    }

    /// Returns a reference to the stored value equal to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(value);
        self.table.find(hash, |v| v.borrow() == value)
    }

    /// Removes a value from the set. Returns whether it was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.take(value).is_some()
    }

    /// Removes and returns the stored value equal to `value`.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    /// Returns a histogram of probe distances of the elements in the set.
    #[cfg(feature = "stats")]
    pub fn probe_histogram(&self) -> crate::stats::ProbeHistogram {
        self.table.probe_histogram()
    }

    /// Returns occupancy and memory statistics of the set.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::stats::DebugStats {
        self.table.debug_stats()
    }

    /// Returns `true` if `self` has no elements in common with `other`.
    pub fn is_disjoint(&self, other: &HashSet<T, S, L>) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().all(|v| !large.contains(v))
    }

    /// Returns `true` if every element of `self` is in `other`.
    pub fn is_subset(&self, other: &HashSet<T, S, L>) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every element of `other` is in `self`.
    pub fn is_superset(&self, other: &HashSet<T, S, L>) -> bool {
        other.is_subset(self)
    }

    /// Returns an iterator over the union of `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use robin_hash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into();
    /// let b: HashSet<i32> = [2, 3].into();
    ///
    /// let mut union: Vec<_> = a.union(&b).copied().collect();
    /// union.sort();
    /// assert_eq!(union, [1, 2, 3]);
    /// # }
    /// ```
    pub fn union<'a>(&'a self, other: &'a HashSet<T, S, L>) -> Union<'a, T, S, L> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        Union {
            iter: large.iter(),
            rest: small.difference(large),
        }
    }

    /// Returns an iterator over the intersection of `self` and `other`.
    pub fn intersection<'a>(&'a self, other: &'a HashSet<T, S, L>) -> Intersection<'a, T, S, L> {
        if self.len() <= other.len() {
            Intersection {
                iter: self.iter(),
                other,
            }
        } else {
            Intersection {
                iter: other.iter(),
                other: self,
            }
        }
    }

    /// Returns an iterator over the values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a HashSet<T, S, L>) -> Difference<'a, T, S, L> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Returns an iterator over the values in exactly one of `self` and
    /// `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use robin_hash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into();
    /// let b: HashSet<i32> = [2, 3].into();
    ///
    /// let mut sym_diff: Vec<_> = a.symmetric_difference(&b).copied().collect();
    /// sym_diff.sort();
    /// assert_eq!(sym_diff, [1, 3]);
    /// # }
    /// ```
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a HashSet<T, S, L>,
    ) -> SymmetricDifference<'a, T, S, L> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }
}

impl<T, S, L> HashSet<T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
    L: SlotLayout,
{
    /// Creates a new hash set using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use robin_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash set that holds at least `capacity` values without
    /// growing, using the default hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S, L> Default for HashSet<T, S, L>
where
    S: Default,
    L: SlotLayout,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T, L: SlotLayout = Inline> {
    inner: hash_table::Iter<'a, T, L>,
}

impl<T, L: SlotLayout> Clone for Iter<'_, T, L> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T, L: SlotLayout> Iterator for Iter<'a, T, L> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, L: SlotLayout> ExactSizeIterator for Iter<'_, T, L> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T, L: SlotLayout = Inline> {
    inner: hash_table::Drain<'a, T, L>,
}

impl<T, L: SlotLayout> Iterator for Drain<'_, T, L> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, L: SlotLayout> ExactSizeIterator for Drain<'_, T, L> {}

/// An owning iterator over the values of a `HashSet`.
pub struct IntoIter<T, L: SlotLayout = Inline> {
    inner: hash_table::IntoIter<T, L>,
}

impl<T, L: SlotLayout> Iterator for IntoIter<T, L> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, L: SlotLayout> ExactSizeIterator for IntoIter<T, L> {}

impl<T, S, L: SlotLayout> IntoIterator for HashSet<T, S, L> {
    type IntoIter = IntoIter<T, L>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S, L: SlotLayout> IntoIterator for &'a HashSet<T, S, L> {
    type IntoIter = Iter<'a, T, L>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S, L> FromIterator<T> for HashSet<T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
    L: SlotLayout,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HashSet::new();
        set.extend(iter);
        set
    }
}

impl<T, S, L, const N: usize> From<[T; N]> for HashSet<T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
    L: SlotLayout,
{
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T, S, L> Extend<T> for HashSet<T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(if self.is_empty() {
            iter.size_hint().0
        } else {
            iter.size_hint().0.div_ceil(2)
        });
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S, L> Extend<&'a T> for HashSet<T, S, L>
where
    T: Hash + Eq + Copy,
    S: BuildHasher,
    L: SlotLayout,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

/// A lazy iterator producing elements in the union of two `HashSet`s.
pub struct Union<'a, T, S, L: SlotLayout = Inline> {
    iter: Iter<'a, T, L>,
    rest: Difference<'a, T, S, L>,
}

impl<'a, T, S, L> Iterator for Union<'a, T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().or_else(|| self.rest.next())
    }
}

/// A lazy iterator producing elements in the intersection of two `HashSet`s.
pub struct Intersection<'a, T, S, L: SlotLayout = Inline> {
    iter: Iter<'a, T, L>,
    other: &'a HashSet<T, S, L>,
}

impl<'a, T, S, L> Iterator for Intersection<'a, T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// A lazy iterator producing elements of one `HashSet` absent from another.
pub struct Difference<'a, T, S, L: SlotLayout = Inline> {
    iter: Iter<'a, T, L>,
    other: &'a HashSet<T, S, L>,
}

impl<'a, T, S, L> Iterator for Difference<'a, T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// A lazy iterator producing elements in exactly one of two `HashSet`s.
pub struct SymmetricDifference<'a, T, S, L: SlotLayout = Inline> {
    iter: core::iter::Chain<Difference<'a, T, S, L>, Difference<'a, T, S, L>>,
}

impl<'a, T, S, L> Iterator for SymmetricDifference<'a, T, S, L>
where
    T: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::layout::{Compact, Indirect};

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type SipSet<T, L = Inline> = HashSet<T, SipHashBuilder, L>;

    fn sorted<'a>(iter: impl Iterator<Item = &'a i32>) -> Vec<i32> {
        let mut out: Vec<_> = iter.copied().collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn test_new_and_with_hasher() {
        let set: SipSet<i32> = HashSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);

        let set2 = HashSet::<i32, _>::with_capacity_and_hasher(64, SipHashBuilder::default());
        assert!(set2.capacity() as f32 * set2.max_load_factor() >= 64.0);
    }

    #[test]
    fn test_insert_contains_remove() {
        fn check<L: SlotLayout>() {
            let mut set: SipSet<u32, L> = HashSet::new();
            for i in 0..300 {
                assert!(set.insert(i));
            }
            assert!(!set.insert(7));
            assert_eq!(set.len(), 300);

            for i in (0..300).step_by(2) {
                assert!(set.remove(&i));
            }
            assert!(!set.remove(&0));
            for i in 0..300 {
                assert_eq!(set.contains(&i), i % 2 == 1);
            }
        }

        check::<Compact>();
        check::<Inline>();
        check::<Indirect>();
    }

    #[test]
    fn test_replace_take_get() {
        let mut set: SipSet<String> = HashSet::new();
        set.insert("apple".to_string());

        assert_eq!(set.get("apple").map(String::as_str), Some("apple"));
        assert_eq!(set.replace("apple".to_string()), Some("apple".to_string()));
        assert_eq!(set.replace("pear".to_string()), None);
        assert_eq!(set.len(), 2);

        assert_eq!(set.take("apple"), Some("apple".to_string()));
        assert_eq!(set.take("apple"), None);
        assert!(set.contains("pear"));
    }

    #[test]
    fn test_set_algebra() {
        let a: SipSet<i32> = (0..10).collect();
        let b: SipSet<i32> = (5..15).collect();

        assert_eq!(sorted(a.union(&b)), (0..15).collect::<Vec<_>>());
        assert_eq!(sorted(b.union(&a)), (0..15).collect::<Vec<_>>());
        assert_eq!(sorted(a.intersection(&b)), (5..10).collect::<Vec<_>>());
        assert_eq!(sorted(a.difference(&b)), (0..5).collect::<Vec<_>>());
        assert_eq!(
            sorted(a.symmetric_difference(&b)),
            (0..5).chain(10..15).collect::<Vec<_>>()
        );

        let small: SipSet<i32> = [6, 7].into();
        assert!(small.is_subset(&a));
        assert!(a.is_superset(&small));
        assert!(!a.is_subset(&small));
        assert!(!a.is_disjoint(&b));
        let far: SipSet<i32> = [100, 200].into();
        assert!(far.is_disjoint(&a));
    }

    #[test]
    fn test_retain_drain_clear() {
        let mut set: SipSet<i32> = (0..100).collect();
        set.retain(|&x| x % 10 == 0);
        assert_eq!(sorted(set.iter()), (0..100).step_by(10).collect::<Vec<_>>());

        let capacity = set.capacity();
        let drained: Vec<_> = set.drain().collect();
        assert_eq!(drained.len(), 10);
        assert!(set.is_empty());
        assert_eq!(set.capacity(), capacity);

        set.insert(1);
        set.clear();
        assert!(!set.contains(&1));
    }

    #[test]
    fn test_equality_clone_debug() {
        let a: SipSet<i32> = [1, 2, 3].into();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.insert(4);
        assert_ne!(a, b);

        let mut one: SipSet<i32> = HashSet::new();
        one.extend([&9]);
        assert_eq!(alloc::format!("{one:?}"), "{9}");
    }

    #[test]
    fn test_into_iter_and_reserve() {
        let mut set: SipSet<u64> = HashSet::new();
        set.reserve(500);
        let capacity = set.capacity();
        set.extend(0..500u64);
        assert_eq!(set.capacity(), capacity);

        set.set_max_load_factor(0.2);
        assert!(set.len() as f32 <= set.capacity() as f32 * 0.2);

        for i in 100..500 {
            set.remove(&i);
        }
        set.shrink_to_fit();
        assert!(set.capacity() < capacity * 4);
        assert!(set.try_reserve(usize::MAX).is_err());

        let mut all: Vec<_> = set.into_iter().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_rehash_and_shrink_to() {
        fn check<L: SlotLayout>() {
            let mut set: SipSet<i32, L> = (0..100).collect();
            set.rehash(2048);
            assert!(set.capacity() >= 2048);
            assert!((set.load_factor() - 100.0 / set.capacity() as f32).abs() < 1e-6);

            set.shrink_to(50);
            let shrunk = set.capacity();
            assert!(shrunk < 2048);
            assert!(set.load_factor() <= set.max_load_factor());

            // Never grows.
            set.shrink_to(1000);
            assert_eq!(set.capacity(), shrunk);

            assert_eq!(set.len(), 100);
            assert_eq!(sorted(set.iter()), (0..100).collect::<Vec<_>>());
        }

        check::<Compact>();
        check::<Inline>();
        check::<Indirect>();
    }
}
