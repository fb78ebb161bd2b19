use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::ops::Index;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::hash_table;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::layout::{Inline, SlotLayout};

#[inline]
fn make_hasher<K: Hash, V, S: BuildHasher>(hash_builder: &S) -> impl Fn(&(K, V)) -> u64 + '_ {
    move |(k, _)| hash_builder.hash_one(k)
}

#[inline]
fn equivalent_key<Q, K, V>(key: &Q) -> impl Fn(&(K, V)) -> bool + '_
where
    Q: ?Sized + Eq,
    K: Borrow<Q>,
{
    move |(k, _)| k.borrow() == key
}

/// A hash map implemented using the Robin Hood [`HashTable`] as the
/// underlying storage.
///
/// `HashMap<K, V, S, L>` stores key-value pairs where keys implement
/// `Hash + Eq` and uses a configurable hasher builder `S` to hash keys. The
/// slot layout `L` picks the control cell width and whether pairs are stored
/// inline or in a dense arena; see [`SlotLayout`].
///
/// # Performance Characteristics
///
/// - **Memory**: 2 bytes of control per probe position with the default
///   [`Inline`] layout, plus the size of `(K, V)` per probe position.
/// - **Lookups** never walk further than the table's probe bound, which grows
///   with the logarithm of the capacity.
///
/// # Examples
///
/// ```rust
/// # use robin_hash::HashMap;
/// #
/// let mut scores: HashMap<&str, i32> = HashMap::new();
/// scores.insert("alice", 10);
/// scores.insert("bob", 7);
///
/// *scores.entry("bob").or_insert(0) += 1;
/// assert_eq!(scores["bob"], 8);
/// assert_eq!(scores.get("carol"), None);
/// ```
pub struct HashMap<K, V, S = DefaultHashBuilder, L: SlotLayout = Inline> {
    table: HashTable<(K, V), L>,
    hash_builder: S,
}

impl<K: Clone, V: Clone, S: Clone, L: SlotLayout> Clone for HashMap<K, V, S, L> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }
}

impl<K, V, S, L> Debug for HashMap<K, V, S, L>
where
    K: Debug,
    V: Debug,
    L: SlotLayout,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, L: SlotLayout> HashMap<K, V, S, L> {
    /// Creates a new hash map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hash::HashMap;
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
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates a new hash map that holds at least `capacity` pairs without
    /// growing, using `hash_builder` to hash keys.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of home buckets, zero or a power of two.
    ///
    /// The map grows once `len()` reaches
    /// `capacity() * max_load_factor()`.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Current ratio of elements to home buckets.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// The load factor at which the map grows.
    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor()
    }

    /// Removes all elements from the map.
    ///
    /// This operation preserves the map's allocated capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// An iterator visiting all key-value pairs in arbitrary order.
    pub fn iter(&self) -> Iter<'_, K, V, L> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// An iterator visiting all key-value pairs in arbitrary order, with
    /// mutable references to the values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, L> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// An iterator visiting all keys in arbitrary order.
    pub fn keys(&self) -> Keys<'_, K, V, L> {
        Keys { inner: self.iter() }
    }

    /// An iterator visiting all values in arbitrary order.
    pub fn values(&self) -> Values<'_, K, V, L> {
        Values { inner: self.iter() }
    }

    /// An iterator visiting all values mutably in arbitrary order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, L> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Consumes the map, yielding its keys.
    pub fn into_keys(self) -> IntoKeys<K, V, L> {
        IntoKeys {
            inner: self.into_iter(),
        }
    }

    /// Consumes the map, yielding its values.
    pub fn into_values(self) -> IntoValues<K, V, L> {
        IntoValues {
            inner: self.into_iter(),
        }
    }

    /// Clears the map, returning all key-value pairs as an iterator. Keeps
    /// the allocated memory for reuse.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::HashMap;
    /// #
    /// let mut map: HashMap<_, _> = [(1, "a"), (2, "b")].into();
    /// let mut drained: Vec<_> = map.drain().collect();
    /// drained.sort();
    ///
    /// assert_eq!(drained, [(1, "a"), (2, "b")]);
    /// assert!(map.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, K, V, L> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the pairs for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::HashMap;
    /// #
    /// let mut map: HashMap<i32, i32> = (0..8).map(|x| (x, x * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|(k, v)| f(k, v));
    }
}

impl<K, V, S, L> HashMap<K, V, S, L>
where
    K: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    /// Sets the load factor at which the map grows, clamped to `[0.2, 0.8]`.
    /// Rebuilds the map if it is already above the new threshold.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::HashMap;
    /// #
    /// let mut map: HashMap<u32, u32> = (0..100).map(|x| (x, x)).collect();
    /// map.set_max_load_factor(0.25);
    /// assert!(map.len() as f32 <= map.capacity() as f32 * 0.25);
    ///
    /// map.set_max_load_factor(2.0);
    /// assert!((map.max_load_factor() - 0.8).abs() < 1e-3);
    /// ```
    pub fn set_max_load_factor(&mut self, load_factor: f32) {
        self.table
            .set_max_load_factor(load_factor, make_hasher(&self.hash_builder));
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows `usize`.
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, make_hasher(&self.hash_builder));
    }

    /// Tries to reserve capacity for at least `additional` more elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::HashMap;
    /// #
    /// let mut map: HashMap<u64, u64> = HashMap::new();
    /// assert!(map.try_reserve(10).is_ok());
    /// assert!(map.try_reserve(usize::MAX).is_err());
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table
            .try_reserve(additional, make_hasher(&self.hash_builder))
    }

    /// Shrinks the map as much as its current length allows.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit(make_hasher(&self.hash_builder));
    }

    /// Shrinks the map, keeping room for at least `min_capacity` elements.
    pub fn shrink_to(&mut self, min_capacity: usize) {
        self.table
            .shrink_to(min_capacity, make_hasher(&self.hash_builder));
    }

    /// Rebuilds the map with at least `buckets` home buckets, or as many as
    /// its length requires if that is more.
    pub fn rehash(&mut self, buckets: usize) {
        self.table.rehash(buckets, make_hasher(&self.hash_builder));
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already had this key present, the value is updated and the
    /// old value is returned; the key itself is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::HashMap;
    /// #
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map[&37], "b");
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.entry(key) {
            Entry::Occupied(mut entry) => Some(entry.insert(value)),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Inserts a key-value pair only if the key is absent.
    ///
    /// On success returns a mutable reference to the inserted value. If the
    /// key is present, the map is unchanged and the error carries the
    /// occupied entry along with the rejected value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::HashMap;
    /// #
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// assert_eq!(map.try_insert(1, "one").ok().copied(), Some("one"));
    ///
    /// let err = map.try_insert(1, "uno").unwrap_err();
    /// assert_eq!(err.value, "uno");
    /// assert_eq!(err.entry.get(), &"one");
    /// ```
    pub fn try_insert(&mut self, key: K, value: V) -> Result<&mut V, OccupiedError<'_, K, V, L>> {
        match self.entry(key) {
            Entry::Occupied(entry) => Err(OccupiedError { entry, value }),
            Entry::Vacant(entry) => Ok(entry.insert(value)),
        }
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find(hash, equivalent_key(key))
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_mut(hash, equivalent_key(key))
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).is_some()
    }

    /// Number of pairs with the specified key: zero or one.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.contains_key(key) as usize
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// Removing an absent key leaves the map unchanged.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, equivalent_key(key))
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::HashMap;
    /// #
    /// let mut letters: HashMap<char, u32> = HashMap::new();
    /// for ch in "a short treatise on fungi".chars() {
    ///     *letters.entry(ch).or_insert(0) += 1;
    /// }
    ///
    /// assert_eq!(letters[&'s'], 2);
    /// assert_eq!(letters[&'t'], 3);
    /// assert_eq!(letters.get(&'y'), None);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, L> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry(
            hash,
            |(k, _)| *k == key,
            make_hasher(&self.hash_builder),
        ) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }

    /// Returns a histogram of probe distances of the elements in the map.
    #[cfg(feature = "stats")]
    pub fn probe_histogram(&self) -> crate::stats::ProbeHistogram {
        self.table.probe_histogram()
    }

    /// Returns occupancy and memory statistics of the map.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::stats::DebugStats {
        self.table.debug_stats()
    }
}

impl<K, V, S, L> HashMap<K, V, S, L>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    L: SlotLayout,
{
    /// Creates a new hash map using the default hasher builder. Does not
    /// allocate.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash map that holds at least `capacity` pairs without
    /// growing, using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::HashMap;
    /// #
    /// let map: HashMap<i32, String> = HashMap::with_capacity(100);
    /// assert!(map.capacity() as f32 * map.max_load_factor() >= 100.0);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S, L> Default for HashMap<K, V, S, L>
where
    S: Default,
    L: SlotLayout,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S, L> PartialEq for HashMap<K, V, S, L>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    L: SlotLayout,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|other| v == other))
    }
}

impl<K, V, S, L> Eq for HashMap<K, V, S, L>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    L: SlotLayout,
{
}

impl<K, Q, V, S, L> Index<&Q> for HashMap<K, V, S, L>
where
    K: Hash + Eq + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in HashMap")
    }
}

impl<K, V, S, L> Extend<(K, V)> for HashMap<K, V, S, L>
where
    K: Hash + Eq,
    S: BuildHasher,
    L: SlotLayout,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let additional = if self.is_empty() {
            iter.size_hint().0
        } else {
            iter.size_hint().0.div_ceil(2)
        };
        self.reserve(additional);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S, L> Extend<(&'a K, &'a V)> for HashMap<K, V, S, L>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
    L: SlotLayout,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<K, V, S, L> FromIterator<(K, V)> for HashMap<K, V, S, L>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    L: SlotLayout,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, L, const N: usize> From<[(K, V); N]> for HashMap<K, V, S, L>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    L: SlotLayout,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V, S, L: SlotLayout> IntoIterator for HashMap<K, V, S, L> {
    type IntoIter = IntoIter<K, V, L>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S, L: SlotLayout> IntoIterator for &'a HashMap<K, V, S, L> {
    type IntoIter = Iter<'a, K, V, L>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, L: SlotLayout> IntoIterator for &'a mut HashMap<K, V, S, L> {
    type IntoIter = IterMut<'a, K, V, L>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Removes every pair of `map` for which `pred` returns `true` and returns
/// how many were removed.
///
/// # Examples
///
/// ```rust
/// # use robin_hash::HashMap;
/// # use robin_hash::hash_map::erase_if;
/// #
/// let mut map: HashMap<i32, i32> = (0..10).map(|x| (x, x)).collect();
/// assert_eq!(erase_if(&mut map, |&k, _| k >= 6), 4);
/// assert_eq!(map.len(), 6);
/// ```
pub fn erase_if<K, V, S, L: SlotLayout>(
    map: &mut HashMap<K, V, S, L>,
    mut pred: impl FnMut(&K, &mut V) -> bool,
) -> usize {
    let before = map.len();
    map.retain(|k, v| !pred(k, v));
    before - map.len()
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, L: SlotLayout = Inline> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, L>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, L>),
}

impl<'a, K, V, L: SlotLayout> Entry<'a, K, V, L> {
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Self::or_insert_with), but the closure
    /// receives the key.
    pub fn or_insert_with_key<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce(&K) -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = default(&entry.key);
                entry.insert(value)
            }
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, L> Entry<'a, K, V, L>
where
    V: Default,
    L: SlotLayout,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V, L: SlotLayout = Inline> {
    entry: hash_table::VacantEntry<'a, (K, V), L>,
    key: K,
}

impl<'a, K, V, L: SlotLayout> VacantEntry<'a, K, V, L> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, L: SlotLayout = Inline> {
    entry: hash_table::OccupiedEntry<'a, (K, V), L>,
}

impl<'a, K, V, L: SlotLayout> OccupiedEntry<'a, K, V, L> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// The error returned by [`try_insert`](HashMap::try_insert) when the key
/// is already present.
pub struct OccupiedError<'a, K, V, L: SlotLayout = Inline> {
    /// The entry holding the existing pair.
    pub entry: OccupiedEntry<'a, K, V, L>,
    /// The value that was not inserted.
    pub value: V,
}

impl<K: Debug, V: Debug, L: SlotLayout> Debug for OccupiedError<'_, K, V, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OccupiedError")
            .field("key", self.entry.key())
            .field("old_value", self.entry.get())
            .field("new_value", &self.value)
            .finish()
    }
}

impl<K: Debug, V: Debug, L: SlotLayout> core::fmt::Display for OccupiedError<'_, K, V, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "failed to insert {:?}, key {:?} already exists with value {:?}",
            self.value,
            self.entry.key(),
            self.entry.get(),
        )
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K, V, L: SlotLayout = Inline> {
    inner: hash_table::Iter<'a, (K, V), L>,
}

impl<K, V, L: SlotLayout> Clone for Iter<'_, K, V, L> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V, L: SlotLayout> Iterator for Iter<'a, K, V, L> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, L: SlotLayout> ExactSizeIterator for Iter<'_, K, V, L> {}

/// A mutable iterator over the key-value pairs of a `HashMap`.
pub struct IterMut<'a, K, V, L: SlotLayout = Inline> {
    inner: hash_table::IterMut<'a, (K, V), L>,
}

impl<'a, K, V, L: SlotLayout> Iterator for IterMut<'a, K, V, L> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, L: SlotLayout> ExactSizeIterator for IterMut<'_, K, V, L> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V, L: SlotLayout = Inline> {
    inner: Iter<'a, K, V, L>,
}

impl<'a, K, V, L: SlotLayout> Iterator for Keys<'a, K, V, L> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, L: SlotLayout> ExactSizeIterator for Keys<'_, K, V, L> {}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V, L: SlotLayout = Inline> {
    inner: Iter<'a, K, V, L>,
}

impl<'a, K, V, L: SlotLayout> Iterator for Values<'a, K, V, L> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, L: SlotLayout> ExactSizeIterator for Values<'_, K, V, L> {}

/// A mutable iterator over the values of a `HashMap`.
pub struct ValuesMut<'a, K, V, L: SlotLayout = Inline> {
    inner: IterMut<'a, K, V, L>,
}

impl<'a, K, V, L: SlotLayout> Iterator for ValuesMut<'a, K, V, L> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, L: SlotLayout> ExactSizeIterator for ValuesMut<'_, K, V, L> {}

/// An owning iterator over the key-value pairs of a `HashMap`.
pub struct IntoIter<K, V, L: SlotLayout = Inline> {
    inner: hash_table::IntoIter<(K, V), L>,
}

impl<K, V, L: SlotLayout> Iterator for IntoIter<K, V, L> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, L: SlotLayout> ExactSizeIterator for IntoIter<K, V, L> {}

/// An owning iterator over the keys of a `HashMap`.
pub struct IntoKeys<K, V, L: SlotLayout = Inline> {
    inner: IntoIter<K, V, L>,
}

impl<K, V, L: SlotLayout> Iterator for IntoKeys<K, V, L> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, L: SlotLayout> ExactSizeIterator for IntoKeys<K, V, L> {}

/// An owning iterator over the values of a `HashMap`.
pub struct IntoValues<K, V, L: SlotLayout = Inline> {
    inner: IntoIter<K, V, L>,
}

impl<K, V, L: SlotLayout> Iterator for IntoValues<K, V, L> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, L: SlotLayout> ExactSizeIterator for IntoValues<K, V, L> {}

/// A draining iterator over the key-value pairs of a `HashMap`.
pub struct Drain<'a, K, V, L: SlotLayout = Inline> {
    inner: hash_table::Drain<'a, (K, V), L>,
}

impl<K, V, L: SlotLayout> Iterator for Drain<'_, K, V, L> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, L: SlotLayout> ExactSizeIterator for Drain<'_, K, V, L> {}
