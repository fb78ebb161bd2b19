use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::hash::BuildHasher;
use core::hash::Hasher;

use proptest::prelude::*;
use siphasher::sip::SipHasher;

use crate::hash_map::HashMap;
use crate::hash_table::{Entry, HashTable};
use crate::layout::{Compact, Indirect, Inline, SlotLayout};

#[derive(Clone, Default)]
struct FixedSip;

impl BuildHasher for FixedSip {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210)
    }
}

fn sip(key: u16) -> u64 {
    let mut hasher = FixedSip.build_hasher();
    hasher.write_u16(key);
    hasher.finish()
}

// Sixteen distinct hashes, so runs of equal hashes stay short.
fn clustered(key: u16) -> u64 {
    u64::from(key % 16).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, u32),
    Remove(u16),
    Get(u16),
    Retain(u16),
    Rehash(usize),
    LoadFactor(f32),
    Shrink,
    Clear,
}

fn ops_strategy(max_key: u16) -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        50 => (0..max_key, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => (0..max_key).prop_map(Op::Remove),
        20 => (0..max_key).prop_map(Op::Get),
        2 => (1..8u16).prop_map(Op::Retain),
        1 => (0..512usize).prop_map(Op::Rehash),
        1 => (0.0f32..1.0).prop_map(Op::LoadFactor),
        1 => Just(Op::Shrink),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=600)
}

fn run_table_ops<L: SlotLayout>(ops: &[Op], hash: fn(u16) -> u64) {
    let hasher = |&(k, _): &(u16, u32)| hash(k);
    let mut table: HashTable<(u16, u32), L> = HashTable::new();
    let mut model: BTreeMap<u16, u32> = BTreeMap::new();

    for op in ops {
        match *op {
            Op::Insert(key, value) => {
                let old_model = model.insert(key, value);
                match table.entry(hash(key), |&(k, _)| k == key, hasher) {
                    Entry::Occupied(mut entry) => {
                        let old = core::mem::replace(&mut entry.get_mut().1, value);
                        assert_eq!(Some(old), old_model);
                    }
                    Entry::Vacant(entry) => {
                        assert_eq!(old_model, None);
                        entry.insert((key, value));
                    }
                }
            }
            Op::Remove(key) => {
                let removed = table.remove(hash(key), |&(k, _)| k == key);
                assert_eq!(removed.map(|(_, v)| v), model.remove(&key));
                assert!(table.find(hash(key), |&(k, _)| k == key).is_none());
                assert!(table.remove(hash(key), |&(k, _)| k == key).is_none());
            }
            Op::Get(key) => {
                let found = table.find(hash(key), |&(k, _)| k == key);
                assert_eq!(found.map(|&(_, v)| v), model.get(&key).copied());
            }
            Op::Retain(modulus) => {
                table.retain(|&mut (k, _)| k % modulus != 0);
                model.retain(|&k, _| k % modulus != 0);
            }
            Op::Rehash(buckets) => table.rehash(buckets, hasher),
            Op::LoadFactor(load_factor) => table.set_max_load_factor(load_factor, hasher),
            Op::Shrink => table.shrink_to_fit(hasher),
            Op::Clear => {
                table.clear();
                model.clear();
            }
        }

        assert_eq!(table.len(), model.len());
        assert!(table.load_factor() <= table.max_load_factor() + 1e-6);
        table.check_invariants(hasher);
    }

    let mut contents: Vec<(u16, u32)> = table.iter().copied().collect();
    contents.sort_unstable();
    let expected: Vec<(u16, u32)> = model.into_iter().collect();
    assert_eq!(contents, expected);
}

fn rehash_keeps_contents<L: SlotLayout>(keys: &[u16], buckets: usize) {
    let hasher = |&k: &u16| sip(k);
    let mut table: HashTable<u16, L> = HashTable::new();
    for &key in keys {
        table.entry(sip(key), |&k| k == key, hasher).or_insert(key);
    }
    let mut before: Vec<u16> = table.iter().copied().collect();
    before.sort_unstable();

    table.rehash(buckets, hasher);
    table.check_invariants(hasher);
    assert!(buckets == 0 || table.capacity() >= buckets);

    let mut after: Vec<u16> = table.iter().copied().collect();
    after.sort_unstable();
    assert_eq!(before, after);
    for &key in keys {
        assert_eq!(table.find(sip(key), |&k| k == key), Some(&key));
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_table_matches_model_compact(ops in ops_strategy(512)) {
        run_table_ops::<Compact>(&ops, sip);
    }

    #[test]
    fn prop_table_matches_model_inline(ops in ops_strategy(512)) {
        run_table_ops::<Inline>(&ops, sip);
    }

    #[test]
    fn prop_table_matches_model_indirect(ops in ops_strategy(512)) {
        run_table_ops::<Indirect>(&ops, sip);
    }

    #[test]
    fn prop_clustered_hashes_all_layouts(ops in ops_strategy(64)) {
        run_table_ops::<Compact>(&ops, clustered);
        run_table_ops::<Inline>(&ops, clustered);
        run_table_ops::<Indirect>(&ops, clustered);
    }

    #[test]
    fn prop_rehash_keeps_contents(
        keys in prop::collection::vec(any::<u16>(), 0..300),
        buckets in 0..2048usize,
    ) {
        rehash_keeps_contents::<Compact>(&keys, buckets);
        rehash_keeps_contents::<Inline>(&keys, buckets);
        rehash_keeps_contents::<Indirect>(&keys, buckets);
    }

    #[test]
    fn prop_map_matches_model(
        entries in prop::collection::vec((any::<u16>(), any::<u32>()), 0..400),
        removals in prop::collection::vec(any::<u16>(), 0..200),
    ) {
        let mut map: HashMap<u16, u32, FixedSip> = HashMap::with_hasher(FixedSip);
        let mut model = BTreeMap::new();
        for &(k, v) in &entries {
            prop_assert_eq!(map.insert(k, v), model.insert(k, v));
        }
        for k in &removals {
            prop_assert_eq!(map.remove(k), model.remove(k));
            prop_assert_eq!(map.remove(k), None);
        }
        prop_assert_eq!(map.len(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(map.get(k), Some(v));
        }

        let clone = map.clone();
        prop_assert!(clone == map);
        let mut drained: Vec<(u16, u32)> = map.drain().collect();
        drained.sort_unstable();
        prop_assert_eq!(drained, model.into_iter().collect::<Vec<_>>());
        prop_assert!(map.is_empty());
    }
}
