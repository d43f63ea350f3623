//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store against a simple reference LRU model.

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};

use crate::cache::{CacheStore, EvictionList};
use crate::config::CacheConfig;

// == Test Configuration ==
const TEST_MAX_AGE_MS: u64 = 300_000;

fn store(max_length: usize) -> CacheStore<u32> {
    CacheStore::new(CacheConfig::from_millis(max_length, TEST_MAX_AGE_MS).unwrap())
}

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u32 },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

// == Reference Model ==
/// Recency queue, least recently used at the front.
#[derive(Debug)]
struct ModelLru {
    order: VecDeque<(String, u32)>,
    max_length: usize,
}

impl ModelLru {
    fn new(max_length: usize) -> Self {
        Self {
            order: VecDeque::new(),
            max_length,
        }
    }

    fn take(&mut self, key: &str) -> Option<(String, u32)> {
        let index = self.order.iter().position(|(k, _)| k == key)?;
        self.order.remove(index)
    }

    fn set(&mut self, key: String, value: u32) {
        self.take(&key);
        self.order.push_back((key, value));
        while self.order.len() > self.max_length {
            self.order.pop_front();
        }
    }

    fn get(&mut self, key: &str) -> Option<u32> {
        let entry = self.take(key)?;
        let value = entry.1;
        self.order.push_back(entry);
        Some(value)
    }

    fn delete(&mut self, key: &str) {
        self.take(key);
    }

    fn keys(&self) -> Vec<String> {
        self.order.iter().map(|(k, _)| k.clone()).collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Any interleaving of set/get/delete leaves the store with the same
    // keys, in the same recency order, and the same values as the model.
    #[test]
    fn prop_matches_reference_lru(
        max_length in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let store = store(max_length);
        let mut model = ModelLru::new(max_length);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(key.clone(), value);
                    model.set(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(store.get(&key), model.get(&key));
                }
                CacheOp::Delete { key } => {
                    store.delete(&key);
                    model.delete(&key);
                }
            }
            prop_assert_eq!(store.keys(), model.keys());
        }
    }

    // Inserting distinct keys past capacity keeps exactly the newest ones.
    #[test]
    fn prop_capacity_keeps_most_recent(
        max_length in 1usize..10,
        extra in 1usize..20
    ) {
        let store = store(max_length);
        let total = max_length + extra;

        for i in 0..total {
            store.set(format!("key{}", i), i as u32);
            prop_assert!(store.len() <= max_length, "Capacity exceeded");
        }

        prop_assert_eq!(store.len(), max_length);
        for i in 0..total {
            let expected = i >= total - max_length;
            prop_assert_eq!(store.has(&format!("key{}", i)), expected);
        }
        prop_assert_eq!(store.stats().evictions, extra as u64);
    }

    // A get refreshes recency: after max_length further inserts only the
    // accessed key and the max_length - 1 newest keys survive.
    #[test]
    fn prop_get_refreshes_recency(
        max_length in 2usize..8,
        accessed_index in 0usize..8
    ) {
        let accessed_index = accessed_index % max_length;
        let store = store(max_length);

        for i in 0..max_length {
            store.set(format!("old{}", i), i as u32);
        }
        let accessed = format!("old{}", accessed_index);
        prop_assert!(store.get(&accessed).is_some());

        for i in 0..max_length - 1 {
            store.set(format!("new{}", i), i as u32);
        }

        let survivors: HashSet<String> = store.keys().into_iter().collect();
        let mut expected: HashSet<String> =
            (0..max_length - 1).map(|i| format!("new{}", i)).collect();
        expected.insert(accessed);
        prop_assert_eq!(survivors, expected);
    }

    // Deleting an absent key never changes the store.
    #[test]
    fn prop_delete_absent_is_noop(
        keys in prop::collection::hash_set(key_strategy(), 0..5),
        absent in "[x-z]{1,3}"
    ) {
        let store = store(10);
        for key in &keys {
            store.set(key.clone(), 1);
        }
        let before = store.keys();

        prop_assert!(!store.delete(&absent));
        prop_assert!(!store.delete(&absent));
        prop_assert_eq!(store.keys(), before);
    }

    // Statistics count every lookup exactly once.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let store = store(4);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => store.set(key, value),
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // The list stays consistent through arbitrary appends and removals.
    #[test]
    fn prop_eviction_list_len_matches_keys(
        ops in prop::collection::vec((any::<bool>(), 0u8..6), 1..60)
    ) {
        let mut list: EvictionList<u8> = EvictionList::new();
        let mut present: Vec<u8> = Vec::new();

        for (insert, key) in ops {
            if insert && !present.contains(&key) {
                list.append(key);
                present.push(key);
            } else if !insert {
                let removed = list.remove(&key);
                let expected = present.iter().position(|k| *k == key).map(|i| present.remove(i));
                prop_assert_eq!(removed, expected);
            }
            prop_assert_eq!(list.len(), present.len());
            prop_assert_eq!(list.keys().copied().collect::<Vec<_>>(), present.clone());
        }
    }
}
