use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use regatta_columnar::{Dictionary, IndexColumn};

/// Two dictionaries with the same content hash and size are assumed equal.
/// The size is a cheap second discriminator on top of the 128-bit hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DictionaryKey {
    pub hash: u128,
    pub size: u64,
}

/// Function output for one input dictionary: the result dictionary and the
/// remapping such that `index_mapping.index(old_indices)` yields the result
/// index column. Holds the input dictionary alive so the key stays valid.
#[derive(Debug)]
pub struct CachedValues {
    pub dictionary_holder: Arc<Dictionary>,
    pub function_result: Arc<Dictionary>,
    pub index_mapping: IndexColumn,
}

/// LRU cache of function results computed over shared dictionaries.
///
/// Capacity is expected to equal the number of concurrent readers so each
/// reader effectively keeps one slot. All operations are linearizable under
/// a single lock; `get_or_set` resolves insert races so every caller
/// converges on the same entry.
pub struct LowCardinalityResultCache {
    cache: Mutex<LruCache<DictionaryKey, Arc<CachedValues>>>,
}

impl LowCardinalityResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<DictionaryKey, Arc<CachedValues>>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Promotes the entry on hit.
    pub fn get(&self, key: &DictionaryKey) -> Option<Arc<CachedValues>> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: DictionaryKey, values: Arc<CachedValues>) {
        self.lock().put(key, values);
    }

    /// Inserts only if absent and returns the now-present entry, so racing
    /// callers all adopt the first inserted value.
    pub fn get_or_set(&self, key: DictionaryKey, values: Arc<CachedValues>) -> Arc<CachedValues> {
        let mut cache = self.lock();
        match cache.get(&key) {
            Some(existing) => Arc::clone(existing),
            None => {
                cache.put(key, Arc::clone(&values));
                values
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use regatta_common::types::{DataType, Value};

    use super::*;

    fn dictionary(values: &[&str]) -> Arc<Dictionary> {
        let values: Vec<Value> = values.iter().map(|s| Value::String(s.to_string())).collect();
        Arc::new(Dictionary::from_values(&values, DataType::String).unwrap())
    }

    fn entry(input: &Arc<Dictionary>, output: &[&str], mapping: Vec<u64>) -> Arc<CachedValues> {
        Arc::new(CachedValues {
            dictionary_holder: Arc::clone(input),
            function_result: dictionary(output),
            index_mapping: IndexColumn::from_positions(mapping),
        })
    }

    fn key_of(dict: &Dictionary) -> DictionaryKey {
        DictionaryKey {
            hash: dict.content_hash(),
            size: dict.len() as u64,
        }
    }

    #[test]
    fn test_get_miss() {
        let cache = LowCardinalityResultCache::new(4);
        let dict = dictionary(&["", "a"]);
        assert!(cache.get(&key_of(&dict)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_then_get() {
        let cache = LowCardinalityResultCache::new(4);
        let dict = dictionary(&["", "a"]);
        let key = key_of(&dict);
        cache.set(key, entry(&dict, &["", "A"], vec![0, 1]));
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.index_mapping.to_vec(), vec![0, 1]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_or_set_keeps_first_entry() {
        let cache = LowCardinalityResultCache::new(4);
        let dict = dictionary(&["", "a"]);
        let key = key_of(&dict);
        let first = entry(&dict, &["", "A"], vec![0, 1]);
        let second = entry(&dict, &["", "B"], vec![1, 0]);

        let won = cache.get_or_set(key, Arc::clone(&first));
        assert!(Arc::ptr_eq(&won, &first));

        let raced = cache.get_or_set(key, second);
        assert!(Arc::ptr_eq(&raced, &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = LowCardinalityResultCache::new(2);
        let a = dictionary(&["", "a"]);
        let b = dictionary(&["", "b"]);
        let c = dictionary(&["", "c"]);
        cache.set(key_of(&a), entry(&a, &["", "A"], vec![0, 1]));
        cache.set(key_of(&b), entry(&b, &["", "B"], vec![0, 1]));

        // touch `a` so `b` is the eviction candidate
        assert!(cache.get(&key_of(&a)).is_some());
        cache.set(key_of(&c), entry(&c, &["", "C"], vec![0, 1]));

        assert!(cache.get(&key_of(&a)).is_some());
        assert!(cache.get(&key_of(&b)).is_none());
        assert!(cache.get(&key_of(&c)).is_some());
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let cache = LowCardinalityResultCache::new(0);
        let dict = dictionary(&["", "a"]);
        cache.set(key_of(&dict), entry(&dict, &["", "A"], vec![0, 1]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_dictionaries_get_distinct_keys() {
        let a = dictionary(&["", "a"]);
        let b = dictionary(&["", "b"]);
        assert_ne!(key_of(&a), key_of(&b));

        let same = dictionary(&["", "a"]);
        assert_eq!(key_of(&a), key_of(&same));
    }
}
