use indexmap::IndexMap;
use parking_lot::RwLock;
use rand::Rng;
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// No caching, every read goes to the DB
    Empty,
    /// Caches up to the given number of entries, evicting a random entry when full
    Count(usize),
}

impl CachePolicy {
    fn max_size(self) -> usize {
        match self {
            CachePolicy::Empty => 0,
            CachePolicy::Count(size) => size,
        }
    }
}

#[derive(Clone)]
pub struct Cache<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
{
    // We use IndexMap and not HashMap because it makes it cheaper to remove a random element when the cache is full.
    map: Arc<RwLock<IndexMap<TKey, TData, S>>>,
    max_size: usize,
}

impl<TKey, TData, S> Cache<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
    S: BuildHasher + Default,
{
    pub fn new(policy: CachePolicy) -> Self {
        let max_size = policy.max_size();
        // Use `size + 1` for not triggering a realloc if new element exactly overflows capacity
        Self { map: Arc::new(RwLock::new(IndexMap::with_capacity_and_hasher(max_size + 1, S::default()))), max_size }
    }

    pub fn get(&self, key: &TKey) -> Option<TData> {
        self.map.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &TKey) -> bool {
        self.map.read().contains_key(key)
    }

    pub fn insert(&self, key: TKey, data: TData) {
        if self.max_size == 0 {
            return;
        }

        let mut write_guard = self.map.write();
        if write_guard.len() == self.max_size && !write_guard.contains_key(&key) {
            write_guard.swap_remove_index(rand::thread_rng().gen_range(0..self.max_size));
        }
        write_guard.insert(key, data);
    }

    pub fn remove(&self, key: &TKey) -> Option<TData> {
        if self.max_size == 0 {
            return None;
        }
        self.map.write().swap_remove(key)
    }

    pub fn remove_all(&self) {
        if self.max_size == 0 {
            return;
        }
        self.map.write().clear();
    }
}
