//! Handler registry shared by every bus

use dashmap::DashMap;
use std::borrow::Borrow;
use std::hash::Hash;

/// Concurrent mapping from a routing key to an ordered list of handlers.
///
/// Each bus owns one registry. Whether a key holds one handler or many is
/// decided by the bus through [`append`](Self::append) (fan-out) or
/// [`replace`](Self::replace) (last registration wins).
///
/// Lookups hand out a snapshot of the entry, so no shard lock is held while
/// the handlers run. A handler may register further handlers or dispatch
/// re-entrantly on the same bus.
pub struct TypeRegistry<K, H>
where
    K: Eq + Hash,
{
    entries: DashMap<K, Vec<H>>,
}

impl<K, H> TypeRegistry<K, H>
where
    K: Eq + Hash,
    H: Clone,
{
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Append a handler after those already registered for `key`.
    ///
    /// Returns the number of handlers now registered for the key.
    pub fn append(&self, key: K, handler: H) -> usize {
        let mut entry = self.entries.entry(key).or_default();
        entry.push(handler);
        entry.len()
    }

    /// Make `handler` the only handler for `key`.
    ///
    /// Returns the handlers it displaced, if any.
    pub fn replace(&self, key: K, handler: H) -> Option<Vec<H>> {
        self.entries.insert(key, vec![handler])
    }

    /// Ordered snapshot of the handlers for `key`; empty when none exist.
    pub fn lookup<Q>(&self, key: &Q) -> Vec<H>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries
            .get(key)
            .map(|handlers| handlers.clone())
            .unwrap_or_default()
    }

    /// First registered handler for `key`
    pub fn first<Q>(&self, key: &Q) -> Option<H>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries
            .get(key)
            .and_then(|handlers| handlers.first().cloned())
    }

    /// Number of handlers registered for `key`
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key).map(|h| h.len()).unwrap_or(0)
    }

    /// Whether at least one handler is registered for `key`
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.count(key) > 0
    }

    /// Drop every handler registered for `key`
    pub fn remove<Q>(&self, key: &Q) -> Option<Vec<H>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.remove(key).map(|(_, handlers)| handlers)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of distinct keys with an entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, H> TypeRegistry<K, H>
where
    K: Eq + Hash + Clone,
    H: Clone,
{
    /// Keys currently holding an entry, in no particular order
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl<K, H> Default for TypeRegistry<K, H>
where
    K: Eq + Hash,
    H: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, H> std::fmt::Debug for TypeRegistry<K, H>
where
    K: Eq + Hash + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for entry in self.entries.iter() {
            map.entry(entry.key(), &entry.value().len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_lookup_missing_key_is_empty() {
        let registry: TypeRegistry<&str, u32> = TypeRegistry::new();

        assert!(registry.lookup(&"missing").is_empty());
        assert_eq!(registry.first(&"missing"), None);
        assert!(!registry.contains(&"missing"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_append_preserves_registration_order() {
        let registry = TypeRegistry::new();

        assert_eq!(registry.append("user_registered", 1), 1);
        assert_eq!(registry.append("user_registered", 2), 2);
        assert_eq!(registry.append("user_registered", 3), 3);

        assert_eq!(registry.lookup(&"user_registered"), vec![1, 2, 3]);
        assert_eq!(registry.first(&"user_registered"), Some(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_replace_keeps_last_registration() {
        let registry = TypeRegistry::new();

        assert!(registry.replace("get_username", "first").is_none());
        let displaced = registry.replace("get_username", "second");

        assert_eq!(displaced, Some(vec!["first"]));
        assert_eq!(registry.lookup(&"get_username"), vec!["second"]);
        assert_eq!(registry.count(&"get_username"), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = TypeRegistry::new();
        registry.append("a", 1);
        registry.append("a", 2);
        registry.append("b", 3);

        assert_eq!(registry.remove(&"a"), Some(vec![1, 2]));
        assert!(!registry.contains(&"a"));
        assert_eq!(registry.keys(), vec!["b"]);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_is_a_snapshot() {
        let registry = TypeRegistry::new();
        registry.append("key", Arc::new(1));

        let snapshot = registry.lookup(&"key");
        registry.append("key", Arc::new(2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.count(&"key"), 2);
    }

    #[test]
    fn test_concurrent_append() {
        let registry = Arc::new(TypeRegistry::new());

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        registry.append("shared", i * 100 + j);
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(registry.count(&"shared"), 800);
    }
}
