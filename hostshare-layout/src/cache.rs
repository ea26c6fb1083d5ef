//! Identity-keyed side tables for derived schema facts.

use crate::schema::{Schema, WeakSchema};
use arc_swap::ArcSwap;
use hostshare_common::map::FastHashMap;

/// A memoization table keyed by schema identity.
///
/// The table holds only weak handles, so it never extends the lifetime of a schema.
/// Entries whose schema has been dropped are pruned on the next insert.
///
/// Reads are lock-free. Inserts replace the whole table, so two callers racing to fill
/// the same entry both succeed and the entry ends up holding one of their (equal) values.
pub struct IdentityCache<T> {
    entries: ArcSwap<FastHashMap<usize, Entry<T>>>,
}

#[derive(Clone)]
struct Entry<T> {
    schema: WeakSchema,
    value: T,
}

impl<T: Clone> IdentityCache<T> {
    pub fn new() -> Self {
        IdentityCache {
            entries: ArcSwap::from_pointee(FastHashMap::default()),
        }
    }

    pub fn get(&self, schema: &Schema) -> Option<T> {
        self.entries
            .load()
            .get(&schema.id())
            .filter(|entry| entry.schema.is_alive())
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&self, schema: &Schema, value: T) {
        let id = schema.id();
        let weak = schema.downgrade();
        self.entries.rcu(|entries| {
            let mut next = FastHashMap::clone(entries);
            next.retain(|_, entry| entry.schema.is_alive());
            next.insert(
                id,
                Entry {
                    schema: weak.clone(),
                    value: value.clone(),
                },
            );
            next
        });
    }

    pub fn get_or_insert_with(&self, schema: &Schema, f: impl FnOnce() -> T) -> T {
        if let Some(value) = self.get(schema) {
            return value;
        }
        let value = f();
        self.insert(schema, value.clone());
        value
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with), but errors are returned
    /// without being cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        schema: &Schema,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        if let Some(value) = self.get(schema) {
            return Ok(value);
        }
        log::trace!("computing layout fact for `{schema}`");
        let value = f()?;
        self.insert(schema, value.clone());
        Ok(value)
    }

    /// The number of entries whose schema is still alive.
    pub fn len(&self) -> usize {
        self.entries
            .load()
            .values()
            .filter(|entry| entry.schema.is_alive())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry whose schema is no longer alive.
    pub fn prune(&self) {
        self.entries.rcu(|entries| {
            let mut next = FastHashMap::clone(entries);
            next.retain(|_, entry| entry.schema.is_alive());
            next
        });
    }
}

impl<T: Clone> Default for IdentityCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analyze::analyze;
    use crate::offsets::offsets_for_props;
    use crate::resolve::size_of;
    use std::sync::Barrier;

    #[test]
    pub fn cache_does_not_own_schema() {
        let cache = IdentityCache::new();
        let schema = Schema::vec3f();
        let weak = schema.downgrade();

        assert_eq!(cache.get_or_insert_with(&schema, || 12usize), 12);
        assert_eq!(cache.get_or_insert_with(&schema, || 99usize), 12);
        assert_eq!(cache.len(), 1);

        drop(schema);
        assert!(weak.upgrade().is_none());
        assert_eq!(cache.len(), 0);
        cache.prune();
        assert!(cache.is_empty());
    }

    #[test]
    pub fn distinct_nodes_get_distinct_entries() {
        let cache = IdentityCache::new();
        let a = Schema::u32();
        let b = Schema::u32();
        cache.insert(&a, 1u32);
        cache.insert(&b, 2u32);
        assert_eq!(cache.get(&a), Some(1));
        assert_eq!(cache.get(&b), Some(2));
    }

    #[test]
    pub fn racing_first_inserts_agree() {
        let cache = IdentityCache::new();
        let schema = Schema::vec3f();
        let barrier = Barrier::new(8);

        let results: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache.get_or_insert_with(&schema, || 12usize)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|&result| result == 12));
        assert_eq!(cache.get(&schema), Some(12));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    pub fn concurrent_layout_queries_agree() {
        let schema = Schema::structure(
            "Racy",
            [
                ("a", Schema::u32()),
                ("b", Schema::vec3f()),
                ("c", Schema::array(Schema::vec3h(), 5).unwrap()),
            ],
        )
        .unwrap();
        let barrier = Barrier::new(8);

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        (
                            size_of(&schema).unwrap(),
                            analyze(&schema).unwrap(),
                            offsets_for_props(&schema).unwrap(),
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let first = &results[0];
        assert!(results.iter().all(|result| result == first));
        assert_eq!(first.0, size_of(&schema).unwrap());
        assert_eq!(first.2, offsets_for_props(&schema).unwrap());
    }

    #[test]
    pub fn errors_are_not_cached() {
        let cache: IdentityCache<u32> = IdentityCache::new();
        let schema = Schema::f32();
        let result: Result<u32, &str> = cache.get_or_try_insert_with(&schema, || Err("nope"));
        assert!(result.is_err());
        assert!(cache.get(&schema).is_none());
    }
}
