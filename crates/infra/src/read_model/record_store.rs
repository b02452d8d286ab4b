use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use volunteerdesk_core::SoftDelete;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("record store lock is poisoned")]
    Poisoned,
    #[error("record store did not run the transaction")]
    NotRun,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Exclusive view of every record in a store while a transaction runs.
pub trait Transaction<K, V> {
    fn get(&self, key: &K) -> Option<&V>;
    fn get_mut(&mut self, key: &K) -> Option<&mut V>;
    fn insert(&mut self, key: K, value: V);
    fn remove(&mut self, key: &K) -> Option<V>;
    fn values(&self) -> Box<dyn Iterator<Item = &V> + '_>;
    fn values_mut(&mut self) -> Box<dyn Iterator<Item = &mut V> + '_>;
}

impl<K: Ord, V> Transaction<K, V> for BTreeMap<K, V> {
    fn get(&self, key: &K) -> Option<&V> {
        BTreeMap::get(self, key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        BTreeMap::get_mut(self, key)
    }

    fn insert(&mut self, key: K, value: V) {
        BTreeMap::insert(self, key, value);
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        BTreeMap::remove(self, key)
    }

    fn values(&self) -> Box<dyn Iterator<Item = &V> + '_> {
        Box::new(BTreeMap::values(self))
    }

    fn values_mut(&mut self) -> Box<dyn Iterator<Item = &mut V> + '_> {
        Box::new(BTreeMap::values_mut(self))
    }
}

/// Keyed record storage.
///
/// Every method takes the store's lock once, so each call is atomic with
/// respect to the others. Writes report a poisoned lock as `StoreError`;
/// reads see a poisoned store as empty.
pub trait RecordStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn upsert(&self, key: K, value: V) -> StoreResult<()>;
    /// Write a batch under a single lock acquisition.
    fn upsert_all(&self, entries: Vec<(K, V)>) -> StoreResult<()>;
    /// Read-modify-write one record under the write lock. Returns the updated
    /// value, or `None` when the key is absent.
    fn modify(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> StoreResult<Option<V>>;
    fn remove(&self, key: &K) -> StoreResult<Option<V>>;
    /// Run `f` once with exclusive access to every record. Checks made inside
    /// `f` hold for the writes made inside `f`.
    fn transaction(&self, f: &mut dyn FnMut(&mut dyn Transaction<K, V>)) -> StoreResult<()>;
    /// All records, soft-deleted included, in key order.
    fn list(&self) -> Vec<V>;
}

impl<K, V, S> RecordStore<K, V> for Arc<S>
where
    S: RecordStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn upsert(&self, key: K, value: V) -> StoreResult<()> {
        (**self).upsert(key, value)
    }

    fn upsert_all(&self, entries: Vec<(K, V)>) -> StoreResult<()> {
        (**self).upsert_all(entries)
    }

    fn modify(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> StoreResult<Option<V>> {
        (**self).modify(key, f)
    }

    fn remove(&self, key: &K) -> StoreResult<Option<V>> {
        (**self).remove(key)
    }

    fn transaction(&self, f: &mut dyn FnMut(&mut dyn Transaction<K, V>)) -> StoreResult<()> {
        (**self).transaction(f)
    }

    fn list(&self) -> Vec<V> {
        (**self).list()
    }
}

/// Run `f` in a store transaction and hand back what it returns.
pub fn transact<K, V, T, E>(
    store: &dyn RecordStore<K, V>,
    mut f: impl FnMut(&mut dyn Transaction<K, V>) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<StoreError>,
{
    let mut result = None;
    store.transaction(&mut |records: &mut dyn Transaction<K, V>| result = Some(f(records)))?;
    result.unwrap_or(Err(StoreError::NotRun.into()))
}

/// Explicit soft-delete aware queries. There is no implicit filter: callers
/// pick `find_active` or `find_all`.
pub trait SoftDeleteQueries<K, V: SoftDelete>: RecordStore<K, V> {
    fn find_active(&self) -> Vec<V> {
        self.list().into_iter().filter(|v| !v.is_deleted()).collect()
    }

    fn find_all(&self) -> Vec<V> {
        self.list()
    }

    fn find_deleted(&self) -> Vec<V> {
        self.list().into_iter().filter(|v| v.is_deleted()).collect()
    }

    /// The record, unless it is missing or soft-deleted.
    fn get_active(&self, key: &K) -> Option<V> {
        self.get(key).filter(|v| !v.is_deleted())
    }
}

impl<K, V, S> SoftDeleteQueries<K, V> for S
where
    V: SoftDelete,
    S: RecordStore<K, V> + ?Sized,
{
}

/// In-memory store for tests, the CLI and dev.
#[derive(Debug)]
pub struct InMemoryRecordStore<K, V> {
    inner: RwLock<BTreeMap<K, V>>,
}

impl<K, V> InMemoryRecordStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryRecordStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RecordStore<K, V> for InMemoryRecordStore<K, V>
where
    K: Clone + Ord + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(key).cloned()
    }

    fn upsert(&self, key: K, value: V) -> StoreResult<()> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(key, value);
        Ok(())
    }

    fn upsert_all(&self, entries: Vec<(K, V)>) -> StoreResult<()> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.extend(entries);
        Ok(())
    }

    fn modify(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> StoreResult<Option<V>> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get_mut(key).map(|value| {
            f(value);
            value.clone()
        }))
    }

    fn remove(&self, key: &K) -> StoreResult<Option<V>> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.remove(key))
    }

    fn transaction(&self, f: &mut dyn FnMut(&mut dyn Transaction<K, V>)) -> StoreResult<()> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        f(&mut *map);
        Ok(())
    }

    fn list(&self) -> Vec<V> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use volunteerdesk_core::DeletionMarker;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Row {
        name: &'static str,
        deletion: DeletionMarker,
    }

    impl SoftDelete for Row {
        fn deletion(&self) -> &DeletionMarker {
            &self.deletion
        }

        fn deletion_mut(&mut self) -> &mut DeletionMarker {
            &mut self.deletion
        }
    }

    fn row(name: &'static str) -> Row {
        Row {
            name,
            ..Default::default()
        }
    }

    #[test]
    fn active_and_all_queries_are_explicit() {
        let store: InMemoryRecordStore<u32, Row> = InMemoryRecordStore::new();
        store.upsert_all(vec![(1, row("a")), (2, row("b"))]).unwrap();
        store
            .modify(&2, &mut |r| {
                r.soft_delete(None, Utc::now());
            })
            .unwrap();

        let active: Vec<_> = store.find_active().into_iter().map(|r| r.name).collect();
        assert_eq!(active, ["a"]);
        assert_eq!(store.find_all().len(), 2);
        assert_eq!(store.find_deleted()[0].name, "b");
        assert!(store.get_active(&2).is_none());
        assert!(store.get(&2).is_some());
    }

    #[test]
    fn modify_missing_key_is_none() {
        let store: InMemoryRecordStore<u32, Row> = InMemoryRecordStore::new();
        let mut called = false;
        assert!(store.modify(&9, &mut |_| called = true).unwrap().is_none());
        assert!(!called);
    }

    #[test]
    fn shared_through_arc_dyn() {
        let store: Arc<dyn RecordStore<u32, Row>> = Arc::new(InMemoryRecordStore::new());
        store.upsert(7, row("x")).unwrap();
        assert_eq!(store.remove(&7).unwrap().map(|r| r.name), Some("x"));
        assert!(store.list().is_empty());
    }

    #[test]
    fn transaction_sees_and_writes_every_record() {
        let store: InMemoryRecordStore<u32, Row> = InMemoryRecordStore::new();
        store.upsert_all(vec![(1, row("a")), (2, row("b"))]).unwrap();

        let view: &dyn RecordStore<u32, Row> = &store;
        let renamed = transact(view, |records| {
            if records.values().any(|r| r.name == "c") {
                return Err(StoreError::NotRun);
            }
            let mut count = 0;
            for record in records.values_mut() {
                record.name = "c";
                count += 1;
            }
            records.insert(3, row("d"));
            Ok(count)
        });

        assert_eq!(renamed, Ok(2));
        let names: Vec<_> = store.list().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["c", "c", "d"]);
    }

    #[test]
    fn poisoned_lock_fails_writes() {
        let store: InMemoryRecordStore<u32, Row> = InMemoryRecordStore::new();
        std::thread::scope(|s| {
            let crashed = s
                .spawn(|| {
                    let _guard = store.inner.write().unwrap();
                    panic!("writer crashed while holding the lock");
                })
                .join();
            assert!(crashed.is_err());
        });

        assert_eq!(store.upsert(1, row("a")), Err(StoreError::Poisoned));
        assert_eq!(store.upsert_all(vec![(2, row("b"))]), Err(StoreError::Poisoned));
        assert_eq!(store.modify(&1, &mut |_| {}), Err(StoreError::Poisoned));
        assert_eq!(store.remove(&1), Err(StoreError::Poisoned));
        assert_eq!(store.transaction(&mut |_| {}), Err(StoreError::Poisoned));
        assert!(store.list().is_empty());
    }
}
