//! In-memory repositories.
//!
//! Records are keyed by `Entity::id`. Ids are UUIDv7, so iterating a
//! `BTreeMap` yields records in creation order.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use quill_core::Entity;

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Another record satisfied the clash predicate.
    Clash,
    /// The record to overwrite no longer exists.
    Missing,
}

pub trait Store<V: Entity>: Send + Sync {
    fn get(&self, id: &V::Id) -> Option<V>;

    fn list(&self) -> Vec<V>;

    fn filter(&self, keep: &dyn Fn(&V) -> bool) -> Vec<V>;

    /// Insert or overwrite `value`, unless another record (different id)
    /// satisfies `clash`. Check and write happen under one lock.
    /// Returns `false` when a clash prevented the write.
    fn upsert_unless(&self, value: V, clash: &dyn Fn(&V) -> bool) -> bool;

    /// Overwrite an existing record unless another record (different id)
    /// satisfies `clash`. Never inserts.
    fn replace_unless(&self, value: V, clash: &dyn Fn(&V) -> bool) -> WriteOutcome;

    fn remove(&self, id: &V::Id) -> Option<V>;

    /// Drop every record matching `pred`; returns how many were removed.
    fn remove_where(&self, pred: &dyn Fn(&V) -> bool) -> usize;

    fn insert(&self, value: V) {
        self.upsert_unless(value, &|_| false);
    }

    /// Overwrite an existing record. Returns `false` if it is gone.
    fn replace(&self, value: V) -> bool {
        self.replace_unless(value, &|_| false) == WriteOutcome::Written
    }
}

impl<V, S> Store<V> for Arc<S>
where
    V: Entity,
    S: Store<V> + ?Sized,
{
    fn get(&self, id: &V::Id) -> Option<V> {
        (**self).get(id)
    }

    fn list(&self) -> Vec<V> {
        (**self).list()
    }

    fn filter(&self, keep: &dyn Fn(&V) -> bool) -> Vec<V> {
        (**self).filter(keep)
    }

    fn upsert_unless(&self, value: V, clash: &dyn Fn(&V) -> bool) -> bool {
        (**self).upsert_unless(value, clash)
    }

    fn replace_unless(&self, value: V, clash: &dyn Fn(&V) -> bool) -> WriteOutcome {
        (**self).replace_unless(value, clash)
    }

    fn remove(&self, id: &V::Id) -> Option<V> {
        (**self).remove(id)
    }

    fn remove_where(&self, pred: &dyn Fn(&V) -> bool) -> usize {
        (**self).remove_where(pred)
    }
}

#[derive(Debug)]
pub struct InMemoryStore<V: Entity> {
    inner: RwLock<BTreeMap<V::Id, V>>,
}

impl<V: Entity> InMemoryStore<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<V: Entity> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Store<V> for InMemoryStore<V>
where
    V: Entity + Clone + Send + Sync + 'static,
    V::Id: Ord,
{
    fn get(&self, id: &V::Id) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(id).cloned()
    }

    fn list(&self) -> Vec<V> {
        self.filter(&|_| true)
    }

    fn filter(&self, keep: &dyn Fn(&V) -> bool) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        map.values().filter(|v| keep(v)).cloned().collect()
    }

    fn upsert_unless(&self, value: V, clash: &dyn Fn(&V) -> bool) -> bool {
        let Ok(mut map) = self.inner.write() else {
            return false;
        };
        let id = value.id();
        if map.iter().any(|(k, v)| *k != id && clash(v)) {
            return false;
        }
        map.insert(id, value);
        true
    }

    fn replace_unless(&self, value: V, clash: &dyn Fn(&V) -> bool) -> WriteOutcome {
        let Ok(mut map) = self.inner.write() else {
            return WriteOutcome::Missing;
        };
        let id = value.id();
        if !map.contains_key(&id) {
            return WriteOutcome::Missing;
        }
        if map.iter().any(|(k, v)| *k != id && clash(v)) {
            return WriteOutcome::Clash;
        }
        map.insert(id, value);
        WriteOutcome::Written
    }

    fn remove(&self, id: &V::Id) -> Option<V> {
        self.inner.write().ok()?.remove(id)
    }

    fn remove_where(&self, pred: &dyn Fn(&V) -> bool) -> usize {
        let Ok(mut map) = self.inner.write() else {
            return 0;
        };
        let before = map.len();
        map.retain(|_, v| !pred(v));
        before - map.len()
    }
}
