//! In-process blob store
//!
//! Used as the durable stand-in on native hosts and as the reference backend
//! in tests. Entries live in a shared map so a store reopened under the same
//! name (see `provision::MemoryOpener`) sees what was written before.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;

use super::{BackendKind, BlobStore};
use crate::error::StoreError;

pub type SharedEntries = Rc<RefCell<HashMap<String, Vec<u8>>>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: SharedEntries,
    closed: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store over an existing entry map
    pub fn with_entries(entries: SharedEntries) -> Self {
        Self {
            entries,
            closed: Cell::new(false),
        }
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.get() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl BlobStore for MemoryStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_open()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_open()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.check_open()?;
        Ok(self.entries.borrow().keys().cloned().collect())
    }

    fn close(&self) {
        self.closed.set(true);
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use proptest::prelude::*;
    use std::ops::ControlFlow;

    proptest! {
        #[test]
        fn put_then_get_returns_blob(
            key in "/[a-zA-Z0-9_/.]{1,32}",
            data in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let store = MemoryStore::new();
            block_on(store.put(&key, &data)).unwrap();
            prop_assert_eq!(block_on(store.get(&key)).unwrap(), Some(data));
        }

        #[test]
        fn clear_empties_any_population(
            keys in proptest::collection::hash_set("[a-z]{1,8}", 0..20),
        ) {
            let store = MemoryStore::new();
            for key in &keys {
                block_on(store.put(key, key.as_bytes())).unwrap();
            }
            block_on(store.clear()).unwrap();
            prop_assert!(block_on(store.keys()).unwrap().is_empty());
        }
    }

    #[test]
    fn test_missing_key_is_absent() {
        let store = MemoryStore::new();
        assert_eq!(block_on(store.get("/nope")).unwrap(), None);
    }

    #[test]
    fn test_delete_then_get_is_absent() {
        let store = MemoryStore::new();
        block_on(store.put("/Saves/a.vsgm1", b"save")).unwrap();
        block_on(store.delete("/Saves/a.vsgm1")).unwrap();
        assert_eq!(block_on(store.get("/Saves/a.vsgm1")).unwrap(), None);
        // Deleting again is fine
        block_on(store.delete("/Saves/a.vsgm1")).unwrap();
    }

    #[test]
    fn test_put_overwrites() {
        let store = MemoryStore::new();
        block_on(store.put("k", b"one")).unwrap();
        block_on(store.put("k", b"two")).unwrap();
        assert_eq!(block_on(store.get("k")).unwrap(), Some(b"two".to_vec()));
        assert_eq!(block_on(store.keys()).unwrap().len(), 1);
    }

    #[test]
    fn test_for_each_visits_each_entry_once() {
        let store = MemoryStore::new();
        for key in ["a", "b", "c"] {
            block_on(store.put(key, key.as_bytes())).unwrap();
        }

        let mut seen = Vec::new();
        block_on(store.for_each(&mut |key, value| {
            assert_eq!(key.as_bytes(), value);
            seen.push(key.to_string());
            ControlFlow::Continue(())
        }))
        .unwrap();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_operations_fail_after_close() {
        let store = MemoryStore::new();
        block_on(store.put("k", b"v")).unwrap();
        store.close();
        assert_eq!(block_on(store.get("k")), Err(StoreError::Closed));
        assert_eq!(block_on(store.put("k", b"v")), Err(StoreError::Closed));
        assert_eq!(block_on(store.keys()), Err(StoreError::Closed));
    }

    #[test]
    fn test_shared_entries_survive_reopen() {
        let entries = SharedEntries::default();
        let first = MemoryStore::with_entries(entries.clone());
        block_on(first.put("/config/settings.json", b"{}")).unwrap();
        first.close();

        let second = MemoryStore::with_entries(entries);
        assert_eq!(
            block_on(second.get("/config/settings.json")).unwrap(),
            Some(b"{}".to_vec())
        );
    }
}
