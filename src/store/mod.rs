//! Keyed blob stores
//!
//! One async contract, several backends:
//! - `MemoryStore`: in-process map (native hosts, tests)
//! - `NoopStore`: accepts everything, keeps nothing
//! - `IdbStore`: IndexedDB (wasm only, see `platform::idb`)
//!
//! Callers hold an `Rc<dyn BlobStore>` and never branch on the backend.

pub mod memory;
pub mod noop;

pub use memory::MemoryStore;
pub use noop::NoopStore;

use std::ops::ControlFlow;

use async_trait::async_trait;

use crate::error::StoreError;

/// Which backend sits behind a store handle (diagnostics only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    IndexedDb,
    Memory,
    Noop,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::IndexedDb => "indexeddb",
            BackendKind::Memory => "memory",
            BackendKind::Noop => "noop",
        }
    }
}

/// Async key → blob store.
///
/// All operations run on a single cooperative thread, so the futures are not
/// `Send`. A missing key is `Ok(None)`, never an error.
#[async_trait(?Send)]
pub trait BlobStore {
    /// Store or overwrite the blob under `key`
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Fetch the blob under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove `key` (removing a missing key succeeds)
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All keys currently stored, in backend order
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Release backend resources
    fn close(&self);

    fn kind(&self) -> BackendKind;

    /// Visit every entry once, until the visitor breaks.
    ///
    /// Keys removed between listing and reading are skipped. Entries after a
    /// `Break` are not read.
    async fn for_each(
        &self,
        visit: &mut dyn for<'k, 'v> FnMut(&'k str, &'v [u8]) -> ControlFlow<()>,
    ) -> Result<(), StoreError> {
        for key in self.keys().await? {
            if let Some(value) = self.get(&key).await? {
                if visit(&key, &value).is_break() {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Remove every entry
    async fn clear(&self) -> Result<(), StoreError> {
        for key in self.keys().await? {
            self.delete(&key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;

    /// Lists a key it no longer holds and counts reads
    struct Vanishing {
        inner: MemoryStore,
        reads: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl BlobStore for Vanishing {
        async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
            self.inner.put(key, data).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.reads.set(self.reads.get() + 1);
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }

        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            let mut keys = self.inner.keys().await?;
            keys.sort();
            keys.insert(0, "/Saves/gone.vsgm1".to_string());
            Ok(keys)
        }

        fn close(&self) {
            self.inner.close()
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Memory
        }
    }

    fn vanishing(keys: &[&str]) -> Vanishing {
        let inner = MemoryStore::new();
        for key in keys {
            block_on(inner.put(key, key.as_bytes())).unwrap();
        }
        Vanishing {
            inner,
            reads: Cell::new(0),
        }
    }

    #[test]
    fn test_for_each_through_trait_object() {
        let store = vanishing(&["a", "b"]);
        let store: &dyn BlobStore = &store;

        let mut seen = Vec::new();
        block_on(store.for_each(&mut |key, value| {
            assert_eq!(key.as_bytes(), value);
            seen.push(key.to_string());
            ControlFlow::Continue(())
        }))
        .unwrap();

        // The listed-but-missing key is skipped
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn test_for_each_stops_reading_after_break() {
        let store = vanishing(&["a", "b", "c"]);

        let mut seen = Vec::new();
        block_on(store.for_each(&mut |key, _| {
            seen.push(key.to_string());
            ControlFlow::Break(())
        }))
        .unwrap();

        assert_eq!(seen, vec!["a"]);
        // gone.vsgm1 and a were read, b and c never were
        assert_eq!(store.reads.get(), 2);
    }

    #[test]
    fn test_default_clear_deletes_listed_keys() {
        let store = vanishing(&["a", "b"]);
        block_on(store.clear()).unwrap();
        assert!(block_on(store.inner.keys()).unwrap().is_empty());
    }
}
