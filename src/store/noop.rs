//! Store that keeps nothing
//!
//! Handed out when durable storage can't be opened, so the rest of the
//! launcher works the same way, just without persistence.

use std::ops::ControlFlow;

use async_trait::async_trait;

use super::{BackendKind, BlobStore};
use crate::error::StoreError;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait(?Send)]
impl BlobStore for NoopStore {
    async fn put(&self, _key: &str, _data: &[u8]) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    fn close(&self) {}

    fn kind(&self) -> BackendKind {
        BackendKind::Noop
    }

    async fn for_each(
        &self,
        _visit: &mut dyn for<'k, 'v> FnMut(&'k str, &'v [u8]) -> ControlFlow<()>,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
