//! Files staged in memory for the current session
//!
//! Archive contents land here while the session is being prepared. The
//! bootstrap hands each buffer to the engine once and drops it after the
//! write succeeds, so large assets are never held twice.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::error::PayloadError;

#[derive(Debug, Default)]
pub struct PendingPayload {
    entries: RefCell<BTreeMap<String, Option<Vec<u8>>>>,
    sealed: Cell<bool>,
}

impl PendingPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `data` under `name` (relative to the engine's data root)
    pub fn stage(&self, name: &str, data: Vec<u8>) -> Result<(), PayloadError> {
        if self.sealed.get() {
            return Err(PayloadError::Sealed(name.to_string()));
        }
        self.entries
            .borrow_mut()
            .insert(name.to_string(), Some(data));
        Ok(())
    }

    /// Names ever staged, including consumed ones
    pub fn names(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Run `f` over the buffer for `name`, if it is still held
    pub fn with<R>(&self, name: &str, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let entries = self.entries.borrow();
        let data = entries.get(name)?.as_deref()?;
        Some(f(data))
    }

    /// Drop the buffer for `name`, keeping its name
    pub fn clear(&self, name: &str) {
        if let Some(slot) = self.entries.borrow_mut().get_mut(name) {
            *slot = None;
        }
    }

    /// Number of buffers not yet consumed
    pub fn pending(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|data| data.is_some())
            .count()
    }

    /// Refuse any further staging
    pub fn seal(&self) {
        self.sealed.set(true);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_drops_buffer_keeps_name() {
        let payload = PendingPayload::new();
        payload.stage("H3sprite.lod", vec![1, 2, 3]).unwrap();
        assert_eq!(payload.pending(), 1);
        assert_eq!(payload.with("H3sprite.lod", |data| data.to_vec()), Some(vec![1, 2, 3]));
        // Reading leaves the buffer in place
        assert_eq!(payload.pending(), 1);

        payload.clear("H3sprite.lod");
        assert_eq!(payload.with("H3sprite.lod", |data| data.len()), None);
        assert_eq!(payload.pending(), 0);
        assert_eq!(payload.names(), vec!["H3sprite.lod"]);
    }

    #[test]
    fn test_sealed_payload_rejects_staging() {
        let payload = PendingPayload::new();
        payload.seal();
        assert_eq!(
            payload.stage("H3ab_bmp.lod", vec![0]),
            Err(PayloadError::Sealed("H3ab_bmp.lod".to_string()))
        );
        assert!(payload.names().is_empty());
    }
}
