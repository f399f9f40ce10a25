//! Store provisioning
//!
//! One store per namespace, opened lazily the first time anybody asks for it
//! and shared for the rest of the session. Opening never fails from the
//! caller's point of view: when durable storage is missing or broken the
//! provisioner hands out a `NoopStore` instead.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};

use crate::error::{OpenError, StoreError};
use crate::store::{BlobStore, MemoryStore, NoopStore, memory::SharedEntries};

/// Logical partition of the persistent cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Original game assets
    Data,
    /// Files the engine wrote back: saves, settings, mod configuration
    Files,
    /// Variant/config files
    Variant,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Data, Namespace::Files, Namespace::Variant];

    /// Database name on disk. Changing these orphans existing caches.
    pub fn db_name(&self) -> &'static str {
        match self {
            Namespace::Data => "vcmi-data",
            Namespace::Files => "vcmi-files",
            Namespace::Variant => "vcmi-variant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "data" | "vcmi-data" => Some(Namespace::Data),
            "files" | "vcmi-files" => Some(Namespace::Files),
            "variant" | "vcmi-variant" => Some(Namespace::Variant),
            _ => None,
        }
    }
}

/// Opens the durable backend for a database name
#[async_trait(?Send)]
pub trait StoreOpener {
    async fn open(&self, name: &str) -> Result<Rc<dyn BlobStore>, OpenError>;
}

/// Opener for hosts without any persistent storage
#[derive(Debug, Default)]
pub struct NoopOpener;

#[async_trait(?Send)]
impl StoreOpener for NoopOpener {
    async fn open(&self, _name: &str) -> Result<Rc<dyn BlobStore>, OpenError> {
        Err(OpenError::Unavailable(
            "no persistent storage on this host".to_string(),
        ))
    }
}

/// Opener backed by in-process maps, one per database name
#[derive(Debug, Default)]
pub struct MemoryOpener {
    databases: RefCell<HashMap<String, SharedEntries>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl StoreOpener for MemoryOpener {
    async fn open(&self, name: &str) -> Result<Rc<dyn BlobStore>, OpenError> {
        let entries = self
            .databases
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(Rc::new(MemoryStore::with_entries(entries)))
    }
}

/// Pending or resolved store handle; clones share one open
pub type StoreFuture = Shared<LocalBoxFuture<'static, Rc<dyn BlobStore>>>;

/// Session-wide owner of the namespace stores
pub struct StoreProvisioner {
    opener: Rc<dyn StoreOpener>,
    stores: RefCell<HashMap<Namespace, StoreFuture>>,
}

impl StoreProvisioner {
    pub fn new(opener: impl StoreOpener + 'static) -> Self {
        Self {
            opener: Rc::new(opener),
            stores: RefCell::new(HashMap::new()),
        }
    }

    /// Provisioner using the host's durable storage
    #[cfg(target_arch = "wasm32")]
    pub fn for_host() -> Self {
        Self::new(crate::platform::idb::IdbOpener)
    }

    /// Provisioner using in-process storage
    #[cfg(not(target_arch = "wasm32"))]
    pub fn for_host() -> Self {
        Self::new(MemoryOpener::new())
    }

    /// Store for `namespace`, opening it on first use
    pub fn store(&self, namespace: Namespace) -> StoreFuture {
        self.stores
            .borrow_mut()
            .entry(namespace)
            .or_insert_with(|| {
                open_or_fallback(self.opener.clone(), namespace)
                    .boxed_local()
                    .shared()
            })
            .clone()
    }

    pub fn data(&self) -> StoreFuture {
        self.store(Namespace::Data)
    }

    pub fn files(&self) -> StoreFuture {
        self.store(Namespace::Files)
    }

    pub fn variant(&self) -> StoreFuture {
        self.store(Namespace::Variant)
    }

    /// Close every store that finished opening
    pub fn close_all(&self) {
        for (namespace, store) in self.stores.borrow().iter() {
            if let Some(store) = store.peek() {
                store.close();
                log::info!("Closed {} cache", namespace.db_name());
            }
        }
    }

    /// Remove every entry from every namespace
    pub async fn reset_all(&self) -> Result<(), StoreError> {
        for namespace in Namespace::ALL {
            let store = self.store(namespace).await;
            store.clear().await?;
            log::info!("Cleared {} cache", namespace.db_name());
        }
        Ok(())
    }
}

async fn open_or_fallback(opener: Rc<dyn StoreOpener>, namespace: Namespace) -> Rc<dyn BlobStore> {
    let name = namespace.db_name();
    match opener.open(name).await {
        Ok(store) => {
            log::info!("Opened {} cache ({})", name, store.kind().as_str());
            store
        }
        Err(OpenError::Unavailable(reason)) => {
            log::warn!("Cache {} not persisted: {}", name, reason);
            Rc::new(NoopStore)
        }
        Err(e) => {
            log::error!("Can't open cache {}: {}", name, e);
            Rc::new(NoopStore)
        }
    }
}
