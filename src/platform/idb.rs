//! IndexedDB backend
//!
//! One database per namespace, one object store (`files`) per database,
//! keys out of line. Values go in as `Blob`s and come back as bytes whatever
//! shape the browser hands them out in.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Array, ArrayBuffer, Promise, Uint8Array};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, IdbDatabase, IdbObjectStore, IdbOpenDbRequest, IdbRequest, IdbTransactionMode,
};

use super::js_reason;
use crate::error::{OpenError, StoreError};
use crate::provision::StoreOpener;
use crate::store::{BackendKind, BlobStore};

const OBJECT_STORE: &str = "files";
const SCHEMA_VERSION: u32 = 1;

/// Why `request` failed; the DOMException when there is one
fn request_reason(request: &IdbRequest, fallback: &JsValue) -> String {
    match request.error() {
        Ok(Some(exception)) => exception.message(),
        _ => js_reason(fallback),
    }
}

/// Resolve once `request` fires success or error
async fn await_request(request: &IdbRequest) -> Result<JsValue, JsValue> {
    let promise = Promise::new(&mut |resolve, reject| {
        request.set_onsuccess(Some(&resolve));
        request.set_onerror(Some(&reject));
    });
    JsFuture::from(promise).await?;
    request.result()
}

fn create_schema(request: &IdbOpenDbRequest) -> Result<(), JsValue> {
    let db: IdbDatabase = request.result()?.dyn_into()?;
    db.create_object_store(OBJECT_STORE)?;
    Ok(())
}

/// Opens IndexedDB databases
#[derive(Debug, Default, Clone, Copy)]
pub struct IdbOpener;

#[async_trait(?Send)]
impl StoreOpener for IdbOpener {
    async fn open(&self, name: &str) -> Result<Rc<dyn BlobStore>, OpenError> {
        let factory = web_sys::window()
            .and_then(|w| w.indexed_db().ok().flatten())
            .ok_or_else(|| {
                OpenError::Unavailable("IndexedDB is not supported on this host".to_string())
            })?;
        let failed = |reason: String| OpenError::Failed {
            name: name.to_string(),
            reason,
        };

        let request = factory
            .open_with_u32(name, SCHEMA_VERSION)
            .map_err(|e| failed(js_reason(&e)))?;

        let upgrade_error: Rc<RefCell<Option<String>>> = Rc::default();
        let on_upgrade = {
            let request = request.clone();
            let upgrade_error = upgrade_error.clone();
            Closure::<dyn FnMut(_)>::new(move |_event: web_sys::IdbVersionChangeEvent| {
                log::info!("Creating cache schema");
                if let Err(e) = create_schema(&request) {
                    *upgrade_error.borrow_mut() = Some(js_reason(&e));
                    // Keep the old version so the next open retries the upgrade
                    if let Some(transaction) = request.transaction() {
                        let _ = transaction.abort();
                    }
                }
            })
        };
        request.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

        let opened = await_request(&request).await;
        request.set_onupgradeneeded(None);
        drop(on_upgrade);

        if let Some(reason) = upgrade_error.borrow_mut().take() {
            if let Ok(db) = opened.and_then(|value| value.dyn_into::<IdbDatabase>()) {
                db.close();
            }
            return Err(failed(format!("can't upgrade cache database: {}", reason)));
        }

        let db: IdbDatabase = match opened {
            Ok(value) => value
                .dyn_into()
                .map_err(|_| failed("open did not yield a database".to_string()))?,
            Err(e) => return Err(failed(request_reason(&request, &e))),
        };

        if !db.object_store_names().contains(OBJECT_STORE) {
            db.close();
            return Err(failed(format!("object store '{}' is missing", OBJECT_STORE)));
        }

        Ok(Rc::new(IdbStore {
            db: RefCell::new(Some(db)),
        }))
    }
}

/// Blob store over one IndexedDB database
pub struct IdbStore {
    db: RefCell<Option<IdbDatabase>>,
}

impl IdbStore {
    /// Object store inside a fresh single-request transaction
    fn object_store(
        &self,
        key: &str,
        mode: IdbTransactionMode,
    ) -> Result<IdbObjectStore, StoreError> {
        let db = self.db.borrow();
        let db = db.as_ref().ok_or(StoreError::Closed)?;
        let transaction_failed = |e: JsValue| StoreError::Transaction {
            key: key.to_string(),
            reason: js_reason(&e),
        };
        db.transaction_with_str_and_mode(OBJECT_STORE, mode)
            .map_err(transaction_failed)?
            .object_store(OBJECT_STORE)
            .map_err(transaction_failed)
    }

    async fn send(
        &self,
        key: &str,
        request: Result<IdbRequest, JsValue>,
    ) -> Result<JsValue, StoreError> {
        let request_failed = |reason| StoreError::Request {
            key: key.to_string(),
            reason,
        };
        let request = request.map_err(|e| request_failed(js_reason(&e)))?;
        await_request(&request)
            .await
            .map_err(|e| request_failed(request_reason(&request, &e)))
    }
}

async fn to_bytes(key: &str, value: JsValue) -> Result<Vec<u8>, StoreError> {
    let decode_failed = |reason: String| StoreError::Decode {
        key: key.to_string(),
        reason,
    };

    if let Some(blob) = value.dyn_ref::<Blob>() {
        let buffer = JsFuture::from(blob.array_buffer())
            .await
            .map_err(|e| decode_failed(js_reason(&e)))?;
        return Ok(Uint8Array::new(&buffer).to_vec());
    }
    if let Some(bytes) = value.dyn_ref::<Uint8Array>() {
        return Ok(bytes.to_vec());
    }
    if value.is_instance_of::<ArrayBuffer>() {
        return Ok(Uint8Array::new(&value).to_vec());
    }
    Err(decode_failed("value is not binary".to_string()))
}

#[async_trait(?Send)]
impl BlobStore for IdbStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let store = self.object_store(key, IdbTransactionMode::Readwrite)?;
        let parts = Array::of1(&Uint8Array::from(data));
        let blob = Blob::new_with_u8_array_sequence(&parts).map_err(|e| StoreError::Request {
            key: key.to_string(),
            reason: js_reason(&e),
        })?;
        self.send(key, store.put_with_key(&blob, &JsValue::from_str(key)))
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let store = self.object_store(key, IdbTransactionMode::Readonly)?;
        let value = self.send(key, store.get(&JsValue::from_str(key))).await?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        to_bytes(key, value).await.map(Some)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let store = self.object_store(key, IdbTransactionMode::Readwrite)?;
        self.send(key, store.delete(&JsValue::from_str(key))).await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let store = self.object_store("*", IdbTransactionMode::Readonly)?;
        let value = self.send("*", store.get_all_keys()).await?;
        let keys = match value.dyn_into::<Array>() {
            Ok(keys) => keys.iter().filter_map(|k| k.as_string()).collect(),
            Err(_) => Vec::new(),
        };
        Ok(keys)
    }

    fn close(&self) {
        if let Some(db) = self.db.borrow_mut().take() {
            db.close();
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::IndexedDb
    }
}
