//! Platform abstraction layer
//!
//! Browser-only pieces live here:
//! - `idb`: IndexedDB store backend
//! - `web`: JS engine module wrapper, canvas fitting, exported `Launcher`
//!
//! Native builds use the in-process store and `RecordingEngine` instead.

#[cfg(target_arch = "wasm32")]
pub mod idb;
#[cfg(target_arch = "wasm32")]
pub mod web;

/// Readable message for a thrown JS value
#[cfg(target_arch = "wasm32")]
pub(crate) fn js_reason(value: &wasm_bindgen::JsValue) -> String {
    use wasm_bindgen::JsCast;

    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return error.message().into();
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
