//! Browser glue
//!
//! Wraps the engine's JS module object, keeps the canvas fitted to its
//! container and exposes `Launcher` to the page.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{Element, HtmlCanvasElement, ResizeObserver};

use super::js_reason;
use crate::bootstrap::{Bootstrap, PendingPayload};
use crate::config::{EngineSettings, LauncherConfig};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::provision::{Namespace, StoreProvisioner};
use crate::surface::{ContainerBox, SurfaceRect, SurfaceSink, SurfaceSizer};

/// The engine's Emscripten-style module object
pub struct JsEngine {
    module: JsValue,
}

impl JsEngine {
    pub fn new(module: JsValue) -> Self {
        Self { module }
    }

    fn entry_point(&self, name: &str) -> Result<Function, EngineError> {
        Reflect::get(&self.module, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| EngineError::MissingEntryPoint(name.to_string()))
    }

    fn call_failed(name: &str, e: JsValue) -> EngineError {
        EngineError::Call {
            name: name.to_string(),
            reason: js_reason(&e),
        }
    }

    /// Hand the rendering surface to the engine
    pub fn set_canvas(&self, canvas: &HtmlCanvasElement) -> Result<(), EngineError> {
        Reflect::set(&self.module, &JsValue::from_str("canvas"), canvas)
            .map_err(|e| Self::call_failed("canvas", e))?;
        Ok(())
    }

    pub fn version(&self) -> Option<String> {
        self.entry_point("getVCMIVersion")
            .ok()?
            .call0(&self.module)
            .ok()?
            .as_string()
    }
}

impl Engine for JsEngine {
    fn fs_write(&self, path: &str, data: &[u8]) -> Result<(), EngineError> {
        self.entry_point("fsWrite")?
            .call2(
                &self.module,
                &JsValue::from_str(path),
                &Uint8Array::from(data),
            )
            .map_err(|e| EngineError::Rejected {
                path: path.to_string(),
                reason: js_reason(&e),
            })?;
        Ok(())
    }

    fn set_game_started(&self, callback: Box<dyn FnOnce()>) {
        let callback = Closure::once_into_js(move || callback());
        if let Err(e) = Reflect::set(&self.module, &JsValue::from_str("gameStarted"), &callback) {
            log::warn!("Can't register gameStarted hook: {}", js_reason(&e));
        }
    }

    fn run(&self) -> Result<(), EngineError> {
        self.entry_point("run")?
            .call0(&self.module)
            .map_err(|e| Self::call_failed("run", e))?;
        Ok(())
    }

    fn call_main(&self, args: &[String]) -> Result<(), EngineError> {
        let argv: Array = args.iter().map(|arg| JsValue::from_str(arg)).collect();
        self.entry_point("callMain")?
            .call1(&self.module, &argv)
            .map_err(|e| Self::call_failed("callMain", e))?;
        Ok(())
    }
}

/// Writes surface placement into the canvas style
struct CanvasSink(HtmlCanvasElement);

impl SurfaceSink for CanvasSink {
    fn apply(&self, rect: &SurfaceRect) {
        let style = self.0.style();
        let _ = style.set_property("position", "absolute");
        let _ = style.set_property("left", &format!("{}px", rect.left));
        let _ = style.set_property("top", &format!("{}px", rect.top));
        let _ = style.set_property("width", &format!("{}px", rect.width));
        let _ = style.set_property("height", &format!("{}px", rect.height));
    }
}

fn container_box(parent: &Element) -> ContainerBox {
    let bounds = parent.get_bounding_client_rect();
    ContainerBox::new(bounds.width(), bounds.height())
}

/// Keeps a canvas fitted to its parent for as long as it lives
pub struct CanvasFit {
    sizer: Rc<SurfaceSizer<CanvasSink>>,
    canvas: HtmlCanvasElement,
    parent: Element,
    observer: ResizeObserver,
    _on_resize: Closure<dyn FnMut(Array, ResizeObserver)>,
    on_context_menu: Closure<dyn FnMut(web_sys::Event)>,
}

impl CanvasFit {
    pub fn mount(canvas: &HtmlCanvasElement, target_aspect: f64) -> Result<Self, JsValue> {
        let parent = canvas
            .parent_element()
            .ok_or_else(|| JsValue::from_str("canvas has no parent element"))?;

        let sizer = Rc::new(SurfaceSizer::new(target_aspect, CanvasSink(canvas.clone())));
        sizer.relayout(container_box(&parent));

        let on_resize = {
            let sizer = sizer.clone();
            let parent = parent.clone();
            Closure::<dyn FnMut(_, _)>::new(move |_entries: Array, _observer: ResizeObserver| {
                sizer.relayout(container_box(&parent));
            })
        };
        let observer = ResizeObserver::new(on_resize.as_ref().unchecked_ref())?;
        observer.observe(&parent);

        // Right click belongs to the game
        let on_context_menu = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
            event.prevent_default();
        });
        canvas.add_event_listener_with_callback(
            "contextmenu",
            on_context_menu.as_ref().unchecked_ref(),
        )?;

        Ok(Self {
            sizer,
            canvas: canvas.clone(),
            parent,
            observer,
            _on_resize: on_resize,
            on_context_menu,
        })
    }

    /// Callback re-fitting the canvas once the engine draws its first frame
    pub fn ready_hook(&self) -> Box<dyn FnOnce()> {
        let sizer = self.sizer.clone();
        let parent = self.parent.clone();
        Box::new(move || {
            let rect = sizer.force_relayout(container_box(&parent));
            log::info!("Engine ready, surface {}x{}", rect.width, rect.height);
        })
    }
}

impl Drop for CanvasFit {
    fn drop(&mut self) {
        self.observer.unobserve(&self.parent);
        self.observer.disconnect();
        let _ = self.canvas.remove_event_listener_with_callback(
            "contextmenu",
            self.on_context_menu.as_ref().unchecked_ref(),
        );
    }
}

/// Entry point used by the page
#[wasm_bindgen]
pub struct Launcher {
    config: LauncherConfig,
    stores: Rc<StoreProvisioner>,
    pending: Rc<PendingPayload>,
    canvas_fit: Rc<RefCell<Option<CanvasFit>>>,
    started: Cell<bool>,
}

#[wasm_bindgen]
impl Launcher {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Launcher {
        Launcher {
            config: LauncherConfig::load(),
            stores: Rc::new(StoreProvisioner::for_host()),
            pending: Rc::new(PendingPayload::new()),
            canvas_fit: Rc::new(RefCell::new(None)),
            started: Cell::new(false),
        }
    }

    /// Keep a downloaded asset in memory until the session starts
    pub fn stage_file(&self, name: &str, data: Vec<u8>) -> Result<(), JsValue> {
        self.pending
            .stage(name, data)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Persist a file in one of the caches (`data`, `files`, `variant`)
    pub fn store_file(&self, namespace: &str, key: String, data: Vec<u8>) -> Promise {
        let Some(namespace) = Namespace::from_str(namespace) else {
            return Promise::reject(&JsValue::from_str(&format!(
                "unknown cache namespace '{}'",
                namespace
            )));
        };
        let store = self.stores.store(namespace);
        future_to_promise(async move {
            store
                .await
                .put(&key, &data)
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Fill the engine's filesystem and start it on `canvas`
    pub fn start(&self, module: JsValue, canvas: HtmlCanvasElement, settings: String) -> Promise {
        if self.started.replace(true) {
            return Promise::reject(&JsValue::from_str("session already started"));
        }

        let config = self.config.clone();
        let stores = self.stores.clone();
        let pending = self.pending.clone();
        let canvas_fit = self.canvas_fit.clone();

        future_to_promise(async move {
            let settings = EngineSettings::new(settings);
            let resolution = settings.resolution_or(config.default_resolution);
            canvas.set_width(resolution.width);
            canvas.set_height(resolution.height);

            let engine = JsEngine::new(module);
            engine
                .set_canvas(&canvas)
                .map_err(|e| JsValue::from_str(&e.to_string()))?;

            let fit = CanvasFit::mount(&canvas, resolution.aspect())?;
            let on_ready = fit.ready_hook();
            *canvas_fit.borrow_mut() = Some(fit);

            let files = stores.files().await;
            let report = Bootstrap::new(&engine, &*files, &pending, settings.as_bytes())
                .launch_args(config.launch_args.clone())
                .on_ready(on_ready)
                .run()
                .await
                .map_err(|e| {
                    log::error!("Bootstrap failed: {}", e);
                    JsValue::from_str(&e.to_string())
                })?;

            if let Some(version) = engine.version() {
                log::info!("Started, VCMI version: {}", version);
            }
            Ok(JsValue::from_f64(
                (report.pending_written + report.persisted_written) as f64,
            ))
        })
    }

    /// Current launcher config as JSON
    pub fn config(&self) -> String {
        self.config.to_json()
    }

    /// Replace the launcher config and persist it; applies to the next `start`
    pub fn save_config(&mut self, json: &str) -> Result<(), JsValue> {
        let config =
            LauncherConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        config.save().map_err(|e| JsValue::from_str(&e))?;
        log::set_max_level(config.log_level().to_level_filter());
        self.config = config;
        Ok(())
    }

    /// Wipe every cache
    pub fn reset(&self) -> Promise {
        let stores = self.stores.clone();
        future_to_promise(async move {
            stores
                .reset_all()
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Tear down: stop tracking the canvas and close the caches
    pub fn close(&self) {
        self.canvas_fit.borrow_mut().take();
        self.stores.close_all();
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(LauncherConfig::load().log_level())
        .expect("Failed to init logger");
    log::info!("VCMI launcher loaded");
}

#[cfg(test)]
mod tests {
    use super::*;
    use js_sys::Object;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    /// Module object whose entry points append to `module.log`
    fn fake_module() -> JsValue {
        let module: JsValue = Object::new().into();
        Reflect::set(&module, &"log".into(), &Array::new()).unwrap();
        let entry = |name: &str, args: &str, body: &str| {
            Reflect::set(&module, &name.into(), &Function::new_with_args(args, body)).unwrap();
        };
        entry("fsWrite", "path, data", "this.log.push('write ' + path + ' ' + data.length);");
        entry("run", "", "this.log.push('run');");
        entry("callMain", "argv", "this.log.push('main ' + argv.join(' '));");
        entry("getVCMIVersion", "", "return '1.5.0';");
        module
    }

    fn log_of(module: &JsValue) -> Vec<String> {
        Reflect::get(module, &"log".into())
            .unwrap()
            .unchecked_into::<Array>()
            .iter()
            .filter_map(|entry| entry.as_string())
            .collect()
    }

    #[wasm_bindgen_test]
    fn test_engine_calls_reach_module() {
        let module = fake_module();
        let engine = JsEngine::new(module.clone());

        engine.fs_write("/Data/H3bitmap.lod", &[1, 2, 3]).unwrap();
        engine.run().unwrap();
        engine
            .call_main(&["--disable-video".to_string(), "-s".to_string()])
            .unwrap();

        assert_eq!(
            log_of(&module),
            vec!["write /Data/H3bitmap.lod 3", "run", "main --disable-video -s"]
        );
        assert_eq!(engine.version().as_deref(), Some("1.5.0"));
    }

    #[wasm_bindgen_test]
    fn test_missing_entry_point() {
        let engine = JsEngine::new(Object::new().into());
        assert_eq!(
            engine.run(),
            Err(EngineError::MissingEntryPoint("run".to_string()))
        );
        assert_eq!(engine.version(), None);
    }

    #[wasm_bindgen_test]
    fn test_throwing_write_is_rejected() {
        let module = fake_module();
        Reflect::set(
            &module,
            &"fsWrite".into(),
            &Function::new_with_args("path", "throw new Error('disk full');"),
        )
        .unwrap();

        let err = JsEngine::new(module).fs_write("/Saves/a.vsgm1", b"a").unwrap_err();
        assert_eq!(
            err,
            EngineError::Rejected {
                path: "/Saves/a.vsgm1".to_string(),
                reason: "disk full".to_string(),
            }
        );
    }

    #[wasm_bindgen_test]
    fn test_game_started_hook_runs_callback() {
        let module = fake_module();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        JsEngine::new(module.clone()).set_game_started(Box::new(move || flag.set(true)));

        let hook: Function = Reflect::get(&module, &"gameStarted".into())
            .unwrap()
            .unchecked_into();
        hook.call0(&module).unwrap();
        assert!(fired.get());
    }
}
