//! VCMI Launcher - browser launcher for the VCMI engine
//!
//! Core modules:
//! - `store`: Async keyed blob stores (IndexedDB, memory, no-op)
//! - `provision`: One lazily opened store per cache namespace
//! - `bootstrap`: Fills the engine filesystem and starts the engine
//! - `surface`: Aspect-correct canvas sizing
//! - `platform`: Browser glue (IndexedDB, JS engine module, exports)
//! - `config`: Launcher preferences and engine settings

pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod error;
pub mod platform;
pub mod provision;
pub mod store;
pub mod surface;

pub use bootstrap::{Bootstrap, BootstrapReport, PendingPayload, Stage};
pub use config::{EngineSettings, LauncherConfig, Resolution};
pub use engine::{Engine, RecordingEngine};
pub use error::{BootstrapError, EngineError, OpenError, PayloadError, StoreError};
pub use provision::{Namespace, StoreOpener, StoreProvisioner};
pub use store::{BackendKind, BlobStore, MemoryStore, NoopStore};
pub use surface::{ContainerBox, SurfaceRect, SurfaceSink, SurfaceSizer, fit_surface};

/// Engine filesystem layout
pub mod consts {
    /// Where staged archive contents go
    pub const DATA_ROOT: &str = "/Data/";
    /// Current session settings, always written by the launcher
    pub const SETTINGS_PATH: &str = "/config/settings.json";
    /// Mod activation; defaulted only when nothing was saved
    pub const MOD_SETTINGS_PATH: &str = "/config/modSettings.json";
    /// Baseline arguments for the engine's main
    pub const DEFAULT_LAUNCH_ARGS: &[&str] = &["--disable-video"];
}
