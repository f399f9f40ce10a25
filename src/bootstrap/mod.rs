//! Engine bootstrap
//!
//! Fills the engine's virtual filesystem and starts it. Stages run strictly
//! in order:
//! 1. `Pending`: buffers staged this session go to the data root
//! 2. `Persisted`: saved files from the cache, minus `settings.json`
//! 3. `Settings`: the current settings, over anything written before
//! 4. `ModSettings`: default mod activation, only if none was saved
//! 5. `ReadyHook`: first-frame callback
//! 6. `Launch`: `run()` then `call_main(args)`
//!
//! A failure in any stage stops the pipeline; the engine is only started if
//! every write before it succeeded.

pub mod mod_settings;
pub mod payload;

pub use mod_settings::DEFAULT_MOD_SETTINGS;
pub use payload::PendingPayload;

use std::fmt;
use std::ops::ControlFlow;

use crate::consts::{DATA_ROOT, DEFAULT_LAUNCH_ARGS, MOD_SETTINGS_PATH, SETTINGS_PATH};
use crate::engine::Engine;
use crate::error::{BootstrapError, EngineError};
use crate::store::BlobStore;

/// Named step of the bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Persisted,
    Settings,
    ModSettings,
    ReadyHook,
    Launch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Persisted => "persisted",
            Stage::Settings => "settings",
            Stage::ModSettings => "mod-settings",
            Stage::ReadyHook => "ready-hook",
            Stage::Launch => "launch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the bootstrap wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Staged buffers written to the data root
    pub pending_written: usize,
    /// Cached entries copied verbatim
    pub persisted_written: usize,
    /// Cached `settings.json` copies ignored
    pub skipped_reserved: usize,
    /// Cached zero-length entries ignored
    pub skipped_empty: usize,
    /// Whether the default mod activation was synthesized
    pub default_mod_settings: bool,
}

/// Result of walking the cached files
#[derive(Debug, Default)]
pub struct PersistedScan {
    pub written: usize,
    pub skipped_reserved: usize,
    pub skipped_empty: usize,
    pub found_mod_settings: bool,
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_settings(path: &str) -> bool {
    file_name(path) == file_name(SETTINGS_PATH)
}

fn is_mod_settings(path: &str) -> bool {
    file_name(path) == file_name(MOD_SETTINGS_PATH)
}

/// One-shot bootstrap of an engine session
pub struct Bootstrap<'a> {
    engine: &'a dyn Engine,
    files: &'a dyn BlobStore,
    pending: &'a PendingPayload,
    settings: &'a [u8],
    launch_args: Vec<String>,
    on_ready: Option<Box<dyn FnOnce()>>,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        engine: &'a dyn Engine,
        files: &'a dyn BlobStore,
        pending: &'a PendingPayload,
        settings: &'a [u8],
    ) -> Self {
        Self {
            engine,
            files,
            pending,
            settings,
            launch_args: DEFAULT_LAUNCH_ARGS.iter().map(|s| s.to_string()).collect(),
            on_ready: None,
        }
    }

    pub fn launch_args(mut self, args: Vec<String>) -> Self {
        self.launch_args = args;
        self
    }

    /// Callback fired when the engine renders its first frame
    pub fn on_ready(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_ready = Some(Box::new(callback));
        self
    }

    /// Run every stage in order
    pub async fn run(mut self) -> Result<BootstrapReport, BootstrapError> {
        log::info!(
            "Bootstrapping engine ({} staged files, cache: {})",
            self.pending.pending(),
            self.files.kind().as_str()
        );

        let pending_written = self.write_pending()?;
        let scan = self.copy_persisted().await?;
        self.write_settings()?;
        let default_mod_settings = self.ensure_mod_settings(scan.found_mod_settings)?;
        self.arm_ready_hook();
        self.launch()?;

        let report = BootstrapReport {
            pending_written,
            persisted_written: scan.written,
            skipped_reserved: scan.skipped_reserved,
            skipped_empty: scan.skipped_empty,
            default_mod_settings,
        };
        log::info!("Engine started: {:?}", report);
        Ok(report)
    }

    fn write(&self, stage: Stage, path: &str, data: &[u8]) -> Result<(), BootstrapError> {
        self.engine
            .fs_write(path, data)
            .map_err(|source| BootstrapError::Stage { stage, source })
    }

    /// Stage 1: hand staged buffers to the engine, dropping each once written
    pub fn write_pending(&self) -> Result<usize, BootstrapError> {
        self.pending.seal();

        let mut written = 0;
        for name in self.pending.names() {
            let path = format!("{}{}", DATA_ROOT, name);
            let result = self
                .pending
                .with(&name, |data| self.write(Stage::Pending, &path, data));
            if let Some(result) = result {
                result?;
                self.pending.clear(&name);
                written += 1;
            }
        }
        Ok(written)
    }

    /// Stage 2: copy cached files, except settings and empty entries
    pub async fn copy_persisted(&self) -> Result<PersistedScan, BootstrapError> {
        let mut scan = PersistedScan::default();
        let mut failure: Option<EngineError> = None;

        // The first rejected write stops the walk, nothing after it is read
        self.files
            .for_each(&mut |key, value| {
                if is_settings(key) {
                    log::debug!("Skipping cached {}, current settings win", key);
                    scan.skipped_reserved += 1;
                    return ControlFlow::Continue(());
                }
                if value.is_empty() {
                    log::debug!("Skipping empty cached file {}", key);
                    scan.skipped_empty += 1;
                    return ControlFlow::Continue(());
                }
                if let Err(e) = self.engine.fs_write(key, value) {
                    failure = Some(e);
                    return ControlFlow::Break(());
                }
                if is_mod_settings(key) {
                    scan.found_mod_settings = true;
                }
                scan.written += 1;
                ControlFlow::Continue(())
            })
            .await?;

        match failure {
            Some(source) => Err(BootstrapError::Stage {
                stage: Stage::Persisted,
                source,
            }),
            None => Ok(scan),
        }
    }

    /// Stage 3: current settings always land last at the settings path
    pub fn write_settings(&self) -> Result<(), BootstrapError> {
        self.write(Stage::Settings, SETTINGS_PATH, self.settings)
    }

    /// Stage 4: default mod activation unless the player saved their own
    pub fn ensure_mod_settings(&self, found: bool) -> Result<bool, BootstrapError> {
        if found {
            return Ok(false);
        }
        log::info!("No saved mod settings, writing defaults");
        self.write(
            Stage::ModSettings,
            MOD_SETTINGS_PATH,
            DEFAULT_MOD_SETTINGS.as_bytes(),
        )?;
        Ok(true)
    }

    /// Stage 5
    pub fn arm_ready_hook(&mut self) {
        match self.on_ready.take() {
            Some(callback) => self.engine.set_game_started(callback),
            None => log::debug!("No ready hook registered"),
        }
    }

    /// Stage 6
    pub fn launch(&self) -> Result<(), BootstrapError> {
        let launch = |source| BootstrapError::Stage {
            stage: Stage::Launch,
            source,
        };
        self.engine.run().map_err(launch)?;
        self.engine.call_main(&self.launch_args).map_err(launch)?;
        Ok(())
    }
}
