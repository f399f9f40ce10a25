//! Engine entry points
//!
//! The engine owns its virtual filesystem and its main loop; the launcher
//! only writes files into it and starts it.

use std::cell::RefCell;

use crate::error::EngineError;

/// Entry points the launcher needs from an embedded engine
pub trait Engine {
    /// Write `data` at `path` in the engine's virtual filesystem
    fn fs_write(&self, path: &str, data: &[u8]) -> Result<(), EngineError>;

    /// Register a callback fired once when the engine renders its first frame
    fn set_game_started(&self, callback: Box<dyn FnOnce()>);

    /// Initialise the runtime
    fn run(&self) -> Result<(), EngineError>;

    /// Enter the engine's main with `args`
    fn call_main(&self, args: &[String]) -> Result<(), EngineError>;
}

/// Something the launcher asked the engine to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Write { path: String, data: Vec<u8> },
    Run,
    CallMain(Vec<String>),
}

/// Engine that records calls instead of running anything.
///
/// Backs the native dry run and the bootstrap tests.
#[derive(Default)]
pub struct RecordingEngine {
    calls: RefCell<Vec<EngineCall>>,
    game_started: RefCell<Option<Box<dyn FnOnce()>>>,
    reject_path: Option<String>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that fails every write to `path`
    pub fn rejecting(path: &str) -> Self {
        Self {
            reject_path: Some(path.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    /// Paths written, in order
    pub fn written_paths(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Write { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Contents of the last write to `path`
    pub fn last_write(&self, path: &str) -> Option<Vec<u8>> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            EngineCall::Write { path: p, data } if p == path => Some(data.clone()),
            _ => None,
        })
    }

    pub fn started(&self) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|call| matches!(call, EngineCall::CallMain(_)))
    }

    /// Fire the first-frame callback, as the engine would
    pub fn signal_ready(&self) -> bool {
        let callback = self.game_started.borrow_mut().take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl Engine for RecordingEngine {
    fn fs_write(&self, path: &str, data: &[u8]) -> Result<(), EngineError> {
        if self.reject_path.as_deref() == Some(path) {
            return Err(EngineError::Rejected {
                path: path.to_string(),
                reason: "write refused".to_string(),
            });
        }
        log::debug!("fs_write {} ({} bytes)", path, data.len());
        self.calls.borrow_mut().push(EngineCall::Write {
            path: path.to_string(),
            data: data.to_vec(),
        });
        Ok(())
    }

    fn set_game_started(&self, callback: Box<dyn FnOnce()>) {
        *self.game_started.borrow_mut() = Some(callback);
    }

    fn run(&self) -> Result<(), EngineError> {
        self.calls.borrow_mut().push(EngineCall::Run);
        Ok(())
    }

    fn call_main(&self, args: &[String]) -> Result<(), EngineError> {
        self.calls
            .borrow_mut()
            .push(EngineCall::CallMain(args.to_vec()));
        Ok(())
    }
}
