//! Threaded interface for submitting and controlling registry scripts.
//!
//! This module provides a minimal, thread-per-script runner that accepts
//! registry scripts, executes them on a background thread, and optionally
//! streams result rows back to the caller. It uses cooperative cancellation
//! via an `Arc<AtomicBool>`.
//!
//! The registry itself serializes its mutations internally (keeper mutexes,
//! the compute guard, the snapshot swap), so scripts submitted here may
//! overlap without corrupting any mapping. Callers can submit scripts and
//! cancel them by id.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::registry::Registry;
use crate::script::Engine;
use crate::stack::DeclaredDirectory;

/// A single row emitted by a script run, printable as-is.
#[derive(Debug, Clone)]
pub struct Row(pub String);

/// Cancellation token shared with the worker thread.
#[derive(Debug)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
    pub fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque script identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptId(u64);

/// Handle to a running or completed script.
pub struct ScriptHandle {
    pub id: ScriptId,
    cancel: CancelToken,
    started: Instant,
    join: Option<JoinHandle<()>>,
    pub results: Option<Receiver<Row>>, // None when sink is stdout
}
impl ScriptHandle {
    /// Request cancellation (cooperative). The worker may take a short time
    /// to observe it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
    /// Wait for the script to finish.
    pub fn join(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
    /// Elapsed time since submission.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Script submission options.
pub struct ScriptOptions {
    pub stream_results: bool,
    pub timeout: Option<Duration>,
}
impl Default for ScriptOptions {
    fn default() -> Self {
        Self { stream_results: true, timeout: None }
    }
}

/// Registry managing script lifecycles.
pub struct ScriptInterface {
    registry: Arc<Registry>,
    directory: Arc<DeclaredDirectory>,
    next_id: Mutex<u64>,
    active: Mutex<HashMap<ScriptId, CancelToken>>, // for external cancellation
}

impl ScriptInterface {
    pub fn new(registry: Arc<Registry>, directory: Arc<DeclaredDirectory>) -> Self {
        Self {
            registry,
            directory,
            next_id: Mutex::new(0),
            active: Mutex::new(HashMap::new()),
        }
    }

    fn allocate_id(&self) -> ScriptId {
        let mut guard = self.next_id.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += 1;
        ScriptId(*guard)
    }

    /// Submit a script for execution on a background thread.
    /// When `options.stream_results` is true, a channel is returned for rows.
    pub fn start_script(&self, script: String, options: ScriptOptions) -> ScriptHandle {
        let id = self.allocate_id();
        let cancel = CancelToken::new();
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, cancel.clone());

        let (tx, rx) = if options.stream_results {
            let (tx, rx) = mpsc::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let registry = Arc::clone(&self.registry);
        let directory = Arc::clone(&self.directory);
        let cancel_for_thread = cancel.clone();
        let timeout = options.timeout;
        let join = std::thread::spawn(move || {
            // cancellation is checked up front; a script that already started
            // runs its commands to completion
            if cancel_for_thread.is_cancelled() || timeout.is_some_and(|d| d.is_zero()) {
                return;
            }
            let engine = Engine::new(&registry, &directory);
            match engine.execute_collect(&script) {
                Ok(outcome) => {
                    if let Some(tx) = tx {
                        for row in outcome.rows {
                            let _ = tx.send(Row(row));
                        }
                    } else {
                        for row in outcome.rows {
                            println!("{}", row);
                        }
                    }
                }
                Err(error) => {
                    warn!(error = %error, "script failed");
                    if let Some(tx) = tx {
                        let _ = tx.send(Row(error.to_string()));
                    }
                }
            }
        });

        ScriptHandle { id, cancel, started: Instant::now(), join: Some(join), results: rx }
    }

    /// Run a script synchronously on the current thread.
    ///
    /// Appropriate for one-off startup scripts where spawning a worker is
    /// not worth it.
    pub fn run_sync(&self, script: &str) {
        let engine = Engine::new(&self.registry, &self.directory);
        engine.execute(script);
    }

    /// Cancel a script by id.
    pub fn cancel(&self, id: ScriptId) -> bool {
        if let Some(token) =
            self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).get(&id)
        {
            token.cancel();
            true
        } else {
            false
        }
    }
}
