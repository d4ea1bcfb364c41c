// Monitoring core: registry, rates, history and the sampler loop
pub mod history;
pub mod publisher;
pub mod rates;
pub mod registry;
pub mod sampler;

pub use history::{HistorySnapshot, HistoryStore, RollingBuffer, TargetHistory};
pub use publisher::{FramePublisher, FrameSubscription, MonitorEvent};
pub use rates::{compute_rate, estimate_from_connections};
pub use registry::TargetRegistry;
pub use sampler::{MonitorState, TickEngine};

use crate::error::{FatalLoopError, MonitorError, Result};
use crate::models::{validate_capacity, MonitorConfig, TargetId, DEFAULT_HISTORY_CAPACITY};
use crate::performance::{CounterSource, SystemCounterSource};
use crossbeam_channel::{bounded, Sender};
use log::{error, info, warn};
use parking_lot::Mutex;
use sampler::{run_sampler, SharedState};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type SourceFactory =
    Box<dyn Fn() -> std::result::Result<Box<dyn CounterSource>, FatalLoopError> + Send + Sync>;

/// Owned control object for one monitoring session.
///
/// Control calls may come from any thread. Registry changes and history
/// appends are serialized through the registry lock, so a tick never sees a
/// half-applied change.
pub struct ResourceMonitor {
    shared: Arc<SharedState>,
    source_factory: SourceFactory,
    worker: Mutex<Option<JoinHandle<()>>>,
    stop_tx: Mutex<Option<Sender<()>>>,
}

impl ResourceMonitor {
    /// Monitor backed by the live OS counters
    pub fn new() -> Self {
        Self::with_source_factory(|| {
            SystemCounterSource::new().map(|source| Box::new(source) as Box<dyn CounterSource>)
        })
    }

    /// Monitor with a custom counter source, created anew on every `start`
    pub fn with_source_factory<F>(factory: F) -> Self
    where
        F: Fn() -> std::result::Result<Box<dyn CounterSource>, FatalLoopError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            shared: Arc::new(SharedState::new(DEFAULT_HISTORY_CAPACITY)),
            source_factory: Box::new(factory),
            worker: Mutex::new(None),
            stop_tx: Mutex::new(None),
        }
    }

    /// Begin sampling. Replaces the registry and clears the history.
    pub fn start(&self, config: MonitorConfig) -> Result<()> {
        config.validate()?;
        let registry = TargetRegistry::from_names(&config.targets, config.include_system)?;

        if !self
            .shared
            .state
            .transition(MonitorState::Idle, MonitorState::Running)
        {
            return Err(MonitorError::AlreadyRunning);
        }

        // A previous run that ended on a fatal error leaves a finished thread behind
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }

        let source = match (self.source_factory)() {
            Ok(source) => source,
            Err(e) => {
                error!("Cannot start monitoring: {}", e);
                self.shared.state.set(MonitorState::Idle);
                return Err(e.into());
            }
        };

        {
            let mut current = self.shared.registry.write();
            *current = registry;
            self.shared.history.set_capacity(config.history_capacity);
            self.shared.history.reset(&current.ids());
        }
        *self.shared.last_error.lock() = None;

        let (stop_tx, stop_rx) = bounded(1);
        let shared = Arc::clone(&self.shared);
        let interval = config.interval();

        let spawned = thread::Builder::new()
            .name("resmon-sampler".into())
            .spawn(move || run_sampler(source, interval, shared, stop_rx));

        match spawned {
            Ok(handle) => {
                // Sender first: whoever takes the handle must find it
                *self.stop_tx.lock() = Some(stop_tx);
                *self.worker.lock() = Some(handle);
                info!(
                    "Monitoring started: {} target(s), {:.1}s interval, {} ticks of history",
                    config.targets.len() + usize::from(config.include_system),
                    config.interval_seconds,
                    config.history_capacity
                );
                Ok(())
            }
            Err(e) => {
                let err = FatalLoopError::ThreadSpawn(e.to_string());
                error!("{}", err);
                self.shared.state.set(MonitorState::Idle);
                Err(err.into())
            }
        }
    }

    /// Stop sampling and wait for the sampler thread. A tick in progress is
    /// allowed to finish; nothing is published after it. Idempotent.
    pub fn stop(&self) {
        self.shared
            .state
            .transition(MonitorState::Running, MonitorState::Stopping);

        // Only the caller that takes the handle joins and settles Idle
        let handle = match self.worker.lock().take() {
            Some(handle) => handle,
            None => return,
        };
        if let Some(stop_tx) = self.stop_tx.lock().take() {
            let _ = stop_tx.send(());
        }
        if handle.join().is_err() {
            error!("Sampler thread panicked");
        }
        // Never overwrites the Running of a newer start
        self.shared
            .state
            .transition(MonitorState::Stopping, MonitorState::Idle);
        info!("Monitoring stopped");
    }

    /// Start monitoring another process filter; takes effect on the next tick
    pub fn add_target(&self, name: &str) -> Result<TargetId> {
        let mut registry = self.shared.registry.write();
        let id = registry.add(name)?;
        self.shared.history.add_target(&id);
        info!("Added target {}", id);
        Ok(id)
    }

    /// Stop monitoring a target and discard its history
    pub fn remove_target(&self, id: &str) -> Result<()> {
        let mut registry = self.shared.registry.write();
        registry.remove(id)?;
        self.shared.history.remove_target(id);
        info!("Removed target {}", id);
        Ok(())
    }

    /// Insert or remove the system-wide target
    pub fn set_system_monitoring(&self, enabled: bool) -> Result<()> {
        let mut registry = self.shared.registry.write();
        if enabled {
            let id = registry.enable_system()?;
            self.shared.history.add_target(&id);
        } else if registry.disable_system() {
            self.shared
                .history
                .remove_target(crate::models::SYSTEM_TARGET_NAME);
        }
        Ok(())
    }

    /// Resize the history; shrinking drops the oldest ticks
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        validate_capacity(capacity)?;
        self.shared.history.set_capacity(capacity);
        Ok(())
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        self.shared.history.snapshot()
    }

    pub fn subscribe(&self) -> FrameSubscription {
        self.shared.publisher.subscribe()
    }

    pub fn state(&self) -> MonitorState {
        self.shared.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() == MonitorState::Running
    }

    /// The error that ended the most recent run, if any
    pub fn last_error(&self) -> Option<FatalLoopError> {
        self.shared.last_error.lock().clone()
    }

    pub fn targets(&self) -> Vec<TargetId> {
        self.shared.registry.read().ids()
    }

    pub fn capacity(&self) -> usize {
        self.shared.history.capacity()
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("Monitor dropped while running, stopping sampler");
        }
        self.stop();
    }
}
