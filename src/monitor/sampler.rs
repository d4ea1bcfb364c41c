// Sampler: per-tick orchestration and the background loop
use super::history::HistoryStore;
use super::publisher::{FramePublisher, MonitorEvent};
use super::rates::compute_rate;
use super::registry::TargetRegistry;
use crate::error::FatalLoopError;
use crate::models::{
    CounterSnapshot, Frame, NetworkCounters, RateSample, TargetId, TargetKind, TargetSample,
    UNKNOWN_USER,
};
use crate::performance::{CounterSource, ProcessCounters, RawTick, SystemCounters};
use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of the sampler loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopping,
}

impl MonitorState {
    fn as_u8(self) -> u8 {
        match self {
            MonitorState::Idle => 0,
            MonitorState::Running => 1,
            MonitorState::Stopping => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => MonitorState::Running,
            2 => MonitorState::Stopping,
            _ => MonitorState::Idle,
        }
    }
}

/// Atomic cell holding a `MonitorState`
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: MonitorState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn get(&self) -> MonitorState {
        MonitorState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: MonitorState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Atomically move `from` -> `to`; false if the current state differs
    pub fn transition(&self, from: MonitorState, to: MonitorState) -> bool {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Turns raw polls into frames. Owns the previous snapshot of every target.
#[derive(Debug, Default)]
pub struct TickEngine {
    previous: HashMap<TargetId, CounterSnapshot>,
}

impl TickEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the frame for one poll. Always yields exactly one sample per
    /// registered target, in registration order.
    pub fn tick(
        &mut self,
        raw: &RawTick,
        dt_seconds: f64,
        timestamp: DateTime<Local>,
        registry: &TargetRegistry,
    ) -> Frame {
        let gpu_percent = raw.gpu_percent.unwrap_or(0.0);

        // Lowest pid wins when several processes match one target
        let mut matched: HashMap<&TargetId, &ProcessCounters> = HashMap::new();
        for process in &raw.processes {
            if let Some(id) = registry.match_process(&process.name) {
                let entry = matched.entry(id).or_insert(process);
                if process.pid < entry.pid {
                    *entry = process;
                }
            }
        }

        let mut samples = Vec::with_capacity(registry.len());
        for target in registry.targets() {
            let current = match target.kind {
                TargetKind::Process => matched
                    .get(&target.id)
                    .map(|p| process_snapshot(p, gpu_percent, timestamp)),
                TargetKind::WholeSystem => raw
                    .system
                    .as_ref()
                    .map(|s| system_snapshot(s, gpu_percent, timestamp)),
            };

            let sample = match current {
                Some(current) => {
                    let prev = self
                        .previous
                        .get(&target.id)
                        .filter(|prev| prev.pid == current.pid);
                    let sample = compute_rate(prev, &current, dt_seconds);
                    self.previous.insert(target.id.clone(), current);
                    sample
                }
                None => {
                    debug!("No live process for target {}", target.id);
                    self.previous.remove(&target.id);
                    RateSample::idle()
                }
            };

            samples.push(TargetSample {
                target: target.id.clone(),
                sample,
            });
        }

        self.previous.retain(|id, _| registry.contains(id));

        Frame { timestamp, samples }
    }
}

fn process_snapshot(
    process: &ProcessCounters,
    gpu_percent: f32,
    timestamp: DateTime<Local>,
) -> CounterSnapshot {
    CounterSnapshot {
        pid: Some(process.pid),
        username: process
            .username
            .clone()
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        cpu_percent: process.cpu_percent,
        memory_bytes: process.memory_bytes,
        memory_percent: None,
        network: process
            .connections
            .map(NetworkCounters::Connections)
            .unwrap_or_default(),
        disk_read_bytes: process.disk_read_bytes,
        disk_write_bytes: process.disk_write_bytes,
        gpu_percent,
        timestamp,
    }
}

fn system_snapshot(
    system: &SystemCounters,
    gpu_percent: f32,
    timestamp: DateTime<Local>,
) -> CounterSnapshot {
    CounterSnapshot {
        pid: None,
        username: system
            .username
            .clone()
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        cpu_percent: system.cpu_percent,
        memory_bytes: system.memory_used_bytes,
        memory_percent: Some(system.memory_percent),
        network: NetworkCounters::Interfaces(system.interfaces.clone()),
        disk_read_bytes: system.disk_read_bytes,
        disk_write_bytes: system.disk_write_bytes,
        gpu_percent,
        timestamp,
    }
}

/// State shared between the control object and the sampler thread
pub struct SharedState {
    pub state: StateCell,
    pub registry: RwLock<TargetRegistry>,
    pub history: HistoryStore,
    pub publisher: FramePublisher,
    pub last_error: Mutex<Option<FatalLoopError>>,
}

impl SharedState {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: StateCell::new(MonitorState::Idle),
            registry: RwLock::new(TargetRegistry::new()),
            history: HistoryStore::new(capacity),
            publisher: FramePublisher::new(),
            last_error: Mutex::new(None),
        }
    }
}

/// Body of the sampler thread.
///
/// Fixed-rate schedule: each wait is the interval minus the time the tick took.
/// The wait is a channel receive so a stop request cuts it short.
///
/// On a fatal error the loop moves `Running -> Idle` itself. On a stop request
/// it leaves the state alone; the joining `stop()` owns `Stopping -> Idle`.
pub fn run_sampler(
    mut source: Box<dyn CounterSource>,
    interval: Duration,
    shared: Arc<SharedState>,
    stop_rx: Receiver<()>,
) {
    lower_thread_priority();
    info!("Sampler started ({:?} interval)", interval);

    let mut engine = TickEngine::new();
    let mut last_poll: Option<Instant> = None;

    loop {
        let tick_started = Instant::now();
        let request = shared.registry.read().poll_request();

        let raw = match source.poll(&request) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Sampler stopped: {}", e);
                *shared.last_error.lock() = Some(e.clone());
                shared.publisher.publish(MonitorEvent::Failed(e));
                shared
                    .state
                    .transition(MonitorState::Running, MonitorState::Idle);
                break;
            }
        };

        let polled_at = Instant::now();
        let dt_seconds = last_poll
            .map(|last| polled_at.duration_since(last).as_secs_f64())
            .unwrap_or_else(|| interval.as_secs_f64());
        last_poll = Some(polled_at);

        let frame = {
            let registry = shared.registry.read();
            let frame = engine.tick(&raw, dt_seconds, Local::now(), &registry);
            shared.history.append(&frame);
            frame
        };
        shared.publisher.publish(MonitorEvent::Frame(Arc::new(frame)));

        let wait = interval.saturating_sub(tick_started.elapsed());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("Sampler stopped");
}

/// Keep the sampler from competing with the workloads it measures
fn lower_thread_priority() {
    #[cfg(windows)]
    {
        use log::warn;
        use windows_sys::Win32::System::Threading::{
            GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_BELOW_NORMAL,
        };
        unsafe {
            if SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_BELOW_NORMAL) == 0 {
                warn!("Failed to set sampler thread to below-normal priority");
            } else {
                debug!("Sampler thread priority set to BELOW_NORMAL");
            }
        }
    }
}
