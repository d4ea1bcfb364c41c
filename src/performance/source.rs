// Counter source abstraction
use crate::error::FatalLoopError;
use crate::models::InterfaceCounters;

/// Raw cumulative counters for one live process
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessCounters {
    pub pid: u32,
    pub name: String,
    pub username: Option<String>,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub disk_read_bytes: Option<u64>,
    pub disk_write_bytes: Option<u64>,
    /// Open socket count, when the platform exposes it
    pub connections: Option<u32>,
}

/// Raw whole-machine counters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SystemCounters {
    pub cpu_percent: f32,
    pub memory_used_bytes: u64,
    pub memory_percent: f32,
    /// One entry per interface present at this poll
    pub interfaces: Vec<InterfaceCounters>,
    pub disk_read_bytes: Option<u64>,
    pub disk_write_bytes: Option<u64>,
    pub username: Option<String>,
}

/// Everything one poll produced
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTick {
    pub processes: Vec<ProcessCounters>,
    pub system: Option<SystemCounters>,
    /// Global load of the first GPU
    pub gpu_percent: Option<f32>,
}

/// What the sampler needs from the next poll
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PollRequest {
    /// Lowercased process filters; only matching processes need to be returned
    pub process_filters: Vec<String>,
    pub include_system: bool,
}

impl PollRequest {
    pub fn wants(&self, process_name_lower: &str) -> bool {
        self.process_filters
            .iter()
            .any(|f| process_name_lower.contains(f.as_str()))
    }
}

/// Per-poll access to OS counters.
///
/// Failures of a single metric must be absorbed by the implementation (leave the
/// field `None`/0). An `Err` means the source is unusable and stops the sampler.
pub trait CounterSource: Send {
    fn poll(&mut self, request: &PollRequest) -> Result<RawTick, FatalLoopError>;
}
