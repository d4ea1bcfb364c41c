// Error taxonomy for the monitoring core
use thiserror::Error;

/// Rejected control calls. Raised synchronously; a running loop is unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("update interval {0}s is outside the allowed range [0.1, 10.0]")]
    IntervalOutOfRange(f64),
    #[error("history capacity {0} is outside the allowed range [10, 1000]")]
    CapacityOutOfRange(usize),
    #[error("target \"{0}\" is already being monitored")]
    DuplicateTarget(String),
    #[error("target name must not be empty")]
    EmptyTargetName,
    #[error("target \"{0}\" is not being monitored")]
    UnknownTarget(String),
    #[error("add a process to monitor or enable system-wide monitoring first")]
    NothingToMonitor,
}

/// A single metric of a single process could not be read this tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    #[error("permission denied reading process {pid}")]
    PermissionDenied { pid: u32 },
    #[error("process {pid} exited while being read")]
    ProcessVanished { pid: u32 },
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl AcquisitionError {
    pub fn from_io(pid: u32, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => AcquisitionError::PermissionDenied { pid },
            _ => AcquisitionError::ProcessVanished { pid },
        }
    }
}

/// The sampler cannot continue at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FatalLoopError {
    #[error("OS monitoring API unavailable: {0}")]
    SourceUnavailable(String),
    #[error("failed to spawn sampler thread: {0}")]
    ThreadSpawn(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no data to export")]
    NoData,
    #[error("failed to serialize export: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors surfaced by the public control API.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fatal(#[from] FatalLoopError),
    #[error("monitoring is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
