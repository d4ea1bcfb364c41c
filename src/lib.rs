// Periodic resource sampling with rolling per-target history
pub mod commands;
pub mod error;
pub mod export;
pub mod file_manager;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod performance;
pub mod utils;

pub use error::{
    AcquisitionError, ConfigError, ExportError, FatalLoopError, MonitorError, Result,
    StorageError,
};
pub use export::{default_export_file_name, to_csv, to_json, write_export, ExportFormat};
pub use models::{
    Frame, HostInfo, InterfaceCounters, MetricKind, MonitorConfig, MonitorSettings, RateSample, Target, TargetId,
    TargetKind, TargetSample, SYSTEM_TARGET_NAME,
};
pub use monitor::{
    FrameSubscription, HistorySnapshot, MonitorEvent, MonitorState, ResourceMonitor, TickEngine,
};
pub use performance::{CounterSource, PollRequest, ProcessCounters, RawTick, SystemCounters};
