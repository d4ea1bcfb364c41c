// Per-tick counter and rate data structures
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const BYTES_PER_MIB: f64 = 1_048_576.0;

/// Username reported when none could be resolved
pub const UNKNOWN_USER: &str = "Unknown";

/// The five charted metrics. Every per-metric code path is parameterized by this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Memory,
    Network,
    Disk,
    Gpu,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Network,
        MetricKind::Disk,
        MetricKind::Gpu,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Memory => "Memory",
            MetricKind::Network => "Network",
            MetricKind::Disk => "Disk",
            MetricKind::Gpu => "GPU",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::Cpu | MetricKind::Gpu => "%",
            MetricKind::Memory => "MB",
            MetricKind::Network => "Mbps",
            MetricKind::Disk => "MB/s",
        }
    }

    /// Chart title, e.g. "Network Usage (Mbps)"
    pub fn title(&self) -> String {
        format!("{} Usage ({})", self.label(), self.unit())
    }
}

/// Cumulative byte counters of one network interface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InterfaceCounters {
    pub name: String,
    pub sent: u64,
    pub recv: u64,
}

impl InterfaceCounters {
    pub fn new(name: impl Into<String>, sent: u64, recv: u64) -> Self {
        Self {
            name: name.into(),
            sent,
            recv,
        }
    }
}

/// Network counters as the source could provide them for one target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NetworkCounters {
    /// Cumulative bytes per interface; deltas are taken interface by interface
    Interfaces(Vec<InterfaceCounters>),
    /// Open internet socket count; only supports the coarse per-process estimate
    Connections(u32),
    #[default]
    Unavailable,
}

/// Raw readings for one target at one tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CounterSnapshot {
    pub pid: Option<u32>,
    pub username: String,
    /// Already a rate, as reported by the OS
    pub cpu_percent: f32,
    /// Resident memory, absolute
    pub memory_bytes: u64,
    /// Used memory share; system target only
    pub memory_percent: Option<f32>,
    pub network: NetworkCounters,
    pub disk_read_bytes: Option<u64>,
    pub disk_write_bytes: Option<u64>,
    /// Global load of the first GPU
    pub gpu_percent: f32,
    pub timestamp: DateTime<Local>,
}

/// Derived metrics for one target at one tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateSample {
    /// Percent
    pub cpu: f64,
    /// MB
    pub memory: f64,
    /// Mbps
    pub network: f64,
    /// MB/s
    pub disk: f64,
    /// Percent
    pub gpu: f64,
    pub pid: Option<u32>,
    pub username: String,
    #[serde(default)]
    pub memory_percent: Option<f64>,
    /// Network value is the connection-count heuristic, not a byte rate
    #[serde(default)]
    pub network_estimated: bool,
}

impl RateSample {
    /// All rates zero, no pid
    pub fn idle() -> Self {
        Self {
            cpu: 0.0,
            memory: 0.0,
            network: 0.0,
            disk: 0.0,
            gpu: 0.0,
            pid: None,
            username: UNKNOWN_USER.to_string(),
            memory_percent: None,
            network_estimated: false,
        }
    }

    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Cpu => self.cpu,
            MetricKind::Memory => self.memory,
            MetricKind::Network => self.network,
            MetricKind::Disk => self.disk,
            MetricKind::Gpu => self.gpu,
        }
    }
}

impl Default for RateSample {
    fn default() -> Self {
        Self::idle()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetSample {
    pub target: String,
    pub sample: RateSample,
}

/// One tick's complete set of per-target samples. Immutable once published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub timestamp: DateTime<Local>,
    /// In target registration order, one entry per registered target
    pub samples: Vec<TargetSample>,
}

impl Frame {
    pub fn get(&self, target: &str) -> Option<&RateSample> {
        self.samples
            .iter()
            .find(|s| s.target == target)
            .map(|s| &s.sample)
    }

    /// Wall-clock label used by charts and exports
    pub fn time_label(&self) -> String {
        time_label(&self.timestamp)
    }
}

pub fn time_label(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_titles() {
        assert_eq!(MetricKind::Network.title(), "Network Usage (Mbps)");
        assert_eq!(MetricKind::Disk.title(), "Disk Usage (MB/s)");
        assert_eq!(MetricKind::Cpu.title(), "CPU Usage (%)");
    }

    #[test]
    fn test_value_by_kind() {
        let sample = RateSample {
            cpu: 1.0,
            memory: 2.0,
            network: 3.0,
            disk: 4.0,
            gpu: 5.0,
            ..RateSample::idle()
        };
        let values: Vec<f64> = MetricKind::ALL.iter().map(|k| sample.value(*k)).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
