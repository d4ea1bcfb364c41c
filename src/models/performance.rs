// Host description data structures
use serde::{Deserialize, Serialize};

/// Static facts about the machine, shown once above the charts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostInfo {
    /// e.g. "Linux 6.8 (Ubuntu 24.04)"
    pub os: String,
    pub physical_cores: Option<usize>,
    pub cpu_frequency_ghz: f64,
    pub total_memory_gb: f64,
    /// "No GPU detected" when NVML is unavailable
    pub gpu_name: String,
}

impl HostInfo {
    pub fn summary(&self) -> String {
        let cores = self
            .physical_cores
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!(
            "OS: {} | CPU: {} cores @ {:.2}GHz | Memory: {:.2}GB | GPU: {}",
            self.os, cores, self.cpu_frequency_ghz, self.total_memory_gb, self.gpu_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let info = HostInfo {
            os: "Linux".into(),
            physical_cores: Some(8),
            cpu_frequency_ghz: 3.2,
            total_memory_gb: 15.5,
            gpu_name: "No GPU detected".into(),
        };
        assert_eq!(
            info.summary(),
            "OS: Linux | CPU: 8 cores @ 3.20GHz | Memory: 15.50GB | GPU: No GPU detected"
        );
    }
}
