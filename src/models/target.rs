// Monitored target data structures
use serde::{Deserialize, Serialize};

/// Display name of the system-wide pseudo-target
pub const SYSTEM_TARGET_NAME: &str = "System";

/// Targets are unique by display name
pub type TargetId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Named process filter, matched by case-insensitive substring
    Process,
    /// Whole-machine counters (singleton)
    WholeSystem,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    pub kind: TargetKind,
    /// Lowercased filter; empty for the system target
    pub match_substring: String,
}

impl Target {
    pub fn process(name: &str) -> Self {
        let name = name.trim();
        Self {
            id: name.to_string(),
            kind: TargetKind::Process,
            match_substring: name.to_lowercase(),
        }
    }

    pub fn whole_system() -> Self {
        Self {
            id: SYSTEM_TARGET_NAME.to_string(),
            kind: TargetKind::WholeSystem,
            match_substring: String::new(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.kind == TargetKind::WholeSystem
    }

    /// `process_name_lower` must already be lowercased
    pub fn matches(&self, process_name_lower: &str) -> bool {
        self.kind == TargetKind::Process && process_name_lower.contains(&self.match_substring)
    }
}
