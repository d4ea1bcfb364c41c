// Registry of monitored targets
use crate::error::ConfigError;
use crate::models::{Target, TargetId, TargetKind, SYSTEM_TARGET_NAME};
use crate::performance::PollRequest;

/// Ordered set of targets. Registration order decides which target is credited
/// when several filters match the same process.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a start request, system target last
    pub fn from_names(names: &[String], include_system: bool) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for name in names {
            registry.add(name)?;
        }
        if include_system {
            registry.enable_system()?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, name: &str) -> Result<TargetId, ConfigError> {
        let target = Target::process(name);
        if target.id.is_empty() {
            return Err(ConfigError::EmptyTargetName);
        }
        self.insert(target)
    }

    /// Insert the system singleton; a no-op if it is already present
    pub fn enable_system(&mut self) -> Result<TargetId, ConfigError> {
        if self.has_system() {
            return Ok(SYSTEM_TARGET_NAME.to_string());
        }
        self.insert(Target::whole_system())
    }

    /// Returns whether the system target was present
    pub fn disable_system(&mut self) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| !t.is_system());
        before != self.targets.len()
    }

    pub fn remove(&mut self, id: &str) -> Result<Target, ConfigError> {
        let pos = self
            .targets
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ConfigError::UnknownTarget(id.to_string()))?;
        Ok(self.targets.remove(pos))
    }

    /// First registered process target whose filter is contained in `process_name`
    pub fn match_process(&self, process_name: &str) -> Option<&TargetId> {
        let lower = process_name.to_lowercase();
        self.targets
            .iter()
            .find(|t| t.matches(&lower))
            .map(|t| &t.id)
    }

    pub fn has_system(&self) -> bool {
        self.targets.iter().any(|t| t.is_system())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.targets.iter().any(|t| t.id == id)
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn ids(&self) -> Vec<TargetId> {
        self.targets.iter().map(|t| t.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn poll_request(&self) -> PollRequest {
        PollRequest {
            process_filters: self
                .targets
                .iter()
                .filter(|t| t.kind == TargetKind::Process)
                .map(|t| t.match_substring.clone())
                .collect(),
            include_system: self.has_system(),
        }
    }

    fn insert(&mut self, target: Target) -> Result<TargetId, ConfigError> {
        if self.contains(&target.id) {
            return Err(ConfigError::DuplicateTarget(target.id));
        }
        let id = target.id.clone();
        self.targets.push(target);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_rejects_duplicates_and_empty() {
        let mut registry = TargetRegistry::new();
        assert_eq!(registry.add("chrome"), Ok("chrome".to_string()));
        assert_eq!(
            registry.add("chrome"),
            Err(ConfigError::DuplicateTarget("chrome".to_string()))
        );
        assert_eq!(registry.add("   "), Err(ConfigError::EmptyTargetName));
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let mut registry = TargetRegistry::new();
        registry.add("Code").unwrap();
        assert_eq!(registry.match_process("code-insiders"), Some(&"Code".to_string()));
        assert_eq!(registry.match_process("VSCODE.EXE"), Some(&"Code".to_string()));
        assert_eq!(registry.match_process("firefox"), None);
    }

    #[test]
    fn test_first_registered_filter_wins() {
        let mut registry = TargetRegistry::new();
        registry.add("fire").unwrap();
        registry.add("firefox").unwrap();
        assert_eq!(registry.match_process("firefox-bin"), Some(&"fire".to_string()));
    }

    #[test]
    fn test_system_target_is_a_singleton_and_never_matches() {
        let mut registry = TargetRegistry::new();
        registry.enable_system().unwrap();
        registry.enable_system().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.match_process("System"), None);
        assert!(registry.disable_system());
        assert!(!registry.disable_system());
    }

    #[test]
    fn test_process_named_system_conflicts_with_singleton() {
        let mut registry = TargetRegistry::new();
        registry.add("System").unwrap();
        assert!(registry.enable_system().is_err());
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut registry = TargetRegistry::from_names(
            &["a".to_string(), "b".to_string(), "c".to_string()],
            true,
        )
        .unwrap();
        registry.remove("b").unwrap();
        assert_eq!(registry.ids(), vec!["a", "c", SYSTEM_TARGET_NAME]);
        assert_eq!(
            registry.remove("b"),
            Err(ConfigError::UnknownTarget("b".to_string()))
        );
    }

    #[test]
    fn test_poll_request_lists_process_filters() {
        let registry = TargetRegistry::from_names(&["Chrome".to_string()], true).unwrap();
        let request = registry.poll_request();
        assert_eq!(request.process_filters, vec!["chrome"]);
        assert!(request.include_system);
    }
}
