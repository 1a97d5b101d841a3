//! Compiler configuration.
//!
//! Every field has a default, so an empty mapping deserializes to
//! [`CompilerConfig::default`].

use serde::{Deserialize, Serialize};

/// Role targeted by compiled actions unless configured otherwise.
pub const DEFAULT_ROLE_NAME: &str = netrun_models::NETWORK_RUNNER;

/// Engine action of the tasks compiled actions produce.
pub const DEFAULT_TASK_ACTION: &str = netrun_models::IMPORT_ROLE;

/// Settings applied while compiling a schema specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Role imported by every action's task.
    pub role_name: String,
    /// Engine action written into produced tasks.
    pub task_action: String,
    /// Names rejected in addition to the built-in reserved words.
    pub reserved_words: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            role_name: DEFAULT_ROLE_NAME.to_string(),
            task_action: DEFAULT_TASK_ACTION.to_string(),
            reserved_words: Vec::new(),
        }
    }
}

impl CompilerConfig {
    /// Configuration targeting `role_name`.
    pub fn for_role(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            ..Self::default()
        }
    }

    /// Whether `name` is a built-in or configured reserved word.
    pub fn is_reserved(&self, name: &str) -> bool {
        netrun_core::is_reserved(name) || self.reserved_words.iter().any(|w| w == name)
    }
}

/// Identifier form of a role name: `-` and `.` become `_`.
pub fn normalize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c == '-' || c == '.' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.role_name, "network-runner");
        assert_eq!(config.task_action, "import_role");
        assert!(config.reserved_words.is_empty());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: CompilerConfig =
            serde_json::from_str(r#"{"reserved_words": ["vlan"]}"#).unwrap();
        assert_eq!(config.role_name, DEFAULT_ROLE_NAME);
        assert!(config.is_reserved("vlan"));
        assert!(config.is_reserved("import"));
        assert!(!config.is_reserved("port"));
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("network-runner"), "network_runner");
        assert_eq!(normalize_identifier("acme.net-tools"), "acme_net_tools");
        assert_eq!(normalize_identifier("plain"), "plain");
    }
}
