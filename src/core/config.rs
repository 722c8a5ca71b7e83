//! Pipeline configuration from YAML

use crate::core::state::TaskType;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

const LOG_LEVELS: &[&str] = &["TRACE", "DEBUG", "INFO", "WARN", "WARNING", "ERROR"];

/// Pipeline-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name (used as the registry key)
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub task_type: TaskType,

    /// Stop at the first failed step
    #[serde(default = "default_stop_on_error")]
    pub stop_on_error: bool,

    /// Level attached to the pipeline's log span
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_stop_on_error() -> bool {
    true
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl PipelineConfig {
    pub fn new(name: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            task_type,
            stop_on_error: default_stop_on_error(),
            log_level: default_log_level(),
        }
    }

    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }
        if !LOG_LEVELS.contains(&self.log_level.to_uppercase().as_str()) {
            anyhow::bail!(
                "Pipeline '{}' has unknown log level '{}'",
                self.name,
                self.log_level
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = PipelineConfig::from_yaml("name: monthly").unwrap();
        assert_eq!(config.name, "monthly");
        assert_eq!(config.task_type, TaskType::Transform);
        assert!(config.stop_on_error);
        assert_eq!(config.log_level, "INFO");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: "reconcile"
description: "Compare statements"
task_type: compare
stop_on_error: false
log_level: debug
unknown_key: ignored
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.task_type, TaskType::Compare);
        assert!(!config.stop_on_error);
        assert_eq!(config.description, "Compare statements");
    }

    #[test]
    fn test_empty_name_fails() {
        assert!(PipelineConfig::from_yaml("name: ''").is_err());
    }

    #[test]
    fn test_bad_log_level_fails() {
        assert!(PipelineConfig::from_yaml("name: x\nlog_level: LOUD").is_err());
    }
}
