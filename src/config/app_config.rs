use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::infrastructure::llm::LlmProviderConfig;
use crate::infrastructure::triage::WorkflowConfig;

/// Application configuration
///
/// Every section has defaults, so an empty configuration is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub llm: LlmProviderConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub infrastructure: InfrastructureConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Incident corpus backing similarity search
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    /// JSON array of `{id, error, solution, metadata?}`; empty index when unset
    pub incidents_path: Option<PathBuf>,
}

/// Infrastructure graph used to resolve alert context
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InfrastructureConfig {
    /// Graph JSON; alerts get an empty context when unset
    pub graph_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load `config/default`, then `config/local`, then `APP__*` environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(dir.join("default")).required(false))
            .add_source(config::File::from(dir.join("local")).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_empty_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.workflow.step_ceiling(), 12);
        assert!(config.knowledge_base.incidents_path.is_none());
    }

    #[test]
    fn test_file_layers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
[server]
port = 9000

[logging]
format = "json"

[workflow]
max_plan_tasks = 4
similar_incidents = 5

[workflow.retry]
max_attempts = 4
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("local.toml"),
            "[server]\nport = 9100\n\n[knowledge_base]\nincidents_path = \"data/incidents.json\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.workflow.plan_cap(), 4);
        assert_eq!(config.workflow.similar_incidents, 5);
        assert_eq!(config.workflow.retry.max_attempts, 4);
        assert_eq!(config.workflow.retry.initial_delay_ms, 500);
        assert_eq!(
            config.knowledge_base.incidents_path,
            Some(PathBuf::from("data/incidents.json"))
        );
    }
}
