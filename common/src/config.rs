// Configuration management with layered configuration (file, env)

use crate::errors::ValidationError;
use crate::models::TaskConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub task: TaskConfig,
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Values supplied by the hosting workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Directory receiving the generated CSV files
    pub temp_dir: PathBuf,
    #[serde(default = "generate_task_id")]
    pub task_id: String,
    /// Selected SQL script files, executed in order
    #[serde(default)]
    pub input_files: Vec<PathBuf>,
}

fn generate_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load configuration with layered precedence: file → local file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("workflow.input_files")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task.connection_string.trim().is_empty() {
            return Err(ValidationError::MissingField(
                "task.connectionString".to_string(),
            ));
        }
        if self.task.separator.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "task.separator".to_string(),
                reason: "separator cannot be empty".to_string(),
            });
        }
        if self.workflow.temp_dir.as_os_str().is_empty() {
            return Err(ValidationError::MissingField("workflow.temp_dir".to_string()));
        }
        if self.workflow.task_id.is_empty() {
            return Err(ValidationError::MissingField("workflow.task_id".to_string()));
        }
        if self.connector.connect_timeout_seconds == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "connector.connect_timeout_seconds".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
