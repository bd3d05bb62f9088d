//! Layered configuration for leadflow.
//!
//! Settings are read from `.leadflow/leadflow.toml`, then environment
//! variables, then CLI flags. Every section is optional.
//!
//! # Configuration File Format
//!
//! ```toml
//! [backend]
//! base_url = "http://127.0.0.1:8080"
//! timeout_secs = 10
//! connect_timeout_secs = 5
//!
//! [pipeline]
//! serialize_per_lead = false
//! event_capacity = 64
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! | Variable                | Overrides               |
//! |-------------------------|-------------------------|
//! | `LEADFLOW_BASE_URL`     | `backend.base_url`      |
//! | `LEADFLOW_TIMEOUT_SECS` | `backend.timeout_secs`  |
//! | `LEADFLOW_LOG_LEVEL`    | `logging.level`         |
//! | `LEADFLOW_LOG_FORMAT`   | `logging.format`        |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR: &str = ".leadflow";
pub const CONFIG_FILE: &str = "leadflow.toml";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines on stderr
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: pretty, json", s),
        }
    }
}

/// Where the lead collection lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Board behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Refuse a drag while the same lead still has a commit outstanding.
    /// Off by default: the last settle decides the final order.
    #[serde(default)]
    pub serialize_per_lead: bool,
    /// Buffer size of the board event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    64
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            serialize_per_lead: false,
            event_capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level or `EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// The complete leadflow.toml structure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeadflowToml {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LeadflowToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse leadflow.toml")
    }

    /// Load `leadflow.toml` from `config_dir`, or defaults if it is absent.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating its directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = self.to_toml_string()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize leadflow.toml")
    }

    /// Apply `LEADFLOW_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("LEADFLOW_BASE_URL") {
            self.backend.base_url = url;
        }
        if let Some(secs) = lookup("LEADFLOW_TIMEOUT_SECS") {
            self.backend.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid LEADFLOW_TIMEOUT_SECS '{}'", secs))?;
        }
        if let Some(level) = lookup("LEADFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LEADFLOW_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let url = &self.backend.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!(
                "Invalid base_url '{}': expected an http:// or https:// URL",
                url
            ));
        }
        if self.backend.timeout_secs == 0 {
            warnings.push("timeout_secs is 0: every request will time out".to_string());
        }
        if self.pipeline.event_capacity == 0 {
            warnings.push("event_capacity is 0: a capacity of 1 will be used".to_string());
        }
        let level = self.logging.level.to_lowercase();
        if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
            warnings.push(format!(
                "Unknown log level '{}'. Valid values: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        warnings
    }
}

/// Resolved configuration for one process.
///
/// It merges settings from:
/// 1. leadflow.toml file
/// 2. Environment variables
/// 3. CLI arguments
#[derive(Debug, Clone)]
pub struct LeadflowConfig {
    /// File the settings were read from (it may not exist)
    pub path: PathBuf,
    pub toml: LeadflowToml,
    /// CLI override: debug logging
    pub verbose: bool,
    /// CLI override: use the seeded in-memory backend
    pub demo: bool,
}

impl LeadflowConfig {
    /// Default config path under `project_dir`.
    pub fn default_path(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load from `explicit` (which must exist) or the default location.
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let (path, mut toml) = match explicit {
            Some(path) => (path.to_path_buf(), LeadflowToml::load(path)?),
            None => {
                let config_dir = project_dir.join(CONFIG_DIR);
                (
                    config_dir.join(CONFIG_FILE),
                    LeadflowToml::load_or_default(&config_dir)?,
                )
            }
        };
        toml.apply_env()?;

        Ok(Self {
            path,
            toml,
            verbose: false,
            demo: false,
        })
    }

    /// Create a LeadflowConfig with CLI overrides.
    pub fn with_cli_args(
        project_dir: &Path,
        explicit: Option<&Path>,
        verbose: bool,
        demo: bool,
    ) -> Result<Self> {
        let mut config = Self::load(project_dir, explicit)?;
        config.verbose = verbose;
        config.demo = demo;
        Ok(config)
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.toml.backend
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.toml.pipeline
    }

    /// Log filter (CLI → env → file → default).
    pub fn log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.toml.logging.level
        }
    }

    pub fn log_format(&self) -> LogFormat {
        self.toml.logging.format
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
