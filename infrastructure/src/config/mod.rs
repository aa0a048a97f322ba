//! Raw TOML configuration data types and loader
//!
//! [`FileConfig`] mirrors the exact structure of the TOML config file;
//! [`ConfigLoader`] merges defaults, an optional `tribunal.toml` in the
//! working directory, an explicit path, and `TRIBUNAL_`-prefixed
//! environment variables.

mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tribunal_domain::RaterId;

/// Problems detected when validating a loaded configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("gateway.deployment must not be empty")]
    EmptyDeployment,

    #[error("gateway endpoint missing: set gateway.base_url or gateway.resource")]
    MissingEndpoint,

    #[error("grading.judge_timeout_seconds must be greater than zero")]
    ZeroJudgeTimeout,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// LLM gateway settings
    pub gateway: FileGatewayConfig,
    /// Grading pipeline settings
    pub grading: FileGradingConfig,
    /// Rubric and calibration file locations
    pub resources: FileResourcesConfig,
}

impl FileConfig {
    /// Validate the loaded configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.gateway.deployment.trim().is_empty() {
            return Err(ConfigValidationError::EmptyDeployment);
        }
        if self.gateway.endpoint().is_none() {
            return Err(ConfigValidationError::MissingEndpoint);
        }
        if self.grading.judge_timeout_seconds == 0 {
            return Err(ConfigValidationError::ZeroJudgeTimeout);
        }
        Ok(())
    }
}

/// `[gateway]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    /// Azure resource name; expands to the standard Responses API endpoint
    pub resource: Option<String>,
    /// Full endpoint override (takes priority over `resource`)
    pub base_url: Option<String>,
    /// Model deployment name
    pub deployment: String,
    /// Environment variable holding the API key (never the key itself)
    pub api_key_env: String,
    /// Outer HTTP timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            resource: None,
            base_url: None,
            deployment: "gpt-5.1-codex-mini".to_string(),
            api_key_env: "AZURE_OPENAI_API_KEY".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl FileGatewayConfig {
    /// Resolve the Responses API base URL
    pub fn endpoint(&self) -> Option<String> {
        if let Some(base_url) = &self.base_url {
            if !base_url.trim().is_empty() {
                return Some(base_url.clone());
            }
        }
        self.resource
            .as_ref()
            .filter(|r| !r.trim().is_empty())
            .map(|r| format!("https://{r}.openai.azure.com/openai/v1"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// `[grading]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGradingConfig {
    /// Per-judge deadline in seconds
    pub judge_timeout_seconds: u64,
}

impl Default for FileGradingConfig {
    fn default() -> Self {
        Self {
            judge_timeout_seconds: 60,
        }
    }
}

impl FileGradingConfig {
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_seconds)
    }
}

/// `[resources]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResourcesConfig {
    /// Shared rubric text file
    pub rubric_path: PathBuf,
    /// Per-rater few-shot calibration example files
    pub calibration: FileCalibrationPaths,
}

impl Default for FileResourcesConfig {
    fn default() -> Self {
        Self {
            rubric_path: PathBuf::from("resources/rubric.txt"),
            calibration: FileCalibrationPaths::default(),
        }
    }
}

/// Calibration example file per judge persona
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCalibrationPaths {
    pub rater_a: PathBuf,
    pub rater_b: PathBuf,
    pub rater_c: PathBuf,
}

impl Default for FileCalibrationPaths {
    fn default() -> Self {
        Self {
            rater_a: PathBuf::from("resources/calibration/rater_a.md"),
            rater_b: PathBuf::from("resources/calibration/rater_b.md"),
            rater_c: PathBuf::from("resources/calibration/rater_c.md"),
        }
    }
}

impl FileCalibrationPaths {
    pub fn for_rater(&self, rater: RaterId) -> &PathBuf {
        match rater {
            RaterId::RaterA => &self.rater_a,
            RaterId::RaterB => &self.rater_b,
            RaterId::RaterC => &self.rater_c,
        }
    }
}
