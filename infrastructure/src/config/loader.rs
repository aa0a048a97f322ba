//! Configuration file loader with multi-source merging

use super::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

/// Name of the project-level config file looked up in the working directory
const PROJECT_CONFIG_FILE: &str = "tribunal.toml";

/// Prefix for environment variable overrides
///
/// Nested keys use a double underscore separator, e.g.
/// `TRIBUNAL_GATEWAY__DEPLOYMENT=codex-mini-prod`.
const ENV_PREFIX: &str = "TRIBUNAL_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `TRIBUNAL_`-prefixed environment variables
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./tribunal.toml`
    /// 4. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        let project_path = PathBuf::from(PROJECT_CONFIG_FILE);
        if project_path.exists() {
            figment = figment.merge(Toml::file(&project_path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Load only default configuration
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.gateway.deployment, "gpt-5.1-codex-mini");
        assert!(config.gateway.base_url.is_none());
        assert_eq!(config.grading.judge_timeout_seconds, 60);
    }

    #[test]
    fn test_explicit_path_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[gateway]\nresource = \"merged\"\ntimeout_seconds = 30"
        )
        .unwrap();

        let config = ConfigLoader::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.gateway.resource.as_deref(), Some("merged"));
        assert_eq!(config.gateway.timeout_seconds, 30);
        // Untouched fields keep their defaults
        assert_eq!(config.gateway.deployment, "gpt-5.1-codex-mini");
    }
}
