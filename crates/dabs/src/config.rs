//! Configuration loading and types

use std::path::{Path, PathBuf};

use dabs_pkg::CollectorConfig;
use dabs_render::OutputConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "DEPENDENCY_ABSTRACTOR_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Collector settings
    #[serde(default)]
    pub collect: CollectorConfig,
    /// Renderer settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            collect: CollectorConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("cannot read {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Load the explicit file, else the first existing default path, else defaults
    ///
    /// # Errors
    /// Returns error if a chosen file cannot be read or parsed
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(&PathBuf::from(path));
        }

        let paths = [
            Some(PathBuf::from("dependency-abstractor.toml")),
            dirs::config_dir().map(|p| p.join("dependency-abstractor/config.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.is_file() {
                return Self::load(&path);
            }
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.output.bar_width, 15);
        assert_eq!(config.collect.timeout_secs, 300);
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            log_level = "warn"

            [output]
            group_cut_off = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.output.group_cut_off, 3);
        assert_eq!(config.output.details_bar_width, 10);
        assert_eq!(config.collect.flatpak_system_dir, PathBuf::from("/var/lib/flatpak"));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[collect]\ntimeout_secs = 5").unwrap();

        let config = Config::load_default(Some(file.path())).unwrap();
        assert_eq!(config.collect.timeout_secs, 5);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = [").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(Path::new("/nonexistent/dependency-abstractor.toml")).is_err());
    }
}
