//! Type definitions for package collection

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Package manager type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManagerType {
    /// APT (Debian/Ubuntu)
    Apt,
    /// DNF (Fedora/RHEL)
    Dnf,
    /// Flatpak
    Flatpak,
}

impl PackageManagerType {
    /// Distribution id expected in os-release for native package managers
    #[must_use]
    pub fn distro_family(self) -> Option<&'static str> {
        match self {
            PackageManagerType::Apt => Some("debian"),
            PackageManagerType::Dnf => Some("fedora"),
            PackageManagerType::Flatpak => None,
        }
    }
}

impl std::fmt::Display for PackageManagerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageManagerType::Apt => write!(f, "apt"),
            PackageManagerType::Dnf => write!(f, "dnf"),
            PackageManagerType::Flatpak => write!(f, "flatpak"),
        }
    }
}

/// Collector settings, read from the `[collect]` table of the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Timeout for each query command, in seconds
    pub timeout_secs: u64,
    /// APT history log; rotated siblings are read as well
    pub apt_history: PathBuf,
    /// Per-user Flatpak installation (defaults to `~/.local/share/flatpak`)
    pub flatpak_user_dir: Option<PathBuf>,
    /// System-wide Flatpak installation
    pub flatpak_system_dir: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            apt_history: PathBuf::from("/var/log/apt/history.log"),
            flatpak_user_dir: None,
            flatpak_system_dir: PathBuf::from("/var/lib/flatpak"),
        }
    }
}

impl CollectorConfig {
    /// Query command timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolved per-user Flatpak installation directory
    #[must_use]
    pub fn flatpak_user_dir(&self) -> PathBuf {
        self.flatpak_user_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_default()
                .join(".local/share/flatpak")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distro_family() {
        assert_eq!(PackageManagerType::Apt.distro_family(), Some("debian"));
        assert_eq!(PackageManagerType::Dnf.distro_family(), Some("fedora"));
        assert_eq!(PackageManagerType::Flatpak.distro_family(), None);
    }

    #[test]
    fn test_config_defaults_from_partial_toml() {
        let config: CollectorConfig = toml::from_str("timeout_secs = 10").unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.flatpak_system_dir, PathBuf::from("/var/lib/flatpak"));
    }
}
