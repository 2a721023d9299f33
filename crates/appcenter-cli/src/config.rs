//! Configuration file support for the CLI.
//!
//! Project settings live in an `appcenter.toml` file so uploads don't need a
//! wall of flags on every invocation. CLI flags always override file values.
//!
//! ## Configuration File Location
//!
//! The configuration file is searched for in the following order:
//! 1. Current working directory (`./appcenter.toml`)
//! 2. Parent directories (up to the repository root or filesystem root)
//!
//! ## Example Configuration
//!
//! ```toml
//! [app]
//! owner = "my-org"
//! name = "my-app-android"
//!
//! [build]
//! artifact = "app/build/outputs/apk/release/app-release.apk"
//! mapping_file = "app/build/outputs/mapping/release/mapping.txt"
//! number = 42
//! version = "1.2.3"
//!
//! [distribute]
//! groups = ["Beta Testers"]
//! notify_testers = true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "appcenter.toml";

/// Root configuration structure for `appcenter.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppcenterConfig {
    /// App identity on App Center.
    pub app: AppSection,

    /// Build artifact settings.
    pub build: BuildSection,

    /// Distribution settings.
    pub distribute: DistributeSection,

    /// Upload behavior.
    pub upload: UploadSection,
}

/// App identity on App Center.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// Owner (organization or user) name.
    pub owner: Option<String>,

    /// Application name.
    pub name: Option<String>,
}

/// Build artifact settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Path to the build artifact (APK/AAB/IPA).
    pub artifact: Option<PathBuf>,

    /// Optional ProGuard/R8 mapping file.
    pub mapping_file: Option<PathBuf>,

    /// Numeric build number (Android `versionCode`).
    pub number: Option<u64>,

    /// Build version string (Android `versionName`).
    pub version: Option<String>,

    /// Optional flavor label, used in log output.
    pub flavor: Option<String>,
}

/// Distribution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributeSection {
    /// Distribution group names. An empty list creates the release without
    /// handing it to anyone.
    pub groups: Vec<String>,

    /// Whether testers are notified on distribution.
    pub notify_testers: bool,

    /// Inline release notes.
    pub release_notes: Option<String>,

    /// Release notes read from a file. The inline value wins when both are
    /// set.
    pub release_notes_file: Option<PathBuf>,
}

/// Upload behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    /// Additional attempts per HTTP call on transport failure.
    pub max_retries: u32,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            max_retries: appcenter_dist::DEFAULT_MAX_RETRIES,
        }
    }
}

impl AppcenterConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AppcenterConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration starting from the specified
    /// directory, walking up until a config file is found, a `.git`
    /// directory marks the repository root, or the filesystem root is
    /// reached.
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Attempts to find and load configuration from the current directory or
    /// any parent directory.
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Generates a starter configuration file as a commented TOML string.
    pub fn generate_starter_toml() -> String {
        r#"# appcenter-dist configuration file
# CLI flags override these settings when provided.

[app]
# App Center owner (organization or user) name
owner = "my-org"

# App Center application name
name = "my-app-android"

[build]
# Path to the build artifact (APK/AAB/IPA)
artifact = "app/build/outputs/apk/release/app-release.apk"

# ProGuard/R8 mapping file, uploaded after a successful release (optional)
# mapping_file = "app/build/outputs/mapping/release/mapping.txt"

# Numeric build number (Android versionCode)
number = 1

# Build version string (Android versionName)
version = "1.0.0"

# Flavor label used in log output (optional)
# flavor = "production"

[distribute]
# Distribution group names; empty list creates the release without
# distributing it
groups = ["Collaborators"]

# Notify testers on distribution
notify_testers = false

# Release notes, inline or from a file (inline wins when both are set)
# release_notes = "Bug fixes"
# release_notes_file = "CHANGELOG.md"

[upload]
# Additional attempts per HTTP call on transport failure
max_retries = 3

# The API token is NOT read from this file. Set APPCENTER_API_TOKEN in the
# environment or a .env file instead.
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = AppcenterConfig::default();
        assert!(config.app.owner.is_none());
        assert!(config.build.artifact.is_none());
        assert!(config.distribute.groups.is_empty());
        assert!(!config.distribute.notify_testers);
        assert_eq!(
            config.upload.max_retries,
            appcenter_dist::DEFAULT_MAX_RETRIES
        );
    }

    #[test]
    fn load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(
            &config_path,
            r#"
[app]
owner = "acme"
name = "wallet-android"

[build]
artifact = "out/app-release.apk"
mapping_file = "out/mapping.txt"
number = 7
version = "2.1.0"
flavor = "production"

[distribute]
groups = ["Beta Testers", "QA"]
notify_testers = true
release_notes = "Fixes"

[upload]
max_retries = 5
"#,
        )
        .unwrap();

        let config = AppcenterConfig::load_from_file(&config_path).unwrap();

        assert_eq!(config.app.owner.as_deref(), Some("acme"));
        assert_eq!(config.app.name.as_deref(), Some("wallet-android"));
        assert_eq!(
            config.build.artifact,
            Some(PathBuf::from("out/app-release.apk"))
        );
        assert_eq!(config.build.number, Some(7));
        assert_eq!(config.build.version.as_deref(), Some("2.1.0"));
        assert_eq!(config.build.flavor.as_deref(), Some("production"));
        assert_eq!(config.distribute.groups, vec!["Beta Testers", "QA"]);
        assert!(config.distribute.notify_testers);
        assert_eq!(config.distribute.release_notes.as_deref(), Some("Fixes"));
        assert_eq!(config.upload.max_retries, 5);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&config_path, "[app]\nowner = \"acme\"\n").unwrap();

        let config = AppcenterConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.app.owner.as_deref(), Some("acme"));
        assert!(config.app.name.is_none());
        assert_eq!(
            config.upload.max_retries,
            appcenter_dist::DEFAULT_MAX_RETRIES
        );
    }

    #[test]
    fn discover_finds_config_in_start_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[app]\nowner = \"discovered\"\n").unwrap();

        let (config, path) = AppcenterConfig::discover_from(temp_dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(config.app.owner.as_deref(), Some("discovered"));
        assert_eq!(path, config_path);
    }

    #[test]
    fn discover_walks_up_to_parent() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[app]\nowner = \"parent\"\n",
        )
        .unwrap();
        let nested = temp_dir.path().join("app/src");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, _) = AppcenterConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.app.owner.as_deref(), Some("parent"));
    }

    #[test]
    fn discover_stops_at_repository_root() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let result = AppcenterConfig::discover_from(temp_dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn starter_toml_parses_back() {
        let toml_text = AppcenterConfig::generate_starter_toml();
        let config: AppcenterConfig = toml::from_str(&toml_text).unwrap();
        assert_eq!(config.app.owner.as_deref(), Some("my-org"));
        assert_eq!(config.distribute.groups, vec!["Collaborators"]);
        assert_eq!(config.upload.max_retries, 3);
    }
}
