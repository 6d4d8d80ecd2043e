//! Run configuration
//!
//! Resolves where to work and which password to use. Values come from CLI
//! flags (or their env vars), then the settings file, then built-in defaults.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::settings::Settings;

/// Password applied to every archive unless overridden.
pub const DEFAULT_PASSWORD: &str = "cosergirl.com";

/// Name of the working directory next to the executable.
pub const SOURCE_DIR_NAME: &str = "source";

/// Configuration for one extraction run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory tree to scan for archives
    pub root: PathBuf,

    /// Password handed to every backend
    pub password: Option<String>,

    /// Explicit 7z binary, searched for when unset
    pub seven_zip: Option<PathBuf>,

    /// Also treat `name.<ext>.001` as an archive
    pub split_volumes: bool,

    /// Where to write the JSON run report, if anywhere
    pub report: Option<PathBuf>,
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub password: Option<String>,
    pub seven_zip: Option<PathBuf>,
    pub split_volumes: bool,
    pub report: Option<PathBuf>,
}

impl RunConfig {
    /// Merge CLI overrides over the settings file over built-in defaults.
    pub fn resolve(overrides: Overrides, settings: &Settings) -> Result<Self> {
        let root = match overrides.root {
            Some(root) => root,
            None => default_root()?,
        };

        let password = overrides
            .password
            .or_else(|| settings.password.clone())
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

        let seven_zip = overrides
            .seven_zip
            .or_else(|| settings.seven_zip_path.as_ref().map(PathBuf::from));

        Ok(Self {
            root,
            password: Some(password).filter(|p| !p.is_empty()),
            seven_zip,
            split_volumes: overrides.split_volumes,
            report: overrides.report,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.exists() {
            return Err(ConfigError::RootNotFound(self.root.clone()));
        }

        if !self.root.is_dir() {
            return Err(ConfigError::RootNotDirectory(self.root.clone()));
        }

        Ok(())
    }
}

/// `source/` next to the running executable.
pub fn default_root() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("Failed to get executable path")?;
    let exe_dir = exe_path.parent().unwrap_or(Path::new("."));
    Ok(exe_dir.join(SOURCE_DIR_NAME))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Source directory not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Source path is not a directory: {0}")]
    RootNotDirectory(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::resolve(Overrides::default(), &Settings::default()).unwrap();
        assert_eq!(config.password.as_deref(), Some(DEFAULT_PASSWORD));
        assert!(config.root.ends_with(SOURCE_DIR_NAME));
        assert!(config.seven_zip.is_none());
        assert!(!config.split_volumes);
    }

    #[test]
    fn test_precedence() {
        let settings = Settings {
            password: Some("from-settings".into()),
            seven_zip_path: Some("/opt/7zz".into()),
        };

        let config = RunConfig::resolve(Overrides::default(), &settings).unwrap();
        assert_eq!(config.password.as_deref(), Some("from-settings"));
        assert_eq!(config.seven_zip, Some(PathBuf::from("/opt/7zz")));

        let overrides = Overrides {
            root: Some(PathBuf::from("/data")),
            password: Some("from-cli".into()),
            ..Default::default()
        };
        let config = RunConfig::resolve(overrides, &settings).unwrap();
        assert_eq!(config.password.as_deref(), Some("from-cli"));
        assert_eq!(config.root, PathBuf::from("/data"));
    }

    #[test]
    fn test_empty_password_means_none() {
        let overrides = Overrides {
            password: Some(String::new()),
            ..Default::default()
        };
        let config = RunConfig::resolve(overrides, &Settings::default()).unwrap();
        assert!(config.password.is_none());
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig::resolve(
            Overrides {
                root: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            &Settings::default(),
        )
        .unwrap();
        assert!(config.validate().is_ok());

        config.root = dir.path().join("missing");
        assert!(matches!(config.validate(), Err(ConfigError::RootNotFound(_))));

        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"").unwrap();
        config.root = file;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RootNotDirectory(_))
        ));
    }
}
