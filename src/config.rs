//! Configuration management for appxinst

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::deploy::{DeployOptions, RemoveOptions};
use crate::error::{AppxError, Result};
use crate::installer::Action;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Install settings
    #[serde(default)]
    pub install: InstallConfig,

    /// Removal settings
    #[serde(default)]
    pub remove: RemoveConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// General configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Action taken without prompting when `--yes` is given
    pub default_action: Action,
    /// Wait for a key press after a failure
    pub pause_on_error: bool,
}

/// Install configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Shut down running instances of the package before deploying
    pub force_app_shutdown: bool,
    /// Extra directories searched for framework packages
    pub dependency_dirs: Vec<PathBuf>,
}

/// Removal configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveConfig {
    /// Keep application data when removing
    pub preserve_data: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable colored output
    pub color: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_action: Action::Upgrade,
            pause_on_error: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            color: true,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .map_err(|_| AppxError::Config(format!("Invalid boolean for {}", key)))
}

impl Config {
    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppxError::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("appxinst").join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a file, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| AppxError::Config(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(path: &Path) -> Result<()> {
        Self::default().save_to(path)
    }

    /// Initialize configuration file
    pub fn init(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(AppxError::Config(
                "Configuration file already exists. Use --force to overwrite.".into()
            ));
        }

        Self::default().save_to(path)
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "general.default_action" => Some(self.general.default_action.to_string()),
            "general.pause_on_error" => Some(self.general.pause_on_error.to_string()),

            "install.force_app_shutdown" => Some(self.install.force_app_shutdown.to_string()),
            "install.dependency_dirs" => Some(
                self.install
                    .dependency_dirs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(";"),
            ),

            "remove.preserve_data" => Some(self.remove.preserve_data.to_string()),

            "logging.level" => Some(self.logging.level.clone()),
            "logging.color" => Some(self.logging.color.to_string()),

            _ => None,
        }
    }

    /// Set a configuration value by key
    ///
    /// `install.dependency_dirs` takes a `;` separated list.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "general.default_action" => {
                self.general.default_action = value
                    .parse()
                    .map_err(|_| AppxError::Config(format!("Invalid action: {}", value)))?;
            }
            "general.pause_on_error" => {
                self.general.pause_on_error = parse_bool(key, value)?;
            }

            "install.force_app_shutdown" => {
                self.install.force_app_shutdown = parse_bool(key, value)?;
            }
            "install.dependency_dirs" => {
                self.install.dependency_dirs = value
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect();
            }

            "remove.preserve_data" => {
                self.remove.preserve_data = parse_bool(key, value)?;
            }

            "logging.level" => {
                self.logging.level = value.to_string();
            }
            "logging.color" => {
                self.logging.color = parse_bool(key, value)?;
            }

            _ => {
                return Err(AppxError::Config(format!("Unknown configuration key: {}", key)));
            }
        }

        Ok(())
    }

    /// Deployment options for add and update
    pub fn deploy_options(&self) -> DeployOptions {
        DeployOptions {
            force_app_shutdown: self.install.force_app_shutdown,
        }
    }

    /// Options for removal
    pub fn remove_options(&self) -> RemoveOptions {
        RemoveOptions {
            preserve_data: self.remove.preserve_data,
        }
    }
}
