//! Error types for appxinst

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for appxinst operations
#[derive(Error, Debug)]
pub enum AppxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Failed to read package archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to parse manifest XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("No AppxManifest.xml found in {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid package version: {0}")]
    InvalidVersion(String),

    #[error("Invalid architecture: {0}")]
    InvalidArchitecture(String),

    #[error("Missing dependency \"{0}\"")]
    MissingDependency(String),

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Package deployment is only available on Windows")]
    UnsupportedPlatform,

    #[error("Deployment error: {0}")]
    Deployment(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for appxinst operations
pub type Result<T> = std::result::Result<T, AppxError>;

impl AppxError {
    /// Create a new invalid manifest error
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::InvalidManifest(msg.into())
    }

    /// Create a new deployment error
    pub fn deployment(msg: impl Into<String>) -> Self {
        Self::Deployment(msg.into())
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a manifest not found error
    pub fn manifest_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ManifestNotFound { path: path.into() }
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for AppxError {
    fn from(err: windows::core::Error) -> Self {
        Self::Deployment(format!("{:#010x}: {}", err.code().0, err.message()))
    }
}
