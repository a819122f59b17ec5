//! Backend used where the platform package manager does not exist

use std::path::{Path, PathBuf};

use crate::error::{AppxError, Result};
use crate::models::InstalledPackage;

use super::{DeployOptions, DeploymentOutcome, PackageBackend, RemoveOptions};

/// Backend that rejects every operation
#[derive(Debug)]
pub struct UnsupportedBackend {
    _private: (),
}

impl UnsupportedBackend {
    /// Always fails: package deployment needs Windows
    pub fn new() -> Result<Self> {
        Err(AppxError::UnsupportedPlatform)
    }
}

impl PackageBackend for UnsupportedBackend {
    fn find_packages(&self, _name: &str, _publisher: &str) -> Result<Vec<InstalledPackage>> {
        Err(AppxError::UnsupportedPlatform)
    }

    async fn add_package(
        &self,
        _package: &Path,
        _dependencies: &[PathBuf],
        _options: DeployOptions,
    ) -> Result<DeploymentOutcome> {
        Err(AppxError::UnsupportedPlatform)
    }

    async fn update_package(
        &self,
        _package: &Path,
        _dependencies: &[PathBuf],
        _options: DeployOptions,
    ) -> Result<DeploymentOutcome> {
        Err(AppxError::UnsupportedPlatform)
    }

    async fn remove_package(&self, _full_name: &str, _options: RemoveOptions) -> Result<DeploymentOutcome> {
        Err(AppxError::UnsupportedPlatform)
    }
}
