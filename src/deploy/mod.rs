//! Package deployment through the platform package manager

#[cfg(not(windows))]
mod unsupported;
#[cfg(windows)]
mod winrt;

#[cfg(not(windows))]
pub use unsupported::UnsupportedBackend as PlatformBackend;
#[cfg(windows)]
pub use winrt::WindowsBackend as PlatformBackend;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::InstalledPackage;

/// Final state of a deployment operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentOutcome {
    /// The operation finished successfully
    Completed,
    /// The operation was canceled
    Canceled,
    /// The platform reported an error
    Failed {
        /// HRESULT of the operation
        error_code: i32,
        /// Extended HRESULT from the deployment result
        extended_error_code: i32,
        /// Human readable error text
        error_text: String,
    },
    /// The operation ended in a state we do not recognize
    Unknown,
}

impl DeploymentOutcome {
    /// Whether the operation counts as successful
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

impl fmt::Display for DeploymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Canceled => write!(f, "canceled"),
            Self::Failed {
                error_code,
                extended_error_code,
                error_text,
            } => write!(
                f,
                "failed ({:#010x}, extended {:#010x}): {}",
                error_code, extended_error_code, error_text
            ),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Options for adding or updating a package
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Shut down running instances of the package first
    pub force_app_shutdown: bool,
}

/// Options for removing a package
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Keep the package's application data
    pub preserve_data: bool,
}

/// Access to the platform package manager
///
/// Every deployment method drives exactly one platform operation and
/// resolves once that operation has completed.
#[allow(async_fn_in_trait)]
pub trait PackageBackend {
    /// Find packages installed for the current user by name and publisher
    fn find_packages(&self, name: &str, publisher: &str) -> Result<Vec<InstalledPackage>>;

    /// Install a package along with its framework dependencies
    async fn add_package(
        &self,
        package: &Path,
        dependencies: &[PathBuf],
        options: DeployOptions,
    ) -> Result<DeploymentOutcome>;

    /// Update an installed package to the given package file
    async fn update_package(
        &self,
        package: &Path,
        dependencies: &[PathBuf],
        options: DeployOptions,
    ) -> Result<DeploymentOutcome>;

    /// Remove an installed package by its full name
    async fn remove_package(&self, full_name: &str, options: RemoveOptions) -> Result<DeploymentOutcome>;
}

/// Build a `file:` URI for a package path
pub fn file_uri(path: &Path) -> Result<String> {
    let absolute = std::fs::canonicalize(path)?;
    Ok(path_to_file_uri(&absolute.to_string_lossy()))
}

/// Convert an absolute path string to a `file:` URI
pub fn path_to_file_uri(path: &str) -> String {
    if let Some(unc) = path.strip_prefix(r"\\?\UNC\") {
        return format!("file://{}", unc.replace('\\', "/"));
    }

    let path = path.strip_prefix(r"\\?\").unwrap_or(path);
    if let Some(unc) = path.strip_prefix(r"\\") {
        return format!("file://{}", unc.replace('\\', "/"));
    }

    let path = path.replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}
