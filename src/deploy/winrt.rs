//! Deployment through `Windows.Management.Deployment.PackageManager`

use std::path::{Path, PathBuf};

use tracing::debug;
use windows::core::HSTRING;
use windows::ApplicationModel::PackageVersion as WinPackageVersion;
use windows::Foundation::Collections::IIterable;
use windows::Foundation::{AsyncStatus, IAsyncOperationWithProgress, Uri};
use windows::Management::Deployment::{
    DeploymentOptions, DeploymentProgress, DeploymentResult, PackageManager, RemovalOptions,
};

use crate::error::{AppxError, Result};
use crate::models::{InstalledPackage, PackageVersion};

use super::{file_uri, DeployOptions, DeploymentOutcome, PackageBackend, RemoveOptions};

type DeploymentOperation = IAsyncOperationWithProgress<DeploymentResult, DeploymentProgress>;

/// Backend over the WinRT package manager
pub struct WindowsBackend {
    manager: PackageManager,
}

impl WindowsBackend {
    /// Create the platform package manager
    pub fn new() -> Result<Self> {
        Ok(Self {
            manager: PackageManager::new()?,
        })
    }
}

fn to_uri(path: &Path) -> Result<Uri> {
    let uri = file_uri(path)?;
    debug!("Package URI: {}", uri);
    Ok(Uri::CreateUri(&HSTRING::from(uri))?)
}

fn dependency_uris(paths: &[PathBuf]) -> Result<Option<IIterable<Uri>>> {
    if paths.is_empty() {
        return Ok(None);
    }

    let uris = paths
        .iter()
        .map(|path| to_uri(path).map(Some))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(IIterable::<Uri>::try_from(uris)?))
}

fn deployment_options(options: DeployOptions) -> DeploymentOptions {
    if options.force_app_shutdown {
        DeploymentOptions::ForceApplicationShutdown
    } else {
        DeploymentOptions::None
    }
}

/// Wait for the operation to finish and translate its status
///
/// `get()` blocks the calling thread until the operation completes, so it
/// runs on tokio's blocking pool.
async fn complete(operation: DeploymentOperation) -> Result<DeploymentOutcome> {
    let pending = operation.clone();
    let result = tokio::task::spawn_blocking(move || pending.get())
        .await
        .map_err(|e| AppxError::deployment(format!("Deployment wait failed: {}", e)))?;

    let outcome = match operation.Status()? {
        AsyncStatus::Completed => DeploymentOutcome::Completed,
        AsyncStatus::Canceled => DeploymentOutcome::Canceled,
        AsyncStatus::Error => {
            let error_code = operation.ErrorCode()?.0;
            let (extended_error_code, error_text) = match result {
                Ok(result) => (
                    result.ExtendedErrorCode()?.0,
                    result.ErrorText()?.to_string_lossy(),
                ),
                Err(e) => (e.code().0, e.message().to_string()),
            };
            DeploymentOutcome::Failed {
                error_code,
                extended_error_code,
                error_text,
            }
        }
        _ => DeploymentOutcome::Unknown,
    };

    Ok(outcome)
}

fn version_from(version: WinPackageVersion) -> PackageVersion {
    PackageVersion::new(version.Major, version.Minor, version.Build, version.Revision)
}

impl PackageBackend for WindowsBackend {
    fn find_packages(&self, name: &str, publisher: &str) -> Result<Vec<InstalledPackage>> {
        // An empty SID means the current user
        let packages = self.manager.FindPackagesByUserSecurityIdNamePublisher(
            &HSTRING::new(),
            &HSTRING::from(name),
            &HSTRING::from(publisher),
        )?;

        let mut found = Vec::new();
        for package in packages {
            let id = package.Id()?;
            let installed_location = package
                .InstalledLocation()
                .and_then(|folder| folder.Path())
                .ok()
                .map(|path| PathBuf::from(path.to_string_lossy()));

            found.push(InstalledPackage {
                name: id.Name()?.to_string_lossy(),
                full_name: id.FullName()?.to_string_lossy(),
                version: version_from(id.Version()?),
                publisher: id.Publisher()?.to_string_lossy(),
                publisher_id: id.PublisherId()?.to_string_lossy(),
                installed_location,
                is_framework: package.IsFramework()?,
            });
        }

        Ok(found)
    }

    async fn add_package(
        &self,
        package: &Path,
        dependencies: &[PathBuf],
        options: DeployOptions,
    ) -> Result<DeploymentOutcome> {
        let uri = to_uri(package)?;
        let deps = dependency_uris(dependencies)?;
        let operation = self
            .manager
            .AddPackageAsync(&uri, deps.as_ref(), deployment_options(options))?;
        complete(operation).await
    }

    async fn update_package(
        &self,
        package: &Path,
        dependencies: &[PathBuf],
        options: DeployOptions,
    ) -> Result<DeploymentOutcome> {
        let uri = to_uri(package)?;
        let deps = dependency_uris(dependencies)?;
        let operation = self
            .manager
            .UpdatePackageAsync(&uri, deps.as_ref(), deployment_options(options))?;
        complete(operation).await
    }

    async fn remove_package(&self, full_name: &str, options: RemoveOptions) -> Result<DeploymentOutcome> {
        let removal = if options.preserve_data {
            RemovalOptions::PreserveApplicationData
        } else {
            RemovalOptions::None
        };
        let operation = self
            .manager
            .RemovePackageWithOptionsAsync(&HSTRING::from(full_name), removal)?;
        complete(operation).await
    }
}
