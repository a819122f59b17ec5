//! Framework dependency resolution
//!
//! Dependencies are satisfied by framework packages sitting next to the
//! package being installed, or by packages the user already has.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::deploy::PackageBackend;
use crate::error::{AppxError, Result};
use crate::models::AppxManifest;
use crate::parsers::AppxReader;

/// Where a dependency will come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySource {
    /// A framework package file found on disk
    Local(PathBuf),
    /// Already installed for the current user
    Installed,
}

/// Result of resolving a manifest's dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDependencies {
    /// Dependency name and where it resolved from, in manifest order
    pub entries: Vec<(String, DependencySource)>,
}

impl ResolvedDependencies {
    /// Package files to hand to the deployment call
    pub fn package_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter_map(|(_, source)| match source {
                DependencySource::Local(path) => Some(path.clone()),
                DependencySource::Installed => None,
            })
            .collect()
    }
}

/// Index of framework packages available on disk
#[derive(Debug, Default)]
pub struct DependencyResolver {
    frameworks: HashMap<String, AppxManifest>,
}

impl DependencyResolver {
    /// Scan the package's directory and any extra directories for framework packages
    ///
    /// Relative extra directories are taken relative to the package's directory.
    pub fn scan(package_path: &Path, extra_dirs: &[PathBuf]) -> Result<Self> {
        let base = package_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut dirs = vec![base.to_path_buf()];
        dirs.extend(extra_dirs.iter().map(|dir| base.join(dir)));

        let mut resolver = Self::default();
        for dir in &dirs {
            resolver.scan_dir(dir)?;
        }

        debug!("Found {} framework package(s)", resolver.frameworks.len());
        Ok(resolver)
    }

    fn scan_dir(&mut self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            warn!("Dependency directory {} does not exist", dir.display());
            return Ok(());
        }

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_package_file(entry.path()) {
                continue;
            }

            let manifest = match AppxReader::open(entry.path()).and_then(|mut r| r.read_manifest()) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            if manifest.is_framework && !self.frameworks.contains_key(&manifest.name) {
                debug!(
                    "Framework {} {} at {}",
                    manifest.name,
                    manifest.version,
                    entry.path().display()
                );
                self.frameworks.insert(manifest.name.clone(), manifest);
            }
        }

        Ok(())
    }

    /// Framework package found on disk for a dependency name
    pub fn get(&self, name: &str) -> Option<&AppxManifest> {
        self.frameworks.get(name)
    }

    /// Number of framework packages found
    pub fn len(&self) -> usize {
        self.frameworks.len()
    }

    /// Whether no framework package was found
    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }

    /// Resolve every dependency of `manifest`, in order
    ///
    /// Fails with [`AppxError::MissingDependency`] on the first dependency
    /// that is neither on disk nor installed.
    pub fn resolve<B: PackageBackend>(&self, manifest: &AppxManifest, backend: &B) -> Result<ResolvedDependencies> {
        let mut resolved = ResolvedDependencies::default();

        for dep in &manifest.dependencies {
            if let Some(framework) = self.get(&dep.name) {
                if let Some(min) = dep.min_version {
                    if framework.version < min {
                        warn!(
                            "{} {} is older than the required {}",
                            framework.name, framework.version, min
                        );
                    }
                }
                resolved
                    .entries
                    .push((dep.name.clone(), DependencySource::Local(framework.package_path.clone())));
                continue;
            }

            if let Some(publisher) = &dep.publisher {
                let installed = backend.find_packages(&dep.name, publisher)?;
                if installed
                    .iter()
                    .any(|p| dep.min_version.map_or(true, |min| p.version >= min))
                {
                    info!("Dependency {} is already installed", dep.name);
                    resolved.entries.push((dep.name.clone(), DependencySource::Installed));
                    continue;
                }
            }

            return Err(AppxError::MissingDependency(dep.name.clone()));
        }

        Ok(resolved)
    }
}

/// Package files end in `appx`, any case
fn is_package_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with("appx"))
        .unwrap_or(false)
}
