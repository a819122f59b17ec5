//! Appxinst - install Windows app packages from the command line
//!
//! Appxinst reads the manifest embedded in an `.appx` or `.appxbundle`
//! file, finds the framework packages it depends on next to it, checks
//! whether the package is already installed for the current user and then
//! asks the platform package manager to install, upgrade or remove it.
//!
//! # Quick Start
//!
//! ```bash
//! # Install, or choose what to do if already installed
//! appxinst App.appxbundle
//!
//! # Upgrade without prompting
//! appxinst install App.appx --action upgrade
//!
//! # Show the manifest and its dependencies
//! appxinst info App.appx
//! appxinst deps App.appx --deps-dir Dependencies/x64
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod installer;
pub mod models;
pub mod parsers;
pub mod resolver;

// Re-export commonly used types
pub use error::{AppxError, Result};
pub use models::{AppxManifest, Architecture, InstalledPackage, PackageDependency, PackageVersion};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Read the manifest of a package file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// let manifest = appxinst::read_manifest(Path::new("App.appxbundle"))?;
/// println!("{} {}", manifest.name, manifest.version);
/// # Ok::<(), appxinst::AppxError>(())
/// ```
pub fn read_manifest(path: &std::path::Path) -> Result<AppxManifest> {
    parsers::AppxReader::open(path)?.read_manifest()
}

/// Find the framework package files a package needs
///
/// Only dependencies present as sibling package files are returned; a
/// dependency that is missing on disk is an error.
pub fn local_dependencies(path: &std::path::Path) -> Result<Vec<std::path::PathBuf>> {
    let manifest = read_manifest(path)?;
    let resolver = resolver::DependencyResolver::scan(&manifest.package_path, &[])?;

    manifest
        .dependencies
        .iter()
        .map(|dep| {
            resolver
                .get(&dep.name)
                .map(|framework| framework.package_path.clone())
                .ok_or_else(|| AppxError::MissingDependency(dep.name.clone()))
        })
        .collect()
}
