//! Package manifest representation

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Architecture, PackageVersion};

/// A `<PackageDependency>` declared by a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    /// Identity name of the required package
    pub name: String,
    /// Publisher of the required package
    pub publisher: Option<String>,
    /// Lowest acceptable version
    pub min_version: Option<PackageVersion>,
}

impl PackageDependency {
    /// Create a dependency with just a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publisher: None,
            min_version: None,
        }
    }
}

/// Identity and dependency information read from `AppxManifest.xml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppxManifest {
    /// Identity name
    pub name: String,
    /// Publisher distinguished name
    pub publisher: String,
    /// Package version
    pub version: PackageVersion,
    /// Target architecture, when declared
    pub architecture: Option<Architecture>,
    /// Friendly name from the properties block
    pub display_name: Option<String>,
    /// Friendly publisher name from the properties block
    pub publisher_display_name: Option<String>,
    /// Whether this is a framework package
    pub is_framework: bool,
    /// Device families the package targets
    pub target_device_families: Vec<String>,
    /// Package file this manifest was read from
    pub package_path: PathBuf,
    /// Framework packages this package needs
    pub dependencies: Vec<PackageDependency>,
}

impl AppxManifest {
    /// Create a manifest with just an identity
    pub fn new(
        name: impl Into<String>,
        publisher: impl Into<String>,
        version: PackageVersion,
        package_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            publisher: publisher.into(),
            version,
            architecture: None,
            display_name: None,
            publisher_display_name: None,
            is_framework: false,
            target_device_families: Vec::new(),
            package_path: package_path.into(),
            dependencies: Vec::new(),
        }
    }

    /// Names of the declared dependencies, in manifest order
    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies.iter().map(|d| d.name.as_str()).collect()
    }

    /// Display name if present, otherwise the identity name
    pub fn friendly_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
