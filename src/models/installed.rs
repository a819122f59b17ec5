//! Installed package information reported by the platform

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::PackageVersion;

/// A package already registered for the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    /// Identity name
    pub name: String,
    /// Full package name (`Name_Version_Arch_ResourceId_PublisherId`)
    pub full_name: String,
    /// Installed version
    pub version: PackageVersion,
    /// Publisher distinguished name
    pub publisher: String,
    /// Hash of the publisher name
    pub publisher_id: String,
    /// Where the package is installed, if the platform reports it
    pub installed_location: Option<PathBuf>,
    /// Whether the package is a framework package
    pub is_framework: bool,
}

impl InstalledPackage {
    /// Render the details shown before asking what to do
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("Name: {}", self.name),
            format!("FullName: {}", self.full_name),
            format!("Version: {}", self.version),
            format!("Publisher: {}", self.publisher),
            format!("PublisherId: {}", self.publisher_id),
            format!(
                "Installed Location: {}",
                self.installed_location
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            format!("IsFramework: {}", self.is_framework),
        ]
    }
}
