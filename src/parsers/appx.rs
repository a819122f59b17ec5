//! AppX package manifest reader
//!
//! .appx files are zip archives with an `AppxManifest.xml` at the root.
//! .appxbundle files are zip archives of per-architecture .appx packages:
//! - `<bundle stem>.appx`: main package, when the bundle follows that naming
//! - `AppxMetadata/AppxBundleManifest.xml`: index of the contained packages

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{AppxError, Result};
use crate::models::{AppxManifest, Architecture, PackageDependency, PackageVersion};

const MANIFEST_NAME: &str = "AppxManifest.xml";
const BUNDLE_MANIFEST_NAME: &str = "AppxMetadata/AppxBundleManifest.xml";

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct PackageXml {
    #[serde(rename = "Identity")]
    identity: Option<IdentityXml>,
    #[serde(rename = "Properties")]
    properties: Option<PropertiesXml>,
    #[serde(rename = "Dependencies")]
    dependencies: Option<DependenciesXml>,
}

#[derive(Debug, Deserialize)]
struct IdentityXml {
    #[serde(rename = "@Name")]
    name: Option<String>,
    #[serde(rename = "@Publisher")]
    publisher: Option<String>,
    #[serde(rename = "@Version")]
    version: Option<String>,
    #[serde(rename = "@ProcessorArchitecture")]
    processor_architecture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PropertiesXml {
    #[serde(rename = "DisplayName")]
    display_name: Option<String>,
    #[serde(rename = "PublisherDisplayName")]
    publisher_display_name: Option<String>,
    #[serde(rename = "Framework")]
    framework: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DependenciesXml {
    #[serde(rename = "PackageDependency", default)]
    packages: Vec<PackageDependencyXml>,
    #[serde(rename = "TargetDeviceFamily", default)]
    device_families: Vec<NamedXml>,
}

#[derive(Debug, Deserialize)]
struct PackageDependencyXml {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@Publisher")]
    publisher: Option<String>,
    #[serde(rename = "@MinVersion")]
    min_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedXml {
    #[serde(rename = "@Name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct BundleXml {
    #[serde(rename = "Packages")]
    packages: Option<BundlePackagesXml>,
}

#[derive(Debug, Deserialize)]
struct BundlePackagesXml {
    #[serde(rename = "Package", default)]
    packages: Vec<BundlePackageXml>,
}

#[derive(Debug, Deserialize)]
struct BundlePackageXml {
    #[serde(rename = "@Type")]
    kind: Option<String>,
    #[serde(rename = "@Architecture")]
    architecture: Option<String>,
    #[serde(rename = "@FileName")]
    file_name: String,
}

/// A package listed in a bundle manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Whether this is an application package (as opposed to a resource pack)
    pub is_application: bool,
    /// Declared architecture
    pub architecture: Option<Architecture>,
    /// File name of the package inside the bundle
    pub file_name: String,
}

/// Reader for .appx and .appxbundle files
pub struct AppxReader {
    /// Path to the package file
    path: PathBuf,
    /// Opened archive
    archive: ZipArchive<File>,
}

impl AppxReader {
    /// Open a package file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.is_file() {
            return Err(AppxError::file_not_found(&path));
        }

        let archive = ZipArchive::new(File::open(&path)?)?;
        Ok(Self { path, archive })
    }

    /// Path of the package file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the package manifest, looking inside bundles if needed
    pub fn read_manifest(&mut self) -> Result<AppxManifest> {
        let xml = self.manifest_xml()?;
        parse_manifest_xml(&xml, &self.path)
    }

    fn manifest_xml(&mut self) -> Result<String> {
        if let Some(xml) = read_entry_string(&mut self.archive, MANIFEST_NAME)? {
            return Ok(xml);
        }

        // Bundles named after their main package
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let inner_name = format!("{}.appx", stem);
        if let Some(xml) = nested_manifest(&mut self.archive, &inner_name)? {
            debug!("Read manifest from bundled package {}", inner_name);
            return Ok(xml);
        }

        if let Some(bundle_xml) = read_entry_string(&mut self.archive, BUNDLE_MANIFEST_NAME)? {
            let entries = parse_bundle_manifest_xml(&bundle_xml)?;
            if let Some(entry) = select_bundle_entry(&entries, Architecture::current()) {
                if let Some(xml) = nested_manifest(&mut self.archive, &entry.file_name)? {
                    debug!("Read manifest from bundled package {}", entry.file_name);
                    return Ok(xml);
                }
            }
        }

        Err(AppxError::manifest_not_found(&self.path))
    }
}

/// Find an entry by name, ignoring ASCII case
fn find_entry<R: Read + Seek>(archive: &ZipArchive<R>, name: &str) -> Option<String> {
    archive
        .file_names()
        .find(|candidate| candidate.eq_ignore_ascii_case(name))
        .map(str::to_string)
}

fn read_entry_bytes<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let Some(found) = find_entry(archive, name) else {
        return Ok(None);
    };

    let mut entry = match archive.by_name(&found) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut buffer = Vec::with_capacity(capacity_hint(entry.size()));
    entry.read_to_end(&mut buffer)?;
    Ok(Some(buffer))
}

/// Initial buffer size for an entry; the header's size is not trusted
fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

fn read_entry_string<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match read_entry_bytes(archive, name)? {
        Some(bytes) => {
            let text = String::from_utf8(bytes)
                .map_err(|e| AppxError::manifest(format!("{} is not valid UTF-8: {}", name, e)))?;
            Ok(Some(text))
        }
        None => Ok(None),
    }
}

/// Read the manifest of a package stored inside another archive
fn nested_manifest<R: Read + Seek>(archive: &mut ZipArchive<R>, inner_name: &str) -> Result<Option<String>> {
    let Some(bytes) = read_entry_bytes(archive, inner_name)? else {
        return Ok(None);
    };

    let mut inner = ZipArchive::new(Cursor::new(bytes))?;
    read_entry_string(&mut inner, MANIFEST_NAME)
}

/// Parse `true`/`false` in any case, ignoring surrounding whitespace
fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse the contents of an `AppxManifest.xml`
pub fn parse_manifest_xml(xml: &str, package_path: impl Into<PathBuf>) -> Result<AppxManifest> {
    let xml = xml.trim_start_matches('\u{feff}');
    let package: PackageXml = quick_xml::de::from_str(xml)?;

    let identity = package
        .identity
        .ok_or_else(|| AppxError::manifest("missing <Identity> element"))?;
    let name = identity
        .name
        .ok_or_else(|| AppxError::manifest("Identity has no Name attribute"))?;
    let publisher = identity
        .publisher
        .ok_or_else(|| AppxError::manifest("Identity has no Publisher attribute"))?;
    let version: PackageVersion = identity
        .version
        .ok_or_else(|| AppxError::manifest("Identity has no Version attribute"))?
        .parse()?;

    let mut manifest = AppxManifest::new(name, publisher, version, package_path);

    if let Some(arch) = identity.processor_architecture {
        manifest.architecture = Some(arch.parse()?);
    }

    if let Some(properties) = package.properties {
        manifest.display_name = properties.display_name;
        manifest.publisher_display_name = properties.publisher_display_name;

        if let Some(framework) = properties.framework {
            manifest.is_framework = parse_bool(&framework).ok_or_else(|| {
                AppxError::manifest(format!("Framework is not a boolean: '{}'", framework.trim()))
            })?;
        }
    }

    if let Some(dependencies) = package.dependencies {
        for dep in dependencies.packages {
            let min_version = dep.min_version.map(|v| v.parse()).transpose()?;
            manifest.dependencies.push(PackageDependency {
                name: dep.name,
                publisher: dep.publisher,
                min_version,
            });
        }
        manifest.target_device_families = dependencies
            .device_families
            .into_iter()
            .map(|family| family.name)
            .collect();
    }

    Ok(manifest)
}

/// Parse the contents of an `AppxBundleManifest.xml`
pub fn parse_bundle_manifest_xml(xml: &str) -> Result<Vec<BundleEntry>> {
    let xml = xml.trim_start_matches('\u{feff}');
    let bundle: BundleXml = quick_xml::de::from_str(xml)?;

    bundle
        .packages
        .map(|p| p.packages)
        .unwrap_or_default()
        .into_iter()
        .map(|package| {
            let architecture = package.architecture.map(|a| a.parse()).transpose()?;
            Ok(BundleEntry {
                // Type defaults to application when omitted
                is_application: package
                    .kind
                    .map_or(true, |kind| kind.eq_ignore_ascii_case("application")),
                architecture,
                file_name: package.file_name,
            })
        })
        .collect()
}

/// Pick the application package a bundle would deploy on `host`
pub fn select_bundle_entry(entries: &[BundleEntry], host: Architecture) -> Option<&BundleEntry> {
    let applications: Vec<&BundleEntry> = entries.iter().filter(|e| e.is_application).collect();

    applications
        .iter()
        .find(|e| e.architecture == Some(host))
        .or_else(|| {
            applications.iter().find(|e| {
                e.architecture
                    .map_or(true, |arch| arch.is_compatible_with(host))
            })
        })
        .or_else(|| applications.first())
        .copied()
}
