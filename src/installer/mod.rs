//! Install, upgrade and removal sequencing

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::deploy::{DeployOptions, DeploymentOutcome, PackageBackend, RemoveOptions};
use crate::error::{AppxError, Result};
use crate::models::{AppxManifest, InstalledPackage};
use crate::resolver::DependencyResolver;

/// What to do when the package is already installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Remove the installed package, then install the new one
    Replace,
    /// Update the installed package in place
    Upgrade,
    /// Remove the installed package
    Uninstall,
    /// Do nothing
    Quit,
}

impl Action {
    /// All actions in menu order
    pub const ALL: [Action; 4] = [Self::Replace, Self::Upgrade, Self::Uninstall, Self::Quit];

    /// Menu label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Replace => "Replace package",
            Self::Upgrade => "Upgrade package",
            Self::Uninstall => "Uninstall package",
            Self::Quit => "Quit",
        }
    }

    /// Action for a menu key (`'1'` to `'4'`)
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            '1' => Some(Self::Replace),
            '2' => Some(Self::Upgrade),
            '3' => Some(Self::Uninstall),
            '4' => Some(Self::Quit),
            _ => None,
        }
    }

    /// Whether the action deploys the new package
    pub fn installs(&self) -> bool {
        matches!(self, Self::Replace | Self::Upgrade)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Replace => "replace",
            Self::Upgrade => "upgrade",
            Self::Uninstall => "uninstall",
            Self::Quit => "quit",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Action {
    type Err = AppxError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(action) = s.chars().next().filter(|_| s.len() == 1).and_then(Self::from_key) {
            return Ok(action);
        }

        match s.to_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "upgrade" | "update" => Ok(Self::Upgrade),
            "uninstall" | "remove" => Ok(Self::Uninstall),
            "quit" => Ok(Self::Quit),
            _ => Err(AppxError::Other(format!("Unknown action: {}", s))),
        }
    }
}

/// A platform operation performed during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Fresh install
    Add,
    /// In-place update
    Update,
    /// Removal
    Remove,
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Whether every step succeeded
    pub success: bool,
    /// Each platform operation and how it ended
    pub steps: Vec<(Step, DeploymentOutcome)>,
}

impl Default for InstallReport {
    fn default() -> Self {
        Self {
            success: true,
            steps: Vec::new(),
        }
    }
}

impl InstallReport {
    fn record(&mut self, step: Step, outcome: DeploymentOutcome) -> bool {
        let ok = outcome.is_success();
        self.success &= ok;
        self.steps.push((step, outcome));
        ok
    }
}

/// Drives the platform operations for one package
pub struct Installer<'a, B: PackageBackend> {
    backend: &'a B,
    resolver: &'a DependencyResolver,
    deploy_options: DeployOptions,
    remove_options: RemoveOptions,
    progress: ProgressBar,
    output: RefCell<Box<dyn Write + 'a>>,
}

impl<'a, B: PackageBackend> Installer<'a, B> {
    /// Create an installer using the given backend and framework index
    pub fn new(backend: &'a B, resolver: &'a DependencyResolver) -> Self {
        Self {
            backend,
            resolver,
            deploy_options: DeployOptions::default(),
            remove_options: RemoveOptions::default(),
            progress: ProgressBar::hidden(),
            output: RefCell::new(Box::new(io::stdout())),
        }
    }

    /// Set the options used when adding or updating
    pub fn deploy_options(mut self, options: DeployOptions) -> Self {
        self.deploy_options = options;
        self
    }

    /// Set the options used when removing
    pub fn remove_options(mut self, options: RemoveOptions) -> Self {
        self.remove_options = options;
        self
    }

    /// Report progress on a spinner
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Write status lines to `output` instead of stdout
    pub fn output(mut self, output: impl Write + 'a) -> Self {
        self.output = RefCell::new(Box::new(output));
        self
    }

    /// Print a status line above the spinner
    ///
    /// Lines are written even when the spinner is hidden.
    fn say(&self, line: impl fmt::Display) -> Result<()> {
        self.progress
            .suspend(|| writeln!(self.output.borrow_mut(), "{}", line))?;
        Ok(())
    }

    /// Run `action` for `manifest`
    ///
    /// With nothing installed the package is simply installed and `action`
    /// is ignored. Dependencies are resolved before anything is removed.
    pub async fn run(
        &self,
        manifest: &AppxManifest,
        installed: Option<&InstalledPackage>,
        action: Action,
    ) -> Result<InstallReport> {
        let mut report = InstallReport::default();

        let Some(installed) = installed else {
            self.install(manifest, false, &mut report).await?;
            return Ok(report);
        };

        match action {
            Action::Replace => {
                let dependencies = self.resolver.resolve(manifest, self.backend)?;
                debug!("Resolved {} dependencies", dependencies.entries.len());
                // Install is attempted even when removal fails
                self.uninstall(&installed.full_name, &mut report).await?;
                self.deploy(manifest, &dependencies.package_paths(), false, &mut report)
                    .await?;
            }
            Action::Upgrade => {
                self.install(manifest, true, &mut report).await?;
            }
            Action::Uninstall => {
                self.uninstall(&installed.full_name, &mut report).await?;
            }
            Action::Quit => {
                debug!("Nothing to do");
            }
        }

        Ok(report)
    }

    /// Resolve dependencies, then add or update the package
    pub async fn install(&self, manifest: &AppxManifest, update: bool, report: &mut InstallReport) -> Result<bool> {
        let dependencies = self.resolver.resolve(manifest, self.backend)?;
        self.deploy(manifest, &dependencies.package_paths(), update, report).await
    }

    async fn deploy(
        &self,
        manifest: &AppxManifest,
        dependencies: &[std::path::PathBuf],
        update: bool,
        report: &mut InstallReport,
    ) -> Result<bool> {
        self.say("Installing package...")?;
        self.progress.set_message(format!("Installing {}", manifest.friendly_name()));
        self.progress.enable_steady_tick(Duration::from_millis(100));

        let path = manifest.package_path.as_path();
        let result = if update {
            self.backend
                .update_package(path, dependencies, self.deploy_options)
                .await
        } else {
            self.backend
                .add_package(path, dependencies, self.deploy_options)
                .await
        };
        self.progress.disable_steady_tick();
        let outcome = result?;

        match &outcome {
            DeploymentOutcome::Completed => {
                info!("Installed {} {}", manifest.name, manifest.version);
                self.say("Installation succeeded")?;
            }
            DeploymentOutcome::Canceled => self.say("Installation canceled")?,
            DeploymentOutcome::Failed {
                error_code,
                extended_error_code,
                error_text,
            } => {
                error!("Installation of {} failed: {}", manifest.name, error_text);
                self.say(format_args!("{:#010x}", error_code))?;
                self.say(format_args!("{:#010x}", extended_error_code))?;
            }
            DeploymentOutcome::Unknown => self.say("Installation status unknown")?,
        }

        let step = if update { Step::Update } else { Step::Add };
        Ok(report.record(step, outcome))
    }

    /// Remove an installed package by full name
    pub async fn uninstall(&self, full_name: &str, report: &mut InstallReport) -> Result<bool> {
        self.progress.set_message(format!("Removing {}", full_name));
        self.progress.enable_steady_tick(Duration::from_millis(100));
        let result = self.backend.remove_package(full_name, self.remove_options).await;
        self.progress.disable_steady_tick();
        let outcome = result?;

        match &outcome {
            DeploymentOutcome::Completed => {
                info!("Removed {}", full_name);
                self.say("Removal succeeded")?;
            }
            DeploymentOutcome::Canceled => self.say("Removal canceled")?,
            DeploymentOutcome::Failed {
                error_code,
                error_text,
                ..
            } => {
                error!("Removal of {} failed", full_name);
                self.say(format_args!("Error code: {:#010x}", error_code))?;
                self.say(format_args!("Error text: {}", error_text))?;
            }
            DeploymentOutcome::Unknown => self.say("Removal status unknown")?,
        }

        Ok(report.record(Step::Remove, outcome))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use crate::models::PackageVersion;
    use crate::parsers::appx::tests::{manifest_xml, write_appx};
    use crate::parsers::AppxReader;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Add(PathBuf, Vec<PathBuf>),
        Update(PathBuf, Vec<PathBuf>),
        Remove(String),
    }

    /// In-memory backend that records every deployment call
    pub(crate) struct MockBackend {
        pub installed: Vec<InstalledPackage>,
        pub add_outcome: DeploymentOutcome,
        pub remove_outcome: DeploymentOutcome,
        pub calls: RefCell<Vec<Call>>,
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self {
                installed: Vec::new(),
                add_outcome: DeploymentOutcome::Completed,
                remove_outcome: DeploymentOutcome::Completed,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl MockBackend {
        pub(crate) fn with_installed(mut self, package: InstalledPackage) -> Self {
            self.installed.push(package);
            self
        }

        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl PackageBackend for MockBackend {
        fn find_packages(&self, name: &str, publisher: &str) -> Result<Vec<InstalledPackage>> {
            Ok(self
                .installed
                .iter()
                .filter(|p| p.name == name && p.publisher == publisher)
                .cloned()
                .collect())
        }

        async fn add_package(
            &self,
            package: &Path,
            dependencies: &[PathBuf],
            _options: DeployOptions,
        ) -> Result<DeploymentOutcome> {
            self.calls
                .borrow_mut()
                .push(Call::Add(package.to_path_buf(), dependencies.to_vec()));
            Ok(self.add_outcome.clone())
        }

        async fn update_package(
            &self,
            package: &Path,
            dependencies: &[PathBuf],
            _options: DeployOptions,
        ) -> Result<DeploymentOutcome> {
            self.calls
                .borrow_mut()
                .push(Call::Update(package.to_path_buf(), dependencies.to_vec()));
            Ok(self.add_outcome.clone())
        }

        async fn remove_package(&self, full_name: &str, _options: RemoveOptions) -> Result<DeploymentOutcome> {
            self.calls.borrow_mut().push(Call::Remove(full_name.to_string()));
            Ok(self.remove_outcome.clone())
        }
    }

    /// Writer whose contents stay readable after the installer is gone
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn installed_app() -> InstalledPackage {
        InstalledPackage {
            name: "Contoso.App".into(),
            full_name: "Contoso.App_1.0.0.0_x64__abc".into(),
            version: PackageVersion::new(1, 0, 0, 0),
            publisher: "CN=Contoso".into(),
            publisher_id: "abc".into(),
            installed_location: None,
            is_framework: false,
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        app: PathBuf,
        vclibs: PathBuf,
        manifest: AppxManifest,
        resolver: DependencyResolver,
    }

    fn fixture(with_framework: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let app = write_appx(
            dir.path(),
            "app.appx",
            &manifest_xml("Contoso.App", "2.0.0.0", false, &["VCLibs"]),
        );
        let vclibs = dir.path().join("vclibs.appx");
        if with_framework {
            write_appx(dir.path(), "vclibs.appx", &manifest_xml("VCLibs", "14.0.0.0", true, &[]));
        }
        let manifest = AppxReader::open(&app).unwrap().read_manifest().unwrap();
        let resolver = DependencyResolver::scan(&app, &[]).unwrap();
        Fixture {
            _dir: dir,
            app,
            vclibs,
            manifest,
            resolver,
        }
    }

    #[test]
    fn test_action_keys_and_names() {
        assert_eq!(Action::from_key('1'), Some(Action::Replace));
        assert_eq!(Action::from_key('4'), Some(Action::Quit));
        assert_eq!(Action::from_key('5'), None);
        assert_eq!("2".parse::<Action>().unwrap(), Action::Upgrade);
        assert_eq!("Remove".parse::<Action>().unwrap(), Action::Uninstall);
        assert!("later".parse::<Action>().is_err());
        assert_eq!(Action::ALL.map(|a| a.label())[0], "Replace package");
    }

    #[tokio::test]
    async fn test_fresh_install() {
        let f = fixture(true);
        let backend = MockBackend::default();
        let installer = Installer::new(&backend, &f.resolver);

        let report = installer.run(&f.manifest, None, Action::Quit).await.unwrap();
        assert!(report.success);
        assert_eq!(backend.calls(), vec![Call::Add(f.app.clone(), vec![f.vclibs.clone()])]);
    }

    #[tokio::test]
    async fn test_replace_removes_then_adds() {
        let f = fixture(true);
        let backend = MockBackend::default();
        let installed = installed_app();
        let installer = Installer::new(&backend, &f.resolver);

        let report = installer
            .run(&f.manifest, Some(&installed), Action::Replace)
            .await
            .unwrap();
        assert!(report.success);
        assert_eq!(
            backend.calls(),
            vec![
                Call::Remove(installed.full_name.clone()),
                Call::Add(f.app.clone(), vec![f.vclibs.clone()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_with_failed_removal_still_installs() {
        let f = fixture(true);
        let backend = MockBackend {
            remove_outcome: DeploymentOutcome::Failed {
                error_code: 1,
                extended_error_code: 2,
                error_text: "in use".into(),
            },
            ..MockBackend::default()
        };
        let installed = installed_app();
        let installer = Installer::new(&backend, &f.resolver);

        let report = installer
            .run(&f.manifest, Some(&installed), Action::Replace)
            .await
            .unwrap();
        assert!(!report.success);
        assert_eq!(backend.calls().len(), 2);
        assert_eq!(report.steps[0].0, Step::Remove);
        assert_eq!(report.steps[1], (Step::Add, DeploymentOutcome::Completed));
    }

    #[tokio::test]
    async fn test_replace_with_missing_dependency_removes_nothing() {
        let f = fixture(false);
        let backend = MockBackend::default();
        let installed = installed_app();
        let installer = Installer::new(&backend, &f.resolver);

        let err = installer
            .run(&f.manifest, Some(&installed), Action::Replace)
            .await
            .unwrap_err();
        assert!(matches!(err, AppxError::MissingDependency(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_updates() {
        let f = fixture(true);
        let backend = MockBackend::default();
        let installed = installed_app();
        let installer = Installer::new(&backend, &f.resolver);

        installer
            .run(&f.manifest, Some(&installed), Action::Upgrade)
            .await
            .unwrap();
        assert_eq!(backend.calls(), vec![Call::Update(f.app.clone(), vec![f.vclibs.clone()])]);
    }

    #[tokio::test]
    async fn test_uninstall_and_quit() {
        let f = fixture(false);
        let backend = MockBackend::default();
        let installed = installed_app();
        let installer = Installer::new(&backend, &f.resolver);

        installer
            .run(&f.manifest, Some(&installed), Action::Uninstall)
            .await
            .unwrap();
        assert_eq!(backend.calls(), vec![Call::Remove(installed.full_name.clone())]);

        let report = installer
            .run(&f.manifest, Some(&installed), Action::Quit)
            .await
            .unwrap();
        assert!(report.success);
        assert!(report.steps.is_empty());
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_canceled_counts_as_success() {
        let f = fixture(true);
        let backend = MockBackend {
            add_outcome: DeploymentOutcome::Canceled,
            ..MockBackend::default()
        };
        let installer = Installer::new(&backend, &f.resolver);

        let report = installer.run(&f.manifest, None, Action::Quit).await.unwrap();
        assert!(report.success);

        let backend = MockBackend {
            add_outcome: DeploymentOutcome::Unknown,
            ..MockBackend::default()
        };
        let installer = Installer::new(&backend, &f.resolver);
        let report = installer.run(&f.manifest, None, Action::Quit).await.unwrap();
        assert!(!report.success);
    }

    #[tokio::test]
    async fn test_status_lines_printed_with_hidden_spinner() {
        let f = fixture(true);
        let backend = MockBackend::default();
        let installed = installed_app();
        let out = SharedBuffer::default();
        let installer = Installer::new(&backend, &f.resolver)
            .progress(ProgressBar::hidden())
            .output(out.clone());

        installer
            .run(&f.manifest, Some(&installed), Action::Replace)
            .await
            .unwrap();
        assert_eq!(
            out.contents(),
            "Removal succeeded\nInstalling package...\nInstallation succeeded\n"
        );
    }

    #[tokio::test]
    async fn test_failure_codes_printed() {
        let f = fixture(true);
        let backend = MockBackend {
            add_outcome: DeploymentOutcome::Failed {
                error_code: 0x80073cf3_u32 as i32,
                extended_error_code: 0x80073cf9_u32 as i32,
                error_text: "dependency conflict".into(),
            },
            remove_outcome: DeploymentOutcome::Failed {
                error_code: 0x80073cf1_u32 as i32,
                extended_error_code: 0,
                error_text: "not found".into(),
            },
            ..MockBackend::default()
        };
        let installed = installed_app();
        let out = SharedBuffer::default();
        let installer = Installer::new(&backend, &f.resolver).output(out.clone());

        let report = installer
            .run(&f.manifest, Some(&installed), Action::Replace)
            .await
            .unwrap();
        assert!(!report.success);

        let text = out.contents();
        assert!(text.contains("Error code: 0x80073cf1\nError text: not found\n"));
        assert!(text.contains("Installing package...\n0x80073cf3\n0x80073cf9\n"));
    }
}
