//! Command execution handlers

use std::cmp::Ordering;
use std::path::Path;

use console::style;
use dialoguer::Select;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::config::Config;
use crate::deploy::{PackageBackend, PlatformBackend};
use crate::error::{AppxError, Result};
use crate::installer::{Action, InstallReport, Installer};
use crate::models::{AppxManifest, InstalledPackage};
use crate::parsers::AppxReader;
use crate::resolver::DependencyResolver;

/// Hint shown when the program is started without a package
pub const USAGE_HINT: &str =
    "To use this program, associate it with the .appx and .appxbundle file extensions.";

fn read_manifest(path: &Path) -> Result<AppxManifest> {
    AppxReader::open(path)?.read_manifest()
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb
}

fn print_installed(package: &InstalledPackage) {
    for line in package.describe() {
        println!("{}", line);
    }
}

fn version_note(installed: &InstalledPackage, manifest: &AppxManifest) -> &'static str {
    match manifest.version.cmp(&installed.version) {
        Ordering::Greater => "upgrade",
        Ordering::Equal => "same version",
        Ordering::Less => "downgrade",
    }
}

/// Ask what to do with an already installed package
fn prompt_action() -> Result<Action> {
    let labels: Vec<String> = Action::ALL
        .iter()
        .enumerate()
        .map(|(i, action)| format!("{} - {}", i + 1, action.label()))
        .collect();

    let choice = Select::new()
        .with_prompt("What do you want to do?")
        .items(&labels)
        .default(0)
        .interact_opt()?;

    Ok(choice.map_or(Action::Quit, |i| Action::ALL[i]))
}

/// Execute the install command
///
/// Returns whether every deployment step succeeded.
pub async fn execute_install(args: &super::InstallArgs, config: &Config) -> Result<bool> {
    let backend = PlatformBackend::new()?;
    install_with(&backend, args, config).await
}

/// Pick the action for an already installed package
fn choose_action(args: &super::InstallArgs, config: &Config) -> Result<Action> {
    match args.action {
        Some(action) => Ok(action),
        None if args.yes => Ok(config.general.default_action),
        None => prompt_action(),
    }
}

async fn install_with<B: PackageBackend>(backend: &B, args: &super::InstallArgs, config: &Config) -> Result<bool> {
    let manifest = read_manifest(&args.package)?;
    debug!("Read manifest for {} {}", manifest.name, manifest.version);

    let mut dirs = config.install.dependency_dirs.clone();
    dirs.extend(args.deps_dirs.iter().cloned());
    let resolver = DependencyResolver::scan(&manifest.package_path, &dirs)?;

    let installed = backend.find_packages(&manifest.name, &manifest.publisher)?;
    let current = installed.first();

    let action = match current {
        Some(package) => {
            println!("{}", style("This package is already installed!").yellow().bold());
            print_installed(package);
            println!();
            println!(
                "New version: {} ({})",
                manifest.version,
                version_note(package, &manifest)
            );
            println!();

            choose_action(args, config)?
        }
        None => Action::Upgrade,
    };
    println!();

    let mut deploy_options = config.deploy_options();
    deploy_options.force_app_shutdown |= args.force_shutdown;

    let pb = spinner();
    let installer = Installer::new(backend, &resolver)
        .deploy_options(deploy_options)
        .remove_options(config.remove_options())
        .progress(pb.clone());

    let result = installer.run(&manifest, current, action).await;
    pb.finish_and_clear();

    let report: InstallReport = result?;
    Ok(report.success)
}

/// Execute the remove command
pub async fn execute_remove(args: &super::RemoveArgs, config: &Config) -> Result<bool> {
    let backend = PlatformBackend::new()?;
    remove_with(&backend, args, config).await
}

async fn remove_with<B: PackageBackend>(backend: &B, args: &super::RemoveArgs, config: &Config) -> Result<bool> {
    let manifest = read_manifest(&args.package)?;

    let installed = backend.find_packages(&manifest.name, &manifest.publisher)?;
    if installed.is_empty() {
        println!("{} is not installed", manifest.name);
        return Ok(true);
    }

    let mut remove_options = config.remove_options();
    remove_options.preserve_data |= args.preserve_data;

    let resolver = DependencyResolver::default();
    let pb = spinner();
    let installer = Installer::new(backend, &resolver)
        .remove_options(remove_options)
        .progress(pb.clone());

    let mut report = InstallReport::default();
    let mut result = Ok(());
    for package in &installed {
        if let Err(e) = installer.uninstall(&package.full_name, &mut report).await {
            result = Err(e);
            break;
        }
    }
    pb.finish_and_clear();
    result?;

    Ok(report.success)
}

/// Execute the info command
pub async fn execute_info(args: &super::InfoArgs) -> Result<()> {
    let manifest = read_manifest(&args.package)?;

    match args.format {
        super::InfoFormat::Pretty => {
            println!("Package Information");
            println!("═══════════════════════════════════════");
            println!("Name:         {}", manifest.name);
            if let Some(ref display_name) = manifest.display_name {
                println!("Display Name: {}", display_name);
            }
            println!("Publisher:    {}", manifest.publisher);
            if let Some(ref publisher) = manifest.publisher_display_name {
                println!("              ({})", publisher);
            }
            println!("Version:      {}", manifest.version);
            if let Some(arch) = manifest.architecture {
                println!("Architecture: {}", arch);
            }
            println!("Framework:    {}", manifest.is_framework);

            if !manifest.target_device_families.is_empty() {
                println!("Targets:      {}", manifest.target_device_families.join(", "));
            }

            if !manifest.dependencies.is_empty() {
                println!("\nDependencies:");
                for dep in &manifest.dependencies {
                    match dep.min_version {
                        Some(min) => println!("  - {} (>= {})", dep.name, min),
                        None => println!("  - {}", dep.name),
                    }
                }
            }

            match PlatformBackend::new() {
                Ok(backend) => {
                    let installed = backend.find_packages(&manifest.name, &manifest.publisher)?;
                    println!();
                    if installed.is_empty() {
                        println!("Not installed");
                    } else {
                        println!("{}", style("Installed").green().bold());
                        for package in &installed {
                            print_installed(package);
                        }
                    }
                }
                Err(e) => debug!("Skipping installed state: {}", e),
            }
        }
        super::InfoFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }
        super::InfoFormat::Toml => {
            println!("{}", toml::to_string_pretty(&manifest).map_err(|e| AppxError::Other(e.to_string()))?);
        }
    }

    Ok(())
}

/// Execute the deps command
///
/// Returns false if a dependency cannot be satisfied.
pub async fn execute_deps(args: &super::DepsArgs, config: &Config) -> Result<bool> {
    let manifest = read_manifest(&args.package)?;

    let mut dirs = config.install.dependency_dirs.clone();
    dirs.extend(args.deps_dirs.iter().cloned());
    let resolver = DependencyResolver::scan(&manifest.package_path, &dirs)?;

    if manifest.dependencies.is_empty() {
        println!("{} has no package dependencies", manifest.name);
        return Ok(true);
    }

    let backend = PlatformBackend::new().ok();
    let mut satisfied = true;

    for dep in &manifest.dependencies {
        if let Some(framework) = resolver.get(&dep.name) {
            println!(
                "{} {} {}",
                style("[local]").green(),
                style(&dep.name).bold(),
                framework.package_path.display()
            );
            continue;
        }

        let installed = match (&backend, &dep.publisher) {
            (Some(backend), Some(publisher)) => backend.find_packages(&dep.name, publisher)?,
            _ => Vec::new(),
        };

        if let Some(package) = installed.first() {
            println!(
                "{} {} {}",
                style("[installed]").cyan(),
                style(&dep.name).bold(),
                package.version
            );
        } else {
            satisfied = false;
            println!("{} {}", style("[missing]").red(), style(&dep.name).bold());
        }
    }

    Ok(satisfied)
}

/// Execute the config command
pub async fn execute_config(args: &super::ConfigArgs, config_path: &Path) -> Result<()> {
    match &args.command {
        super::ConfigCommands::Show => {
            let config = Config::load_from(config_path)?;
            println!("{}", toml::to_string_pretty(&config).map_err(|e| AppxError::Other(e.to_string()))?);
        }
        super::ConfigCommands::Reset => {
            Config::reset(config_path)?;
            println!("Configuration reset to defaults");
        }
        super::ConfigCommands::Set { key, value } => {
            let mut config = Config::load_from(config_path)?;
            config.set(key, value)?;
            config.save_to(config_path)?;
            println!("Set {} = {}", key, value);
        }
        super::ConfigCommands::Get { key } => {
            let config = Config::load_from(config_path)?;
            if let Some(value) = config.get(key) {
                println!("{}", value);
            } else {
                println!("Key '{}' not found", key);
            }
        }
        super::ConfigCommands::Init { force } => {
            Config::init(config_path, *force)?;
            println!("Configuration initialized at {}", config_path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeploymentOutcome;
    use crate::installer::tests::{Call, MockBackend};
    use crate::models::PackageVersion;
    use crate::parsers::appx::tests::{manifest_xml, write_appx};

    fn installed(full_name: &str) -> InstalledPackage {
        InstalledPackage {
            name: "Contoso.App".into(),
            full_name: full_name.into(),
            version: PackageVersion::new(1, 0, 0, 0),
            publisher: "CN=Contoso".into(),
            publisher_id: "abc".into(),
            installed_location: None,
            is_framework: false,
        }
    }

    /// App package with no dependencies, written to a temporary directory
    fn app_package(dir: &Path) -> std::path::PathBuf {
        write_appx(dir, "app.appx", &manifest_xml("Contoso.App", "2.0.0.0", false, &[]))
    }

    #[test]
    fn test_version_note() {
        let installed = installed("Contoso.App_1.0.0.0_x64__abc");
        let mut manifest = AppxManifest::new("Contoso.App", "CN=Contoso", PackageVersion::new(1, 1, 0, 0), "app.appx");
        assert_eq!(version_note(&installed, &manifest), "upgrade");
        manifest.version = PackageVersion::new(0, 9, 0, 0);
        assert_eq!(version_note(&installed, &manifest), "downgrade");
    }

    #[tokio::test]
    async fn test_config_command_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let set = super::super::ConfigArgs {
            command: super::super::ConfigCommands::Set {
                key: "general.pause_on_error".into(),
                value: "false".into(),
            },
        };
        execute_config(&set, &path).await.unwrap();
        assert!(!Config::load_from(&path).unwrap().general.pause_on_error);

        let init = super::super::ConfigArgs {
            command: super::super::ConfigCommands::Init { force: false },
        };
        assert!(execute_config(&init, &path).await.is_err());
    }

    #[tokio::test]
    async fn test_info_reads_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_appx(dir.path(), "app.appx", &manifest_xml("Contoso.App", "1.0.0.0", false, &[]));

        let args = super::super::InfoArgs {
            package: path,
            format: super::super::InfoFormat::Json,
        };
        execute_info(&args).await.unwrap();
    }

    #[tokio::test]
    async fn test_deps_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_appx(
            dir.path(),
            "app.appx",
            &manifest_xml("Contoso.App", "1.0.0.0", false, &["VCLibs", "Missing.Framework"]),
        );
        write_appx(dir.path(), "vclibs.appx", &manifest_xml("VCLibs", "14.0.0.0", true, &[]));

        let args = super::super::DepsArgs {
            package: path,
            deps_dirs: Vec::new(),
        };
        // Missing.Framework is neither local nor installed in the test environment
        assert!(!execute_deps(&args, &Config::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_install_fresh_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = app_package(dir.path());
        let backend = MockBackend::default();

        let args = super::super::InstallArgs::for_package(path.clone());
        assert!(install_with(&backend, &args, &Config::default()).await.unwrap());
        assert_eq!(backend.calls(), vec![Call::Add(path, Vec::new())]);
    }

    #[tokio::test]
    async fn test_install_with_action_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = app_package(dir.path());
        let backend = MockBackend::default().with_installed(installed("Contoso.App_1.0.0.0_x64__abc"));

        let mut args = super::super::InstallArgs::for_package(path);
        args.action = Some(Action::Uninstall);
        // The flag wins over -y
        args.yes = true;
        assert!(install_with(&backend, &args, &Config::default()).await.unwrap());
        assert_eq!(backend.calls(), vec![Call::Remove("Contoso.App_1.0.0.0_x64__abc".into())]);
    }

    #[tokio::test]
    async fn test_install_yes_uses_default_action() {
        let dir = tempfile::tempdir().unwrap();
        let path = app_package(dir.path());
        let backend = MockBackend::default().with_installed(installed("Contoso.App_1.0.0.0_x64__abc"));

        let mut config = Config::default();
        config.general.default_action = Action::Replace;
        let mut args = super::super::InstallArgs::for_package(path.clone());
        args.yes = true;

        assert!(install_with(&backend, &args, &config).await.unwrap());
        assert_eq!(
            backend.calls(),
            vec![
                Call::Remove("Contoso.App_1.0.0.0_x64__abc".into()),
                Call::Add(path.clone(), Vec::new()),
            ]
        );

        let backend = MockBackend::default().with_installed(installed("Contoso.App_1.0.0.0_x64__abc"));
        assert!(install_with(&backend, &args, &Config::default()).await.unwrap());
        assert_eq!(backend.calls(), vec![Call::Update(path, Vec::new())]);
    }

    #[tokio::test]
    async fn test_install_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = app_package(dir.path());
        let backend = MockBackend {
            add_outcome: DeploymentOutcome::Unknown,
            ..MockBackend::default()
        };

        let args = super::super::InstallArgs::for_package(path);
        assert!(!install_with(&backend, &args, &Config::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_every_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = app_package(dir.path());
        let backend = MockBackend::default()
            .with_installed(installed("Contoso.App_1.0.0.0_x64__abc"))
            .with_installed(installed("Contoso.App_1.0.0.0_x86__abc"));

        let args = super::super::RemoveArgs {
            package: path,
            preserve_data: false,
        };
        assert!(remove_with(&backend, &args, &Config::default()).await.unwrap());
        assert_eq!(
            backend.calls(),
            vec![
                Call::Remove("Contoso.App_1.0.0.0_x64__abc".into()),
                Call::Remove("Contoso.App_1.0.0.0_x86__abc".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let path = app_package(dir.path());
        let backend = MockBackend::default();

        let args = super::super::RemoveArgs {
            package: path,
            preserve_data: true,
        };
        assert!(remove_with(&backend, &args, &Config::default()).await.unwrap());
        assert!(backend.calls().is_empty());
    }
}
