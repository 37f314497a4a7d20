use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use gover_backend::{
    CatalogEntry, CatalogSource, GoverError, Installer, MinorLine, Resolution, Source,
    VersionPolicy,
};
use gover_core::{
    ActivePointer, CatalogCache, CatalogFilter, CommandInstaller, ENTRY_POINT, HttpCatalogSource,
    LocalInventory, PROJECT_FILE, ProjectRequirement, VersionCatalog, expand_selector,
    latest_stable, patch_releases, read_project_requirement, reconcile, resolve,
};
use gover_platform::{GoverPaths, HostPlatform};
use gover_shell::{EnvStore, render_exports};
use log::{debug, info};

use crate::cli::{Command, EnvArgs};
use crate::error::CliError;
use crate::settings::Settings;

fn cache_ttl(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Every component a command needs, built once from settings.
pub struct Context<S> {
    paths: GoverPaths,
    policy: VersionPolicy,
    project_dir: PathBuf,
    inventory: LocalInventory,
    catalog: VersionCatalog<S>,
    pointer: ActivePointer,
    env: EnvStore,
    installer: Box<dyn Installer>,
}

impl Context<HttpCatalogSource> {
    pub fn from_settings(
        paths: GoverPaths,
        settings: &Settings,
        project_dir: PathBuf,
    ) -> Result<Self, CliError> {
        let source = HttpCatalogSource::new(settings.catalog_url.clone(), settings.fetch_timeout_secs)?;
        let installer = CommandInstaller::new(
            settings.installer_command.clone(),
            Duration::from_secs(settings.install_timeout_secs),
        );
        let filter = settings.catalog_filter(&HostPlatform::current());
        Ok(Self::new(
            paths,
            settings,
            source,
            filter,
            Box::new(installer),
            project_dir,
        ))
    }
}

impl<S: CatalogSource> Context<S> {
    pub fn new(
        paths: GoverPaths,
        settings: &Settings,
        source: S,
        filter: CatalogFilter,
        installer: Box<dyn Installer>,
        project_dir: PathBuf,
    ) -> Self {
        let cache = CatalogCache::new(
            settings.cache_path(&filter),
            cache_ttl(settings.cache_ttl_secs),
        );
        Self {
            inventory: LocalInventory::new(paths.versions_dir()),
            catalog: VersionCatalog::new(source, cache, filter),
            pointer: ActivePointer::from_paths(&paths),
            env: EnvStore::new(paths.env_dir()),
            policy: settings.policy.clone(),
            paths,
            project_dir,
            installer,
        }
    }

    pub async fn execute(&self, command: Command, out: &mut dyn Write) -> Result<(), CliError> {
        debug!("Executing {command:?}");
        match command {
            Command::Use { version } => self.use_version(&version, out).await,
            Command::Auto => self.auto(out).await,
            Command::Current => self.current(out),
            Command::List => self.list(out),
            Command::ListRemote => self.list_remote(out).await,
            Command::Latest => self.latest(out).await,
            Command::Sub { line } => self.sub(&line, out).await,
            Command::Uninstall { selectors } => self.uninstall(&selectors, out),
            Command::Env(args) => self.env(&args, out),
        }
    }

    /// Local results go through the installer too, so a directory left
    /// without an entry point is reinstalled instead of switched to.
    async fn activate(&self, resolution: &Resolution, out: &mut dyn Write) -> Result<(), CliError> {
        self.paths.ensure_dirs().map_err(GoverError::from)?;
        let destination = self.paths.version_dir(&resolution.name);
        debug!(
            "Ensuring {} ({}) with the {} installer",
            resolution.name,
            resolution.source,
            self.installer.name()
        );
        let installed = self
            .installer
            .ensure_installed(&resolution.version, &destination, Path::new(ENTRY_POINT))
            .await?;
        if installed {
            info!("Installed {}", resolution.name);
            writeln!(out, "Installed {}", resolution.name)?;
        }

        self.pointer.switch_to(&resolution.name)?;
        writeln!(out, "Now using {}", resolution.name)?;
        Ok(())
    }

    async fn use_version(&self, input: &str, out: &mut dyn Write) -> Result<(), CliError> {
        let requested = self.policy.parse(input).map_err(GoverError::from)?;
        let project = read_project_requirement(&self.project_dir, &self.policy)?;
        let installed = self.inventory.list()?;

        let resolution = reconcile(&requested, project.declared(), &installed, &self.policy)?;
        if let Some(requirement) = project.declared()
            && resolution.version != requested
        {
            writeln!(
                out,
                "{PROJECT_FILE} requires {}; using {} instead of {requested}",
                requirement.effective, resolution.name
            )?;
        }

        self.activate(&resolution, out).await
    }

    async fn auto(&self, out: &mut dyn Write) -> Result<(), CliError> {
        let requirement = match read_project_requirement(&self.project_dir, &self.policy)? {
            ProjectRequirement::Declared(requirement) => requirement,
            ProjectRequirement::NoFile => {
                writeln!(
                    out,
                    "No {PROJECT_FILE} in {}; not a Go project, nothing to do",
                    self.project_dir.display()
                )?;
                return Ok(());
            }
            ProjectRequirement::Unspecified => {
                writeln!(
                    out,
                    "{PROJECT_FILE} declares no go or toolchain version; nothing to do"
                )?;
                return Ok(());
            }
        };

        let installed = self.inventory.list()?;
        let resolution = match resolve(&requirement.effective, &installed, &[], &self.policy) {
            Ok(resolution) => resolution,
            Err(GoverError::NoCandidate { .. }) => {
                let catalog = self.catalog.fetch().await?;
                resolve(&requirement.effective, &installed, &catalog, &self.policy)?
            }
            Err(error) => return Err(error.into()),
        };

        writeln!(
            out,
            "{PROJECT_FILE} requires {}; selected {} ({})",
            requirement.effective, resolution.name, resolution.source
        )?;
        self.activate(&resolution, out).await
    }

    fn current(&self, out: &mut dyn Write) -> Result<(), CliError> {
        match self.pointer.current()? {
            Some(name) => writeln!(out, "{name}")?,
            None => writeln!(out, "none")?,
        }
        Ok(())
    }

    fn list(&self, out: &mut dyn Write) -> Result<(), CliError> {
        let installed = self.inventory.list()?;
        if installed.is_empty() {
            writeln!(out, "No versions installed")?;
            return Ok(());
        }

        let active = self.pointer.current()?;
        for version in &installed {
            let marker = if active.as_deref() == Some(version.name.as_str()) {
                '*'
            } else {
                ' '
            };
            writeln!(out, "{marker} {}", version.name)?;
        }
        Ok(())
    }

    fn installed_marker(&self, entry: &CatalogEntry, installed: &BTreeSet<String>) -> &'static str {
        let name = self.policy.normalize(&entry.version).to_string();
        if installed.contains(&name) {
            " (installed)"
        } else {
            ""
        }
    }

    fn installed_names(&self) -> Result<BTreeSet<String>, CliError> {
        Ok(self
            .inventory
            .list()?
            .into_iter()
            .map(|v| self.policy.normalize(&v.version).to_string())
            .collect())
    }

    async fn list_remote(&self, out: &mut dyn Write) -> Result<(), CliError> {
        let mut catalog = self.catalog.fetch().await?;
        catalog.sort_by(|a, b| b.version.cmp(&a.version));
        let installed = self.installed_names()?;

        for entry in &catalog {
            let stability = if entry.stable { "" } else { " (unstable)" };
            writeln!(
                out,
                "{}{stability}{}",
                entry.version,
                self.installed_marker(entry, &installed)
            )?;
        }
        Ok(())
    }

    async fn latest(&self, out: &mut dyn Write) -> Result<(), CliError> {
        let catalog = self.catalog.fetch().await?;
        let entry = latest_stable(&catalog)?;
        let installed = self.inventory.list()?;

        let resolution = match installed.iter().find(|v| v.version == entry.version) {
            Some(local) => Resolution {
                name: local.name.clone(),
                version: local.version.clone(),
                source: Source::Local,
            },
            None => Resolution {
                name: self.policy.normalize(&entry.version).to_string(),
                version: entry.version.clone(),
                source: Source::Remote,
            },
        };
        self.activate(&resolution, out).await
    }

    async fn sub(&self, input: &str, out: &mut dyn Write) -> Result<(), CliError> {
        let line: MinorLine = input.parse().map_err(GoverError::from)?;
        let catalog = self.catalog.fetch().await?;
        let releases = patch_releases(&catalog, line);
        if releases.is_empty() {
            return Err(GoverError::NoCandidate {
                requirement: line.to_string(),
            }
            .into());
        }

        let installed = self.installed_names()?;
        for entry in releases {
            writeln!(
                out,
                "{}{}",
                entry.version,
                self.installed_marker(entry, &installed)
            )?;
        }
        Ok(())
    }

    fn uninstall(&self, selectors: &[String], out: &mut dyn Write) -> Result<(), CliError> {
        let installed = self.inventory.list()?;
        let active = self.pointer.current()?;

        let mut names = BTreeSet::new();
        for selector in selectors {
            names.extend(expand_selector(selector, &installed, &self.policy)?);
        }
        if let Some(active) = &active
            && names.contains(active)
        {
            return Err(GoverError::ActiveVersion {
                version: active.clone(),
            }
            .into());
        }

        for name in &names {
            self.inventory.remove(name, active.as_deref())?;
            writeln!(out, "Removed {name}")?;
        }
        Ok(())
    }

    fn env_target(&self, args: &EnvArgs) -> Result<String, CliError> {
        match &args.target {
            Some(target) => Ok(target.clone()),
            None => self.pointer.current()?.ok_or(CliError::NoActiveVersion),
        }
    }

    fn env(&self, args: &EnvArgs, out: &mut dyn Write) -> Result<(), CliError> {
        let version = self.env_target(args)?;

        if let Some(assignment) = &args.write {
            let (name, value) = assignment
                .split_once('=')
                .ok_or_else(|| CliError::usage(format!("expected KEY=VALUE, got {assignment:?}")))?;
            self.env.set(&version, name, value)?;
            writeln!(out, "Set {name} for {version}")?;
        } else if let Some(name) = &args.unset {
            self.env.unset(&version, name)?;
            writeln!(out, "Unset {name} for {version}")?;
        } else if args.clear {
            self.env.clear_all(&version)?;
            writeln!(out, "Cleared variables for {version}")?;
        } else if args.shell {
            let mut all = self.env.load_all()?;
            let current = all.remove(&version).unwrap_or_default();
            let others: Vec<_> = all.values().collect();
            write!(out, "{}", render_exports(&current, &others, args.clean))?;
        } else {
            let overlay = self.env.load(&version)?;
            if overlay.is_empty() {
                writeln!(out, "No variables set for {version}")?;
            }
            for (name, value) in &overlay {
                writeln!(out, "{name}={value}")?;
            }
        }
        Ok(())
    }
}
