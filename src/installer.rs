// src/installer.rs

//! Install orchestration
//!
//! `RosdepInstaller` resolves the rosdep keys declared by a set of
//! packages and installs whatever is missing, dependencies first.
//!
//! For each key the order is:
//! 1. install keys listed in the rule's `depends` (if the backend allows them)
//! 2. skip the key if its packages are already present
//! 3. print (simulate) or run the install commands
//! 4. re-check presence; a key still missing counts as failed
//!
//! A key that fails is attempted once per run. With `continue_on_error`,
//! keys depending on it fail as well, naming the failed dependency.

use crate::context::InstallerContext;
use crate::error::{Error, InstallFailure, Result};
use crate::installers::{InstallCommand, format_commands};
use crate::lookup::{ResolutionErrors, Resolutions, RosdepLookup};
use crate::runner::{CommandRunner, SystemRunner};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::Write;
use tracing::{debug, info, warn};

/// Options for [`RosdepInstaller::install`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Allow package managers to prompt for confirmation
    pub interactive: bool,
    /// Print commands instead of running them
    pub simulate: bool,
    /// Keep going after a failed key and report all failures at the end
    pub continue_on_error: bool,
    /// Print commands before running them
    pub verbose: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            interactive: true,
            simulate: false,
            continue_on_error: false,
            verbose: false,
        }
    }
}

/// What an install run did, by rosdep key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Keys whose commands ran and passed the presence re-check
    pub installed: Vec<String>,
    /// Keys that were already present
    pub skipped: Vec<String>,
    /// Keys whose commands were only printed
    pub simulated: Vec<String>,
    /// Every command that was run or would have run, in order
    pub commands: Vec<InstallCommand>,
}

/// Bookkeeping for a single `install` call
#[derive(Default)]
struct InstallRun {
    report: InstallReport,
    done: HashSet<String>,
    failed: HashSet<String>,
    failures: Vec<InstallFailure>,
}

pub struct RosdepInstaller<'a> {
    context: &'a InstallerContext,
    lookup: &'a mut RosdepLookup,
    runner: Box<dyn CommandRunner>,
    /// Destination of verbose and simulated command listings
    out: Box<dyn Write + 'a>,
}

impl<'a> RosdepInstaller<'a> {
    pub fn new(context: &'a InstallerContext, lookup: &'a mut RosdepLookup) -> Self {
        Self::with_runner(context, lookup, Box::new(SystemRunner))
    }

    pub fn with_runner(
        context: &'a InstallerContext,
        lookup: &'a mut RosdepLookup,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        Self {
            context,
            lookup,
            runner,
            out: Box::new(std::io::stdout()),
        }
    }

    /// Print command listings to `out` instead of stdout
    pub fn with_output(mut self, out: Box<dyn Write + 'a>) -> Self {
        self.out = out;
        self
    }

    /// Resolved packages still missing, per installer key, plus resolution errors
    pub fn get_uninstalled(&mut self, packages: &[String]) -> Result<(Resolutions, ResolutionErrors)> {
        let context = self.context;
        debug!("Resolving for packages {:?}", packages);
        let (resolutions, errors) = self.lookup.resolve_all(packages, context)?;

        let mut uninstalled = BTreeMap::new();
        for (installer_key, resolved) in resolutions {
            let installer = context
                .get_installer(&installer_key)
                .map_err(|e| Error::Internal(e.to_string()))?;
            let missing = installer.get_packages_to_install(&resolved)?;
            debug!("[{}] missing: {:?}", installer_key, missing);
            uninstalled.insert(installer_key, missing);
        }
        Ok((uninstalled, errors))
    }

    /// Install every rosdep key needed by `packages`
    pub fn install(&mut self, packages: &[String], options: &InstallOptions) -> Result<InstallReport> {
        let mut keys_by_unit: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for package in packages {
            let unit = self.lookup.loader().unit_of_package(package)?;
            keys_by_unit
                .entry(unit)
                .or_default()
                .extend(self.lookup.get_rosdeps(package)?);
        }

        let mut run = InstallRun::default();
        for (unit, keys) in &keys_by_unit {
            for key in keys {
                let mut chain = Vec::new();
                match self.install_key(unit, key, options, &mut chain, &mut run) {
                    Ok(()) => {}
                    // Already recorded in run.failures
                    Err(Error::InstallFailed(_)) if options.continue_on_error => {}
                    Err(e) => return Err(e),
                }
            }
        }

        if !run.failures.is_empty() {
            return Err(Error::MultipleInstallsFailed(run.failures));
        }
        Ok(run.report)
    }

    fn install_key(
        &mut self,
        unit: &str,
        key: &str,
        options: &InstallOptions,
        chain: &mut Vec<String>,
        run: &mut InstallRun,
    ) -> Result<()> {
        if run.done.contains(key) {
            return Ok(());
        }
        if run.failed.contains(key) {
            return Err(Error::InstallFailed(InstallFailure::new(
                key,
                None,
                "failed earlier in this run",
            )));
        }
        if chain.iter().any(|k| k == key) {
            let mut cycle = chain.clone();
            cycle.push(key.to_string());
            return Err(Error::CycleDetected(cycle));
        }

        chain.push(key.to_string());
        let result = self.install_key_inner(unit, key, options, chain, run);
        chain.pop();

        match &result {
            Ok(()) => {
                run.done.insert(key.to_string());
            }
            Err(Error::InstallFailed(failure)) if failure.key == key => {
                warn!("{}", failure);
                run.failed.insert(key.to_string());
                run.failures.push(failure.clone());
            }
            Err(_) => {}
        }
        result
    }

    fn install_key_inner(
        &mut self,
        unit: &str,
        key: &str,
        options: &InstallOptions,
        chain: &mut Vec<String>,
        run: &mut InstallRun,
    ) -> Result<()> {
        let context = self.context;
        let failed = |command: Option<String>, cause: String| {
            Error::InstallFailed(InstallFailure::new(key, command, cause))
        };

        debug!("Processing rosdep {}", key);
        let resolved_key = self
            .lookup
            .resolve_key(unit, key, context)
            .map_err(|e| match e {
                Error::Internal(_) | Error::CycleDetected(_) => e,
                other => failed(None, other.to_string()),
            })?;
        let installer = context
            .get_installer(&resolved_key.installer_key)
            .map_err(|e| Error::Internal(e.to_string()))?;

        let depends = installer
            .get_depends(&resolved_key.spec)
            .map_err(|e| failed(None, e.to_string()))?;
        for dependency in &depends {
            debug!("{} depends on {}", key, dependency);
            match self.install_key(unit, dependency, options, chain, run) {
                Ok(()) => {}
                Err(Error::InstallFailed(_)) if options.continue_on_error => {
                    return Err(failed(None, format!("dependency [{}] failed", dependency)));
                }
                Err(e) => return Err(e),
            }
        }

        let resolved = &resolved_key.resolved;
        if installer
            .is_installed(resolved)
            .map_err(|e| failed(None, e.to_string()))?
        {
            debug!("rosdep {} already present", key);
            run.report.skipped.push(key.to_string());
            return Ok(());
        }

        let commands = installer
            .get_install_command(resolved, options.interactive)
            .map_err(|e| failed(None, e.to_string()))?;
        if options.verbose || options.simulate {
            writeln!(self.out, "# {} [{}]", key, resolved_key.installer_key)?;
            writeln!(self.out, "{}", format_commands(&commands))?;
            self.out.flush()?;
        }
        if options.simulate {
            run.report.simulated.push(key.to_string());
            run.report.commands.extend(commands);
            return Ok(());
        }

        for command in &commands {
            let succeeded = self
                .runner
                .run(command)
                .map_err(|e| failed(Some(command.to_string()), e.to_string()))?;
            run.report.commands.push(command.clone());
            if !succeeded {
                return Err(failed(
                    Some(command.to_string()),
                    "command exited with a failure status".to_string(),
                ));
            }
        }

        let still_missing = installer
            .get_packages_to_install(resolved)
            .map_err(|e| failed(None, e.to_string()))?;
        if !still_missing.is_empty() {
            let command = (!commands.is_empty()).then(|| format_commands(&commands));
            return Err(failed(
                command,
                format!("not detected after install: {}", still_missing.join(" ")),
            ));
        }

        info!("Installed {}", key);
        run.report.installed.push(key.to_string());
        Ok(())
    }
}
