// src/installers/package_manager.rs

//! Generic "list of package names" installer
//!
//! Most native package managers share the same shape: the rule names a
//! list of packages, a query tool reports which of them are installed, and
//! one install command takes the missing names as arguments.

use super::{InstallCommand, Installer, RawSpec, Resolved, names_from_value};
use crate::error::Result;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Returns the subset of the given packages that is installed
pub type DetectFn = Box<dyn Fn(&[String]) -> Result<Vec<String>>>;

/// How to build install commands for a package manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTemplate {
    /// Leading argv, e.g. `["sudo", "apt-get", "install"]`
    pub prefix: Vec<String>,
    /// Flag that suppresses confirmation prompts
    pub noninteractive_flag: Option<String>,
    /// Emit one command per package instead of one for all
    pub one_per_package: bool,
}

impl InstallTemplate {
    pub fn new(prefix: &[&str]) -> Self {
        Self {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            noninteractive_flag: None,
            one_per_package: false,
        }
    }

    pub fn with_noninteractive_flag(mut self, flag: &str) -> Self {
        self.noninteractive_flag = Some(flag.to_string());
        self
    }

    pub fn one_per_package(mut self) -> Self {
        self.one_per_package = true;
        self
    }

    fn command_for(&self, packages: &[String], interactive: bool) -> InstallCommand {
        let mut argv = self.prefix.clone();
        if !interactive {
            if let Some(flag) = &self.noninteractive_flag {
                argv.push(flag.clone());
            }
        }
        argv.extend(packages.iter().cloned());
        InstallCommand { argv }
    }

    /// Build the commands for `packages`; empty input yields no commands
    pub fn build(&self, packages: &[String], interactive: bool) -> Vec<InstallCommand> {
        if packages.is_empty() {
            return Vec::new();
        }
        if self.one_per_package {
            packages
                .iter()
                .map(|p| self.command_for(std::slice::from_ref(p), interactive))
                .collect()
        } else {
            vec![self.command_for(packages, interactive)]
        }
    }
}

pub struct PackageManagerInstaller {
    name: String,
    detect: DetectFn,
    template: InstallTemplate,
    supports_depends: bool,
}

impl PackageManagerInstaller {
    pub fn new(name: impl Into<String>, detect: DetectFn, template: InstallTemplate) -> Self {
        Self {
            name: name.into(),
            detect,
            template,
            supports_depends: false,
        }
    }

    /// Allow rules for this installer to declare `depends`
    pub fn with_depends(mut self) -> Self {
        self.supports_depends = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &InstallTemplate {
        &self.template
    }
}

impl fmt::Debug for PackageManagerInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageManagerInstaller")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("supports_depends", &self.supports_depends)
            .finish()
    }
}

impl Installer for PackageManagerInstaller {
    fn is_installed(&self, resolved: &[String]) -> Result<bool> {
        Ok(self.get_packages_to_install(resolved)?.is_empty())
    }

    fn get_install_command(
        &self,
        resolved: &[String],
        interactive: bool,
    ) -> Result<Vec<InstallCommand>> {
        let packages = self.get_packages_to_install(resolved)?;
        Ok(self.template.build(&packages, interactive))
    }

    fn supports_depends(&self) -> bool {
        self.supports_depends
    }

    fn get_depends(&self, spec: &RawSpec) -> Result<Vec<String>> {
        if !self.supports_depends {
            return Ok(Vec::new());
        }
        match spec.field("depends") {
            Some(value) => names_from_value(value),
            None => Ok(Vec::new()),
        }
    }

    fn resolve(&self, spec: &RawSpec) -> Result<Resolved> {
        match spec {
            RawSpec::Map(_) => match spec.field("packages") {
                Some(value) => names_from_value(value),
                None => Ok(Vec::new()),
            },
            RawSpec::Str(s) => Ok(s.split_whitespace().map(String::from).collect()),
            RawSpec::List(items) => Ok(items.clone()),
        }
    }

    fn get_packages_to_install(&self, resolved: &[String]) -> Result<Resolved> {
        if resolved.is_empty() {
            return Ok(Vec::new());
        }
        let installed: HashSet<String> = (self.detect)(resolved)?.into_iter().collect();
        debug!("[{}] installed: {:?}", self.name, installed);

        let mut seen = HashSet::new();
        Ok(resolved
            .iter()
            .filter(|p| !installed.contains(*p) && seen.insert(p.as_str()))
            .cloned()
            .collect())
    }
}
