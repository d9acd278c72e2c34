// src/context.rs

//! Installer context
//!
//! Binds installer keys to backends, OS keys to their ordered installer
//! keys, and resolves the OS identity used for rule lookups. Built once at
//! startup by platform registration and passed by reference afterwards.

use crate::config::RosdepConfig;
use crate::error::{Error, Result};
use crate::installers::{self, Installer};
use crate::os_detect::{OsDetect, OsRelease, OsVersionType};
use std::collections::HashMap;
use tracing::debug;

pub struct InstallerContext {
    installers: HashMap<String, Box<dyn Installer>>,
    os_installers: HashMap<String, Vec<String>>,
    default_os_installer: HashMap<String, String>,
    os_version_type: HashMap<String, OsVersionType>,
    os_detect: Box<dyn OsDetect>,
    os_override: Option<(String, String)>,
}

impl InstallerContext {
    /// Create a context that detects the host OS from os-release
    pub fn new() -> Self {
        Self::with_os_detect(Box::new(OsRelease::new()))
    }

    pub fn with_os_detect(os_detect: Box<dyn OsDetect>) -> Self {
        Self {
            installers: HashMap::new(),
            os_installers: HashMap::new(),
            default_os_installer: HashMap::new(),
            os_version_type: HashMap::new(),
            os_detect,
            os_override: None,
        }
    }

    /// Apply settings from configuration
    pub fn apply_config(&mut self, config: &RosdepConfig) -> Result<()> {
        if let Some((name, version)) = config.os_override()? {
            self.set_os_override(&name, &version);
        }
        Ok(())
    }

    /// Force the OS identity used for resolution. Not validated against known OS keys.
    pub fn set_os_override(&mut self, os_name: &str, os_version: &str) {
        debug!("OS override: {} {}", os_name, os_version);
        self.os_override = Some((os_name.to_string(), os_version.to_string()));
    }

    pub fn get_os_override(&self) -> Option<(&str, &str)> {
        self.os_override
            .as_ref()
            .map(|(name, version)| (name.as_str(), version.as_str()))
    }

    pub fn get_os_version_type(&self, os_name: &str) -> OsVersionType {
        self.os_version_type
            .get(os_name)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_os_version_type(&mut self, os_name: &str, version_type: OsVersionType) {
        self.os_version_type.insert(os_name.to_string(), version_type);
    }

    /// OS name and version key, honoring any override
    pub fn get_os_name_and_version(&self) -> Result<(String, String)> {
        if let Some((name, version)) = &self.os_override {
            return Ok((name.clone(), version.clone()));
        }
        let os_name = self.os_detect.name()?;
        let os_version = match self.get_os_version_type(&os_name) {
            OsVersionType::Codename => self.os_detect.codename()?,
            OsVersionType::Version => self.os_detect.version()?,
        };
        Ok((os_name, os_version))
    }

    pub fn get_os_detect(&self) -> &dyn OsDetect {
        self.os_detect.as_ref()
    }

    /// Register an installer, replacing any existing one for `installer_key`
    pub fn set_installer(&mut self, installer_key: &str, installer: Box<dyn Installer>) {
        self.installers.insert(installer_key.to_string(), installer);
    }

    /// Register one of the built-in backends by name
    pub fn register_backend(&mut self, installer_key: &str, backend: &str) -> Result<()> {
        let installer: Box<dyn Installer> = match backend {
            installers::apt::INSTALLER_KEY => Box::new(installers::apt::installer()),
            installers::dnf::INSTALLER_KEY => Box::new(installers::dnf::installer()),
            installers::pacman::INSTALLER_KEY => Box::new(installers::pacman::installer()),
            installers::pip::INSTALLER_KEY => Box::new(installers::pip::installer()),
            other => {
                return Err(Error::InvalidInstaller(format!(
                    "[{}] is not a known installer backend",
                    other
                )));
            }
        };
        self.set_installer(installer_key, installer);
        Ok(())
    }

    pub fn get_installer(&self, installer_key: &str) -> Result<&dyn Installer> {
        self.installers
            .get(installer_key)
            .map(|i| i.as_ref())
            .ok_or_else(|| Error::Lookup(format!("no installer registered for [{}]", installer_key)))
    }

    /// Registered installer keys, sorted
    pub fn get_installer_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.installers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// OS keys with at least one installer, sorted
    pub fn get_os_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.os_installers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Append an installer key to the OS's ordered list.
    ///
    /// Each key appears at most once per OS; adding a key that is already
    /// listed keeps its original priority.
    pub fn add_os_installer_key(&mut self, os_key: &str, installer_key: &str) -> Result<()> {
        self.get_installer(installer_key)?;
        let keys = self.os_installers.entry(os_key.to_string()).or_default();
        if !keys.iter().any(|k| k == installer_key) {
            keys.push(installer_key.to_string());
        }
        Ok(())
    }

    /// Installer keys for an OS in priority order; empty if none registered
    pub fn get_os_installer_keys(&self, os_key: &str) -> Vec<String> {
        self.os_installers.get(os_key).cloned().unwrap_or_default()
    }

    /// Set the default installer for an OS; requires a prior `add_os_installer_key`
    pub fn set_default_os_installer_key(&mut self, os_key: &str, installer_key: &str) -> Result<()> {
        let keys = self
            .os_installers
            .get(os_key)
            .ok_or_else(|| Error::Lookup(format!("unknown OS: {}", os_key)))?;
        if !keys.iter().any(|k| k == installer_key) {
            return Err(Error::Lookup(format!(
                "installer [{}] is not associated with OS [{}]. call add_os_installer_key() first",
                installer_key, os_key
            )));
        }
        self.get_installer(installer_key)?;
        self.default_os_installer
            .insert(os_key.to_string(), installer_key.to_string());
        Ok(())
    }

    /// Default installer key for an OS, `None` if no default is set
    pub fn get_default_os_installer_key(&self, os_key: &str) -> Result<Option<&str>> {
        if !self.os_installers.contains_key(os_key) {
            return Err(Error::Lookup(format!("unknown OS: {}", os_key)));
        }
        Ok(self.default_os_installer.get(os_key).map(String::as_str))
    }
}

impl Default for InstallerContext {
    fn default() -> Self {
        Self::new()
    }
}
