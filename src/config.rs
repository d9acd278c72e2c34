// src/config.rs

//! Rosdep configuration
//!
//! Settings come from an optional TOML file, overlaid by environment
//! variables.
//!
//! # Example config.toml
//!
//! ```toml
//! ros_home = "/home/builder/.ros"
//! os_override = "ubuntu:jammy"
//! package_path = ["/opt/ros/stacks", "/home/builder/stacks"]
//! verbose = false
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default system-wide config file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rosdep/config.toml";

/// Name of the override rule file inside the ROS home directory
pub const OVERRIDE_FILE_NAME: &str = "rosdep.yaml";

pub const ROS_HOME_ENV: &str = "ROS_HOME";
pub const OS_OVERRIDE_ENV: &str = "ROS_OS_OVERRIDE";
pub const PACKAGE_PATH_ENV: &str = "ROS_PACKAGE_PATH";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RosdepConfig {
    /// Directory holding the per-user override file
    pub ros_home: Option<PathBuf>,

    /// Forced OS identity as "name:version"
    pub os_override: Option<String>,

    /// Discovery roots, searched in order
    pub package_path: Vec<PathBuf>,

    /// Print commands before running them
    pub verbose: bool,
}

impl RosdepConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.os_override()?;
        Ok(config)
    }

    /// Overlay values from the process environment
    pub fn with_env(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Overlay values from an environment lookup function
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(home) = lookup(ROS_HOME_ENV).filter(|v| !v.is_empty()) {
            self.ros_home = Some(PathBuf::from(home));
        }
        if let Some(os) = lookup(OS_OVERRIDE_ENV).filter(|v| !v.is_empty()) {
            self.os_override = Some(os);
        }
        if let Some(path) = lookup(PACKAGE_PATH_ENV) {
            let roots: Vec<PathBuf> = std::env::split_paths(&path)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !roots.is_empty() {
                self.package_path = roots;
            }
        }
        self
    }

    /// Load the default config file if present, then overlay the environment
    pub fn from_env() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        let base = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        Ok(base.with_env())
    }

    /// Parsed OS override, if configured
    pub fn os_override(&self) -> Result<Option<(String, String)>> {
        match &self.os_override {
            None => Ok(None),
            Some(value) => match value.split_once(':') {
                Some((name, version)) if !name.is_empty() => {
                    Ok(Some((name.to_string(), version.to_string())))
                }
                _ => Err(Error::InvalidData(format!(
                    "OS override must be NAME:VERSION, got [{}]",
                    value
                ))),
            },
        }
    }

    /// Directory holding the override file
    pub fn ros_home(&self) -> PathBuf {
        if let Some(home) = &self.ros_home {
            return home.clone();
        }
        dirs::home_dir()
            .map(|h| h.join(".ros"))
            .unwrap_or_else(|| PathBuf::from(".ros"))
    }

    /// Location of the per-user override rule file
    pub fn override_file(&self) -> PathBuf {
        self.ros_home().join(OVERRIDE_FILE_NAME)
    }
}
