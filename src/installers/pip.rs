// src/installers/pip.rs

//! Pip installer for Python packages
//!
//! Pip does not order system-level prerequisites, so rules for this
//! installer may declare `depends` on other rosdep keys.

use super::package_manager::{InstallTemplate, PackageManagerInstaller};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::process::Command;
use tracing::debug;

pub const INSTALLER_KEY: &str = "pip";

/// Canonical form of a distribution name: lowercase, `_` and `.` as `-`
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['_', '.'], "-")
}

/// Parse `pip freeze` output into normalized distribution names
pub fn parse_pip_freeze(output: &str) -> HashSet<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("-e "))
        .filter_map(|line| {
            let name = line.split(['=', ' ', '@']).next()?;
            (!name.is_empty()).then(|| normalize_name(name))
        })
        .collect()
}

/// Select the requested packages that appear in `pip freeze` output
pub fn installed_from_freeze(output: &str, packages: &[String]) -> Vec<String> {
    let installed = parse_pip_freeze(output);
    packages
        .iter()
        .filter(|p| installed.contains(&normalize_name(p)))
        .cloned()
        .collect()
}

pub fn pip_detect(packages: &[String]) -> Result<Vec<String>> {
    debug!("Querying pip for {} packages", packages.len());

    let output = Command::new("pip")
        .arg("freeze")
        .output()
        .map_err(|e| Error::Detection(format!("Failed to run pip: {}. Is pip installed?", e)))?;

    if !output.status.success() {
        return Err(Error::Detection(format!(
            "pip freeze failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(installed_from_freeze(&String::from_utf8_lossy(&output.stdout), packages))
}

pub fn installer() -> PackageManagerInstaller {
    PackageManagerInstaller::new(
        INSTALLER_KEY,
        Box::new(pip_detect),
        InstallTemplate::new(&["sudo", "pip", "install", "-U"]).one_per_package(),
    )
    .with_depends()
}
