// src/installers/apt.rs

//! APT installer for Debian and Ubuntu systems
//!
//! Presence is detected with `dpkg-query`, installs go through `apt-get`.

use super::package_manager::{InstallTemplate, PackageManagerInstaller};
use crate::error::{Error, Result};
use std::process::Command;
use tracing::debug;

pub const INSTALLER_KEY: &str = "apt";

/// Status reported by dpkg for a fully installed package
const INSTALLED_STATUS: &str = "install ok installed";

/// Parse `dpkg-query -W -f '${Package} ${Status}\n'` output into installed names
pub fn parse_dpkg_query(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (name, status) = line.trim().split_once(' ')?;
            (status.trim() == INSTALLED_STATUS).then(|| name.to_string())
        })
        .collect()
}

/// Return the packages from `packages` that dpkg reports as installed
pub fn dpkg_detect(packages: &[String]) -> Result<Vec<String>> {
    debug!("Querying dpkg for {} packages", packages.len());

    // dpkg-query exits non-zero when any name is unknown but still prints the rest
    let output = Command::new("dpkg-query")
        .args(["-W", "-f", "${Package} ${Status}\n"])
        .args(packages)
        .output()
        .map_err(|e| Error::Detection(format!("Failed to run dpkg-query: {}. Is dpkg installed?", e)))?;

    Ok(parse_dpkg_query(&String::from_utf8_lossy(&output.stdout)))
}

pub fn installer() -> PackageManagerInstaller {
    PackageManagerInstaller::new(
        INSTALLER_KEY,
        Box::new(dpkg_detect),
        InstallTemplate::new(&["sudo", "apt-get", "install"]).with_noninteractive_flag("-y"),
    )
}
