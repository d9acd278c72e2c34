// src/installers/dnf.rs

//! DNF installer for Fedora and RHEL systems
//!
//! Presence is detected through the RPM database.

use super::package_manager::{InstallTemplate, PackageManagerInstaller};
use crate::error::{Error, Result};
use std::process::Command;
use tracing::debug;

pub const INSTALLER_KEY: &str = "dnf";

/// Parse `rpm -q --qf '%{NAME}\n' <pkgs>` output into installed names
pub fn parse_rpm_query(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.ends_with("is not installed"))
        .map(String::from)
        .collect()
}

pub fn rpm_detect(packages: &[String]) -> Result<Vec<String>> {
    debug!("Querying rpm for {} packages", packages.len());

    let output = Command::new("rpm")
        .args(["-q", "--qf", "%{NAME}\n"])
        .args(packages)
        .output()
        .map_err(|e| Error::Detection(format!("Failed to run rpm: {}. Is rpm installed?", e)))?;

    Ok(parse_rpm_query(&String::from_utf8_lossy(&output.stdout)))
}

pub fn installer() -> PackageManagerInstaller {
    PackageManagerInstaller::new(
        INSTALLER_KEY,
        Box::new(rpm_detect),
        InstallTemplate::new(&["sudo", "dnf", "install"]).with_noninteractive_flag("-y"),
    )
}
