// src/installers/pacman.rs

//! Pacman installer for Arch Linux systems

use super::package_manager::{InstallTemplate, PackageManagerInstaller};
use crate::error::{Error, Result};
use std::process::Command;
use tracing::debug;

pub const INSTALLER_KEY: &str = "pacman";

/// Parse `pacman -Q <pkgs>` output ("name version" per installed package)
pub fn parse_pacman_query(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(String::from)
        .collect()
}

pub fn pacman_detect(packages: &[String]) -> Result<Vec<String>> {
    debug!("Querying pacman for {} packages", packages.len());

    // Missing packages are reported on stderr; stdout still lists the installed ones
    let output = Command::new("pacman")
        .arg("-Q")
        .args(packages)
        .output()
        .map_err(|e| Error::Detection(format!("Failed to run pacman: {}. Is pacman installed?", e)))?;

    Ok(parse_pacman_query(&String::from_utf8_lossy(&output.stdout)))
}

pub fn installer() -> PackageManagerInstaller {
    PackageManagerInstaller::new(
        INSTALLER_KEY,
        Box::new(pacman_detect),
        InstallTemplate::new(&["sudo", "pacman", "-S", "--needed"])
            .with_noninteractive_flag("--noconfirm"),
    )
}
