// src/platforms.rs

//! Built-in platform definitions
//!
//! Registers the bundled installer backends and the OS keys they serve.
//! OS keys match the `ID` field of os-release.

use crate::context::InstallerContext;
use crate::error::Result;
use crate::installers::{apt, dnf, pacman, pip};
use crate::os_detect::OsVersionType;
use tracing::debug;

struct Platform {
    os_key: &'static str,
    default_installer: &'static str,
    version_type: OsVersionType,
}

const PLATFORMS: &[Platform] = &[
    Platform {
        os_key: "ubuntu",
        default_installer: apt::INSTALLER_KEY,
        version_type: OsVersionType::Codename,
    },
    Platform {
        os_key: "debian",
        default_installer: apt::INSTALLER_KEY,
        version_type: OsVersionType::Codename,
    },
    Platform {
        os_key: "mint",
        default_installer: apt::INSTALLER_KEY,
        version_type: OsVersionType::Version,
    },
    Platform {
        os_key: "linuxmint",
        default_installer: apt::INSTALLER_KEY,
        version_type: OsVersionType::Version,
    },
    Platform {
        os_key: "arch",
        default_installer: pacman::INSTALLER_KEY,
        version_type: OsVersionType::Version,
    },
    Platform {
        os_key: "fedora",
        default_installer: dnf::INSTALLER_KEY,
        version_type: OsVersionType::Version,
    },
    Platform {
        os_key: "rhel",
        default_installer: dnf::INSTALLER_KEY,
        version_type: OsVersionType::Version,
    },
];

/// Register the bundled backends and every known platform
pub fn register_platforms(context: &mut InstallerContext) -> Result<()> {
    for backend in [
        apt::INSTALLER_KEY,
        dnf::INSTALLER_KEY,
        pacman::INSTALLER_KEY,
        pip::INSTALLER_KEY,
    ] {
        context.register_backend(backend, backend)?;
    }

    for platform in PLATFORMS {
        context.add_os_installer_key(platform.os_key, platform.default_installer)?;
        context.add_os_installer_key(platform.os_key, pip::INSTALLER_KEY)?;
        context.set_default_os_installer_key(platform.os_key, platform.default_installer)?;
        context.set_os_version_type(platform.os_key, platform.version_type);
    }

    debug!("Registered {} platforms", PLATFORMS.len());
    Ok(())
}
