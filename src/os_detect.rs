// src/os_detect.rs

//! Operating system detection
//!
//! Resolution only needs an OS name plus a version key, which is either
//! the raw version string or the release codename depending on the OS.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Default location of the os-release file
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Provider of the host OS identity
pub trait OsDetect {
    /// OS key, e.g. "ubuntu"
    fn name(&self) -> Result<String>;

    /// Raw version string, e.g. "22.04"
    fn version(&self) -> Result<String>;

    /// Release codename, e.g. "jammy"
    fn codename(&self) -> Result<String>;
}

/// Which value identifies an OS release in rule files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OsVersionType {
    #[default]
    Version,
    Codename,
}

/// Detection backed by an os-release file.
///
/// The file is read once, on first use; later calls reuse the parsed fields.
#[derive(Debug, Clone)]
pub struct OsRelease {
    path: PathBuf,
    info: OnceLock<OsReleaseInfo>,
}

/// Fields of interest from an os-release file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsReleaseInfo {
    pub id: String,
    pub version_id: Option<String>,
    pub codename: Option<String>,
}

impl OsRelease {
    pub fn new() -> Self {
        Self::with_path(OS_RELEASE_PATH)
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            info: OnceLock::new(),
        }
    }

    /// Parse os-release content
    pub fn parse(content: &str) -> Result<OsReleaseInfo> {
        let mut info = OsReleaseInfo::default();
        let mut ubuntu_codename = None;

        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
            match key {
                "ID" => info.id = value,
                "VERSION_ID" => info.version_id = Some(value),
                "VERSION_CODENAME" if !value.is_empty() => info.codename = Some(value),
                "UBUNTU_CODENAME" if !value.is_empty() => ubuntu_codename = Some(value),
                _ => {}
            }
        }

        if info.codename.is_none() {
            info.codename = ubuntu_codename;
        }

        if info.id.is_empty() {
            return Err(Error::Lookup("os-release does not declare an ID".to_string()));
        }
        Ok(info)
    }

    fn read(&self) -> Result<&OsReleaseInfo> {
        if let Some(info) = self.info.get() {
            return Ok(info);
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Lookup(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let info = Self::parse(&content)?;
        debug!("Detected OS {:?} from {}", info, self.path.display());
        Ok(self.info.get_or_init(|| info))
    }
}

impl Default for OsRelease {
    fn default() -> Self {
        Self::new()
    }
}

impl OsDetect for OsRelease {
    fn name(&self) -> Result<String> {
        Ok(self.read()?.id.clone())
    }

    fn version(&self) -> Result<String> {
        self.read()?
            .version_id
            .clone()
            .ok_or_else(|| Error::Lookup("os-release does not declare VERSION_ID".to_string()))
    }

    fn codename(&self) -> Result<String> {
        self.read()?
            .codename
            .clone()
            .ok_or_else(|| Error::Lookup("os-release does not declare a codename".to_string()))
    }
}

/// A fixed OS identity, used for tests and cross-building
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedOs {
    pub name: String,
    pub version: String,
    pub codename: String,
}

impl FixedOs {
    pub fn new(name: &str, version: &str, codename: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            codename: codename.to_string(),
        }
    }
}

impl OsDetect for FixedOs {
    fn name(&self) -> Result<String> {
        Ok(self.name.clone())
    }

    fn version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    fn codename(&self) -> Result<String> {
        Ok(self.codename.clone())
    }
}
