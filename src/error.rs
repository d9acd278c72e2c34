// src/error.rs

//! Error types for rosdep
//!
//! A single crate-wide error enum. Resolution errors for individual
//! dependency keys are returned as data by the lookup layer; every other
//! variant propagates to the immediate caller.

use crate::view::DefinitionConflict;
use std::fmt;
use thiserror::Error;

/// A single dependency key that failed to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFailure {
    /// Dependency key that was being installed
    pub key: String,
    /// The command that was attempted, if one was built
    pub command: Option<String>,
    /// Why the install was considered failed
    pub cause: String,
}

impl InstallFailure {
    pub fn new(key: impl Into<String>, command: Option<String>, cause: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            command,
            cause: cause.into(),
        }
    }
}

impl fmt::Display for InstallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.command {
            Some(command) => write!(f, "{}: `{}` failed: {}", self.key, command, self.cause),
            None => write!(f, "{}: {}", self.key, self.cause),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Unknown installer, OS, package, unit or dependency key
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// An installer backend could not be registered
    #[error("Invalid installer: {0}")]
    InvalidInstaller(String),

    /// Malformed rule file or dependency spec
    #[error("Invalid rosdep data: {0}")]
    InvalidData(String),

    /// Two definitions of the same key disagree
    #[error(transparent)]
    Conflict(Box<DefinitionConflict>),

    /// A dependency key could not be resolved for the current OS
    #[error("Cannot resolve rosdep key [{key}]: {message}")]
    Resolution { key: String, message: String },

    #[error("Install failed: {0}")]
    InstallFailed(InstallFailure),

    #[error("{} rosdep(s) failed to install:\n{}", .0.len(), format_failures(.0))]
    MultipleInstallsFailed(Vec<InstallFailure>),

    /// A presence probe could not be run
    #[error("Detection failed: {0}")]
    Detection(String),

    /// Internal inconsistency, always a programming or configuration bug
    #[error("Internal error: {0}")]
    Internal(String),

    /// Dependency keys reference each other in a loop
    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

fn format_failures(failures: &[InstallFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  - {}", f))
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<DefinitionConflict> for Error {
    fn from(conflict: DefinitionConflict) -> Self {
        Error::Conflict(Box::new(conflict))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
