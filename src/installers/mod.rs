// src/installers/mod.rs

//! Installer backends
//!
//! An installer turns the OS-specific part of a rosdep rule into a
//! resolved list of package identifiers, checks whether those are present
//! and builds the commands that install the missing ones.
//!
//! # Accepted spec shapes
//!
//! ```yaml
//! boost: libboost-dev libboost-python-dev     # whitespace-separated string
//! boost: [libboost-dev, libboost-python-dev]  # sequence of names
//! boost:
//!   packages: [libboost-dev]                  # mapping with `packages`
//!   depends: [python]                         # only for supports_depends backends
//! ```

pub mod apt;
pub mod dnf;
pub mod package_manager;
pub mod pacman;
pub mod pip;

pub use package_manager::{DetectFn, InstallTemplate, PackageManagerInstaller};

use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Resolved package identifiers for one installer
pub type Resolved = Vec<String>;

/// OS-specific rule data handed to an installer
#[derive(Debug, Clone, PartialEq)]
pub enum RawSpec {
    Str(String),
    List(Vec<String>),
    Map(Mapping),
}

impl RawSpec {
    /// Decode a YAML value, rejecting anything but string, string list or mapping
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Sequence(items) => Ok(Self::List(string_list(items)?)),
            Value::Mapping(map) => Ok(Self::Map(map.clone())),
            other => Err(Error::InvalidData(format!(
                "installer spec must be a string, list or mapping, found {:?}",
                other
            ))),
        }
    }

    /// Look up a field of a mapping spec
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Map(map) => map.get(name),
            _ => None,
        }
    }
}

fn string_list(items: &[Value]) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(Error::InvalidData(format!(
                "expected a package name, found {:?}",
                other
            ))),
        })
        .collect()
}

/// Split a spec value into names: a whitespace-separated string or a list
pub(crate) fn names_from_value(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(s.split_whitespace().map(String::from).collect()),
        Value::Sequence(items) => string_list(items),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::InvalidData(format!(
            "expected a string or list of names, found {:?}",
            other
        ))),
    }
}

/// One command to run, as an argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    pub argv: Vec<String>,
}

impl InstallCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for InstallCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

/// Render a list of commands the way they would be run
pub fn format_commands(commands: &[InstallCommand]) -> String {
    commands
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Backend capable of checking and installing packages via one manager
pub trait Installer {
    /// True iff every item in `resolved` is already present
    fn is_installed(&self, resolved: &[String]) -> Result<bool>;

    /// Commands that install everything in `resolved` not yet installed.
    ///
    /// `interactive == false` must suppress confirmation prompts.
    fn get_install_command(&self, resolved: &[String], interactive: bool)
        -> Result<Vec<InstallCommand>>;

    /// Whether specs for this backend may declare `depends`
    fn supports_depends(&self) -> bool {
        false
    }

    /// Rosdep keys this spec depends on
    fn get_depends(&self, _spec: &RawSpec) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Normalize a raw spec into package identifiers
    fn resolve(&self, spec: &RawSpec) -> Result<Resolved>;

    /// Merge several resolved lists into one sorted, deduplicated list
    fn unique(&self, resolved: &[&[String]]) -> Resolved {
        let set: BTreeSet<&String> = resolved.iter().flat_map(|r| r.iter()).collect();
        set.into_iter().cloned().collect()
    }

    /// `resolved` minus what is already installed
    fn get_packages_to_install(&self, resolved: &[String]) -> Result<Resolved>;
}
