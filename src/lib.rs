// src/lib.rs

//! Rosdep
//!
//! Resolves abstract system dependency keys declared by packages into
//! concrete per-OS package lists and installs whatever is missing.
//!
//! # Architecture
//!
//! - Rule files: per-unit `rosdep.yaml` plus an optional per-user override
//! - Views: per-unit merge of inherited rules with conflict detection
//! - Installer context: explicit registry of backends and OS keys
//! - Installers: one trait, one generic package-list backend per manager

pub mod config;
pub mod context;
mod error;
pub mod installer;
pub mod installers;
pub mod loader;
pub mod lookup;
pub mod model;
pub mod os_detect;
pub mod platforms;
pub mod runner;
pub mod view;

pub use config::RosdepConfig;
pub use context::InstallerContext;
pub use error::{Error, InstallFailure, Result};
pub use installer::{InstallOptions, InstallReport, RosdepInstaller};
pub use installers::{InstallCommand, Installer, RawSpec, Resolved};
pub use loader::{DirectoryLoader, LoadError, RosdepLoader, StackManifest};
pub use lookup::{OVERRIDE_ENTRY, ResolvedKey, RosdepLookup};
pub use model::{Database, DatabaseEntry, DependencyDefinition};
pub use os_detect::{FixedOs, OsDetect, OsRelease, OsVersionType};
pub use platforms::register_platforms;
pub use runner::{CommandRunner, SystemRunner};
pub use view::{DefinitionConflict, RosdepView};
