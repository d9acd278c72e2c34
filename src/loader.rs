// src/loader.rs

//! Discovery of units, packages and their rule files
//!
//! The lookup layer only sees the `RosdepLoader` trait. `DirectoryLoader`
//! discovers units on disk from `stack.toml` manifests.
//!
//! # Example stack.toml
//!
//! ```toml
//! name = "stack1"
//! depends = ["ros"]
//!
//! [packages]
//! stack1_p1 = ["stack1_dep1", "stack1_p1_dep1"]
//! stack1_p2 = ["stack1_dep1", "stack1_p2_dep1"]
//! ```
//!
//! The unit's rules live in `rosdep.yaml` next to the manifest. A manifest
//! that cannot be read or parsed is skipped and reported through
//! [`RosdepLoader::discovery_errors`].

use crate::error::{Error, Result};
use crate::model::{DatabaseEntry, load_rules_file};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = "stack.toml";
pub const RULES_FILE: &str = "rosdep.yaml";

/// How deep below each root a manifest may sit
const MAX_SEARCH_DEPTH: usize = 4;

/// A rule source that failed to load
#[derive(Debug)]
pub struct LoadError {
    pub origin: String,
    pub error: Error,
}

/// Source of units, packages and raw rule entries
pub trait RosdepLoader {
    /// All discoverable units, sorted
    fn unit_names(&self) -> Result<Vec<String>>;

    /// All discoverable packages, sorted
    fn package_names(&self) -> Result<Vec<String>>;

    /// Unit that contains `package`
    fn unit_of_package(&self, package: &str) -> Result<String>;

    /// Rosdep keys declared by `package`
    fn package_rosdeps(&self, package: &str) -> Result<Vec<String>>;

    /// Load the raw rule entry of a unit
    fn load_unit(&self, unit: &str) -> Result<DatabaseEntry>;

    /// Identifier of a unit's rule source, used in error reports
    fn unit_origin(&self, unit: &str) -> String {
        unit.to_string()
    }

    /// Sources skipped while discovering units
    fn discovery_errors(&self) -> Vec<LoadError> {
        Vec::new()
    }
}

/// Parsed `stack.toml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StackManifest {
    pub name: String,

    #[serde(default)]
    pub depends: Vec<String>,

    /// Package name -> declared rosdep keys
    #[serde(default)]
    pub packages: BTreeMap<String, Vec<String>>,
}

impl StackManifest {
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        if manifest.name.is_empty() {
            return Err(Error::InvalidData("stack manifest has an empty name".to_string()));
        }
        Ok(manifest)
    }
}

#[derive(Debug, Clone)]
struct DiscoveredUnit {
    manifest: StackManifest,
    dir: PathBuf,
}

/// Discovers units under a list of root directories
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoader {
    units: BTreeMap<String, DiscoveredUnit>,
    package_units: HashMap<String, String>,
    /// Manifest path -> reason it was skipped
    skipped: Vec<(PathBuf, String)>,
}

impl DirectoryLoader {
    /// Scan `roots` for manifests. Earlier roots shadow later ones.
    pub fn new(roots: &[PathBuf]) -> Result<Self> {
        let mut loader = Self::default();

        for root in roots {
            if !root.is_dir() {
                warn!("Package path entry {} is not a directory", root.display());
                continue;
            }
            for entry in WalkDir::new(root)
                .max_depth(MAX_SEARCH_DEPTH)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE {
                    if let Err(e) = loader.add_manifest(entry.path()) {
                        warn!("Skipping {}: {}", entry.path().display(), e);
                        loader.skipped.push((entry.path().to_path_buf(), e.to_string()));
                    }
                }
            }
        }

        debug!(
            "Discovered {} units with {} packages",
            loader.units.len(),
            loader.package_units.len()
        );
        Ok(loader)
    }

    fn add_manifest(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let manifest = StackManifest::parse(&content)?;

        if self.units.contains_key(&manifest.name) {
            debug!("Unit {} at {} is shadowed", manifest.name, path.display());
            return Ok(());
        }

        for package in manifest.packages.keys() {
            self.package_units
                .entry(package.clone())
                .or_insert_with(|| manifest.name.clone());
        }

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.units
            .insert(manifest.name.clone(), DiscoveredUnit { manifest, dir });
        Ok(())
    }

    fn unit(&self, name: &str) -> Result<&DiscoveredUnit> {
        self.units
            .get(name)
            .ok_or_else(|| Error::Lookup(format!("unknown unit [{}]", name)))
    }

    /// Path of a unit's rule file
    pub fn rules_path(&self, unit: &str) -> Result<PathBuf> {
        Ok(self.unit(unit)?.dir.join(RULES_FILE))
    }
}

impl RosdepLoader for DirectoryLoader {
    fn unit_names(&self) -> Result<Vec<String>> {
        Ok(self.units.keys().cloned().collect())
    }

    fn package_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.package_units.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn unit_of_package(&self, package: &str) -> Result<String> {
        self.package_units
            .get(package)
            .cloned()
            .ok_or_else(|| Error::Lookup(format!("unknown package [{}]", package)))
    }

    fn package_rosdeps(&self, package: &str) -> Result<Vec<String>> {
        let unit = self.unit_of_package(package)?;
        Ok(self
            .unit(&unit)?
            .manifest
            .packages
            .get(package)
            .cloned()
            .unwrap_or_default())
    }

    fn load_unit(&self, unit: &str) -> Result<DatabaseEntry> {
        let discovered = self.unit(unit)?;
        let path = discovered.dir.join(RULES_FILE);
        let rules = if path.is_file() {
            load_rules_file(&path)?
        } else {
            BTreeMap::new()
        };
        Ok(DatabaseEntry::new(
            rules,
            discovered.manifest.depends.clone(),
            path.display().to_string(),
        ))
    }

    fn unit_origin(&self, unit: &str) -> String {
        self.rules_path(unit)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| unit.to_string())
    }

    fn discovery_errors(&self) -> Vec<LoadError> {
        self.skipped
            .iter()
            .map(|(path, message)| LoadError {
                origin: path.display().to_string(),
                error: Error::InvalidData(message.clone()),
            })
            .collect()
    }
}
