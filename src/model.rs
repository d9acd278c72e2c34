// src/model.rs

//! Rosdep data model
//!
//! Raw rule data is kept as YAML values so that definitions from different
//! sources can be compared structurally during view merges.
//!
//! # Rule file format
//!
//! ```yaml
//! # OS-keyed, optionally version-keyed
//! boost:
//!   ubuntu:
//!     jammy: libboost-all-dev
//!     noble:
//!       apt:
//!         packages: [libboost-all-dev]
//!   arch: boost
//! ```

use crate::error::{Error, Result};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// Raw rule data for a single dependency key
pub type RuleData = Value;

/// One definition of a dependency key and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyDefinition {
    pub rosdep_key: String,
    pub data: RuleData,
    pub origin: String,
}

impl DependencyDefinition {
    pub fn new(rosdep_key: impl Into<String>, data: RuleData, origin: impl Into<String>) -> Self {
        Self {
            rosdep_key: rosdep_key.into(),
            data,
            origin: origin.into(),
        }
    }
}

/// Raw contents of one definition source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseEntry {
    /// Dependency key -> OS-conditioned spec
    pub rosdep_data: BTreeMap<String, RuleData>,
    /// Units whose definitions this entry builds on
    pub depends: Vec<String>,
    pub origin: String,
}

impl DatabaseEntry {
    pub fn new(
        rosdep_data: BTreeMap<String, RuleData>,
        depends: Vec<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            rosdep_data,
            depends,
            origin: origin.into(),
        }
    }

    /// Check whether this entry defines `key`
    pub fn defines(&self, key: &str) -> bool {
        self.rosdep_data.contains_key(key)
    }
}

/// All loaded entries, keyed by unit name
#[derive(Debug, Default)]
pub struct Database {
    entries: HashMap<String, DatabaseEntry>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, unit: &str) -> bool {
        self.entries.contains_key(unit)
    }

    /// Store the entry for a unit, replacing any previous one
    pub fn set_unit_data(&mut self, unit: impl Into<String>, entry: DatabaseEntry) {
        self.entries.insert(unit.into(), entry);
    }

    pub fn get_unit_data(&self, unit: &str) -> Result<&DatabaseEntry> {
        self.entries
            .get(unit)
            .ok_or_else(|| Error::Lookup(format!("unit [{}] is not loaded", unit)))
    }

    /// Loaded unit names, sorted
    pub fn unit_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Parse rule file text into key -> data
pub fn parse_rules(content: &str, origin: &str) -> Result<BTreeMap<String, RuleData>> {
    let doc: Value = serde_yaml::from_str(content).map_err(|e| {
        Error::InvalidData(format!("{}: {}", origin, e))
    })?;

    let mapping = match doc {
        // An empty file is an empty rule set
        Value::Null => return Ok(BTreeMap::new()),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(Error::InvalidData(format!(
                "{}: rule file must be a mapping of rosdep keys",
                origin
            )));
        }
    };

    let mut rules = BTreeMap::new();
    for (key, value) in mapping {
        let key = match key {
            Value::String(s) => s,
            other => {
                return Err(Error::InvalidData(format!(
                    "{}: rosdep key must be a string, found {:?}",
                    origin, other
                )));
            }
        };
        rules.insert(key, value);
    }

    debug!("Parsed {} rosdep keys from {}", rules.len(), origin);
    Ok(rules)
}

/// Load a rule file from disk; the path is used as the origin
pub fn load_rules_file(path: &Path) -> Result<BTreeMap<String, RuleData>> {
    let content = std::fs::read_to_string(path)?;
    parse_rules(&content, &path.display().to_string())
}
