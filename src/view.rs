// src/view.rs

//! Merged per-unit view of rosdep definitions
//!
//! A view is built by merging database entries in order. Identical
//! re-definitions are accepted silently; differing definitions either
//! replace the existing one (override) or surface as a conflict.
//!
//! Conflicts are remembered per key until an override merge redefines
//! that key, so a single disputed key does not poison the rest of the view.

use crate::error::{Error, Result};
use crate::model::{DatabaseEntry, DependencyDefinition};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Two definitions of the same key that disagree
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionConflict {
    pub rosdep_key: String,
    pub definition1: DependencyDefinition,
    pub definition2: DependencyDefinition,
}

impl DefinitionConflict {
    pub fn new(
        rosdep_key: impl Into<String>,
        definition1: DependencyDefinition,
        definition2: DependencyDefinition,
    ) -> Self {
        Self {
            rosdep_key: rosdep_key.into(),
            definition1,
            definition2,
        }
    }
}

impl fmt::Display for DefinitionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rules for rosdep key [{}] do not match:", self.rosdep_key)?;
        writeln!(
            f,
            "  {}: {:?}",
            self.definition1.origin, self.definition1.data
        )?;
        write!(
            f,
            "  {}: {:?}",
            self.definition2.origin, self.definition2.data
        )
    }
}

impl std::error::Error for DefinitionConflict {}

/// Mapping from dependency key to its merged definition
#[derive(Debug, Clone)]
pub struct RosdepView {
    name: String,
    rosdep_defs: BTreeMap<String, DependencyDefinition>,
    conflicts: BTreeMap<String, DefinitionConflict>,
}

impl RosdepView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rosdep_defs: BTreeMap::new(),
            conflicts: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the definition of a key
    pub fn lookup(&self, rosdep_key: &str) -> Result<&DependencyDefinition> {
        self.rosdep_defs.get(rosdep_key).ok_or_else(|| {
            Error::Lookup(format!(
                "rosdep key [{}] is not defined in view [{}]",
                rosdep_key, self.name
            ))
        })
    }

    /// Defined keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.rosdep_defs.keys().cloned().collect()
    }

    /// Unresolved conflict recorded for a key, if any
    pub fn conflict(&self, rosdep_key: &str) -> Option<&DefinitionConflict> {
        self.conflicts.get(rosdep_key)
    }

    /// Every unresolved conflict, ordered by key
    pub fn conflicts(&self) -> impl Iterator<Item = &DefinitionConflict> {
        self.conflicts.values()
    }

    pub fn len(&self) -> usize {
        self.rosdep_defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rosdep_defs.is_empty()
    }

    /// Merge an entry into this view.
    ///
    /// Every key is merged independently. With `override_existing` set,
    /// differing definitions replace the current ones; without it, the
    /// current definition is kept, the conflict is recorded on the view and
    /// the first conflict encountered is returned once all other keys have
    /// been merged. An override merge clears any conflict on the keys it
    /// defines.
    pub fn merge(&mut self, entry: &DatabaseEntry, override_existing: bool) -> Result<()> {
        let mut first_conflict: Option<DefinitionConflict> = None;

        for (key, data) in &entry.rosdep_data {
            let incoming = DependencyDefinition::new(key.clone(), data.clone(), entry.origin.clone());
            if override_existing && self.conflicts.remove(key).is_some() {
                debug!("[{}] {} settles conflict on [{}]", self.name, incoming.origin, key);
            }

            match self.rosdep_defs.get(key) {
                None => {
                    self.rosdep_defs.insert(key.clone(), incoming);
                }
                Some(existing) if existing.data == incoming.data => {}
                Some(existing) => {
                    if override_existing {
                        debug!(
                            "[{}] {} overrides definition of [{}] from {}",
                            self.name, incoming.origin, key, existing.origin
                        );
                        self.rosdep_defs.insert(key.clone(), incoming);
                    } else {
                        let conflict = DefinitionConflict::new(key.clone(), existing.clone(), incoming);
                        warn!("[{}] {}", self.name, conflict);
                        self.conflicts
                            .entry(key.clone())
                            .or_insert_with(|| conflict.clone());
                        if first_conflict.is_none() {
                            first_conflict = Some(conflict);
                        }
                    }
                }
            }
        }

        match first_conflict {
            Some(conflict) => Err(conflict.into()),
            None => Ok(()),
        }
    }
}
