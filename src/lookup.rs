// src/lookup.rs

//! Rosdep lookup and resolution
//!
//! Aggregates rule entries from every discovered unit, builds merged
//! per-unit views and resolves dependency keys into per-installer package
//! lists for the current OS.
//!
//! # View composition
//!
//! The view for a unit merges, in order:
//! 1. every transitive dependency unit, furthest ancestor first (no override)
//! 2. the unit's own entry (override, local rules win)
//! 3. the per-user override entry, if any (override, wins over everything)

use crate::config::RosdepConfig;
use crate::context::InstallerContext;
use crate::error::{Error, Result};
use crate::installers::{RawSpec, Resolved};
use crate::loader::{DirectoryLoader, RosdepLoader};
pub use crate::loader::LoadError;
use crate::model::{Database, DatabaseEntry, DependencyDefinition, load_rules_file};
use crate::view::RosdepView;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// Reserved origin name for the per-user override source
pub const OVERRIDE_ENTRY: &str = "*override*";

/// Version key that matches any OS release
pub const WILDCARD_VERSION: &str = "*";

/// Fields that mark a mapping as an installer spec
const SPEC_FIELDS: &[&str] = &["packages", "depends"];

/// Resolved package lists keyed by installer key
pub type Resolutions = BTreeMap<String, Resolved>;

/// Resolution failures keyed by rosdep key
pub type ResolutionErrors = BTreeMap<String, Error>;

/// One rosdep key resolved for the current OS
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedKey {
    pub rosdep_key: String,
    pub installer_key: String,
    pub spec: RawSpec,
    pub resolved: Resolved,
    pub origin: String,
}

pub struct RosdepLookup {
    loader: Box<dyn RosdepLoader>,
    database: Database,
    override_entry: Option<DatabaseEntry>,
    view_cache: HashMap<String, RosdepView>,
    errors: Vec<LoadError>,
}

impl RosdepLookup {
    pub fn new(loader: Box<dyn RosdepLoader>) -> Self {
        Self {
            loader,
            database: Database::new(),
            override_entry: None,
            view_cache: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Discover units from the configured package path and load the override file
    pub fn create_from_config(config: &RosdepConfig) -> Result<Self> {
        let loader = DirectoryLoader::new(&config.package_path)?;
        let mut lookup = Self::new(Box::new(loader));
        lookup.load_override_file(&config.override_file())?;
        Ok(lookup)
    }

    /// Load the override source from `path`; a missing file means no override
    pub fn load_override_file(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            debug!("No override file at {}", path.display());
            self.set_override_entry(None);
            return Ok(());
        }
        let rules = load_rules_file(path)?;
        debug!("Loaded {} override rules from {}", rules.len(), path.display());
        self.set_override_entry(Some(DatabaseEntry::new(
            rules,
            Vec::new(),
            path.display().to_string(),
        )));
        Ok(())
    }

    pub fn set_override_entry(&mut self, entry: Option<DatabaseEntry>) {
        self.override_entry = entry;
        self.view_cache.clear();
    }

    pub fn override_entry(&self) -> Option<&DatabaseEntry> {
        self.override_entry.as_ref()
    }

    pub fn loader(&self) -> &dyn RosdepLoader {
        self.loader.as_ref()
    }

    /// Rosdep keys declared by a package, independent of OS
    pub fn get_rosdeps(&self, package: &str) -> Result<Vec<String>> {
        self.loader.package_rosdeps(package)
    }

    /// Packages that declare `rosdep_key`, sorted by name
    pub fn get_packages_that_need(&self, rosdep_key: &str) -> Result<Vec<String>> {
        let mut packages = Vec::new();
        for package in self.loader.package_names()? {
            if self
                .loader
                .package_rosdeps(&package)?
                .iter()
                .any(|k| k == rosdep_key)
            {
                packages.push(package);
            }
        }
        packages.sort();
        Ok(packages)
    }

    /// Units defining `rosdep_key` as (unit, origin) pairs.
    ///
    /// The override source is listed first under [`OVERRIDE_ENTRY`].
    pub fn get_units_that_define(&mut self, rosdep_key: &str) -> Result<Vec<(String, String)>> {
        self.load_all_units()?;

        let mut found = Vec::new();
        if let Some(entry) = &self.override_entry {
            if entry.defines(rosdep_key) {
                found.push((OVERRIDE_ENTRY.to_string(), entry.origin.clone()));
            }
        }
        for unit in self.database.unit_names() {
            let entry = self.database.get_unit_data(&unit)?;
            if entry.defines(rosdep_key) {
                found.push((unit, entry.origin.clone()));
            }
        }
        Ok(found)
    }

    /// Load every discoverable unit, recording failures for [`get_errors`]
    ///
    /// Manifests the loader skipped during discovery are reported first.
    ///
    /// [`get_errors`]: RosdepLookup::get_errors
    pub fn load_all_units(&mut self) -> Result<()> {
        self.errors = self.loader.discovery_errors();
        for unit in self.loader.unit_names()? {
            if self.database.is_loaded(&unit) {
                continue;
            }
            match self.loader.load_unit(&unit) {
                Ok(entry) => self.database.set_unit_data(unit, entry),
                Err(error) => {
                    let origin = self.loader.unit_origin(&unit);
                    warn!("Failed to load rules for {}: {}", origin, error);
                    self.errors.push(LoadError { origin, error });
                }
            }
        }
        Ok(())
    }

    /// Errors from the most recent [`load_all_units`](RosdepLookup::load_all_units)
    pub fn get_errors(&self) -> &[LoadError] {
        &self.errors
    }

    /// Drop all loaded entries and cached views
    pub fn reload(&mut self) {
        self.database.clear();
        self.view_cache.clear();
        self.errors.clear();
    }

    fn ensure_unit_loaded(&mut self, unit: &str) -> Result<()> {
        if !self.database.is_loaded(unit) {
            let entry = self.loader.load_unit(unit)?;
            self.database.set_unit_data(unit, entry);
        }
        Ok(())
    }

    /// Post-order walk of unit dependencies, ancestors before dependents
    fn collect_units(
        &mut self,
        unit: &str,
        visiting: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if order.iter().any(|u| u == unit) {
            return Ok(());
        }
        if visiting.iter().any(|u| u == unit) {
            let mut chain = visiting.clone();
            chain.push(unit.to_string());
            return Err(Error::CycleDetected(chain));
        }

        visiting.push(unit.to_string());
        self.ensure_unit_loaded(unit)?;
        let depends = self.database.get_unit_data(unit)?.depends.clone();
        for dep in &depends {
            self.collect_units(dep, visiting, order)?;
        }
        visiting.pop();
        order.push(unit.to_string());
        Ok(())
    }

    fn ensure_view(&mut self, unit: &str) -> Result<()> {
        if self.view_cache.contains_key(unit) {
            debug!("Using cached view for {}", unit);
            return Ok(());
        }

        let mut order = Vec::new();
        self.collect_units(unit, &mut Vec::new(), &mut order)?;
        debug!("Merge order for {}: {:?}", unit, order);

        // Conflicts stay recorded on the view and only fail their own keys
        let mut view = RosdepView::new(unit);
        for name in &order {
            let entry = self.database.get_unit_data(name)?;
            if let Err(e) = view.merge(entry, name == unit) {
                debug!("Merging {} into view {}: {}", name, unit, e);
            }
        }
        if let Some(entry) = &self.override_entry {
            if let Err(e) = view.merge(entry, true) {
                debug!("Merging override into view {}: {}", unit, e);
            }
        }

        self.view_cache.insert(unit.to_string(), view);
        Ok(())
    }

    /// Merged view for a unit, cached until [`reload`](RosdepLookup::reload).
    ///
    /// Conflicting definitions do not fail the view; they are reported by
    /// [`RosdepView::conflicts`] and fail only the disputed keys on resolution.
    pub fn get_view_for_unit(&mut self, unit: &str) -> Result<&RosdepView> {
        self.ensure_view(unit)?;
        self.view_cache
            .get(unit)
            .ok_or_else(|| Error::Internal(format!("view for [{}] missing after build", unit)))
    }

    /// Merged view for the unit that contains `package`
    pub fn get_view_for_package(&mut self, package: &str) -> Result<&RosdepView> {
        let unit = self.loader.unit_of_package(package)?;
        self.get_view_for_unit(&unit)
    }

    /// Select the installer key and spec of a definition for the current OS
    pub fn resolve_definition(
        definition: &DependencyDefinition,
        context: &InstallerContext,
    ) -> Result<(String, RawSpec)> {
        let (os_name, os_version) = context.get_os_name_and_version()?;
        let unresolved = |message: String| Error::Resolution {
            key: definition.rosdep_key.clone(),
            message,
        };

        let mut data = match &definition.data {
            Value::Mapping(os_map) => get_by_str(os_map, &os_name)
                .ok_or_else(|| unresolved(format!("no rule for OS [{}]", os_name)))?,
            flat => flat,
        };

        if let Value::Mapping(versions) = data {
            if let Some(versioned) =
                get_by_str(versions, &os_version).or_else(|| get_by_str(versions, WILDCARD_VERSION))
            {
                data = versioned;
            }
        }

        if let Value::Mapping(by_installer) = data {
            for installer_key in context.get_os_installer_keys(&os_name) {
                if let Some(spec) = get_by_str(by_installer, &installer_key) {
                    return Ok((installer_key, RawSpec::from_value(spec)?));
                }
            }
            // Neither a version, an installer nor a spec mapping
            if SPEC_FIELDS
                .iter()
                .all(|field| get_by_str(by_installer, field).is_none())
            {
                return Err(unresolved(format!(
                    "no rule for OS version [{} {}]",
                    os_name, os_version
                )));
            }
        }

        let default = context
            .get_default_os_installer_key(&os_name)
            .map_err(|_| unresolved(format!("OS [{}] is not supported", os_name)))?
            .ok_or_else(|| unresolved(format!("OS [{}] has no default installer", os_name)))?;
        Ok((default.to_string(), RawSpec::from_value(data)?))
    }

    fn resolve_in_view(
        view: &RosdepView,
        rosdep_key: &str,
        context: &InstallerContext,
    ) -> Result<ResolvedKey> {
        let definition = view.lookup(rosdep_key)?;
        if let Some(conflict) = view.conflict(rosdep_key) {
            return Err(conflict.clone().into());
        }
        let (installer_key, spec) = Self::resolve_definition(definition, context)?;
        let installer = context
            .get_installer(&installer_key)
            .map_err(|e| Error::Internal(e.to_string()))?;
        let resolved = installer.resolve(&spec)?;
        debug!(
            "Resolved {} via {} to {:?} ({})",
            rosdep_key, installer_key, resolved, definition.origin
        );
        Ok(ResolvedKey {
            rosdep_key: rosdep_key.to_string(),
            installer_key,
            spec,
            resolved,
            origin: definition.origin.clone(),
        })
    }

    /// Resolve a single key against a unit's view
    pub fn resolve_key(
        &mut self,
        unit: &str,
        rosdep_key: &str,
        context: &InstallerContext,
    ) -> Result<ResolvedKey> {
        let view = self.get_view_for_unit(unit)?;
        Self::resolve_in_view(view, rosdep_key, context)
    }

    /// Resolve keys against a unit's view, grouped by installer key.
    ///
    /// Keys that cannot be resolved are returned in the error map rather
    /// than failing the batch.
    pub fn resolve_keys(
        &mut self,
        unit: &str,
        rosdep_keys: &[String],
        context: &InstallerContext,
    ) -> Result<(Resolutions, ResolutionErrors)> {
        let mut resolutions = Resolutions::new();
        let mut errors = ResolutionErrors::new();

        let view = match self.get_view_for_unit(unit) {
            Ok(view) => view,
            Err(e) => {
                let message = format!("view for [{}] is unavailable: {}", unit, e);
                for key in rosdep_keys {
                    errors.insert(
                        key.clone(),
                        Error::Resolution {
                            key: key.clone(),
                            message: message.clone(),
                        },
                    );
                }
                return Ok((resolutions, errors));
            }
        };

        for key in rosdep_keys {
            match Self::resolve_in_view(view, key, context) {
                Ok(resolved_key) => accumulate(
                    &mut resolutions,
                    context,
                    &resolved_key.installer_key,
                    &resolved_key.resolved,
                )?,
                Err(Error::Internal(message)) => return Err(Error::Internal(message)),
                Err(e) => {
                    debug!("Cannot resolve {}: {}", key, e);
                    errors.insert(key.clone(), e);
                }
            }
        }
        Ok((resolutions, errors))
    }

    /// Resolve every rosdep key needed by `packages`
    pub fn resolve_all(
        &mut self,
        packages: &[String],
        context: &InstallerContext,
    ) -> Result<(Resolutions, ResolutionErrors)> {
        let mut keys_by_unit: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for package in packages {
            let unit = self.loader.unit_of_package(package)?;
            keys_by_unit
                .entry(unit)
                .or_default()
                .extend(self.get_rosdeps(package)?);
        }

        let mut resolutions = Resolutions::new();
        let mut errors = ResolutionErrors::new();
        for (unit, keys) in keys_by_unit {
            let keys: Vec<String> = keys.into_iter().collect();
            let (unit_resolutions, unit_errors) = self.resolve_keys(&unit, &keys, context)?;
            for (installer_key, resolved) in unit_resolutions {
                accumulate(&mut resolutions, context, &installer_key, &resolved)?;
            }
            for (key, error) in unit_errors {
                errors.entry(key).or_insert(error);
            }
        }
        Ok((resolutions, errors))
    }
}

/// Merge `resolved` into the entry for `installer_key` using the installer's `unique`
fn accumulate(
    resolutions: &mut Resolutions,
    context: &InstallerContext,
    installer_key: &str,
    resolved: &[String],
) -> Result<()> {
    let installer = context
        .get_installer(installer_key)
        .map_err(|e| Error::Internal(e.to_string()))?;
    let merged = match resolutions.get(installer_key) {
        Some(existing) => installer.unique(&[existing.as_slice(), resolved]),
        None => installer.unique(&[resolved]),
    };
    resolutions.insert(installer_key.to_string(), merged);
    Ok(())
}

/// Mapping lookup that also matches numeric YAML keys such as `22.04`
fn get_by_str<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.iter().find_map(|(k, v)| {
        let matches = match k {
            Value::String(s) => s == key,
            Value::Number(n) => n.to_string() == key,
            _ => false,
        };
        matches.then_some(v)
    })
}
