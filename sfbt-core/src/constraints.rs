//! Constraint registry — constraint names to import paths on the compute node.
//!
//! The orchestrator never loads these implementations. It only checks that
//! every requested name has an entry and hands the import path to the worker.
//!
//! Effective registry = built-ins, then `constraint_registry` from the config
//! on top (same name: the config entry wins).

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

use crate::config::ConfigModel;

/// Constraints shipped with the optimizer.
pub const BUILTIN_CONSTRAINTS: &[(&str, &str)] = &[
    ("ZeroBeta", "sf_quant.optimizer.constraints.ZeroBeta"),
    ("ZeroInvestment", "sf_quant.optimizer.constraints.ZeroInvestment"),
];

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name pattern"));
static IMPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*(:[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("valid import pattern")
});

#[derive(Debug, Error, PartialEq)]
pub enum ConstraintError {
    #[error("unknown constraint `{name}` (known: {})", .known.join(", "))]
    UnknownConstraint { name: String, known: Vec<String> },

    #[error("invalid constraint name {name:?}: expected an identifier such as ZeroBeta")]
    InvalidName { name: String },

    #[error("invalid import path {path:?} for constraint `{name}`: expected dotted.module.Class")]
    InvalidImportPath { name: String, path: String },
}

/// A constraint name paired with the import path the worker will load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConstraint {
    pub name: String,
    pub import_path: String,
}

impl fmt::Display for ResolvedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.import_path)
    }
}

/// Merged name → import path mapping for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintRegistry {
    entries: BTreeMap<String, String>,
}

impl ConstraintRegistry {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_CONSTRAINTS
                .iter()
                .map(|(name, path)| (name.to_string(), path.to_string()))
                .collect(),
        }
    }

    /// Built-ins with `overrides` merged on top. Every entry is format-checked.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, ConstraintError> {
        let mut registry = Self::builtin();
        for (name, path) in overrides {
            if !NAME_PATTERN.is_match(name) {
                return Err(ConstraintError::InvalidName { name: name.clone() });
            }
            if !IMPORT_PATTERN.is_match(path) {
                return Err(ConstraintError::InvalidImportPath {
                    name: name.clone(),
                    path: path.clone(),
                });
            }
            if let Some(previous) = registry.entries.insert(name.clone(), path.clone()) {
                if previous != *path {
                    tracing::debug!(constraint = %name, builtin = %previous, replacement = %path, "constraint override");
                }
            }
        }
        Ok(registry)
    }

    /// Effective registry for a config.
    pub fn for_config(config: &ConfigModel) -> Result<Self, ConstraintError> {
        Self::with_overrides(config.constraint_registry())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Known names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `names` in order. Fails on the first name without an entry.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<ResolvedConstraint>, ConstraintError> {
        names
            .iter()
            .map(|name| {
                if !NAME_PATTERN.is_match(name) {
                    return Err(ConstraintError::InvalidName { name: name.clone() });
                }
                self.get(name)
                    .map(|path| ResolvedConstraint {
                        name: name.clone(),
                        import_path: path.to_string(),
                    })
                    .ok_or_else(|| ConstraintError::UnknownConstraint {
                        name: name.clone(),
                        known: self.names(),
                    })
            })
            .collect()
    }
}

/// Resolve every constraint a config asks for against its effective registry.
pub fn resolve_constraints(config: &ConfigModel) -> Result<Vec<ResolvedConstraint>, ConstraintError> {
    ConstraintRegistry::for_config(config)?.resolve(config.constraints())
}
