//! Body modification rules.
//!
//! A rule names a slash-delimited key path and the operations applied to
//! every object found at the end of that path:
//!
//! ```yaml
//! rules:
//!   - path: "data/facets"
//!     add: { enabled: true }
//!     remove: ["debug"]
//!     transform: "scripts/normalize.sh"
//! ```

use crate::config::{RuleEntry, StubsRules};
use serde_json::{Map, Value as JsonValue};

/// One operation applied at the end of a rule's path.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Merge fields into the object; added values win on collision
    Add(Map<String, JsonValue>),
    /// Delete keys from the object
    Remove(Vec<String>),
    /// Replace the object with the output of an external script
    Transform(String),
}

/// A parsed rule.
///
/// `path` holds the segments still to be descended. `original_path` keeps the
/// configured text for diagnostics once segments have been consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ModificationRule {
    pub path: Vec<String>,
    pub operations: Vec<Operation>,
    pub original_path: String,
}

impl ModificationRule {
    /// Build a rule from its configured path and operations.
    pub fn new(path: &str, operations: Vec<Operation>) -> Result<Self, RuleError> {
        if operations.is_empty() {
            return Err(RuleError::NoOperations(path.to_string()));
        }
        Ok(Self {
            path: split_path(path),
            operations,
            original_path: path.to_string(),
        })
    }

    /// Leading path segment, if any remain.
    pub fn head(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    /// The same rule one level deeper.
    pub fn descend(&self) -> Self {
        Self {
            path: self.path.iter().skip(1).cloned().collect(),
            operations: self.operations.clone(),
            original_path: self.original_path.clone(),
        }
    }
}

/// Split a rule path on `/`, dropping empty segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the configured rule list, preserving declaration order.
pub fn parse_rules(config: &StubsRules) -> Result<Vec<ModificationRule>, RuleError> {
    let entries = match config.rules {
        Some(ref entries) if !entries.is_empty() => entries,
        _ => return Err(RuleError::MissingRules),
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(index, entry))
        .collect()
}

fn parse_entry(index: usize, entry: &RuleEntry) -> Result<ModificationRule, RuleError> {
    let path = entry
        .path
        .as_deref()
        .ok_or(RuleError::MissingPath(index))?;

    let mut operations = Vec::new();
    if let Some(ref add) = entry.add {
        operations.push(Operation::Add(add.clone()));
    }
    if let Some(ref remove) = entry.remove {
        operations.push(Operation::Remove(remove.clone()));
    }
    if let Some(ref script) = entry.transform {
        if script.trim().is_empty() {
            return Err(RuleError::EmptyTransform(path.to_string()));
        }
        operations.push(Operation::Transform(script.clone()));
    }

    ModificationRule::new(path, operations)
}

/// Errors in the configured rule list.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Missing (or empty) rules list")]
    MissingRules,

    #[error("Rule #{0} has no path")]
    MissingPath(usize),

    #[error("Rule '{0}' needs at least one of add, remove or transform")]
    NoOperations(String),

    #[error("Rule '{0}' has an empty transform script")]
    EmptyTransform(String),
}
