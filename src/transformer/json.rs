//! JSON body transformer.
//!
//! Each rule walks its key path through the fixture body. At every step the
//! value under the next key decides what happens:
//!
//! - an object is descended into,
//! - an array whose elements are all objects is descended into element by
//!   element,
//! - anything else (missing key, scalar, mixed array) leaves the node as it
//!   is, because fixtures of the same endpoint are not uniformly shaped.
//!
//! Once the path is exhausted the rule's operations are applied to the object,
//! or to every object of the array, found there.

use super::script::ScriptRunner;
use super::TransformError;
use crate::report::Reporter;
use crate::rule::{ModificationRule, Operation};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, trace};

/// Applies an ordered rule list to fixture bodies.
pub struct RuleEngine<'a> {
    rules: Vec<ModificationRule>,
    runner: &'a dyn ScriptRunner,
    reporter: &'a dyn Reporter,
}

impl<'a> RuleEngine<'a> {
    /// Create a new engine from parsed rules.
    pub fn new(
        rules: Vec<ModificationRule>,
        runner: &'a dyn ScriptRunner,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            rules,
            runner,
            reporter,
        }
    }

    /// Get the configured rules.
    pub fn rules(&self) -> &[ModificationRule] {
        &self.rules
    }

    /// Apply every rule in declaration order and return the new tree.
    ///
    /// The input is left untouched. The output of each rule is the input of
    /// the next.
    pub fn apply_rules(&self, tree: &JsonValue) -> Result<JsonValue, TransformError> {
        self.rules
            .iter()
            .try_fold(tree.clone(), |node, rule| self.apply_rule(rule.clone(), node))
    }

    /// Apply a single rule to a node.
    pub fn apply_rule(
        &self,
        rule: ModificationRule,
        node: JsonValue,
    ) -> Result<JsonValue, TransformError> {
        match rule.head().map(str::to_string) {
            Some(key) => self.descend(key, rule, node),
            None => self.apply_terminal(&rule, node),
        }
    }

    fn descend(
        &self,
        key: String,
        rule: ModificationRule,
        node: JsonValue,
    ) -> Result<JsonValue, TransformError> {
        let mut map = match node {
            JsonValue::Object(map) => map,
            other => {
                return Err(TransformError::NotAnObject {
                    path: rule.original_path,
                    segment: key,
                    found: kind(&other),
                })
            }
        };

        if let Some(slot) = map.get_mut(&key) {
            let next = rule.descend();
            let child = std::mem::take(slot);

            *slot = match child {
                JsonValue::Object(_) => self.apply_rule(next, child)?,
                JsonValue::Array(items) if is_object_array(&items) => JsonValue::Array(
                    items
                        .into_iter()
                        .map(|item| self.apply_rule(next.clone(), item))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                other => {
                    trace!(
                        path = %rule.original_path,
                        key = %key,
                        found = kind(&other),
                        "Path does not apply here, leaving node unchanged"
                    );
                    other
                }
            };
        } else {
            trace!(path = %rule.original_path, key = %key, "Key missing, leaving node unchanged");
        }

        Ok(JsonValue::Object(map))
    }

    fn apply_terminal(
        &self,
        rule: &ModificationRule,
        node: JsonValue,
    ) -> Result<JsonValue, TransformError> {
        match node {
            JsonValue::Object(map) => Ok(self.apply_operations(rule, map)),
            JsonValue::Array(items) if is_object_array(&items) => Ok(JsonValue::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        JsonValue::Object(map) => self.apply_operations(rule, map),
                        other => other,
                    })
                    .collect(),
            )),
            other => Err(TransformError::NotModifiable {
                path: rule.original_path.clone(),
                found: kind(&other),
            }),
        }
    }

    /// Apply a rule's operations to one object.
    fn apply_operations(&self, rule: &ModificationRule, object: Map<String, JsonValue>) -> JsonValue {
        let mut current = JsonValue::Object(object);

        for operation in &rule.operations {
            current = match (operation, current) {
                (Operation::Add(fields), JsonValue::Object(mut map)) => {
                    for (k, v) in fields {
                        map.insert(k.clone(), v.clone());
                    }
                    JsonValue::Object(map)
                }
                (Operation::Remove(keys), JsonValue::Object(mut map)) => {
                    for key in keys {
                        map.remove(key);
                    }
                    JsonValue::Object(map)
                }
                (Operation::Transform(script), value) => self.run_transform(rule, script, value),
                (_, other) => {
                    debug!(
                        path = %rule.original_path,
                        found = kind(&other),
                        "Transform output is not an object, skipping operation"
                    );
                    other
                }
            };
        }

        current
    }

    /// Replace a value with a script's output, keeping it on failure.
    fn run_transform(&self, rule: &ModificationRule, script: &str, value: JsonValue) -> JsonValue {
        let result = serde_json::to_vec(&value)
            .map_err(|e| e.to_string())
            .and_then(|payload| {
                self.runner
                    .run(script, &payload)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(replacement) => replacement,
            Err(e) => {
                self.reporter.error(&format!(
                    "Transform failed for rule '{}', object left unchanged: {}",
                    rule.original_path, e
                ));
                value
            }
        }
    }
}

fn is_object_array(items: &[JsonValue]) -> bool {
    items.iter().all(JsonValue::is_object)
}

/// Short name of a value's shape for diagnostics.
fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(items) if is_object_array(items) => "array of objects",
        JsonValue::Array(_) => "mixed array",
        JsonValue::Object(_) => "object",
    }
}
