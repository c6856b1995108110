//! Fixture transformers.

mod json;
pub mod script;
mod url;

pub use json::RuleEngine;
pub use script::{ProcessScriptRunner, ScriptError, ScriptRunner};
pub use url::UrlTransformer;

/// Errors raised when a rule's path does not fit the shape of a fixture.
///
/// These abort the modification of one fixture file, never the batch.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Rule '{path}' cannot descend into '{segment}': expected an object, found {found}")]
    NotAnObject {
        path: String,
        segment: String,
        found: &'static str,
    },

    #[error("Rule '{path}' can only modify an object or an array of objects, found {found}")]
    NotModifiable { path: String, found: &'static str },
}
