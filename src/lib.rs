//! Rule engine for recorded HTTP fixtures.
//!
//! A fixture tree holds index files listing recorded interactions, one per
//! line, each pointing at a fixture folder with the recorded response body.
//! This crate selects interactions by URL, status and method, then:
//!
//! - adds, removes or script-transforms fields of the matching JSON bodies
//! - adds or removes query parameters on matching index lines
//! - deletes matching index lines together with their fixture folders
//!
//! ## Configuration Example
//!
//! ```yaml
//! index_search_parameters:
//!   host: api.example.com
//!   path: "^/v1/catalog"
//!   statusCode: 200
//!   httpMethod: GET
//! stubs_modification_rules:
//!   rules:
//!     - path: data/items
//!       add: { available: true }
//!       remove: [internalId]
//! index_modification_rules:
//!   remove: [sessionId]
//! ```

pub mod config;
pub mod discovery;
pub mod matcher;
pub mod modifier;
pub mod record;
pub mod report;
pub mod rule;
pub mod transformer;

pub use config::{ConfigError, FixtureConfig, MatchSpec};
pub use matcher::CompiledMatcher;
pub use modifier::{FixtureModifier, Mode, ModifyError};
pub use record::{HttpMethod, IndexRecord};
pub use report::{BatchSummary, Reporter, TracingReporter};
pub use rule::{ModificationRule, RuleError};
pub use transformer::{ProcessScriptRunner, RuleEngine, ScriptRunner, TransformError};
