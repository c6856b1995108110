//! Query parameter name matching.

use super::{Matcher, UrlParts};
use std::collections::BTreeSet;

/// Compiled query key matcher.
pub enum QueryKeysMatcher {
    /// The URL must carry no query parameters
    NoQuery,
    /// Every key must be present; values and extra keys are ignored
    Superset(BTreeSet<String>),
}

impl QueryKeysMatcher {
    /// Compile a query key matcher from configuration.
    pub fn compile(keys: &BTreeSet<String>) -> Self {
        if keys.is_empty() {
            Self::NoQuery
        } else {
            Self::Superset(keys.clone())
        }
    }
}

impl Matcher for QueryKeysMatcher {
    fn matches(&self, url: &UrlParts<'_>) -> bool {
        match self {
            Self::NoQuery => url.query_keys.is_empty(),
            Self::Superset(required) => required.is_subset(&url.query_keys),
        }
    }

    fn name(&self) -> &'static str {
        "query_keys_matcher"
    }
}
