//! Path matching implementation.

use super::{Matcher, UrlParts};
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Compiled path matcher.
///
/// A path matches when it equals the configured pattern exactly, or when the
/// pattern, read as a case-insensitive regex, finds a match anywhere in it.
/// Literal equality is checked first so configured paths containing regex
/// metacharacters keep matching themselves.
pub struct PathMatcherImpl {
    /// Pattern as configured
    literal: String,
    /// Compiled pattern, absent if it is not a valid regex
    regex: Option<Regex>,
}

impl PathMatcherImpl {
    /// Compile a path matcher from configuration.
    pub fn compile(pattern: &str) -> Self {
        let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(
                    pattern,
                    error = %e,
                    "Path pattern is not a valid regex, matching it literally"
                );
                None
            }
        };

        Self {
            literal: pattern.to_string(),
            regex,
        }
    }

    /// Check a decomposed URL path.
    pub fn matches_path(&self, path: &str) -> bool {
        if path == self.literal {
            return true;
        }
        self.regex.as_ref().is_some_and(|regex| regex.is_match(path))
    }
}

impl Matcher for PathMatcherImpl {
    fn matches(&self, url: &UrlParts<'_>) -> bool {
        self.matches_path(url.path)
    }

    fn name(&self) -> &'static str {
        "path_matcher"
    }
}
