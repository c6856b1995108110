//! Index record matchers.

mod path;
mod query;

pub use path::PathMatcherImpl;
pub use query::QueryKeysMatcher;

use crate::config::MatchSpec;
use crate::record::{HttpMethod, IndexRecord};
use std::collections::BTreeSet;
use tracing::trace;
use url::Url;

/// Trait for matching one aspect of a recorded URL.
pub trait Matcher {
    /// Check if this matcher accepts the given URL.
    fn matches(&self, url: &UrlParts<'_>) -> bool;

    /// Get the matcher name for debugging.
    fn name(&self) -> &'static str;
}

/// A URL broken into the components matching looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: &'a str,
    pub host: Option<&'a str>,
    pub path: &'a str,
    /// Port written in the URL, default ports included
    pub port: Option<u16>,
    /// Decoded query parameter names
    pub query_keys: BTreeSet<String>,
}

impl<'a> UrlParts<'a> {
    /// Decompose a URL. Fails for URLs without a hierarchical path
    /// (`mailto:`, `data:` and the like).
    pub fn decompose(url: &'a Url) -> Option<Self> {
        if url.cannot_be_a_base() {
            return None;
        }

        Some(Self {
            scheme: url.scheme(),
            host: url.host_str(),
            path: url.path(),
            port: url.port(),
            query_keys: url.query_pairs().map(|(k, _)| k.into_owned()).collect(),
        })
    }

    /// Take the port from the URL text as recorded. Parsing drops a port
    /// equal to the scheme's default.
    pub fn with_written_port(mut self, raw: &str) -> Self {
        if let Some(port) = written_port(raw) {
            self.port = Some(port);
        }
        self
    }
}

/// Port in the authority of a URL as written.
fn written_port(raw: &str) -> Option<u16> {
    let rest = raw.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let (host, port) = host_port.rsplit_once(':')?;
    // A colon inside an IPv6 literal
    if host.starts_with('[') && !host.ends_with(']') {
        return None;
    }
    port.parse().ok()
}

/// Compiled [`MatchSpec`] that combines all conditions.
pub struct CompiledMatcher {
    scheme: Option<String>,
    host: Option<String>,
    path: Option<PathMatcherImpl>,
    port: Option<u16>,
    query: Option<QueryKeysMatcher>,
    status_code: Option<u16>,
    http_method: Option<HttpMethod>,
}

impl CompiledMatcher {
    /// Compile a match spec from configuration.
    pub fn compile(spec: &MatchSpec) -> Self {
        Self {
            scheme: spec.scheme.clone(),
            host: spec.host.clone(),
            path: spec.path.as_deref().map(PathMatcherImpl::compile),
            port: spec.port,
            query: spec.query_keys.as_ref().map(QueryKeysMatcher::compile),
            status_code: spec.status_code,
            http_method: spec.http_method,
        }
    }

    /// Check a record against every configured condition.
    pub fn matches(&self, record: &IndexRecord) -> bool {
        if self
            .status_code
            .is_some_and(|status| status != record.status_code)
        {
            return false;
        }

        if self
            .http_method
            .is_some_and(|method| method != record.http_method)
        {
            return false;
        }

        match UrlParts::decompose(&record.url) {
            Some(parts) => self.matches_parts(&parts.with_written_port(&record.raw_url)),
            None => {
                trace!(url = %record.raw_url, "URL cannot be decomposed");
                false
            }
        }
    }

    /// Check only the URL conditions (scheme, host, port, path, query keys).
    pub fn matches_url(&self, url: &Url) -> bool {
        match UrlParts::decompose(url) {
            Some(parts) => self.matches_parts(&parts),
            None => {
                trace!(url = %url, "URL cannot be decomposed");
                false
            }
        }
    }

    fn matches_parts(&self, parts: &UrlParts<'_>) -> bool {
        if self
            .scheme
            .as_deref()
            .is_some_and(|scheme| scheme != parts.scheme)
        {
            return false;
        }

        if self
            .host
            .as_deref()
            .is_some_and(|host| Some(host) != parts.host)
        {
            return false;
        }

        if self.port.is_some() && self.port != parts.port {
            return false;
        }

        let matchers: [Option<&dyn Matcher>; 2] = [
            self.path.as_ref().map(|m| m as &dyn Matcher),
            self.query.as_ref().map(|m| m as &dyn Matcher),
        ];
        for matcher in matchers.into_iter().flatten() {
            if !matcher.matches(parts) {
                trace!(path = parts.path, matcher = matcher.name(), "URL rejected");
                return false;
            }
        }

        true
    }

    /// Keep the records that match, in their original order.
    pub fn select<'r>(&self, records: &'r [IndexRecord]) -> Vec<&'r IndexRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}
