//! Query string rewriting for index lines.

use crate::config::IndexRules;
use crate::record::{RecordParseError, FIELD_COUNT, FIELD_DELIMITER, URL_FIELD};
use serde_json::Value as JsonValue;
use url::{form_urlencoded, Url};

/// Rewrites the query string of recorded URLs.
pub struct UrlTransformer {
    /// Query parameters to set, in key order
    add_query: Vec<(String, String)>,
    /// Query parameters to remove
    remove_query: Vec<String>,
}

impl UrlTransformer {
    /// Create a new URL transformer from configuration.
    pub fn new(config: &IndexRules) -> Self {
        Self {
            add_query: config
                .add
                .iter()
                .map(|(k, v)| (k.clone(), query_value(v)))
                .collect(),
            remove_query: config.remove.clone(),
        }
    }

    /// Apply removals, then additions, to a URL's query.
    ///
    /// Removed keys drop every occurrence. Added keys replace any existing
    /// occurrence and are appended at the end.
    pub fn transform(&self, url: &Url) -> Url {
        let mut new_url = url.clone();
        if let Some(query) = self.rewrite_query(url.query()) {
            new_url.set_query((!query.is_empty()).then_some(query.as_str()));
        }
        new_url
    }

    /// Rewrite the URL field of an index line, keeping the other fields verbatim.
    ///
    /// The URL is edited as written: query segments no rule touches keep
    /// their exact bytes, and a line no rule applies to is returned as is.
    pub fn rewrite_line(&self, line: &str) -> Result<String, RecordParseError> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(RecordParseError::FieldCount(fields.len()));
        }

        let raw = fields[URL_FIELD];
        Url::parse(raw).map_err(|e| RecordParseError::InvalidUrl {
            url: raw.to_string(),
            source: e,
        })?;

        let (before_fragment, fragment) = raw.split_at(raw.find('#').unwrap_or(raw.len()));
        let (base, query) = match before_fragment.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (before_fragment, None),
        };

        let Some(new_query) = self.rewrite_query(query) else {
            return Ok(line.to_string());
        };

        let rewritten = if new_query.is_empty() {
            format!("{base}{fragment}")
        } else {
            format!("{base}?{new_query}{fragment}")
        };
        Ok(format!(
            "{}{}{}",
            fields[..URL_FIELD].join(FIELD_DELIMITER),
            FIELD_DELIMITER,
            rewritten
        ))
    }

    /// New query text, or `None` when the rules leave it as it is.
    fn rewrite_query(&self, query: Option<&str>) -> Option<String> {
        let original = query.unwrap_or_default();

        let mut segments: Vec<String> = original
            .split('&')
            .filter(|segment| !segment.is_empty())
            .filter(|segment| {
                let key = segment_key(segment);
                !self.remove_query.contains(&key) && !self.add_query.iter().any(|(k, _)| *k == key)
            })
            .map(str::to_string)
            .collect();

        segments.extend(
            self.add_query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))),
        );

        let rewritten = segments.join("&");
        (rewritten != original).then_some(rewritten)
    }
}

/// Decoded key of a `key[=value]` query segment.
fn segment_key(segment: &str) -> String {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

/// Text of a configured query value. Strings are used as is.
fn query_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
