//! Index file records.
//!
//! An index file lists recorded interactions, one per line:
//!
//! ```text
//! F,\t200,\tfolder1,\tGET,\thttp://api.test/v1/items?x=1
//! ```
//!
//! Fields are separated by a comma followed by a tab.

use crate::report::Reporter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use url::Url;

/// Field delimiter used by index files.
pub const FIELD_DELIMITER: &str = ",\t";

/// Number of fields in a well-formed record line.
pub const FIELD_COUNT: usize = 5;

/// Position of the fixture folder field.
pub const FOLDER_FIELD: usize = 2;

/// Position of the URL field.
pub const URL_FIELD: usize = 4;

/// Whether a recorded interaction is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    Focused,
    NotFocused,
}

impl Focus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Focused => "F",
            Self::NotFocused => "N",
        }
    }
}

impl FromStr for Focus {
    type Err = RecordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "F" => Ok(Self::Focused),
            "N" => Ok(Self::NotFocused),
            other => Err(RecordParseError::InvalidFocus(other.to_string())),
        }
    }
}

/// HTTP methods recognised in index files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = RecordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "CONNECT" => Ok(Self::Connect),
            "OPTIONS" => Ok(Self::Options),
            "TRACE" => Ok(Self::Trace),
            "PATCH" => Ok(Self::Patch),
            other => Err(RecordParseError::InvalidMethod(other.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub focus: Focus,
    pub status_code: u16,
    /// Folder holding the recorded body, relative to the index file
    pub fixture_folder: String,
    pub http_method: HttpMethod,
    pub url: Url,
    /// URL as written in the index file
    pub raw_url: String,
}

impl FromStr for IndexRecord {
    type Err = RecordParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(RecordParseError::FieldCount(fields.len()));
        }

        let focus = fields[0].parse()?;
        let status_code = fields[1]
            .parse()
            .map_err(|_| RecordParseError::InvalidStatus(fields[1].to_string()))?;
        let http_method = fields[3].parse()?;
        let url = Url::parse(fields[URL_FIELD]).map_err(|e| RecordParseError::InvalidUrl {
            url: fields[URL_FIELD].to_string(),
            source: e,
        })?;

        Ok(Self {
            focus,
            status_code,
            fixture_folder: fields[FOLDER_FIELD].to_string(),
            http_method,
            url,
            raw_url: fields[URL_FIELD].to_string(),
        })
    }
}

impl fmt::Display for IndexRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status_code.to_string();
        let fields = [
            self.focus.as_str(),
            status.as_str(),
            self.fixture_folder.as_str(),
            self.http_method.as_str(),
            self.raw_url.as_str(),
        ];
        f.write_str(&fields.join(FIELD_DELIMITER))
    }
}

/// Parse one index line, reporting and discarding malformed lines.
pub fn parse_record(line: &str, reporter: &dyn Reporter) -> Option<IndexRecord> {
    match line.parse() {
        Ok(record) => Some(record),
        Err(e) => {
            reporter.error(&format!("Incorrect line format ({e}): {line}"));
            None
        }
    }
}

/// Split index file content into record lines. Empty lines are dropped.
pub fn record_lines(content: &str) -> impl Iterator<Item = &str> {
    content.split('\n').filter(|line| !line.is_empty())
}

/// Read every parseable record of an index file, in file order.
pub fn parse_file(path: &Path, reporter: &dyn Reporter) -> Vec<IndexRecord> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            reporter.error(&format!(
                "Cannot open index file at {}: {e}",
                path.display()
            ));
            return Vec::new();
        }
    };

    record_lines(&content)
        .filter_map(|line| parse_record(line, reporter))
        .collect()
}

/// Errors for a single malformed index line.
#[derive(Debug, thiserror::Error)]
pub enum RecordParseError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid focus flag '{0}'")]
    InvalidFocus(String),

    #[error("invalid status code '{0}'")]
    InvalidStatus(String),

    #[error("unsupported HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;

    const LINE: &str = "F,\t200,\tfolder1,\tGET,\thttp://api.test/v1/items?x=1";

    #[test]
    fn test_parse_valid_line() {
        let record: IndexRecord = LINE.parse().unwrap();
        assert_eq!(record.focus, Focus::Focused);
        assert_eq!(record.status_code, 200);
        assert_eq!(record.fixture_folder, "folder1");
        assert_eq!(record.http_method, HttpMethod::Get);
        assert_eq!(record.url.host_str(), Some("api.test"));
    }

    #[test]
    fn test_round_trip() {
        let record: IndexRecord = LINE.parse().unwrap();
        assert_eq!(record.to_string(), LINE);
        let reparsed: IndexRecord = record.to_string().parse().unwrap();
        assert_eq!(reparsed, record);
    }

    #[test]
    fn test_url_is_written_back_as_recorded() {
        let line = "F,\t200,\tf,\tGET,\thttp://API.test:80";
        let record: IndexRecord = line.parse().unwrap();
        assert_eq!(record.url.as_str(), "http://api.test/");
        assert_eq!(record.to_string(), line);
    }

    #[test]
    fn test_wrong_field_count() {
        let err = "F,\t200,\tfolder1,\tGET".parse::<IndexRecord>().unwrap_err();
        assert!(matches!(err, RecordParseError::FieldCount(4)));

        // Comma without tab is not a delimiter
        let err = "F,200,folder1,GET,http://a.test/"
            .parse::<IndexRecord>()
            .unwrap_err();
        assert!(matches!(err, RecordParseError::FieldCount(1)));
    }

    #[test]
    fn test_invalid_fields() {
        assert!(matches!(
            "X,\t200,\tf,\tGET,\thttp://a.test/".parse::<IndexRecord>(),
            Err(RecordParseError::InvalidFocus(_))
        ));
        assert!(matches!(
            "N,\tok,\tf,\tGET,\thttp://a.test/".parse::<IndexRecord>(),
            Err(RecordParseError::InvalidStatus(_))
        ));
        assert!(matches!(
            "N,\t200,\tf,\tget,\thttp://a.test/".parse::<IndexRecord>(),
            Err(RecordParseError::InvalidMethod(_))
        ));
        assert!(matches!(
            "N,\t200,\tf,\tGET,\tnot a url".parse::<IndexRecord>(),
            Err(RecordParseError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_all_methods_parse() {
        for method in [
            "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
        ] {
            let parsed: HttpMethod = method.parse().unwrap();
            assert_eq!(parsed.as_str(), method);
        }
    }

    #[test]
    fn test_parse_record_reports_malformed_line() {
        let reporter = MemoryReporter::new();
        assert!(parse_record("garbage", &reporter).is_none());
        assert_eq!(reporter.errors().len(), 1);
        assert!(reporter.errors()[0].contains("garbage"));
    }

    #[test]
    fn test_parse_file_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.txt");
        let content = format!(
            "{LINE}\nbroken line\n\nN,\t404,\tfolder2,\tPOST,\thttps://api.test/v2/login\n"
        );
        std::fs::write(&path, content).unwrap();

        let reporter = MemoryReporter::new();
        let records = parse_file(&path, &reporter);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fixture_folder, "folder1");
        assert_eq!(records[1].fixture_folder, "folder2");
        assert_eq!(records[1].http_method, HttpMethod::Post);
        assert_eq!(reporter.errors().len(), 1);
    }

    #[test]
    fn test_parse_missing_file() {
        let reporter = MemoryReporter::new();
        let records = parse_file(Path::new("/nonexistent/index.txt"), &reporter);
        assert!(records.is_empty());
        assert_eq!(reporter.errors().len(), 1);
    }
}
