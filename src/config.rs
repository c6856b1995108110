//! Configuration types for fixture modification.

use crate::record::HttpMethod;
use crate::rule::RuleError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Main configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Selects the recorded interactions to modify
    pub index_search_parameters: MatchSpec,
    /// Rules applied to fixture bodies
    #[serde(default)]
    pub stubs_modification_rules: Option<StubsRules>,
    /// Edits applied to matching index lines
    #[serde(default)]
    pub index_modification_rules: Option<IndexRules>,
    /// Global settings
    #[serde(default)]
    pub settings: Settings,
    /// Directory of the file this configuration was loaded from
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name of index files inside the fixture tree
    pub index_file_name: String,
    /// Name of the recorded body inside each fixture folder
    pub body_file_name: String,
    /// Program used to run transform scripts (e.g. `bash`)
    pub script_interpreter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_file_name: "index.txt".to_string(),
            body_file_name: "resp_body.json".to_string(),
            script_interpreter: None,
        }
    }
}

/// Declarative selector for recorded interactions. Absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSpec {
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    /// Literal path or case-insensitive regex
    #[serde(default)]
    pub path: Option<String>,
    /// Required query parameter names; an empty set requires no query at all
    #[serde(default)]
    pub query_keys: Option<BTreeSet<String>>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub http_method: Option<HttpMethod>,
}

/// Rules applied to fixture bodies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StubsRules {
    #[serde(default)]
    pub rules: Option<Vec<RuleEntry>>,
}

/// One body modification rule as written in configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Slash-delimited key path, e.g. `data/facets`
    #[serde(default)]
    pub path: Option<String>,
    /// Fields merged into each object at the path
    #[serde(default)]
    pub add: Option<serde_json::Map<String, serde_json::Value>>,
    /// Keys deleted from each object at the path
    #[serde(default)]
    pub remove: Option<Vec<String>>,
    /// External script that rewrites each object at the path
    #[serde(default)]
    pub transform: Option<String>,
}

/// Edits applied to matching index lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexRules {
    /// Query parameters set on the URL
    #[serde(default)]
    pub add: serde_json::Map<String, serde_json::Value>,
    /// Query parameters removed from the URL
    #[serde(default)]
    pub remove: Vec<String>,
    /// Drop the line and delete its fixture folder
    #[serde(default, rename = "shouldRemoveLine")]
    pub should_remove_line: bool,
}

impl IndexRules {
    /// Whether any edit is configured.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && !self.should_remove_line
    }
}

impl FixtureConfig {
    /// Load configuration from a YAML or JSON file, chosen by extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config = if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };

        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check document-level structure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stubs_modification_rules.is_none() && self.index_modification_rules.is_none() {
            return Err(ConfigError::NoRules);
        }
        if let Some(ref index_rules) = self.index_modification_rules {
            if index_rules.is_empty() {
                return Err(ConfigError::EmptyIndexRules);
            }
        }
        Ok(())
    }
}

/// Errors that make a configuration unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration needs stubs_modification_rules or index_modification_rules")]
    NoRules,

    #[error("index_modification_rules needs add, remove or shouldRemoveLine")]
    EmptyIndexRules,

    #[error("Mode '{0}' selected but its rules are missing from the configuration")]
    MissingModeRules(&'static str),

    #[error(transparent)]
    Rules(#[from] RuleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.index_file_name, "index.txt");
        assert_eq!(settings.body_file_name, "resp_body.json");
        assert!(settings.script_interpreter.is_none());
    }

    #[test]
    fn test_config_parsing() {
        let json = r#"{
            "index_search_parameters": {
                "host": "api.test",
                "path": "^/v1/items",
                "queryKeys": ["x", "y", "x"],
                "statusCode": 200,
                "httpMethod": "GET",
                "unknown": "ignored"
            },
            "stubs_modification_rules": {
                "rules": [
                    {"path": "data/facets", "add": {"enabled": true}},
                    {"path": "data", "remove": ["secret"], "transform": "scripts/fix.sh"}
                ]
            }
        }"#;
        let config = FixtureConfig::from_json(json).unwrap();
        let spec = &config.index_search_parameters;
        assert_eq!(spec.host.as_deref(), Some("api.test"));
        assert_eq!(spec.query_keys.as_ref().unwrap().len(), 2);
        assert_eq!(spec.status_code, Some(200));
        assert_eq!(spec.http_method, Some(HttpMethod::Get));
        assert!(spec.scheme.is_none());

        let rules = config.stubs_modification_rules.unwrap().rules.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].transform.as_deref(), Some("scripts/fix.sh"));
        assert!(config.index_modification_rules.is_none());
    }

    #[test]
    fn test_yaml_config_parsing() {
        let yaml = r#"
index_search_parameters:
  scheme: https
  queryKeys: []
index_modification_rules:
  add:
    locale: en
  remove: ["session"]
settings:
  script_interpreter: bash
"#;
        let config = FixtureConfig::from_yaml(yaml).unwrap();
        let spec = &config.index_search_parameters;
        assert_eq!(spec.scheme.as_deref(), Some("https"));
        assert!(spec.query_keys.as_ref().unwrap().is_empty());

        let index_rules = config.index_modification_rules.unwrap();
        assert_eq!(index_rules.add["locale"], "en");
        assert_eq!(index_rules.remove, vec!["session"]);
        assert!(!index_rules.should_remove_line);
        assert_eq!(config.settings.script_interpreter.as_deref(), Some("bash"));
        assert_eq!(config.settings.body_file_name, "resp_body.json");
    }

    #[test]
    fn test_missing_both_rule_sets() {
        let json = r#"{"index_search_parameters": {}}"#;
        assert!(matches!(
            FixtureConfig::from_json(json),
            Err(ConfigError::NoRules)
        ));
    }

    #[test]
    fn test_missing_search_parameters() {
        let json = r#"{"index_modification_rules": {"shouldRemoveLine": true}}"#;
        assert!(matches!(
            FixtureConfig::from_json(json),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_empty_index_rules() {
        let json = r#"{
            "index_search_parameters": {},
            "index_modification_rules": {"add": {}, "remove": [], "shouldRemoveLine": false}
        }"#;
        assert!(matches!(
            FixtureConfig::from_json(json),
            Err(ConfigError::EmptyIndexRules)
        ));
    }

    #[test]
    fn test_remove_line_only_is_valid() {
        let json = r#"{
            "index_search_parameters": {"statusCode": 500},
            "index_modification_rules": {"shouldRemoveLine": true}
        }"#;
        let config = FixtureConfig::from_json(json).unwrap();
        assert!(config.index_modification_rules.unwrap().should_remove_line);
    }

    #[test]
    fn test_invalid_method_rejected() {
        let json = r#"{
            "index_search_parameters": {"httpMethod": "FETCH"},
            "index_modification_rules": {"shouldRemoveLine": true}
        }"#;
        assert!(FixtureConfig::from_json(json).is_err());
    }

    #[test]
    fn test_from_path_sets_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        std::fs::write(
            &path,
            "index_search_parameters: {}\nindex_modification_rules:\n  remove: [debug]\n",
        )
        .unwrap();

        let config = FixtureConfig::from_path(&path).unwrap();
        assert_eq!(config.base_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = FixtureConfig::from_path(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
