//! External transform scripts.
//!
//! A script receives the object to rewrite as its only argument, base64
//! encoded UTF-8 JSON, and prints the replacement JSON document to stdout.

use crate::config::FixtureConfig;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Capability to run a transform script over a JSON payload.
pub trait ScriptRunner {
    /// Run `script` with the serialized object and parse what it prints.
    fn run(&self, script: &str, payload: &[u8]) -> Result<JsonValue, ScriptError>;
}

/// Runs scripts as child processes, one blocking call per object.
#[derive(Debug, Clone, Default)]
pub struct ProcessScriptRunner {
    /// Program that runs the script, e.g. `bash`
    interpreter: Option<String>,
    /// Directory relative script paths are resolved against
    base_dir: Option<PathBuf>,
}

impl ProcessScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner using the configured interpreter, resolving scripts next to
    /// the configuration file.
    pub fn for_config(config: &FixtureConfig) -> Self {
        Self {
            interpreter: config.settings.script_interpreter.clone(),
            base_dir: config.base_dir.clone(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    fn resolve(&self, script: &str) -> PathBuf {
        let path = PathBuf::from(script);
        match self.base_dir {
            Some(ref dir) if path.is_relative() => dir.join(path),
            _ => path,
        }
    }

    fn command(&self, script: &str, argument: String) -> Command {
        let script_path = self.resolve(script);
        match self.interpreter {
            Some(ref interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(script_path).arg(argument);
                cmd
            }
            None => {
                let mut cmd = Command::new(script_path);
                cmd.arg(argument);
                cmd
            }
        }
    }
}

impl ScriptRunner for ProcessScriptRunner {
    fn run(&self, script: &str, payload: &[u8]) -> Result<JsonValue, ScriptError> {
        let encoded = STANDARD.encode(payload);
        debug!(script, payload_len = payload.len(), "Running transform script");

        let output = self
            .command(script, encoded)
            .output()
            .map_err(|e| ScriptError::Spawn {
                script: script.to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ScriptError::Failed {
                script: script.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| ScriptError::InvalidUtf8 {
            script: script.to_string(),
        })?;

        serde_json::from_str(stdout.trim()).map_err(|e| ScriptError::InvalidOutput {
            script: script.to_string(),
            source: e,
        })
    }
}

/// Errors from a single script invocation.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Cannot run transform script '{script}': {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transform script '{script}' exited with {status}: {stderr}")]
    Failed {
        script: String,
        status: String,
        stderr: String,
    },

    #[error("Transform script '{script}' printed non UTF-8 output")]
    InvalidUtf8 { script: String },

    #[error("Transform script '{script}' printed invalid JSON: {source}")]
    InvalidOutput {
        script: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) {
        std::fs::write(dir.path().join(name), body).unwrap();
    }

    fn runner(dir: &tempfile::TempDir) -> ProcessScriptRunner {
        ProcessScriptRunner::new()
            .with_interpreter("sh")
            .with_base_dir(dir.path())
    }

    #[test]
    fn test_script_output_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        write_script(&dir, "fixed.sh", "printf '  {\"replaced\": true}\\n'\n");

        let result = runner(&dir).run("fixed.sh", br#"{"id":1}"#).unwrap();
        assert_eq!(result, json!({"replaced": true}));
    }

    #[test]
    fn test_payload_is_base64_argument() {
        let dir = tempfile::tempdir().unwrap();
        // Echo the argument back as a JSON string
        write_script(&dir, "echo.sh", "printf '\"%s\"' \"$1\"\n");

        let payload = br#"{"id":1}"#;
        let result = runner(&dir).run("echo.sh", payload).unwrap();
        assert_eq!(result, json!(STANDARD.encode(payload)));
    }

    #[test]
    fn test_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        write_script(&dir, "fail.sh", "echo broken >&2\nexit 3\n");

        let err = runner(&dir).run("fail.sh", b"{}").unwrap_err();
        match err {
            ScriptError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_json_output() {
        let dir = tempfile::tempdir().unwrap();
        write_script(&dir, "text.sh", "echo not json\n");

        let err = runner(&dir).run("text.sh", b"{}").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidOutput { .. }));
    }

    #[test]
    fn test_for_config_resolves_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        write_script(&dir, "fixed.sh", "echo '[1, 2]'\n");
        let config_path = dir.path().join("rules.json");
        std::fs::write(
            &config_path,
            r#"{"index_search_parameters": {}, "index_modification_rules": {"remove": ["a"]},
                "settings": {"script_interpreter": "sh"}}"#,
        )
        .unwrap();

        let config = FixtureConfig::from_path(&config_path).unwrap();
        let result = ProcessScriptRunner::for_config(&config)
            .run("fixed.sh", b"{}")
            .unwrap();
        assert_eq!(result, json!([1, 2]));
    }

    #[test]
    fn test_missing_program() {
        let err = ProcessScriptRunner::new()
            .run("/nonexistent/transform-script", b"{}")
            .unwrap_err();
        assert!(matches!(err, ScriptError::Spawn { .. }));
    }
}
