//! Batch modification of a fixture tree.
//!
//! Two modes share one matcher:
//!
//! - index mode rewrites (or deletes) matching lines of index files,
//! - stubs mode runs the body rules over the fixtures matching lines point at.
//!
//! Failures are reported per line or per file and never stop the batch.

use crate::config::{ConfigError, FixtureConfig, IndexRules, Settings};
use crate::discovery::find_index_files;
use crate::matcher::CompiledMatcher;
use crate::record::{parse_file, parse_record, record_lines, IndexRecord};
use crate::report::{BatchSummary, Reporter};
use crate::rule::parse_rules;
use crate::transformer::{RuleEngine, ScriptRunner, TransformError, UrlTransformer};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// What a run modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Index file lines
    Index,
    /// Fixture bodies
    Stubs,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Stubs => "stubs",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index mode rules, compiled.
struct IndexEdit {
    rules: IndexRules,
    url_transformer: UrlTransformer,
}

/// Applies a configuration to a fixture tree.
pub struct FixtureModifier<'a> {
    matcher: CompiledMatcher,
    settings: Settings,
    index_edit: Option<IndexEdit>,
    engine: Option<RuleEngine<'a>>,
    reporter: &'a dyn Reporter,
}

impl<'a> FixtureModifier<'a> {
    /// Compile the matcher and rule sets of a configuration.
    pub fn new(
        config: &FixtureConfig,
        runner: &'a dyn ScriptRunner,
        reporter: &'a dyn Reporter,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let engine = config
            .stubs_modification_rules
            .as_ref()
            .map(parse_rules)
            .transpose()?
            .map(|rules| RuleEngine::new(rules, runner, reporter));

        let index_edit = config.index_modification_rules.as_ref().map(|rules| IndexEdit {
            rules: rules.clone(),
            url_transformer: UrlTransformer::new(rules),
        });

        debug!(
            body_rules = engine.as_ref().map_or(0, |e| e.rules().len()),
            index_rules = index_edit.is_some(),
            "Fixture modifier initialized"
        );

        Ok(Self {
            matcher: CompiledMatcher::compile(&config.index_search_parameters),
            settings: config.settings.clone(),
            index_edit,
            engine,
            reporter,
        })
    }

    /// Check that the configuration carries rules for a mode.
    pub fn supports(&self, mode: Mode) -> Result<(), ConfigError> {
        let present = match mode {
            Mode::Index => self.index_edit.is_some(),
            Mode::Stubs => self.engine.is_some(),
        };
        if present {
            Ok(())
        } else {
            Err(ConfigError::MissingModeRules(mode.as_str()))
        }
    }

    /// Discover index files under `root` and run the selected modes.
    ///
    /// Stubs mode runs before index mode so that index edits cannot hide
    /// fixtures from it.
    pub fn run(&self, root: &Path, modes: &[Mode]) -> Result<BatchSummary, ConfigError> {
        for mode in modes {
            self.supports(*mode)?;
        }

        let index_files = find_index_files(root, &self.settings.index_file_name);
        self.reporter.info(&format!(
            "Found {} index file(s) under {}",
            index_files.len(),
            root.display()
        ));

        let mut summary = BatchSummary::default();
        if modes.contains(&Mode::Stubs) {
            summary.merge(self.modify_stubs(&index_files)?);
        }
        if modes.contains(&Mode::Index) {
            summary.merge(self.modify_index_files(&index_files)?);
        }
        Ok(summary)
    }

    /// Rewrite or delete matching lines in each index file.
    pub fn modify_index_files(&self, index_files: &[PathBuf]) -> Result<BatchSummary, ConfigError> {
        let edit = self
            .index_edit
            .as_ref()
            .ok_or(ConfigError::MissingModeRules(Mode::Index.as_str()))?;

        self.reporter.info("Started modifying index files");

        let mut summary = BatchSummary::default();
        for path in index_files {
            summary.examined += 1;
            match self.modify_index_file(edit, path) {
                Ok(true) => summary.modified += 1,
                Ok(false) => {}
                Err(e) => {
                    summary.failed += 1;
                    self.reporter.error(&e.to_string());
                }
            }
        }

        self.reporter
            .info(&format!("Index modification has finished: {summary}"));
        Ok(summary)
    }

    fn modify_index_file(&self, edit: &IndexEdit, path: &Path) -> Result<bool, ModifyError> {
        let content = fs::read_to_string(path).map_err(|e| ModifyError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let index_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut changed = false;
        let mut lines = Vec::new();
        for line in record_lines(&content) {
            let Some(record) = parse_record(line, self.reporter) else {
                lines.push(line.to_string());
                continue;
            };
            if !self.matcher.matches(&record) {
                lines.push(line.to_string());
                continue;
            }

            if edit.rules.should_remove_line {
                self.remove_fixture_folder(index_dir, &record);
                changed = true;
                continue;
            }

            match edit.url_transformer.rewrite_line(line) {
                Ok(rewritten) => {
                    changed |= rewritten != line;
                    lines.push(rewritten);
                }
                Err(e) => {
                    self.reporter
                        .error(&format!("Cannot rewrite line ({e}): {line}"));
                    lines.push(line.to_string());
                }
            }
        }

        if !changed {
            return Ok(false);
        }

        let mut new_content = lines.join("\n");
        new_content.push('\n');
        fs::write(path, new_content).map_err(|e| ModifyError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.reporter
            .info(&format!("Did modify index file at {}", path.display()));
        Ok(true)
    }

    fn remove_fixture_folder(&self, index_dir: &Path, record: &IndexRecord) {
        let folder = Path::new(&record.fixture_folder);
        let contained = !record.fixture_folder.is_empty()
            && folder
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !contained {
            self.reporter.error(&format!(
                "Refusing to remove fixture folder '{}' outside {}",
                record.fixture_folder,
                index_dir.display()
            ));
            return;
        }

        let target = index_dir.join(folder);
        match fs::remove_dir_all(&target) {
            Ok(()) => self
                .reporter
                .info(&format!("Removed data at path: {}", target.display())),
            Err(e) => self.reporter.error(&format!(
                "Wasn't able to remove folder at {}: {e}",
                target.display()
            )),
        }
    }

    /// Apply the body rules to every fixture selected by the index files.
    pub fn modify_stubs(&self, index_files: &[PathBuf]) -> Result<BatchSummary, ConfigError> {
        let engine = self
            .engine
            .as_ref()
            .ok_or(ConfigError::MissingModeRules(Mode::Stubs.as_str()))?;

        self.reporter.info("Finding stubs to modify");
        let body_paths = self.body_paths(index_files);
        self.reporter.info(&format!(
            "Found {} stub file(s) to be modified",
            body_paths.len()
        ));

        let mut summary = BatchSummary::default();
        for path in &body_paths {
            summary.examined += 1;
            match self.modify_stub(engine, path) {
                Ok(true) => {
                    summary.modified += 1;
                    self.reporter
                        .info(&format!("Did modify file at {}", path.display()));
                }
                Ok(false) => debug!(path = %path.display(), "No rule changed fixture"),
                Err(e) => {
                    summary.failed += 1;
                    self.reporter.error(&format!(
                        "Did fail to modify stub at {}: {e}",
                        path.display()
                    ));
                }
            }
        }

        self.reporter
            .info(&format!("Stubs modification has finished: {summary}"));
        Ok(summary)
    }

    /// Body files of matching records, deduplicated, in discovery order.
    fn body_paths(&self, index_files: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut paths = Vec::new();

        for index_file in index_files {
            let records = parse_file(index_file, self.reporter);
            let index_dir = index_file.parent().unwrap_or_else(|| Path::new("."));

            for record in self.matcher.select(&records) {
                let path = index_dir
                    .join(&record.fixture_folder)
                    .join(&self.settings.body_file_name);
                if seen.insert(path.clone()) {
                    paths.push(path);
                }
            }
        }

        paths
    }

    fn modify_stub(&self, engine: &RuleEngine<'_>, path: &Path) -> Result<bool, ModifyError> {
        let content = fs::read_to_string(path).map_err(|e| ModifyError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let tree: JsonValue = serde_json::from_str(&content)?;

        let modified = engine.apply_rules(&tree)?;
        if modified == tree {
            return Ok(false);
        }

        let mut output = serde_json::to_string_pretty(&modified)?;
        output.push('\n');
        fs::write(path, output).map_err(|e| ModifyError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(true)
    }
}

/// Errors that stop the modification of a single file.
#[derive(Debug, thiserror::Error)]
pub enum ModifyError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),
}
