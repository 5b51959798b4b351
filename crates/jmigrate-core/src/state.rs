//! Per-run working memory
//!
//! [`RunState`] is owned by exactly one orchestrator run. History and the
//! reasoning chain only grow; the current-facts map keeps the latest value
//! per key.

use crate::error::{LoggerError, MigrationError};
use crate::stage::{validate_transition, Stage};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// Unique identifier of one migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate a new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One History entry: a stage and its structured result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Stage that produced the result
    pub step: Stage,
    /// Structured result
    pub result: Value,
}

/// Append-only sequence of advisory texts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasoningChain(Vec<String>);

impl ReasoningChain {
    /// Append one block
    pub fn push(&mut self, text: impl Into<String>) {
        self.0.push(text.into());
    }

    /// Most recent block
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Number of blocks
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no block was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Blocks in recording order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Working memory of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Run identifier
    pub run_id: RunId,
    /// Project under migration
    pub project_path: PathBuf,
    /// Last recorded stage
    pub current_stage: Option<Stage>,
    /// Latest known value per fact
    #[serde(rename = "state")]
    pub current: IndexMap<String, Value>,
    /// One entry per executed stage
    pub history: Vec<HistoryEntry>,
    /// Advisory texts in recording order
    pub reasoning: ReasoningChain,
}

impl RunState {
    /// Fresh state for a project
    #[must_use]
    pub fn new(run_id: RunId, project_path: impl AsRef<Path>) -> Self {
        Self {
            run_id,
            project_path: project_path.as_ref().to_path_buf(),
            current_stage: None,
            current: IndexMap::new(),
            history: Vec::new(),
            reasoning: ReasoningChain::default(),
        }
    }

    /// Record a stage result
    ///
    /// Advances the stage pointer, appends the History entry and merges the
    /// result's top-level keys into the current facts (later stages win).
    ///
    /// # Errors
    /// [`MigrationError::IllegalTransition`] if `stage` does not follow the
    /// last recorded stage.
    pub fn record(&mut self, stage: Stage, result: Value) -> Result<(), MigrationError> {
        validate_transition(self.current_stage, stage)?;

        if let Value::Object(fields) = &result {
            for (key, value) in fields {
                self.current.insert(key.clone(), value.clone());
            }
        }
        self.history.push(HistoryEntry {
            step: stage,
            result,
        });
        self.current_stage = Some(stage);
        Ok(())
    }

    /// Fact by key
    #[must_use]
    pub fn fact(&self, key: &str) -> Option<&Value> {
        self.current.get(key)
    }

    /// Stages recorded so far
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        self.history.iter().map(|entry| entry.step).collect()
    }

    /// Checkpoint file for this run inside `dir`
    #[must_use]
    pub fn checkpoint_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("run_{}.checkpoint.json", self.run_id))
    }

    /// Persist a snapshot to `<dir>/run_<run_id>.checkpoint.json`
    ///
    /// Written to a sibling temp file first and renamed, so a reader never
    /// sees a torn snapshot.
    ///
    /// # Errors
    /// Returns [`LoggerError`] on encoding or file system failure.
    pub fn write_checkpoint(&self, dir: &Path) -> Result<PathBuf, LoggerError> {
        let path = self.checkpoint_path(dir);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(self)?;

        std::fs::write(&tmp, bytes).map_err(|e| LoggerError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| LoggerError::io(&path, e))?;
        Ok(path)
    }

    /// Load a snapshot written by [`RunState::write_checkpoint`]
    ///
    /// # Errors
    /// Returns [`LoggerError`] if the file cannot be read or decoded.
    pub fn read_checkpoint(path: &Path) -> Result<Self, LoggerError> {
        let bytes = std::fs::read(path).map_err(|e| LoggerError::io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
