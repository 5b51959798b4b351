//! Step logger
//!
//! Every record is appended to an in-memory list, written as one JSON line
//! to the run's log file and synced before `log_step` returns, then emitted
//! as a `tracing` event under the `jmigrate::steps` target. Reports are
//! rendered from the in-memory list and never overwrite an earlier report.

use crate::error::LoggerError;
use crate::report::render_html;
use crate::state::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Directory under the project used when none is configured
pub const DEFAULT_LOG_DIR: &str = "migration_logs";

/// Record severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Normal progress
    #[default]
    Info,
    /// Degraded but continuing
    Warning,
    /// Failure
    Error,
}

impl Severity {
    /// Lowercase name, also the report's CSS class
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One logged step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// When the record was appended
    pub timestamp: DateTime<Utc>,
    /// Step name
    pub step: String,
    /// Structured details
    pub details: Value,
    /// Severity
    #[serde(rename = "status")]
    pub severity: Severity,
}

/// Durable, append-only step log for one run
#[derive(Debug)]
pub struct StepLogger {
    project: String,
    log_dir: PathBuf,
    log_file: PathBuf,
    stamp: String,
    sink: File,
    records: Vec<StepRecord>,
    reports: u32,
}

impl StepLogger {
    /// Open a logger writing under `log_dir`
    ///
    /// Creates the directory and a log file named
    /// `migration_<timestamp>_<run_id>.log`.
    ///
    /// # Errors
    /// Returns [`LoggerError::Io`] if the directory or file cannot be created.
    pub fn open(project_path: &Path, log_dir: &Path, run_id: RunId) -> Result<Self, LoggerError> {
        std::fs::create_dir_all(log_dir).map_err(|e| LoggerError::io(log_dir, e))?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_file = log_dir.join(format!("migration_{stamp}_{run_id}.log"));
        let sink = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| LoggerError::io(&log_file, e))?;

        Ok(Self {
            project: project_path.display().to_string(),
            log_dir: log_dir.to_path_buf(),
            log_file,
            stamp,
            sink,
            records: Vec::new(),
            reports: 0,
        })
    }

    /// Default log directory for a project
    #[must_use]
    pub fn default_dir(project_path: &Path) -> PathBuf {
        project_path.join(DEFAULT_LOG_DIR)
    }

    /// Append a record and persist it before returning
    ///
    /// # Errors
    /// Returns [`LoggerError`] if the record cannot be encoded or written. The
    /// record stays in memory either way.
    pub fn log_step(
        &mut self,
        step: &str,
        details: Value,
        severity: Severity,
    ) -> Result<(), LoggerError> {
        let record = StepRecord {
            timestamp: Utc::now(),
            step: step.to_string(),
            details,
            severity,
        };

        match severity {
            Severity::Info => info!(target: "jmigrate::steps", step, details = %record.details, "step"),
            Severity::Warning => warn!(target: "jmigrate::steps", step, details = %record.details, "step"),
            Severity::Error => error!(target: "jmigrate::steps", step, details = %record.details, "step"),
        }

        let line = serde_json::to_string(&record);
        self.records.push(record);
        let mut line = line?;
        line.push('\n');

        self.sink
            .write_all(line.as_bytes())
            .and_then(|()| self.sink.flush())
            .and_then(|()| self.sink.sync_data())
            .map_err(|e| LoggerError::io(&self.log_file, e))
    }

    /// Append an info record
    ///
    /// # Errors
    /// See [`StepLogger::log_step`].
    pub fn info(&mut self, step: &str, details: Value) -> Result<(), LoggerError> {
        self.log_step(step, details, Severity::Info)
    }

    /// Append a warning record
    ///
    /// # Errors
    /// See [`StepLogger::log_step`].
    pub fn warning(&mut self, step: &str, details: Value) -> Result<(), LoggerError> {
        self.log_step(step, details, Severity::Warning)
    }

    /// Append an error record
    ///
    /// # Errors
    /// See [`StepLogger::log_step`].
    pub fn error(&mut self, step: &str, details: Value) -> Result<(), LoggerError> {
        self.log_step(step, details, Severity::Error)
    }

    /// Records in recording order
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Durable log file
    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Directory holding the log, reports and checkpoints
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Render every record so far into a new HTML report
    ///
    /// Each call creates a new `migration_report_<timestamp>_<seq>.html`;
    /// an existing file is never replaced.
    ///
    /// # Errors
    /// Returns [`LoggerError::Io`] if the report cannot be written.
    pub fn generate_report(&mut self) -> Result<PathBuf, LoggerError> {
        let html = render_html(&self.project, Utc::now(), &self.records);

        loop {
            self.reports += 1;
            let path = self
                .log_dir
                .join(format!("migration_report_{}_{:03}.html", self.stamp, self.reports));

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(html.as_bytes())
                        .and_then(|()| file.sync_all())
                        .map_err(|e| LoggerError::io(&path, e))?;
                    info!(report = %path.display(), records = self.records.len(), "report generated");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(LoggerError::io(&path, e)),
            }
        }
    }
}
