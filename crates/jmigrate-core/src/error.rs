//! Error types for the migration pipeline
//!
//! Provides error handling for:
//! - Structural preconditions (no build descriptor)
//! - Operator cancellation and declined checkpoints
//! - Collaborator failures, tagged with the stage they happened in
//! - Step log and checkpoint persistence
//! - Configuration loading

use crate::stage::Stage;
use jmigrate_gateway::GatewayError;
use std::path::PathBuf;

/// Pipeline error
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Discovery found no build descriptor
    #[error("No POM files found in the project")]
    NoDescriptorFound,

    /// Operator quit at a checkpoint
    #[error("migration cancelled at {stage}")]
    Cancelled {
        /// Stage whose checkpoint was cancelled
        stage: Stage,
    },

    /// Operator answered "No" at a checkpoint that requires "Yes"
    #[error("migration declined at {stage}")]
    Declined {
        /// Stage whose checkpoint was declined
        stage: Stage,
    },

    /// A collaborator call failed
    #[error("{stage} failed: {source}")]
    Gateway {
        /// Stage that issued the call
        stage: Stage,
        /// Collaborator error
        #[source]
        source: GatewayError,
    },

    /// Step log or report could not be written
    #[error("step logger error: {0}")]
    Logger(#[from] LoggerError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A stage was recorded out of order
    #[error("illegal stage transition: {} -> {to}", .from.map_or("start", Stage::name))]
    IllegalTransition {
        /// Last recorded stage, `None` before the first
        from: Option<Stage>,
        /// Stage that was attempted
        to: Stage,
    },

    /// Stage result could not be serialized
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl MigrationError {
    /// Stage the error is attached to, if any
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Cancelled { stage } | Self::Declined { stage } | Self::Gateway { stage, .. } => {
                Some(*stage)
            }
            Self::IllegalTransition { to, .. } => Some(*to),
            Self::NoDescriptorFound | Self::Logger(_) | Self::Config(_) | Self::Serialize(_) => None,
        }
    }

    /// Operator stopped the run (quit or declined)
    #[inline]
    #[must_use]
    pub fn is_operator_stop(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::Declined { .. })
    }
}

/// Step log, report and checkpoint persistence errors
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// File system failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded
    #[error("could not encode record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LoggerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for this schema
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// TOML error
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_descriptor_message_is_stable() {
        assert_eq!(
            MigrationError::NoDescriptorFound.to_string(),
            "No POM files found in the project"
        );
    }

    #[test]
    fn stage_attached_to_errors() {
        let err = MigrationError::Declined {
            stage: Stage::Compilation,
        };
        assert_eq!(err.stage(), Some(Stage::Compilation));
        assert!(err.is_operator_stop());
        assert_eq!(err.to_string(), "migration declined at Project Compilation");

        let err = MigrationError::Gateway {
            stage: Stage::Exploration,
            source: GatewayError::Unavailable("file_explorer".to_string()),
        };
        assert!(!err.is_operator_stop());
        assert_eq!(err.to_string(), "Project Exploration failed: file_explorer unavailable");
    }

    #[test]
    fn illegal_transition_from_start() {
        let err = MigrationError::IllegalTransition {
            from: None,
            to: Stage::Compilation,
        };
        assert_eq!(
            err.to_string(),
            "illegal stage transition: start -> Project Compilation"
        );
    }
}
