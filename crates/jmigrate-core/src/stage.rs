//! Pipeline stages as an explicit state machine
//!
//! The run advances strictly one stage at a time. `Exploration` is the only
//! legal first stage and every other stage has exactly one legal predecessor.
//! A run may stop after any stage but never skips or repeats one.

use crate::error::MigrationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One discrete step of a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Discover project structure
    #[serde(rename = "Project Exploration")]
    Exploration,
    /// Parse the build descriptor
    #[serde(rename = "POM Analysis")]
    DescriptorAnalysis,
    /// Query the bundled framework status
    #[serde(rename = "Spring Boot Verification")]
    FrameworkVerification,
    /// Baseline compile
    #[serde(rename = "Project Compilation")]
    Compilation,
    /// Baseline tests
    #[serde(rename = "Test Execution")]
    Tests,
    /// Select the migration target
    #[serde(rename = "Migration Path Determination")]
    PathDetermination,
    /// Preview and operator approval
    #[serde(rename = "Migration Confirmation")]
    Confirmation,
    /// Apply the transformation
    #[serde(rename = "Migration Execution")]
    Transformation,
    /// Post-migration compile
    #[serde(rename = "Post-Migration Compilation")]
    PostCompilation,
    /// Post-migration tests
    #[serde(rename = "Post-Migration Tests")]
    PostTests,
    /// Full clean install
    #[serde(rename = "Project Build")]
    Build,
    /// Render the report
    #[serde(rename = "Report Generation")]
    Report,
}

impl Stage {
    /// Every stage in pipeline order
    pub const ALL: [Self; 12] = [
        Self::Exploration,
        Self::DescriptorAnalysis,
        Self::FrameworkVerification,
        Self::Compilation,
        Self::Tests,
        Self::PathDetermination,
        Self::Confirmation,
        Self::Transformation,
        Self::PostCompilation,
        Self::PostTests,
        Self::Build,
        Self::Report,
    ];

    /// Display name, as recorded in History and the report
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Exploration => "Project Exploration",
            Self::DescriptorAnalysis => "POM Analysis",
            Self::FrameworkVerification => "Spring Boot Verification",
            Self::Compilation => "Project Compilation",
            Self::Tests => "Test Execution",
            Self::PathDetermination => "Migration Path Determination",
            Self::Confirmation => "Migration Confirmation",
            Self::Transformation => "Migration Execution",
            Self::PostCompilation => "Post-Migration Compilation",
            Self::PostTests => "Post-Migration Tests",
            Self::Build => "Project Build",
            Self::Report => "Report Generation",
        }
    }

    /// Following stage, `None` after the report
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let index = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(index + 1).copied()
    }

    /// Stages that run the build tool
    #[must_use]
    pub fn is_build_stage(self) -> bool {
        matches!(
            self,
            Self::Compilation | Self::Tests | Self::PostCompilation | Self::PostTests | Self::Build
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stages reachable from `from`
#[must_use]
pub fn allowed_transitions(from: Option<Stage>) -> Vec<Stage> {
    match from {
        None => vec![Stage::Exploration],
        Some(stage) => stage.next().into_iter().collect(),
    }
}

/// Validates a stage transition
///
/// # Errors
/// [`MigrationError::IllegalTransition`] if `to` is not the successor of `from`.
pub fn validate_transition(from: Option<Stage>, to: Stage) -> Result<(), MigrationError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(MigrationError::IllegalTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_order_is_linear() {
        let mut stage = Stage::Exploration;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            validate_transition(Some(stage), next).unwrap();
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, Stage::ALL.to_vec());
        assert!(allowed_transitions(Some(Stage::Report)).is_empty());
    }

    #[test]
    fn first_stage_must_be_exploration() {
        validate_transition(None, Stage::Exploration).unwrap();
        assert!(validate_transition(None, Stage::DescriptorAnalysis).is_err());
    }

    #[test]
    fn stages_cannot_be_skipped_or_repeated() {
        assert!(validate_transition(Some(Stage::Compilation), Stage::Compilation).is_err());
        assert!(validate_transition(Some(Stage::Tests), Stage::Transformation).is_err());
        assert!(validate_transition(Some(Stage::Build), Stage::Compilation).is_err());
    }

    #[test]
    fn build_stages_are_the_checkpointed_ones() {
        let build: Vec<_> = Stage::ALL.into_iter().filter(|s| s.is_build_stage()).collect();
        assert_eq!(
            build,
            vec![
                Stage::Compilation,
                Stage::Tests,
                Stage::PostCompilation,
                Stage::PostTests,
                Stage::Build,
            ]
        );
    }

    #[test]
    fn serializes_by_display_name() {
        let json = serde_json::to_string(&Stage::FrameworkVerification).unwrap();
        assert_eq!(json, "\"Spring Boot Verification\"");
        for stage in Stage::ALL {
            let quoted = format!("\"{}\"", stage.name());
            assert_eq!(serde_json::from_str::<Stage>(&quoted).unwrap(), stage);
        }
    }
}
