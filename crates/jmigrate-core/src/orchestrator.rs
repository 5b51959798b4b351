//! Migration orchestrator
//!
//! Drives one run through the twelve [`Stage`]s in order:
//!
//! ```text
//! Exploration -> POM Analysis -> Spring Boot Verification
//!   -> Compilation -> Tests -> Path Determination -> Confirmation
//!   -> Execution -> Post-Migration Compilation -> Post-Migration Tests
//!   -> Build -> Report
//! ```
//!
//! Every executed stage leaves exactly one History entry, including the stage
//! during which the run stopped. Step records are written as the run goes, so
//! the log on disk is complete up to the last finished call even if the
//! process dies. Per-run state lives in a private `Run` value, so concurrent
//! runs on one orchestrator share nothing mutable.

use crate::config::MigrationSettings;
use crate::error::MigrationError;
use crate::logger::{Severity, StepLogger};
use crate::selector::{self, MigrationTarget};
use crate::stage::Stage;
use crate::state::{HistoryEntry, RunId, RunState};
use indexmap::IndexMap;
use jmigrate_gateway::{
    yes_no, AdvisoryContext, BuildAnalysis, BuildGoal, BuildRequest, Confirmation,
    FrameworkStatus, Gateway, GatewayError, ProjectDescriptor, RecipeType, TransformOutcome,
    TransformRequest,
};
use serde_json::{json, Value};
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Text used in place of reasoning when the advisor fails
pub const ADVISORY_UNAVAILABLE: &str = "(advisory unavailable)";

/// Why a run ended without a migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Discovery found no build descriptor
    NoDescriptorFound,
    /// No registered migration applies; not an error
    NoMigrationPath,
    /// Operator quit at a checkpoint
    Cancelled {
        /// Stage whose checkpoint was cancelled
        stage: Stage,
    },
    /// Operator answered "No"
    Declined {
        /// Stage whose checkpoint was declined
        stage: Stage,
    },
    /// A collaborator call failed
    Gateway {
        /// Stage that issued the call
        stage: Stage,
        /// Collaborator error text
        message: String,
    },
    /// Local failure (log, report or checkpoint persistence)
    Internal(String),
}

impl FailureReason {
    /// Whether this reason is an error, as opposed to a legitimate outcome
    #[must_use]
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::NoMigrationPath)
    }

    /// Stage the run stopped in, when known
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Cancelled { stage } | Self::Declined { stage } | Self::Gateway { stage, .. } => {
                Some(*stage)
            }
            Self::NoDescriptorFound => Some(Stage::Exploration),
            Self::NoMigrationPath => Some(Stage::PathDetermination),
            Self::Internal(_) => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDescriptorFound => f.write_str("No POM files found in the project"),
            Self::NoMigrationPath => f.write_str("No migration path found"),
            Self::Cancelled { stage } => write!(f, "Migration cancelled by user at {stage}"),
            Self::Declined { stage } => write!(f, "Migration declined at {stage}"),
            Self::Gateway { stage, message } => write!(f, "{stage} failed: {message}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl From<MigrationError> for FailureReason {
    fn from(err: MigrationError) -> Self {
        match err {
            MigrationError::NoDescriptorFound => Self::NoDescriptorFound,
            MigrationError::Cancelled { stage } => Self::Cancelled { stage },
            MigrationError::Declined { stage } => Self::Declined { stage },
            MigrationError::Gateway { stage, source } => Self::Gateway {
                stage,
                message: source.to_string(),
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Outcome of [`MigrationOrchestrator::run_migration`]
#[derive(Debug, Clone)]
pub enum MigrationResult {
    /// Every stage ran and the report was written
    Success {
        /// Run identifier
        run_id: RunId,
        /// Rendered report
        report_path: PathBuf,
        /// One entry per stage
        history: Vec<HistoryEntry>,
        /// Latest value per fact
        final_state: IndexMap<String, Value>,
        /// Migration that was applied
        target: MigrationTarget,
    },
    /// The run stopped early
    Failure {
        /// Run identifier
        run_id: RunId,
        /// Why
        reason: FailureReason,
        /// Entries for the stages that ran
        history: Vec<HistoryEntry>,
        /// Most recent reasoning text
        reasoning: Option<String>,
    },
}

impl MigrationResult {
    /// Whether the migration ran to completion
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Run identifier
    #[must_use]
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Success { run_id, .. } | Self::Failure { run_id, .. } => *run_id,
        }
    }

    /// History in execution order
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        match self {
            Self::Success { history, .. } | Self::Failure { history, .. } => history,
        }
    }

    /// Stages that ran, in order
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        self.history().iter().map(|entry| entry.step).collect()
    }

    /// Failure reason, `None` on success
    #[must_use]
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(reason),
        }
    }
}

/// Runs migrations against one set of collaborators
#[derive(Debug, Clone)]
pub struct MigrationOrchestrator {
    gateway: Gateway,
    settings: MigrationSettings,
}

impl MigrationOrchestrator {
    /// Create an orchestrator
    #[must_use]
    pub fn new(gateway: Gateway, settings: MigrationSettings) -> Self {
        Self { gateway, settings }
    }

    /// Pipeline settings
    #[must_use]
    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// Run the whole pipeline for one project
    ///
    /// Never returns an error: every failure is folded into
    /// [`MigrationResult::Failure`] with the History collected so far.
    pub async fn run_migration(&self, project_path: impl AsRef<Path>) -> MigrationResult {
        let project = project_path.as_ref().to_path_buf();
        let run_id = RunId::new();
        let log_dir = self
            .settings
            .log_dir
            .clone()
            .unwrap_or_else(|| StepLogger::default_dir(&project));

        info!(%run_id, project = %project.display(), engine = %self.settings.engine, "starting migration");

        let logger = match StepLogger::open(&project, &log_dir, run_id) {
            Ok(logger) => logger,
            Err(err) => {
                error!(%run_id, error = %err, "cannot open step log");
                return MigrationResult::Failure {
                    run_id,
                    reason: FailureReason::Internal(err.to_string()),
                    history: Vec::new(),
                    reasoning: None,
                };
            }
        };

        let mut run = Run {
            gateway: &self.gateway,
            settings: &self.settings,
            state: RunState::new(run_id, &project),
            project,
            log_dir,
            logger,
            active: None,
        };

        match run.execute().await {
            Ok(result) => result,
            Err(err) => run.fail(err),
        }
    }
}

fn at(stage: Stage) -> impl FnOnce(GatewayError) -> MigrationError {
    move |source| MigrationError::Gateway { stage, source }
}

fn failure_subject(stage: Stage) -> &'static str {
    match stage {
        Stage::Compilation | Stage::PostCompilation => "Compilation",
        Stage::Tests | Stage::PostTests => "Tests",
        _ => "Build",
    }
}

fn preview_summary(preview: &TransformOutcome) -> String {
    if !preview.success {
        return format!(
            "Preview did not complete: {}\n\n",
            preview.message.as_deref().unwrap_or("no details")
        );
    }
    let changes = preview.change_list();
    if changes.is_empty() {
        return "Preview: no file changes reported.\n\n".to_string();
    }
    let mut summary = format!("Preview: {} file(s) would change:\n", changes.len());
    for change in changes {
        let _ = writeln!(summary, "  - {} ({})", change.file, change.change_type);
    }
    summary.push('\n');
    summary
}

/// One run's exclusive working set
struct Run<'a> {
    gateway: &'a Gateway,
    settings: &'a MigrationSettings,
    project: PathBuf,
    log_dir: PathBuf,
    state: RunState,
    logger: StepLogger,
    active: Option<Stage>,
}

impl Run<'_> {
    async fn execute(&mut self) -> Result<MigrationResult, MigrationError> {
        let descriptor = self.explore().await?;
        let descriptor_path = descriptor
            .first_of_type(&self.settings.descriptor_type)
            .map(|file| PathBuf::from(&file.path))
            .ok_or(MigrationError::NoDescriptorFound)?;

        let analysis = self.analyze_descriptor(&descriptor_path).await?;
        let framework = self.verify_framework().await?;

        self.build_stage(Stage::Compilation, BuildGoal::Compile, false).await?;
        self.build_stage(Stage::Tests, BuildGoal::Test, false).await?;

        let (target, reasoning) = self.determine_path(&analysis, &framework).await?;
        let Some(target) = target else {
            info!(run_id = %self.state.run_id, "no migration path found");
            return Ok(MigrationResult::Failure {
                run_id: self.state.run_id,
                reason: FailureReason::NoMigrationPath,
                history: self.state.history.clone(),
                reasoning: Some(reasoning),
            });
        };

        let request = self.transform_request(&target, analysis.java_version.clone());
        self.confirm_migration(&target, &request, &reasoning).await?;
        self.transform(&request).await?;

        self.build_stage(Stage::PostCompilation, BuildGoal::Compile, false).await?;
        self.build_stage(Stage::PostTests, BuildGoal::Test, false).await?;
        self.build_stage(Stage::Build, BuildGoal::CleanInstall, self.settings.skip_tests_on_build)
            .await?;

        let report_path = self.report()?;
        info!(run_id = %self.state.run_id, report = %report_path.display(), "migration completed");

        Ok(MigrationResult::Success {
            run_id: self.state.run_id,
            report_path,
            history: self.state.history.clone(),
            final_state: self.state.current.clone(),
            target,
        })
    }

    fn begin(&mut self, stage: Stage, details: Value) -> Result<(), MigrationError> {
        self.active = Some(stage);
        info!(run_id = %self.state.run_id, %stage, "stage started");
        self.logger.info(stage.name(), details)?;
        Ok(())
    }

    fn record(&mut self, stage: Stage, result: Value) -> Result<(), MigrationError> {
        self.state.record(stage, result)?;
        if let Err(err) = self.state.write_checkpoint(&self.log_dir) {
            warn!(run_id = %self.state.run_id, error = %err, "could not write run checkpoint");
        }
        Ok(())
    }

    /// Ask the advisor, passing only the most recent reasoning as history
    async fn reason(&mut self, stage: Stage, result: Value) -> Result<String, MigrationError> {
        let gateway = self.gateway;
        let context = AdvisoryContext::new(stage.name(), result)
            .with_previous(self.state.reasoning.last().map(str::to_string));

        match gateway.advisor.advise(&context).await {
            Ok(text) => {
                self.state.reasoning.push(text.clone());
                Ok(text)
            }
            Err(err) => {
                warn!(%stage, error = %err, "advisory reasoning unavailable");
                self.logger.warning(
                    "Advisory Reasoning",
                    json!({"step": stage.name(), "error": err.to_string()}),
                )?;
                Ok(ADVISORY_UNAVAILABLE.to_string())
            }
        }
    }

    async fn ask(&mut self, stage: Stage, message: String) -> Result<Confirmation, MigrationError> {
        let gateway = self.gateway;
        let answer = gateway
            .confirmation
            .confirm(&message, &yes_no())
            .await
            .map_err(at(stage))?;

        self.logger.info(
            "User Confirmation",
            json!({"step": stage.name(), "prompt": message, "response": answer.label()}),
        )?;
        Ok(answer)
    }

    async fn explore(&mut self) -> Result<ProjectDescriptor, MigrationError> {
        let stage = Stage::Exploration;
        self.begin(stage, json!({"status": "started", "path": self.project.display().to_string()}))?;

        let gateway = self.gateway;
        let settings = self.settings;
        let descriptor = gateway
            .discovery
            .discover(&self.project, &settings.file_types)
            .await
            .map_err(at(stage))?;

        let counts = descriptor.type_counts();
        self.logger.info(
            "Project Structure",
            json!({
                "files": descriptor.files.len(),
                "directories": descriptor.directories.len(),
                "file_types": counts,
            }),
        )?;
        self.record(
            stage,
            json!({
                "root": descriptor.root,
                "file_count": descriptor.files.len(),
                "file_types": counts,
                "descriptor": descriptor.first_of_type(&settings.descriptor_type).map(|f| f.path.as_str()),
            }),
        )?;
        Ok(descriptor)
    }

    async fn analyze_descriptor(&mut self, path: &Path) -> Result<BuildAnalysis, MigrationError> {
        let stage = Stage::DescriptorAnalysis;
        self.begin(stage, json!({"status": "started", "pom_path": path.display().to_string()}))?;

        let gateway = self.gateway;
        let analysis = gateway.parser.parse_descriptor(path).await.map_err(at(stage))?;
        let result = serde_json::to_value(&analysis)?;
        let reasoning = self.reason(stage, result.clone()).await?;

        self.logger.info(
            "POM Analysis Results",
            json!({
                "java_version": analysis.java_version,
                "dependencies": analysis.dependencies,
                "properties": analysis.properties,
                "reasoning": reasoning,
            }),
        )?;
        self.record(stage, result)?;
        Ok(analysis)
    }

    async fn verify_framework(&mut self) -> Result<FrameworkStatus, MigrationError> {
        let stage = Stage::FrameworkVerification;
        self.begin(stage, json!({"status": "started"}))?;

        let gateway = self.gateway;
        let status = gateway
            .build_tool
            .verify_framework(&self.project)
            .await
            .map_err(at(stage))?;
        let result = serde_json::to_value(&status)?;
        let reasoning = self.reason(stage, result.clone()).await?;

        self.logger.info(
            "Spring Boot Analysis",
            json!({
                "is_spring_boot": status.detected,
                "current_version": status.current_version,
                "needs_migration": status.needs_migration,
                "reasoning": reasoning,
            }),
        )?;
        self.record(stage, json!({"framework": result}))?;
        Ok(status)
    }

    /// Compile, test or build, gated on the operator when the goal fails
    ///
    /// A failed goal and a failed build-tool call both lead to the same
    /// checkpoint. "No" aborts except at the final build, where the answer
    /// is only recorded. Cancellation always aborts.
    async fn build_stage(
        &mut self,
        stage: Stage,
        goal: BuildGoal,
        skip_tests: bool,
    ) -> Result<(), MigrationError> {
        debug_assert!(stage.is_build_stage(), "{stage} does not run the build tool");
        self.begin(
            stage,
            json!({"status": "started", "goals": goal.to_string(), "skip_tests": skip_tests}),
        )?;

        let gateway = self.gateway;
        let request = BuildRequest::new(&self.project, goal).skip_tests(skip_tests);
        let step = format!("{} Results", stage.name());

        let (result, reasoning) = match gateway.build_tool.build(&request).await {
            Ok(outcome) => {
                let outcome_value = serde_json::to_value(&outcome)?;
                let reasoning = self.reason(stage, outcome_value.clone()).await?;

                let severity = if outcome.success { Severity::Info } else { Severity::Error };
                self.logger.log_step(
                    &step,
                    json!({
                        "success": outcome.success,
                        "output": outcome.output,
                        "errors": outcome.errors,
                        "test_results": outcome.test_summary,
                        "reasoning": reasoning,
                    }),
                    severity,
                )?;

                let result = json!({"goal": goal.to_string(), "outcome": outcome_value});
                if outcome.success {
                    self.record(stage, result)?;
                    return Ok(());
                }
                (result, reasoning)
            }
            Err(err) => {
                warn!(run_id = %self.state.run_id, %stage, error = %err, "build tool call failed");
                let error = err.to_string();
                let reasoning = self
                    .reason(stage, json!({"success": false, "error": error}))
                    .await?;
                self.logger.error(
                    &step,
                    json!({"success": false, "error": error, "reasoning": reasoning}),
                )?;
                (json!({"goal": goal.to_string(), "error": error}), reasoning)
            }
        };

        self.failure_checkpoint(stage, result, &reasoning).await
    }

    /// Ask whether to go on after a failed compile, test or build and record
    /// the stage with the answer
    async fn failure_checkpoint(
        &mut self,
        stage: Stage,
        mut result: Value,
        reasoning: &str,
    ) -> Result<(), MigrationError> {
        let retry = stage == Stage::Build;
        let question = if retry {
            "Would you like to retry?"
        } else {
            "Would you like to continue anyway?"
        };
        let message = format!(
            "{} failed. Reasoning:\n{reasoning}\n\n{question}",
            failure_subject(stage)
        );
        let answer = self.ask(stage, message).await?;
        result["decision"] = json!(answer.label());
        self.record(stage, result)?;

        if answer.is_cancelled() {
            Err(MigrationError::Cancelled { stage })
        } else if retry || answer.is_yes() {
            Ok(())
        } else {
            Err(MigrationError::Declined { stage })
        }
    }

    async fn determine_path(
        &mut self,
        analysis: &BuildAnalysis,
        framework: &FrameworkStatus,
    ) -> Result<(Option<MigrationTarget>, String), MigrationError> {
        let stage = Stage::PathDetermination;
        self.begin(stage, json!({"status": "started"}))?;

        let target = selector::select(analysis, framework);
        let reasoning = match &target {
            Some(target) => {
                let reasoning = self
                    .reason(stage, json!({"migration_type": target.kind, "migration_target": target}))
                    .await?;
                self.logger.info(
                    "Migration Path",
                    json!({"type": target.kind, "target": target, "reasoning": reasoning}),
                )?;
                reasoning
            }
            None => {
                let reasoning = self
                    .reason(
                        stage,
                        json!({
                            "result": "No predetermined migration path found",
                            "java_version": analysis.java_version,
                        }),
                    )
                    .await?;
                self.logger.info(
                    "Migration Analysis",
                    json!({"status": "no_path_found", "reasoning": reasoning}),
                )?;
                reasoning
            }
        };

        self.record(stage, json!({"migration": target}))?;
        Ok((target, reasoning))
    }

    fn transform_request(&self, target: &MigrationTarget, source_version: Option<String>) -> TransformRequest {
        TransformRequest::new(&self.project, self.settings.engine, RecipeType::JavaUpgrade)
            .versions(source_version, &target.target_version)
            .with_recipe(&target.recipe)
    }

    /// Dry run; a failure here only costs the preview
    async fn preview(&mut self, request: &TransformRequest) -> Result<Option<TransformOutcome>, MigrationError> {
        let gateway = self.gateway;
        match gateway.transformer.analyze(request).await {
            Ok(outcome) => {
                self.logger.info(
                    "Migration Preview",
                    json!({
                        "success": outcome.success,
                        "changes": outcome.change_list(),
                        "errors": outcome.errors,
                    }),
                )?;
                Ok(Some(outcome))
            }
            Err(err) => {
                warn!(error = %err, "migration preview unavailable");
                self.logger
                    .warning("Migration Preview", json!({"error": err.to_string()}))?;
                Ok(None)
            }
        }
    }

    async fn confirm_migration(
        &mut self,
        target: &MigrationTarget,
        request: &TransformRequest,
        reasoning: &str,
    ) -> Result<(), MigrationError> {
        let stage = Stage::Confirmation;
        self.begin(stage, json!({"status": "started", "target": target}))?;

        let preview = if self.settings.preview_changes {
            self.preview(request).await?
        } else {
            None
        };

        let mut message = format!("Migration path determined. Reasoning:\n{reasoning}\n\n");
        if let Some(preview) = &preview {
            message.push_str(&preview_summary(preview));
        }
        message.push_str("Proceed with migration?");

        let answer = self.ask(stage, message).await?;
        self.record(
            stage,
            json!({
                "preview": preview.as_ref().map(TransformOutcome::change_list),
                "decision": answer.label(),
            }),
        )?;

        if answer.is_cancelled() {
            Err(MigrationError::Cancelled { stage })
        } else if answer.is_yes() {
            Ok(())
        } else {
            Err(MigrationError::Declined { stage })
        }
    }

    async fn transform(&mut self, request: &TransformRequest) -> Result<TransformOutcome, MigrationError> {
        let stage = Stage::Transformation;
        self.begin(
            stage,
            json!({
                "status": "started",
                "engine": request.engine,
                "target_version": request.target_version,
                "recipe": request.custom_recipe,
            }),
        )?;

        let gateway = self.gateway;
        let outcome = gateway.transformer.execute(request).await.map_err(at(stage))?;

        let severity = if outcome.success { Severity::Info } else { Severity::Error };
        self.logger.log_step(
            "Migration Execution Results",
            json!({
                "success": outcome.success,
                "message": outcome.message,
                "changes": outcome.change_list(),
                "errors": outcome.errors,
                "command_executed": outcome.command_executed,
            }),
            severity,
        )?;
        self.record(stage, json!({"transformation": outcome}))?;
        Ok(outcome)
    }

    fn report(&mut self) -> Result<PathBuf, MigrationError> {
        let stage = Stage::Report;
        self.begin(stage, json!({"status": "started", "records": self.logger.records().len()}))?;

        let path = self.logger.generate_report()?;
        self.record(stage, json!({"report_path": path.display().to_string()}))?;
        Ok(path)
    }

    /// Fold an error into a Failure, recording the interrupted stage if it
    /// has no History entry yet
    fn fail(mut self, err: MigrationError) -> MigrationResult {
        let stopped_by_operator = err.is_operator_stop();
        let stage = err.stage().or(self.active);

        if let Some(active) = self.active {
            if self.state.current_stage != Some(active) {
                if let Err(record_err) = self.record(active, json!({"error": err.to_string()})) {
                    warn!(error = %record_err, "could not record interrupted stage");
                }
            }
        }

        let (title, severity) = if stopped_by_operator {
            warn!(run_id = %self.state.run_id, error = %err, "migration stopped by operator");
            ("Migration Stopped", Severity::Warning)
        } else {
            error!(run_id = %self.state.run_id, error = %err, "migration failed");
            ("Migration Error", Severity::Error)
        };
        if let Err(log_err) = self.logger.log_step(
            title,
            json!({"stage": stage.map(Stage::name), "error": err.to_string()}),
            severity,
        ) {
            warn!(error = %log_err, "could not log failure");
        }

        let reasoning = self.state.reasoning.last().map(str::to_string);
        MigrationResult::Failure {
            run_id: self.state.run_id,
            reason: FailureReason::from(err),
            history: self.state.history,
            reasoning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmigrate_gateway::FileChange;

    #[test]
    fn failure_reason_messages() {
        assert_eq!(
            FailureReason::NoDescriptorFound.to_string(),
            "No POM files found in the project"
        );
        assert!(!FailureReason::NoMigrationPath.is_error());
        assert!(FailureReason::Cancelled { stage: Stage::Confirmation }.is_error());
        assert_eq!(
            FailureReason::Declined { stage: Stage::Tests }.to_string(),
            "Migration declined at Test Execution"
        );
    }

    #[test]
    fn gateway_errors_keep_stage() {
        let reason = FailureReason::from(MigrationError::Gateway {
            stage: Stage::Transformation,
            source: GatewayError::Unavailable("migration_tools".to_string()),
        });
        assert_eq!(reason.stage(), Some(Stage::Transformation));
        assert_eq!(reason.to_string(), "Migration Execution failed: migration_tools unavailable");
    }

    #[test]
    fn preview_summary_lists_changes() {
        let preview = TransformOutcome {
            success: true,
            changes: Some(vec![
                FileChange {
                    file: "pom.xml".to_string(),
                    change_type: "would_update".to_string(),
                },
                FileChange {
                    file: "src/App.java".to_string(),
                    change_type: "would_update".to_string(),
                },
            ]),
            ..TransformOutcome::default()
        };
        let summary = preview_summary(&preview);
        assert!(summary.starts_with("Preview: 2 file(s) would change:\n"));
        assert!(summary.contains("  - src/App.java (would_update)\n"));

        let empty = TransformOutcome {
            success: true,
            ..TransformOutcome::default()
        };
        assert_eq!(preview_summary(&empty), "Preview: no file changes reported.\n\n");
    }
}
