//! Testing utilities for the jmigrate workspace
//!
//! In-memory collaborators with canned answers and a call log, plus
//! fixtures for common project shapes.

#![allow(missing_docs)]

use async_trait::async_trait;
use jmigrate_gateway::{
    Advisor, AdvisoryContext, BuildAnalysis, BuildGoal, BuildOutcome, BuildRequest, BuildTool,
    ConfirmationChannel, Dependency, DescriptorParser, DiscoveredFile, FileChange,
    FrameworkStatus, Gateway, GatewayError, ProjectDescriptor, ProjectDiscovery, SourceAnalysis,
    TestSummary, TransformOutcome, TransformRequest, Transformer,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Collaborator a fake can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeFailure {
    Discovery,
    Parser,
    FrameworkVerification,
    /// Every compile, test and build call errors
    Build,
    Preview,
    Transformation,
    Advisor,
}

/// When a build goal fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FailWhen {
    Always,
    AfterMigration,
}

/// Discovery, parser, build tool, transformer and advisor in one value
#[derive(Debug)]
pub struct FakeServices {
    with_descriptor: bool,
    analysis: BuildAnalysis,
    framework: FrameworkStatus,
    failing_goals: Vec<(BuildGoal, FailWhen)>,
    failures: HashSet<FakeFailure>,
    migrated: Mutex<bool>,
    calls: Mutex<Vec<String>>,
    contexts: Mutex<Vec<AdvisoryContext>>,
}

impl FakeServices {
    /// Maven project declaring Java 11, without Spring Boot
    ///
    /// Discovery answers relative to whatever root it is asked about, so one
    /// fake can serve several projects.
    pub fn maven_project() -> Self {
        Self {
            with_descriptor: true,
            analysis: java_analysis(Some("11")),
            framework: FrameworkStatus::absent(),
            failing_goals: Vec::new(),
            failures: HashSet::new(),
            migrated: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Declared Java version
    pub fn with_java_version(mut self, version: Option<&str>) -> Self {
        self.analysis.java_version = version.map(str::to_string);
        self
    }

    /// Framework status reported by the build tool
    pub fn with_framework(mut self, framework: FrameworkStatus) -> Self {
        self.framework = framework;
        self
    }

    /// Discovery reports only source files
    pub fn without_descriptor(mut self) -> Self {
        self.with_descriptor = false;
        self
    }

    /// `goal` fails before and after the migration
    pub fn failing_goal(mut self, goal: BuildGoal) -> Self {
        self.failing_goals.push((goal, FailWhen::Always));
        self
    }

    /// `goal` fails only once the transformation has run
    pub fn failing_goal_after_migration(mut self, goal: BuildGoal) -> Self {
        self.failing_goals.push((goal, FailWhen::AfterMigration));
        self
    }

    /// A collaborator answers with an error
    pub fn failing(mut self, failure: FakeFailure) -> Self {
        self.failures.insert(failure);
        self
    }

    /// Calls received, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls whose label starts with `prefix`
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Advisory contexts received, in order
    pub fn advisory_contexts(&self) -> Vec<AdvisoryContext> {
        self.contexts.lock().clone()
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn fails(&self, failure: FakeFailure, service: &str) -> Result<(), GatewayError> {
        if self.failures.contains(&failure) {
            Err(GatewayError::Unavailable(service.to_string()))
        } else {
            Ok(())
        }
    }

    fn goal_fails(&self, goal: BuildGoal) -> bool {
        let migrated = *self.migrated.lock();
        self.failing_goals.iter().any(|(failing, when)| {
            *failing == goal && (*when == FailWhen::Always || migrated)
        })
    }
}

#[async_trait]
impl ProjectDiscovery for FakeServices {
    async fn discover(&self, root: &Path, _file_types: &[String]) -> Result<ProjectDescriptor, GatewayError> {
        self.log(format!("discover:{}", root.display()));
        self.fails(FakeFailure::Discovery, "file_explorer")?;

        let root = root.display().to_string();
        let mut files = vec![DiscoveredFile::new(
            format!("{root}/src/main/java/com/acme/App.java"),
            "java",
        )];
        if self.with_descriptor {
            files.insert(0, DiscoveredFile::new(format!("{root}/pom.xml"), "xml"));
        }
        Ok(ProjectDescriptor {
            files,
            directories: vec![root.clone(), format!("{root}/src/main/java/com/acme")],
            root,
        })
    }
}

#[async_trait]
impl DescriptorParser for FakeServices {
    async fn parse_descriptor(&self, path: &Path) -> Result<BuildAnalysis, GatewayError> {
        self.log(format!("parse_descriptor:{}", path.display()));
        self.fails(FakeFailure::Parser, "file_parser")?;
        Ok(self.analysis.clone())
    }

    async fn parse_source(&self, path: &Path) -> Result<SourceAnalysis, GatewayError> {
        self.log(format!("parse_source:{}", path.display()));
        self.fails(FakeFailure::Parser, "file_parser")?;
        Ok(SourceAnalysis {
            imports: vec!["java.util.List".to_string()],
            class_name: "App".to_string(),
            package_name: "com.acme".to_string(),
        })
    }
}

#[async_trait]
impl BuildTool for FakeServices {
    async fn verify_framework(&self, _project_path: &Path) -> Result<FrameworkStatus, GatewayError> {
        self.log("verify_framework");
        self.fails(FakeFailure::FrameworkVerification, "maven")?;
        Ok(self.framework.clone())
    }

    async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome, GatewayError> {
        self.log(format!("build:{}", request.goal));
        self.fails(FakeFailure::Build, "maven")?;
        let outcome = if self.goal_fails(request.goal) {
            BuildOutcome::failed(vec!["[ERROR] BUILD FAILURE".to_string()])
        } else {
            BuildOutcome::succeeded("[INFO] BUILD SUCCESS")
        };
        Ok(match request.goal {
            BuildGoal::Test => outcome.with_tests(test_summary(!self.goal_fails(request.goal))),
            _ => outcome,
        })
    }
}

#[async_trait]
impl Transformer for FakeServices {
    async fn analyze(&self, request: &TransformRequest) -> Result<TransformOutcome, GatewayError> {
        self.log(format!("analyze:{}", request.engine));
        self.fails(FakeFailure::Preview, "migration_tools")?;
        Ok(changes("would_update"))
    }

    async fn execute(&self, request: &TransformRequest) -> Result<TransformOutcome, GatewayError> {
        let recipe = request
            .custom_recipe
            .as_ref()
            .and_then(|r| r.get("recipe"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.log(format!("execute:{recipe}"));
        self.fails(FakeFailure::Transformation, "migration_tools")?;
        *self.migrated.lock() = true;
        Ok(TransformOutcome {
            command_executed: Some(format!("mvn rewrite:run -Drewrite.activeRecipes={recipe}")),
            ..changes("updated")
        })
    }
}

#[async_trait]
impl Advisor for FakeServices {
    async fn advise(&self, context: &AdvisoryContext) -> Result<String, GatewayError> {
        self.log(format!("advise:{}", context.step));
        self.contexts.lock().push(context.clone());
        self.fails(FakeFailure::Advisor, "advisor")?;
        Ok(format!("Reasoning #{} for {}", self.contexts.lock().len(), context.step))
    }
}

/// Bundle a fake with a confirmation channel
pub fn gateway_with(services: Arc<FakeServices>, confirmation: Arc<dyn ConfirmationChannel>) -> Gateway {
    Gateway::new(
        services.clone(),
        services.clone(),
        services.clone(),
        services.clone(),
        services,
        confirmation,
    )
}

/// Temporary project directory
pub fn project_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

/// Descriptor analysis with a few dependencies
pub fn java_analysis(java_version: Option<&str>) -> BuildAnalysis {
    let mut analysis = BuildAnalysis {
        java_version: java_version.map(str::to_string),
        dependencies: vec![
            Dependency::new("org.springframework", "spring-core", "5.3.31"),
            Dependency::new("junit", "junit", "4.13.2").with_scope("test"),
        ],
        ..BuildAnalysis::default()
    };
    if let Some(version) = java_version {
        analysis.properties.insert("java.version".to_string(), version.to_string());
    }
    analysis
}

/// Spring Boot 2.7 that needs the 3.x upgrade
pub fn spring_boot_2() -> FrameworkStatus {
    FrameworkStatus {
        detected: true,
        current_version: Some("2.7.18".to_string()),
        needs_migration: true,
        recommended_version: Some("3.2.0".to_string()),
    }
}

fn test_summary(passed: bool) -> TestSummary {
    TestSummary {
        tests_run: 12,
        failures: u32::from(!passed),
        errors: 0,
        skipped: 1,
        failed_tests: if passed {
            Vec::new()
        } else {
            vec!["com.acme.AppTest.contextLoads".to_string()]
        },
    }
}

fn changes(change_type: &str) -> TransformOutcome {
    TransformOutcome {
        success: true,
        message: Some("Recipe applied".to_string()),
        changes: Some(vec![
            FileChange {
                file: "pom.xml".to_string(),
                change_type: change_type.to_string(),
            },
            FileChange {
                file: "src/main/java/com/acme/App.java".to_string(),
                change_type: change_type.to_string(),
            },
        ]),
        ..TransformOutcome::default()
    }
}
