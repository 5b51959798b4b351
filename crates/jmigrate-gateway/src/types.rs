//! Request and response shapes exchanged with the collaborators
//!
//! Field names follow the collaborator services' JSON vocabulary
//! (`groupId`, `is_spring_boot`, `test_results`, ...) through serde renames,
//! while the Rust side uses descriptive names. Optional collections are
//! `Option<Vec<_>>` because the services emit explicit `null`s.

use crate::engine::{RecipeType, TransformEngine};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file reported by the discovery service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    /// Absolute or root-relative path
    pub path: String,
    /// Type tag (the file extension, e.g. `xml`, `java`)
    #[serde(rename = "type")]
    pub file_type: String,
}

impl DiscoveredFile {
    /// Create a discovered file entry
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_type: file_type.into(),
        }
    }
}

/// Project structure, as discovered once per run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Root that was explored
    #[serde(default)]
    pub root: String,
    /// Matching files in discovery order
    pub files: Vec<DiscoveredFile>,
    /// Every directory encountered
    #[serde(default)]
    pub directories: Vec<String>,
}

impl ProjectDescriptor {
    /// Files carrying the given type tag, in discovery order
    pub fn files_of_type<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DiscoveredFile> {
        self.files.iter().filter(move |f| f.file_type == tag)
    }

    /// First file carrying the given type tag
    #[must_use]
    pub fn first_of_type(&self, tag: &str) -> Option<&DiscoveredFile> {
        self.files.iter().find(|f| f.file_type == tag)
    }

    /// Count of files per type tag, ordered by first appearance
    #[must_use]
    pub fn type_counts(&self) -> IndexMap<String, usize> {
        let mut counts = IndexMap::new();
        for file in &self.files {
            *counts.entry(file.file_type.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// A declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Maven group id
    #[serde(rename = "groupId")]
    pub group: String,
    /// Maven artifact id
    #[serde(rename = "artifactId")]
    pub artifact: String,
    /// Declared version (empty when managed by a parent)
    #[serde(default)]
    pub version: String,
    /// Dependency scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Dependency {
    /// Create a dependency without scope
    #[must_use]
    pub fn new(group: impl Into<String>, artifact: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
            scope: None,
        }
    }

    /// With scope
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// Facts extracted from the build descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAnalysis {
    /// Declared Java version (`java.version` or `maven.compiler.source`)
    #[serde(default)]
    pub java_version: Option<String>,
    /// Declared dependencies in document order
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Build properties in document order
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

/// Facts extracted from a Java source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAnalysis {
    /// Imported names
    #[serde(default)]
    pub imports: Vec<String>,
    /// First declared class
    #[serde(default)]
    pub class_name: String,
    /// Declared package
    #[serde(default)]
    pub package_name: String,
}

/// Bundled framework (Spring Boot) status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkStatus {
    /// Whether the framework was detected in the descriptor
    #[serde(rename = "is_spring_boot")]
    pub detected: bool,
    /// Detected version
    #[serde(default)]
    pub current_version: Option<String>,
    /// Whether a major-version upgrade is required
    #[serde(default)]
    pub needs_migration: bool,
    /// Version the build tool recommends
    #[serde(default)]
    pub recommended_version: Option<String>,
}

impl FrameworkStatus {
    /// Status for a project without the framework
    #[inline]
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Major component of the detected version
    #[must_use]
    pub fn major_version(&self) -> Option<u32> {
        self.current_version
            .as_deref()
            .and_then(|v| v.split('.').next())
            .and_then(|major| major.trim().parse().ok())
    }
}

/// Build goal sets the build tool understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildGoal {
    /// `compile`
    Compile,
    /// `test`
    Test,
    /// `clean install`
    CleanInstall,
}

impl BuildGoal {
    /// Goal names as passed to the build tool
    #[must_use]
    pub fn goals(self) -> &'static [&'static str] {
        match self {
            Self::Compile => &["compile"],
            Self::Test => &["test"],
            Self::CleanInstall => &["clean", "install"],
        }
    }

    /// Endpoint path on the build-tool service
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Compile => "/compile",
            Self::Test => "/test",
            Self::CleanInstall => "/build",
        }
    }
}

impl std::fmt::Display for BuildGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.goals().join(" "))
    }
}

/// One build-tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Project directory
    pub project_path: PathBuf,
    /// Goals to run
    pub goal: BuildGoal,
    /// Pass `-DskipTests`
    pub skip_tests: bool,
}

impl BuildRequest {
    /// Create a request for a goal
    #[must_use]
    pub fn new(project_path: impl AsRef<Path>, goal: BuildGoal) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            goal,
            skip_tests: false,
        }
    }

    /// With `skip_tests`
    #[must_use]
    pub fn skip_tests(mut self, skip: bool) -> Self {
        self.skip_tests = skip;
        self
    }
}

/// Parsed test report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    /// Tests run
    #[serde(rename = "tests", default)]
    pub tests_run: u32,
    /// Assertion failures
    #[serde(default)]
    pub failures: u32,
    /// Errors
    #[serde(default)]
    pub errors: u32,
    /// Skipped
    #[serde(default)]
    pub skipped: u32,
    /// Failed test identifiers in report order
    #[serde(default)]
    pub failed_tests: Vec<String>,
}

/// Result of one compile/test/build invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    /// Whether the goals succeeded
    pub success: bool,
    /// Human summary from the build tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Raw tool output
    #[serde(default)]
    pub output: Option<String>,
    /// Error lines
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    /// Test report, for test-running goals
    #[serde(rename = "test_results", default)]
    pub test_summary: Option<TestSummary>,
    /// Produced artifact paths
    #[serde(rename = "build_artifacts", default)]
    pub artifacts: Option<Vec<String>>,
}

impl BuildOutcome {
    /// Successful outcome with output text
    #[must_use]
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            ..Self::default()
        }
    }

    /// Failed outcome with error lines
    #[must_use]
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors: Some(errors),
            ..Self::default()
        }
    }

    /// With a test summary
    #[must_use]
    pub fn with_tests(mut self, summary: TestSummary) -> Self {
        self.test_summary = Some(summary);
        self
    }

    /// Error lines, empty when none were reported
    #[must_use]
    pub fn error_lines(&self) -> &[String] {
        self.errors.as_deref().unwrap_or_default()
    }
}

/// A single transformation request, used for both dry-run and execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformRequest {
    /// Project directory
    pub project_path: PathBuf,
    /// Engine applying the recipe
    #[serde(rename = "tool")]
    pub engine: TransformEngine,
    /// Recipe family
    pub recipe_type: RecipeType,
    /// Version migrated from
    pub source_version: Option<String>,
    /// Version migrated to
    pub target_version: Option<String>,
    /// Dependencies to bump (for dependency updates)
    pub dependencies: Vec<Dependency>,
    /// Explicit recipe payload
    pub custom_recipe: Option<serde_json::Value>,
}

impl TransformRequest {
    /// Create a request with no versions, dependencies or custom recipe
    #[must_use]
    pub fn new(project_path: impl AsRef<Path>, engine: TransformEngine, recipe_type: RecipeType) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            engine,
            recipe_type,
            source_version: None,
            target_version: None,
            dependencies: Vec::new(),
            custom_recipe: None,
        }
    }

    /// With source and target versions
    #[must_use]
    pub fn versions(mut self, source: Option<String>, target: impl Into<String>) -> Self {
        self.source_version = source;
        self.target_version = Some(target.into());
        self
    }

    /// With a named recipe, sent as `{"recipe": <id>}`
    #[must_use]
    pub fn with_recipe(mut self, recipe: impl Into<String>) -> Self {
        self.custom_recipe = Some(serde_json::json!({ "recipe": recipe.into() }));
        self
    }

    /// With dependency updates
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// A change reported by a transformation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Changed file
    pub file: String,
    /// Change kind (`updated`, `would_update`, ...)
    #[serde(rename = "type")]
    pub change_type: String,
}

/// Transformation response, for both dry-run and execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformOutcome {
    /// Whether the engine succeeded
    pub success: bool,
    /// Human summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Reported changes
    #[serde(default)]
    pub changes: Option<Vec<FileChange>>,
    /// Error lines
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    /// Recipe document the engine ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_used: Option<serde_json::Value>,
    /// Executed command line, for audit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_executed: Option<String>,
}

impl TransformOutcome {
    /// Reported changes, empty when none
    #[must_use]
    pub fn change_list(&self) -> &[FileChange] {
        self.changes.as_deref().unwrap_or_default()
    }
}
