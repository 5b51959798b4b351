//! Transformation engines and recipe families
//!
//! Two interchangeable engines sit behind the same transformation contract.
//! The orchestrator only ever holds a [`TransformEngine`] value; the engine
//! tag travels with each request as the `tool` field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Code-transformation engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformEngine {
    /// OpenRewrite through the Maven plugin
    #[default]
    OpenRewrite,
    /// Moderne CLI
    Moderne,
}

impl TransformEngine {
    /// All engines
    pub const ALL: [Self; 2] = [Self::OpenRewrite, Self::Moderne];

    /// Wire tag
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenRewrite => "openrewrite",
            Self::Moderne => "moderne",
        }
    }

    /// Built-in recipe the engine runs for a recipe family
    ///
    /// `Custom` has no built-in recipe; the request must carry one.
    #[must_use]
    pub fn default_recipe_for(self, recipe_type: RecipeType) -> Option<&'static str> {
        match (self, recipe_type) {
            (_, RecipeType::Custom) => None,
            (Self::OpenRewrite, RecipeType::JavaUpgrade) => {
                Some("org.openrewrite.java.migrate.UpgradeToJava21")
            }
            (Self::OpenRewrite, RecipeType::DependencyUpdate) => {
                Some("org.openrewrite.java.dependencies.UpgradeDependencyVersion")
            }
            (Self::OpenRewrite, RecipeType::CodeCleanup) => {
                Some("org.openrewrite.java.cleanup.CommonStaticAnalysis")
            }
            (Self::Moderne, RecipeType::JavaUpgrade) => Some("java-upgrade"),
            (Self::Moderne, RecipeType::DependencyUpdate) => Some("dependency-update"),
            (Self::Moderne, RecipeType::CodeCleanup) => Some("code-cleanup"),
        }
    }

    /// Recipe catalog: `(name, description)` pairs
    #[must_use]
    pub fn catalog(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::OpenRewrite => &[
                ("org.openrewrite.java.migrate.UpgradeToJava17", "Upgrade Java code to Java 17"),
                ("org.openrewrite.java.migrate.UpgradeToJava21", "Upgrade Java code to Java 21"),
                (
                    "org.openrewrite.java.spring.boot3.SpringBoot2To3Migration",
                    "Migrate Spring Boot 2.x applications to 3.x",
                ),
                (
                    "org.openrewrite.java.dependencies.UpgradeDependencyVersion",
                    "Upgrade dependency versions",
                ),
                ("org.openrewrite.java.format.AutoFormat", "Format Java code"),
                (
                    "org.openrewrite.java.cleanup.CommonStaticAnalysis",
                    "Apply common static analysis fixes",
                ),
            ],
            Self::Moderne => &[
                ("java-upgrade", "Upgrade Java code to a newer version"),
                ("dependency-update", "Update dependencies to newer versions"),
                ("code-cleanup", "Clean up code according to best practices"),
            ],
        }
    }
}

impl fmt::Display for TransformEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrewrite" => Ok(Self::OpenRewrite),
            "moderne" => Ok(Self::Moderne),
            other => Err(format!("unsupported transformation engine: {other}")),
        }
    }
}

/// Recipe family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeType {
    /// Upgrade the Java language level
    JavaUpgrade,
    /// Bump dependency versions
    DependencyUpdate,
    /// Static-analysis cleanup
    CodeCleanup,
    /// Caller-supplied recipe
    Custom,
}

impl RecipeType {
    /// Human description
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::JavaUpgrade => "Upgrade Java version",
            Self::DependencyUpdate => "Update dependencies",
            Self::CodeCleanup => "Clean up code",
            Self::Custom => "Custom recipe",
        }
    }
}
