//! Migration path selection
//!
//! A pure decision over the descriptor analysis and framework status. The
//! framework check wins over the Java-version check; nothing else is scanned.

use jmigrate_gateway::{BuildAnalysis, FrameworkStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Java major version assumed when the descriptor declares none
pub const DEFAULT_JAVA_MAJOR: &str = "8";

/// Java upgrade table: `(source major, target version, recipe)`
pub const JAVA_TARGETS: &[(&str, &str, &str)] = &[
    ("8", "17", "org.openrewrite.java.migrate.UpgradeToJava17"),
    ("11", "17", "org.openrewrite.java.migrate.UpgradeToJava17"),
    ("17", "21", "org.openrewrite.java.migrate.UpgradeToJava21"),
];

/// Spring Boot upgrade table: `(source line, target version, recipe)`
pub const FRAMEWORK_TARGETS: &[(&str, &str, &str)] = &[(
    "2.x",
    "3.2.0",
    "org.openrewrite.java.spring.boot3.SpringBoot2To3Migration",
)];

/// Kind of migration selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationKind {
    /// Raise the Java language level
    JavaUpgrade,
    /// Bundled framework major upgrade
    SpringBootUpgrade,
}

impl fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::JavaUpgrade => "java",
            Self::SpringBootUpgrade => "spring_boot",
        })
    }
}

/// Selected migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationTarget {
    /// Kind of migration
    pub kind: MigrationKind,
    /// Version migrated to
    pub target_version: String,
    /// Recipe identifier handed to the transformation engine
    pub recipe: String,
}

impl MigrationTarget {
    fn from_row(kind: MigrationKind, (_, target, recipe): &(&str, &str, &str)) -> Self {
        Self {
            kind,
            target_version: (*target).to_string(),
            recipe: (*recipe).to_string(),
        }
    }
}

/// Major component of a declared Java version
///
/// Splits on `.` and keeps the first segment, so `"1.8"` yields `"1"`.
#[must_use]
pub fn java_major(java_version: Option<&str>) -> &str {
    let version = java_version.map(str::trim).unwrap_or(DEFAULT_JAVA_MAJOR);
    version.split('.').next().unwrap_or(version)
}

/// Select the migration for a project, `None` when no path is registered
#[must_use]
pub fn select(analysis: &BuildAnalysis, framework: &FrameworkStatus) -> Option<MigrationTarget> {
    if framework.detected && framework.needs_migration {
        return FRAMEWORK_TARGETS
            .first()
            .map(|row| MigrationTarget::from_row(MigrationKind::SpringBootUpgrade, row));
    }

    let major = java_major(analysis.java_version.as_deref());
    JAVA_TARGETS
        .iter()
        .find(|(source, _, _)| *source == major)
        .map(|row| MigrationTarget::from_row(MigrationKind::JavaUpgrade, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn analysis(java_version: Option<&str>) -> BuildAnalysis {
        BuildAnalysis {
            java_version: java_version.map(str::to_string),
            ..BuildAnalysis::default()
        }
    }

    fn spring_boot(needs_migration: bool) -> FrameworkStatus {
        FrameworkStatus {
            detected: true,
            current_version: Some("2.7.18".to_string()),
            needs_migration,
            recommended_version: Some("3.2.0".to_string()),
        }
    }

    #[test]
    fn java_8_upgrades_to_17() {
        let target = select(&analysis(Some("8")), &FrameworkStatus::absent()).unwrap();
        assert_eq!(target.kind, MigrationKind::JavaUpgrade);
        assert_eq!(target.target_version, "17");
        assert!(target.recipe.ends_with("UpgradeToJava17"));
    }

    #[test]
    fn missing_java_version_defaults_to_8() {
        let target = select(&analysis(None), &FrameworkStatus::absent()).unwrap();
        assert_eq!(target.target_version, "17");
    }

    #[test]
    fn legacy_version_string_has_no_path() {
        assert_eq!(java_major(Some("1.8")), "1");
        assert!(select(&analysis(Some("1.8")), &FrameworkStatus::absent()).is_none());
        assert!(select(&analysis(Some("21")), &FrameworkStatus::absent()).is_none());
    }

    #[test]
    fn dotted_versions_use_major() {
        let target = select(&analysis(Some("17.0.2")), &FrameworkStatus::absent()).unwrap();
        assert_eq!(target.target_version, "21");
        assert!(target.recipe.ends_with("UpgradeToJava21"));
    }

    #[test]
    fn framework_upgrade_takes_precedence() {
        let target = select(&analysis(Some("11")), &spring_boot(true)).unwrap();
        assert_eq!(target.kind, MigrationKind::SpringBootUpgrade);
        assert_eq!(target.target_version, "3.2.0");
        assert_eq!(
            target.recipe,
            "org.openrewrite.java.spring.boot3.SpringBoot2To3Migration"
        );
    }

    #[test]
    fn framework_without_migration_falls_through_to_java() {
        let target = select(&analysis(Some("11")), &spring_boot(false)).unwrap();
        assert_eq!(target.kind, MigrationKind::JavaUpgrade);
    }

    proptest! {
        #[test]
        fn prop_select_is_deterministic(major in 0u32..40, minor in proptest::option::of(0u32..10)) {
            let version = match minor {
                Some(minor) => format!("{major}.{minor}"),
                None => major.to_string(),
            };
            let first = select(&analysis(Some(version.as_str())), &FrameworkStatus::absent());
            let second = select(&analysis(Some(version.as_str())), &FrameworkStatus::absent());
            prop_assert_eq!(&first, &second);

            let registered = JAVA_TARGETS.iter().find(|(source, _, _)| *source == major.to_string());
            match (first, registered) {
                (Some(target), Some((_, version, recipe))) => {
                    prop_assert_eq!(target.kind, MigrationKind::JavaUpgrade);
                    prop_assert_eq!(target.target_version.as_str(), *version);
                    prop_assert_eq!(target.recipe.as_str(), *recipe);
                }
                (None, None) => {}
                (got, expected) => prop_assert!(false, "got {:?}, table row {:?}", got, expected),
            }
        }

        #[test]
        fn prop_framework_wins_over_any_java_version(version in "[0-9]{1,2}(\\.[0-9]{1,2})?") {
            let target = select(&analysis(Some(version.as_str())), &spring_boot(true)).unwrap();
            prop_assert_eq!(target.kind, MigrationKind::SpringBootUpgrade);
            prop_assert_eq!(target.target_version.as_str(), "3.2.0");
        }
    }
}
