//! jmigrate Core - migration orchestration pipeline
//!
//! The orchestration layer that:
//! - Sequences the migration stages as an explicit state machine
//! - Selects a migration path from descriptor and framework facts
//! - Gates progress on human confirmation
//! - Records every step durably and renders an HTML report
//!
//! # Example
//!
//! ```rust,ignore
//! use jmigrate_core::{MigrationConfig, MigrationOrchestrator};
//!
//! # async fn example(gateway: jmigrate_gateway::Gateway) {
//! let config = MigrationConfig::new();
//! let orchestrator = MigrationOrchestrator::new(gateway, config.migration);
//!
//! let result = orchestrator.run_migration("/work/petclinic").await;
//! println!("{} stages executed", result.history().len());
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod report;
pub mod selector;
pub mod stage;
pub mod state;

pub use config::{
    AdvisorProvider, AdvisorSettings, MigrationConfig, MigrationSettings, TransportSettings,
};
pub use error::{ConfigError, LoggerError, MigrationError};
pub use logger::{Severity, StepLogger, StepRecord};
pub use orchestrator::{FailureReason, MigrationOrchestrator, MigrationResult, ADVISORY_UNAVAILABLE};
pub use selector::{select, MigrationKind, MigrationTarget};
pub use stage::Stage;
pub use state::{HistoryEntry, ReasoningChain, RunId, RunState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
