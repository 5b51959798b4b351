//! jmigrate Gateway - collaborator bindings
//!
//! Everything the migration orchestrator talks to lives behind a trait in
//! this crate:
//! - [`ProjectDiscovery`]: file discovery
//! - [`DescriptorParser`]: build descriptor and source parsing
//! - [`BuildTool`]: framework verification, compile, test and build
//! - [`Transformer`]: dry-run and execution of transformation recipes
//! - [`Advisor`]: free-text reasoning for the operator
//! - [`ConfirmationChannel`]: human checkpoints
//!
//! The HTTP bindings share one [`ServiceClient`] carrying the per-call
//! timeout and bounded retry policy.
//!
//! # Example
//!
//! ```rust,ignore
//! use jmigrate_gateway::{AutoApprove, Gateway, OfflineAdvisor, ServiceEndpoints, TransportPolicy};
//! use std::sync::Arc;
//!
//! let gateway = Gateway::http(
//!     &ServiceEndpoints::default(),
//!     TransportPolicy::default(),
//!     Arc::new(OfflineAdvisor),
//!     Arc::new(AutoApprove),
//! )?;
//! ```

#![warn(unreachable_pub)]

pub mod advisor;
pub mod confirmation;
pub mod engine;
pub mod error;
pub mod http;
pub mod services;
pub mod transport;
pub mod types;

pub use advisor::{
    render_prompt, AdvisoryContext, GeminiAdvisor, OfflineAdvisor, GEMINI_BASE_URL,
    GEMINI_KEY_HEADER,
};
pub use confirmation::{
    yes_no, AutoApprove, Confirmation, ScriptedConfirmation, TerminalConfirmation, NO, YES,
};
pub use engine::{RecipeType, TransformEngine};
pub use error::GatewayError;
pub use http::{HttpBuildTool, HttpDiscovery, HttpParser, HttpTransformer, ServiceEndpoints};
pub use services::{
    Advisor, BuildTool, ConfirmationChannel, DescriptorParser, Gateway, ProjectDiscovery,
    Transformer,
};
pub use transport::{Endpoint, ServiceClient, TransportPolicy};
pub use types::{
    BuildAnalysis, BuildGoal, BuildOutcome, BuildRequest, Dependency, DiscoveredFile, FileChange,
    FrameworkStatus, ProjectDescriptor, SourceAnalysis, TestSummary, TransformOutcome,
    TransformRequest,
};

#[cfg(any(test, feature = "mocks"))]
pub use services::{
    MockAdvisor, MockBuildTool, MockConfirmationChannel, MockDescriptorParser,
    MockProjectDiscovery, MockTransformer,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
