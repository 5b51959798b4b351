//! Collaborator contracts
//!
//! One trait per external collaborator. Implementations carry no business
//! logic: they translate a typed request into a round trip and a typed
//! response back. The orchestrator holds them as trait objects through
//! [`Gateway`], so HTTP bindings, in-memory fakes and generated mocks are
//! interchangeable.

use crate::advisor::AdvisoryContext;
use crate::confirmation::Confirmation;
use crate::error::GatewayError;
use crate::types::{
    BuildAnalysis, BuildOutcome, BuildRequest, FrameworkStatus, ProjectDescriptor,
    SourceAnalysis, TransformOutcome, TransformRequest,
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// File-discovery collaborator
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ProjectDiscovery: Send + Sync {
    /// Walk `root` and report files whose names end with one of `file_types`
    async fn discover(
        &self,
        root: &Path,
        file_types: &[String],
    ) -> Result<ProjectDescriptor, GatewayError>;
}

/// Descriptor and source parsing collaborator
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait DescriptorParser: Send + Sync {
    /// Extract Java version, dependencies and properties from a build descriptor
    async fn parse_descriptor(&self, path: &Path) -> Result<BuildAnalysis, GatewayError>;

    /// Extract package, class and imports from a Java source file
    async fn parse_source(&self, path: &Path) -> Result<SourceAnalysis, GatewayError>;
}

/// Build-tool collaborator
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Detect the bundled framework and whether it needs a major upgrade
    async fn verify_framework(&self, project_path: &Path) -> Result<FrameworkStatus, GatewayError>;

    /// Run a goal set against the project
    async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome, GatewayError>;
}

/// Code-transformation collaborator
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Dry-run the recipe and report what would change
    async fn analyze(&self, request: &TransformRequest) -> Result<TransformOutcome, GatewayError>;

    /// Apply the recipe
    async fn execute(&self, request: &TransformRequest) -> Result<TransformOutcome, GatewayError>;
}

/// Reasoning advisory collaborator
///
/// Output is free text for display and audit only.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Produce analysis for the given context
    async fn advise(&self, context: &AdvisoryContext) -> Result<String, GatewayError>;
}

/// Human confirmation collaborator
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ConfirmationChannel: Send + Sync {
    /// Present `message` and, when given, the enumerated `options`
    async fn confirm(&self, message: &str, options: &[String]) -> Result<Confirmation, GatewayError>;
}

/// All collaborators a migration run talks to
#[derive(Clone)]
pub struct Gateway {
    /// File discovery
    pub discovery: Arc<dyn ProjectDiscovery>,
    /// Descriptor/source parsing
    pub parser: Arc<dyn DescriptorParser>,
    /// Build tool
    pub build_tool: Arc<dyn BuildTool>,
    /// Transformation engines
    pub transformer: Arc<dyn Transformer>,
    /// Reasoning advisory
    pub advisor: Arc<dyn Advisor>,
    /// Human confirmation
    pub confirmation: Arc<dyn ConfirmationChannel>,
}

impl Gateway {
    /// Bundle collaborators
    #[must_use]
    pub fn new(
        discovery: Arc<dyn ProjectDiscovery>,
        parser: Arc<dyn DescriptorParser>,
        build_tool: Arc<dyn BuildTool>,
        transformer: Arc<dyn Transformer>,
        advisor: Arc<dyn Advisor>,
        confirmation: Arc<dyn ConfirmationChannel>,
    ) -> Self {
        Self {
            discovery,
            parser,
            build_tool,
            transformer,
            advisor,
            confirmation,
        }
    }

    /// Replace the confirmation channel
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: Arc<dyn ConfirmationChannel>) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Replace the advisory provider
    #[must_use]
    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = advisor;
        self
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}
