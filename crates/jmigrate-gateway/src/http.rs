//! HTTP bindings to the collaborator services

use crate::error::GatewayError;
use crate::services::{
    Advisor, BuildTool, ConfirmationChannel, DescriptorParser, Gateway, ProjectDiscovery,
    Transformer,
};
use crate::transport::{Endpoint, ServiceClient, TransportPolicy};
use crate::types::{
    BuildAnalysis, BuildOutcome, BuildRequest, FrameworkStatus, ProjectDescriptor,
    SourceAnalysis, TransformOutcome, TransformRequest,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Serialize)]
struct ExploreRequest<'a> {
    path: String,
    file_types: &'a [String],
}

#[derive(Serialize)]
struct ParseRequest {
    file_path: String,
    file_type: &'static str,
}

#[derive(Serialize)]
struct MavenRequest<'a> {
    project_path: String,
    goals: &'a [&'static str],
    skip_tests: bool,
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// File-explorer service binding (`POST /explore`)
#[derive(Debug, Clone)]
pub struct HttpDiscovery {
    client: ServiceClient,
}

impl HttpDiscovery {
    /// Bind to the file-explorer service
    ///
    /// # Errors
    /// Propagates client construction failures.
    pub fn new(endpoint: &Endpoint, policy: TransportPolicy) -> Result<Self, GatewayError> {
        Ok(Self {
            client: ServiceClient::new("file_explorer", endpoint, policy)?,
        })
    }
}

#[async_trait]
impl ProjectDiscovery for HttpDiscovery {
    async fn discover(
        &self,
        root: &Path,
        file_types: &[String],
    ) -> Result<ProjectDescriptor, GatewayError> {
        let request = ExploreRequest {
            path: path_string(root),
            file_types,
        };
        let mut descriptor: ProjectDescriptor = self.client.post_json("/explore", &request).await?;
        descriptor.root = request.path;
        Ok(descriptor)
    }
}

/// File-parser service binding (`POST /parse/pom`, `POST /parse/java`)
#[derive(Debug, Clone)]
pub struct HttpParser {
    client: ServiceClient,
}

impl HttpParser {
    /// Bind to the file-parser service
    ///
    /// # Errors
    /// Propagates client construction failures.
    pub fn new(endpoint: &Endpoint, policy: TransportPolicy) -> Result<Self, GatewayError> {
        Ok(Self {
            client: ServiceClient::new("file_parser", endpoint, policy)?,
        })
    }
}

#[async_trait]
impl DescriptorParser for HttpParser {
    async fn parse_descriptor(&self, path: &Path) -> Result<BuildAnalysis, GatewayError> {
        let request = ParseRequest {
            file_path: path_string(path),
            file_type: "pom",
        };
        self.client.post_json("/parse/pom", &request).await
    }

    async fn parse_source(&self, path: &Path) -> Result<SourceAnalysis, GatewayError> {
        let request = ParseRequest {
            file_path: path_string(path),
            file_type: "java",
        };
        self.client.post_json("/parse/java", &request).await
    }
}

/// Build-tool service binding (`/verify-spring-boot`, `/compile`, `/test`, `/build`)
#[derive(Debug, Clone)]
pub struct HttpBuildTool {
    client: ServiceClient,
}

impl HttpBuildTool {
    /// Bind to the build-tool service
    ///
    /// # Errors
    /// Propagates client construction failures.
    pub fn new(endpoint: &Endpoint, policy: TransportPolicy) -> Result<Self, GatewayError> {
        Ok(Self {
            client: ServiceClient::new("maven", endpoint, policy)?,
        })
    }
}

#[async_trait]
impl BuildTool for HttpBuildTool {
    async fn verify_framework(&self, project_path: &Path) -> Result<FrameworkStatus, GatewayError> {
        let request = MavenRequest {
            project_path: path_string(project_path),
            goals: &[],
            skip_tests: false,
        };
        self.client.post_json("/verify-spring-boot", &request).await
    }

    async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome, GatewayError> {
        let body = MavenRequest {
            project_path: path_string(&request.project_path),
            goals: request.goal.goals(),
            skip_tests: request.skip_tests,
        };
        self.client.post_command(request.goal.endpoint(), &body).await
    }
}

/// Migration-tools service binding (`POST /analyze`, `POST /execute`)
#[derive(Debug, Clone)]
pub struct HttpTransformer {
    client: ServiceClient,
}

impl HttpTransformer {
    /// Bind to the migration-tools service
    ///
    /// # Errors
    /// Propagates client construction failures.
    pub fn new(endpoint: &Endpoint, policy: TransportPolicy) -> Result<Self, GatewayError> {
        Ok(Self {
            client: ServiceClient::new("migration_tools", endpoint, policy)?,
        })
    }
}

#[async_trait]
impl Transformer for HttpTransformer {
    async fn analyze(&self, request: &TransformRequest) -> Result<TransformOutcome, GatewayError> {
        self.client.post_json("/analyze", request).await
    }

    async fn execute(&self, request: &TransformRequest) -> Result<TransformOutcome, GatewayError> {
        self.client.post_command("/execute", request).await
    }
}

/// Locations of the four collaborator services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpoints {
    /// File explorer
    pub file_explorer: Endpoint,
    /// File parser
    pub file_parser: Endpoint,
    /// Migration tools (transformation engines)
    pub migration_tools: Endpoint,
    /// Maven build tool
    pub maven: Endpoint,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            file_explorer: Endpoint::new("localhost", 8001),
            file_parser: Endpoint::new("localhost", 8002),
            migration_tools: Endpoint::new("localhost", 8004),
            maven: Endpoint::new("localhost", 8005),
        }
    }
}

impl Gateway {
    /// Bind the four services over HTTP and pair them with the given advisor
    /// and confirmation channel
    ///
    /// # Errors
    /// Propagates client construction failures.
    pub fn http(
        endpoints: &ServiceEndpoints,
        policy: TransportPolicy,
        advisor: Arc<dyn Advisor>,
        confirmation: Arc<dyn ConfirmationChannel>,
    ) -> Result<Self, GatewayError> {
        Ok(Self::new(
            Arc::new(HttpDiscovery::new(&endpoints.file_explorer, policy)?),
            Arc::new(HttpParser::new(&endpoints.file_parser, policy)?),
            Arc::new(HttpBuildTool::new(&endpoints.maven, policy)?),
            Arc::new(HttpTransformer::new(&endpoints.migration_tools, policy)?),
            advisor,
            confirmation,
        ))
    }
}
