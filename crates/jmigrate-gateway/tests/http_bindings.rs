//! Integration tests for the HTTP collaborator bindings using wiremock

use std::path::Path;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jmigrate_gateway::{
    BuildGoal, BuildRequest, BuildTool, DescriptorParser, Endpoint, GatewayError, HttpBuildTool,
    HttpDiscovery, HttpParser, HttpTransformer, ProjectDiscovery, RecipeType, TransformEngine,
    TransformRequest, Transformer, TransportPolicy,
};

fn endpoint(server: &MockServer) -> Endpoint {
    let addr = server.address();
    Endpoint::new(addr.ip().to_string(), addr.port())
}

fn fast_policy() -> TransportPolicy {
    TransportPolicy {
        timeout: Duration::from_secs(2),
        max_retries: 2,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(20),
    }
}

#[tokio::test]
async fn test_discovery_posts_root_and_file_types() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/explore"))
        .and(body_json(json!({"path": "/work/app", "file_types": ["pom.xml", "java"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"path": "/work/app/pom.xml", "type": "xml"},
                {"path": "/work/app/src/App.java", "type": "java"}
            ],
            "directories": ["/work/app", "/work/app/src"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let discovery = HttpDiscovery::new(&endpoint(&server), fast_policy()).unwrap();
    let types = vec!["pom.xml".to_string(), "java".to_string()];
    let descriptor = discovery.discover(Path::new("/work/app"), &types).await.unwrap();

    assert_eq!(descriptor.root, "/work/app");
    assert_eq!(descriptor.first_of_type("xml").unwrap().path, "/work/app/pom.xml");
    assert_eq!(descriptor.directories.len(), 2);
}

#[tokio::test]
async fn test_parser_routes_by_file_kind() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/pom"))
        .and(body_json(json!({"file_path": "/work/app/pom.xml", "file_type": "pom"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "java_version": "11",
            "dependencies": [],
            "properties": {"java.version": "11"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/parse/java"))
        .and(body_json(json!({"file_path": "/work/app/src/App.java", "file_type": "java"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "imports": ["java.util.List"],
            "class_name": "App",
            "package_name": "com.acme"
        })))
        .mount(&server)
        .await;

    let parser = HttpParser::new(&endpoint(&server), fast_policy()).unwrap();

    let analysis = parser.parse_descriptor(Path::new("/work/app/pom.xml")).await.unwrap();
    assert_eq!(analysis.java_version.as_deref(), Some("11"));

    let source = parser.parse_source(Path::new("/work/app/src/App.java")).await.unwrap();
    assert_eq!(source.class_name, "App");
    assert_eq!(source.imports, vec!["java.util.List".to_string()]);
}

#[tokio::test]
async fn test_build_tool_sends_goals_to_goal_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/build"))
        .and(body_json(json!({
            "project_path": "/work/app",
            "goals": ["clean", "install"],
            "skip_tests": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "output": "BUILD SUCCESS",
            "errors": null,
            "test_results": null,
            "build_artifacts": ["target/app.jar"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let build_tool = HttpBuildTool::new(&endpoint(&server), fast_policy()).unwrap();
    let request = BuildRequest::new("/work/app", BuildGoal::CleanInstall).skip_tests(true);
    let outcome = build_tool.build(&request).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.artifacts, Some(vec!["target/app.jar".to_string()]));
    assert!(outcome.error_lines().is_empty());
}

#[tokio::test]
async fn test_framework_verification_decodes_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/verify-spring-boot"))
        .and(body_partial_json(json!({"project_path": "/work/app"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_spring_boot": true,
            "current_version": "2.7.18",
            "needs_migration": true,
            "recommended_version": "3.2.0"
        })))
        .mount(&server)
        .await;

    let build_tool = HttpBuildTool::new(&endpoint(&server), fast_policy()).unwrap();
    let status = build_tool.verify_framework(Path::new("/work/app")).await.unwrap();

    assert!(status.detected);
    assert!(status.needs_migration);
    assert_eq!(status.major_version(), Some(2));
}

#[tokio::test]
async fn test_transformer_sends_engine_and_recipe() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute"))
        .and(body_partial_json(json!({
            "project_path": "/work/app",
            "tool": "openrewrite",
            "recipe_type": "java_upgrade",
            "source_version": "11",
            "target_version": "17",
            "custom_recipe": {"recipe": "org.openrewrite.java.migrate.UpgradeToJava17"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "changes": [{"file": "pom.xml", "type": "updated"}],
            "errors": null,
            "command_executed": "mvn rewrite:run"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transformer = HttpTransformer::new(&endpoint(&server), fast_policy()).unwrap();
    let request = TransformRequest::new("/work/app", TransformEngine::OpenRewrite, RecipeType::JavaUpgrade)
        .versions(Some("11".to_string()), "17")
        .with_recipe("org.openrewrite.java.migrate.UpgradeToJava17");
    let outcome = transformer.execute(&request).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.change_list().len(), 1);
    assert_eq!(outcome.command_executed.as_deref(), Some("mvn rewrite:run"));
}

#[tokio::test]
async fn test_server_error_is_retried_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/verify-spring-boot"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/verify-spring-boot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_spring_boot": false,
            "needs_migration": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let build_tool = HttpBuildTool::new(&endpoint(&server), fast_policy()).unwrap();
    let status = build_tool.verify_framework(Path::new("/work/app")).await.unwrap();

    assert!(!status.detected);
}

#[tokio::test]
async fn test_build_goal_is_not_resent_after_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/compile"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&server)
        .await;

    let build_tool = HttpBuildTool::new(&endpoint(&server), fast_policy()).unwrap();
    let error = build_tool
        .build(&BuildRequest::new("/work/app", BuildGoal::Compile))
        .await
        .unwrap_err();

    assert!(matches!(error, GatewayError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_slow_recipe_execution_is_sent_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let policy = TransportPolicy {
        timeout: Duration::from_millis(100),
        ..fast_policy()
    };
    let transformer = HttpTransformer::new(&endpoint(&server), policy).unwrap();
    let request = TransformRequest::new("/work/app", TransformEngine::OpenRewrite, RecipeType::JavaUpgrade)
        .versions(Some("11".to_string()), "17");
    let error = transformer.execute(&request).await.unwrap_err();

    assert!(matches!(error, GatewayError::Timeout { after_ms: 100, .. }));
    assert!(!error.is_undelivered());
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such project"))
        .expect(1)
        .mount(&server)
        .await;

    let build_tool = HttpBuildTool::new(&endpoint(&server), fast_policy()).unwrap();
    let error = build_tool
        .build(&BuildRequest::new("/work/app", BuildGoal::Test))
        .await
        .unwrap_err();

    assert!(matches!(error, GatewayError::Status { status: 404, .. }));
    assert_eq!(error.to_string(), "maven returned HTTP 404: no such project");
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let transformer = HttpTransformer::new(&endpoint(&server), fast_policy()).unwrap();
    let request = TransformRequest::new("/work/app", TransformEngine::Moderne, RecipeType::JavaUpgrade);
    let error = transformer.analyze(&request).await.unwrap_err();

    assert!(matches!(error, GatewayError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/explore"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"files": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let policy = TransportPolicy::no_retry(Duration::from_millis(50));
    let discovery = HttpDiscovery::new(&endpoint(&server), policy).unwrap();
    let error = discovery.discover(Path::new("/work/app"), &[]).await.unwrap_err();

    assert!(matches!(error, GatewayError::Timeout { after_ms: 50, .. }));
    assert_eq!(error.service(), Some("file_explorer"));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/pom"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let parser = HttpParser::new(&endpoint(&server), fast_policy()).unwrap();
    let error = parser.parse_descriptor(Path::new("/work/app/pom.xml")).await.unwrap_err();

    assert!(matches!(error, GatewayError::Decode { .. }));
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let server = MockServer::start().await;
    let endpoint = endpoint(&server);
    drop(server);

    let policy = TransportPolicy::no_retry(Duration::from_secs(2));
    let discovery = HttpDiscovery::new(&endpoint, policy).unwrap();
    let error = discovery.discover(Path::new("/work/app"), &[]).await.unwrap_err();

    assert!(matches!(error, GatewayError::Transport { .. }));
}

#[tokio::test]
async fn test_unreachable_build_tool_is_undelivered() {
    let server = MockServer::start().await;
    let endpoint = endpoint(&server);
    drop(server);

    let build_tool = HttpBuildTool::new(&endpoint, fast_policy()).unwrap();
    let error = build_tool
        .build(&BuildRequest::new("/work/app", BuildGoal::CleanInstall))
        .await
        .unwrap_err();

    assert!(error.is_undelivered());
}
