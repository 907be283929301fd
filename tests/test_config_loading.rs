//! Configuration loading, validation and pipeline bootstrap tests
//!
//! Tests focus on observable behavior: what loads, what is rejected at startup,
//! and how a pipeline built from a file routes requests.


use agent_triage::bootstrap::{build_pipeline, build_registry, build_triage};
use agent_triage::config::{ConfigError, TriageConfig};
use agent_triage::error::FailureKind;
use agent_triage::protocol::Request;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_from_file() {
    let temp_file = write_config(test_helpers::TEST_CONFIG);

    let config = TriageConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.pipeline.max_message_chars, 500);
    assert!(!config.pipeline.metrics);
    assert_eq!(config.routing.fallback, "help-agent");
    assert_eq!(config.routing.routes["data_query"], "data-agent");
    assert_eq!(config.classifier.rules.len(), 3);
    assert_eq!(config.agents.len(), 3);
}

#[test]
fn test_missing_file_is_read_error() {
    let result = TriageConfig::load_from_file(Path::new("/nonexistent/triage.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let temp_file = write_config("[routing\nfallback = ");
    let result = TriageConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_missing_routing_section_is_parse_error() {
    let temp_file = write_config("[pipeline]\nmetrics = true\n");
    let result = TriageConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_invalid_agent_section_name_rejected() {
    let result = TriageConfig::from_toml_str(
        r#"
[routing]
fallback = "help-agent"

[agents."help agent"]
reply = "hi"
"#,
    );
    assert!(matches!(result, Err(ConfigError::InvalidAgentName(_))));
}

#[test]
fn test_zero_message_limit_rejected() {
    let result = TriageConfig::from_toml_str(
        r#"
[pipeline]
max_message_chars = 0

[routing]
fallback = "help-agent"
"#,
    );
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_unknown_default_category_fails_bootstrap() {
    let mut config = test_helpers::test_config();
    config.classifier.default_category = Some("chitchat".to_string());

    let result = build_triage(&config);
    assert!(matches!(
        result,
        Err(ConfigError::UnknownCategory { ref label, .. }) if label == "chitchat"
    ));
}

#[test]
fn test_route_spellings_colliding_on_one_category_rejected() {
    let mut config = test_helpers::test_config();
    config
        .routing
        .routes
        .insert("HelpRequest".to_string(), "data-agent".to_string());

    assert!(matches!(
        build_pipeline(&config),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_registry_has_one_agent_per_section() {
    let registry = build_registry(&test_helpers::test_config()).unwrap();
    assert_eq!(
        registry.names(),
        vec!["data-agent", "feedback-agent", "help-agent"]
    );
}

#[test]
fn test_routes_to_unconfigured_agents_still_build() {
    let mut config = test_helpers::test_config();
    config
        .routing
        .routes
        .insert("action_request".to_string(), "action-agent".to_string());

    assert!(build_pipeline(&config).is_ok());
}

#[tokio::test]
async fn test_pipeline_from_file_routes_requests() {
    let temp_file = write_config(test_helpers::TEST_CONFIG);
    let config = TriageConfig::load_from_file(temp_file.path()).unwrap();
    let pipeline = build_pipeline(&config).unwrap();
    let cancel = CancellationToken::new();

    let cases = [
        ("I need help resetting my password", "help: I need help resetting my password"),
        ("weather?", "data: weather?"),
        ("thanks!", "feedback: thanks!"),
        ("tell me a joke", "help: tell me a joke"),
    ];
    for (message, expected) in cases {
        let response = pipeline
            .invoke(&mut Request::new("t", message), &cancel)
            .await
            .unwrap();
        assert_eq!(response.message(), expected);
    }
}

#[tokio::test]
async fn test_pipeline_from_config_enforces_message_limit() {
    let pipeline = build_pipeline(&test_helpers::test_config()).unwrap();

    let err = pipeline
        .invoke(&mut Request::new("t", "a".repeat(501)), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::PipelineAborted);
}

#[tokio::test]
async fn test_missing_fallback_agent_fails_per_request() {
    let mut config = test_helpers::test_config();
    config.agents.remove("help-agent");
    let pipeline = build_pipeline(&config).unwrap();

    let err = pipeline
        .invoke(&mut Request::new("t", "tell me a joke"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::AgentNotFound);
    assert!(err.reason.contains("help-agent"));
}
