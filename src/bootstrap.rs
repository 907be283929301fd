//! Wiring a ready-to-run pipeline from configuration
//!
//! Every collaborator is built here once, at startup. Anything that goes wrong is
//! a [`ConfigError`]; after [`build_pipeline`] returns, the registry, routing
//! table and classifier are immutable and shared by all requests.

use crate::agent::{AgentRegistry, StaticReplyAgent, TriageAgent};
use crate::config::{ConfigError, TriageConfig};
use crate::observability::metrics::metrics;
use crate::pipeline::{
    MessageValidationMiddleware, MetricsMiddleware, Pipeline, TracingMiddleware,
};
use crate::routing::{Intent, KeywordClassifier, RoutingTable};
use tracing::info;

/// Register one [`StaticReplyAgent`] per `[agents.<name>]` section
pub fn build_registry(config: &TriageConfig) -> Result<AgentRegistry, ConfigError> {
    let mut builder = AgentRegistry::builder();
    for (name, section) in &config.agents {
        builder.register_with(name.clone(), || StaticReplyAgent::from_config(section))?;
    }
    Ok(builder.build())
}

/// Build the triage agent for the built-in [`Intent`] categories
pub fn build_triage(config: &TriageConfig) -> Result<TriageAgent<Intent>, ConfigError> {
    let registry = build_registry(config)?;
    let classifier = KeywordClassifier::<Intent>::from_config(&config.classifier)?;
    let routes = RoutingTable::<Intent>::from_config(&config.routing)?;

    info!(
        agents = registry.len(),
        routes = routes.len(),
        rules = classifier.rules().len(),
        fallback = %routes.fallback(),
        "Triage agent configured"
    );

    let mut builder = TriageAgent::builder()
        .classifier(classifier)
        .routes(routes)
        .registry(registry);
    if config.pipeline.metrics {
        builder = builder.metrics(metrics());
    }
    builder.build()
}

/// Full pipeline: tracing, metrics (when enabled), validation, then triage
pub fn build_pipeline(config: &TriageConfig) -> Result<Pipeline, ConfigError> {
    config.validate()?;
    let triage = build_triage(config)?;

    let mut builder = Pipeline::builder().with(TracingMiddleware);
    if config.pipeline.metrics {
        builder = builder.with(MetricsMiddleware::new());
    }
    let pipeline = builder
        .with(MessageValidationMiddleware::new(config.pipeline.max_message_chars))
        .build(triage);

    info!(stages = ?pipeline.stage_names(), "Pipeline assembled");
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::protocol::Request;
    use tokio_util::sync::CancellationToken;

    const CONFIG: &str = r#"
[pipeline]
max_message_chars = 200
metrics = false

[routing]
fallback = "help-agent"

[routing.routes]
help_request = "help-agent"
data_query = "data-agent"

[classifier]
default_category = "general"

[[classifier.rules]]
category = "help_request"
patterns = ["(?i)\\bhelp\\b", "(?i)password"]

[[classifier.rules]]
category = "data_query"
patterns = ["(?i)weather", "(?i)how many"]

[agents.help-agent]
reply = "[{agent}/{category}] {message}"

[agents.data-agent]
reply = "Looking that up: {message}"
"#;

    fn config() -> TriageConfig {
        TriageConfig::from_toml_str(CONFIG).unwrap()
    }

    #[test]
    fn test_stage_order() {
        let pipeline = build_pipeline(&config()).unwrap();
        assert_eq!(pipeline.stage_names(), ["tracing", "message_validation"]);

        let mut with_metrics = config();
        with_metrics.pipeline.metrics = true;
        let pipeline = build_pipeline(&with_metrics).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            ["tracing", "metrics", "message_validation"]
        );
    }

    #[tokio::test]
    async fn test_routes_by_keyword() {
        let pipeline = build_pipeline(&config()).unwrap();
        let cancel = CancellationToken::new();

        let response = pipeline
            .invoke(&mut Request::new("t1", "What's the weather today?"), &cancel)
            .await
            .unwrap();
        assert_eq!(response.message(), "Looking that up: What's the weather today?");

        let response = pipeline
            .invoke(&mut Request::new("t2", "I forgot my password"), &cancel)
            .await
            .unwrap();
        assert_eq!(
            response.message(),
            "[help-agent/help_request] I forgot my password"
        );
    }

    #[tokio::test]
    async fn test_default_category_falls_back() {
        let pipeline = build_pipeline(&config()).unwrap();
        let mut request = Request::new("t", "thanks for everything");

        let response = pipeline
            .invoke(&mut request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.message(), "[help-agent/general] thanks for everything");
        assert_eq!(request.context().classification::<Intent>(), Ok(Intent::General));
    }

    #[tokio::test]
    async fn test_validation_runs_before_triage() {
        let pipeline = build_pipeline(&config()).unwrap();
        let mut request = Request::new("t", "x".repeat(201));

        let err = pipeline
            .invoke(&mut request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::PipelineAborted);
        assert!(!request.context().has_classification());
    }

    #[test]
    fn test_unknown_route_category_is_fatal() {
        let mut config = config();
        config
            .routing
            .routes
            .insert("smalltalk".to_string(), "help-agent".to_string());

        assert!(matches!(
            build_pipeline(&config),
            Err(ConfigError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_bad_rule_pattern_is_fatal() {
        let mut config = config();
        config.classifier.rules[0].patterns.push("(unclosed".to_string());

        assert!(matches!(
            build_pipeline(&config),
            Err(ConfigError::InvalidRule { .. })
        ));
    }
}
