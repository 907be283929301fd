//! Middleware pipeline composition tests


use agent_triage::agent::{Agent, AgentRegistry};
use agent_triage::error::{FailureKind, Outcome};
use agent_triage::pipeline::{Middleware, Pipeline};
use agent_triage::protocol::{Request, Response};
use agent_triage::testing::{CancellingMiddleware, RecordingAgent, RecordingMiddleware};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Tags the request with an extension before passing it on
struct Tagger;

#[async_trait]
impl Middleware for Tagger {
    fn name(&self) -> &str {
        "tagger"
    }

    async fn handle(
        &self,
        request: &mut Request,
        cancel: &CancellationToken,
        next: &dyn Agent,
    ) -> Outcome<Response> {
        request
            .context_mut()
            .insert_extension("locale", json!("en-GB"));
        next.invoke(request, cancel).await
    }
}

#[tokio::test]
async fn test_middleware_wraps_triage_in_registration_order() {
    let log = RecordingMiddleware::shared_log();
    let (triage, agents) = test_helpers::recording_triage(&["help-agent"]);
    let pipeline = Pipeline::builder()
        .with(RecordingMiddleware::new("outer", log.clone()))
        .with(RecordingMiddleware::new("inner", log.clone()))
        .build(triage);

    let response = pipeline
        .invoke(&mut Request::new("t", "help"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.message(), "help-agent handled: help");
    assert_eq!(agents["help-agent"].invocation_count(), 1);
    assert_eq!(
        *log.lock().await,
        vec!["outer:before", "inner:before", "inner:after", "outer:after"]
    );
}

#[tokio::test]
async fn test_short_circuit_never_reaches_triage() {
    let log = RecordingMiddleware::shared_log();
    let (triage, agents) = test_helpers::recording_triage(&["help-agent"]);
    let pipeline = Pipeline::builder()
        .with(RecordingMiddleware::aborting("gate", log.clone()))
        .with(RecordingMiddleware::new("never", log.clone()))
        .build(triage);
    let mut request = Request::new("t", "help");

    let err = pipeline
        .invoke(&mut request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::PipelineAborted);
    assert_eq!(*log.lock().await, vec!["gate:abort"]);
    assert_eq!(agents["help-agent"].invocation_count(), 0);
    assert!(!request.context().has_classification());
}

#[tokio::test]
async fn test_cancellation_mid_chain_stops_downstream_stages() {
    let log = RecordingMiddleware::shared_log();
    let terminal = RecordingAgent::new("terminal");
    let pipeline = Pipeline::builder()
        .with(RecordingMiddleware::new("first", log.clone()))
        .with(CancellingMiddleware::new("interrupt"))
        .with(RecordingMiddleware::new("downstream", log.clone()))
        .build(terminal.clone());
    let cancel = CancellationToken::new();

    let err = pipeline
        .invoke(&mut Request::new("t", "hi"), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Cancelled);
    assert!(err.reason.contains("'downstream'"));
    assert!(cancel.is_cancelled());
    assert_eq!(*log.lock().await, vec!["first:before", "first:after"]);
    assert_eq!(terminal.invocation_count(), 0);
}

#[tokio::test]
async fn test_cancellation_before_terminal() {
    let terminal = RecordingAgent::new("terminal");
    let pipeline = Pipeline::builder()
        .with(CancellingMiddleware::new("interrupt"))
        .build(terminal.clone());

    let err = pipeline
        .invoke(&mut Request::new("t", "hi"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(err.reason.contains("terminal"));
    assert_eq!(terminal.invocation_count(), 0);
}

/// Sleeps without looking at the token
struct SleepyAgent {
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl Agent for SleepyAgent {
    async fn invoke(
        &self,
        request: &mut Request,
        _cancel: &CancellationToken,
    ) -> Outcome<Response> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(Response::assistant(request, "done"))
    }
}

#[tokio::test]
async fn test_cancellation_abandons_terminal_that_ignores_token() {
    let finished = Arc::new(AtomicBool::new(false));
    let pipeline = Pipeline::builder().build(SleepyAgent {
        finished: finished.clone(),
    });
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let mut request = Request::new("t", "hi");
    let outcome = tokio::time::timeout(
        Duration::from_millis(500),
        pipeline.invoke(&mut request, &cancel),
    )
    .await
    .expect("terminal stage must stop once the token fires");

    let err = outcome.unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
    assert!(err.reason.contains("terminal"));
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_extensions_reach_the_handler() {
    struct LocaleAgent;

    #[async_trait]
    impl Agent for LocaleAgent {
        async fn invoke(
            &self,
            request: &mut Request,
            _cancel: &CancellationToken,
        ) -> Outcome<Response> {
            let locale = request
                .context()
                .extension("locale")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            Ok(Response::assistant(request, locale))
        }
    }

    let pipeline = Pipeline::builder().with(Tagger).build(LocaleAgent);

    let response = pipeline
        .invoke(&mut Request::new("t", "hi"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.message(), "en-GB");
}

#[tokio::test]
async fn test_pipeline_registered_as_agent() {
    let log = RecordingMiddleware::shared_log();
    let help = RecordingAgent::new("help-agent");
    let sub_pipeline = Pipeline::builder()
        .with(RecordingMiddleware::new("help-stage", log.clone()))
        .build(help.clone());

    let mut registry = AgentRegistry::builder();
    registry.register("help-agent", sub_pipeline).unwrap();
    let triage = agent_triage::agent::TriageAgent::builder()
        .classifier(test_helpers::keyword_classifier())
        .routes(test_helpers::standard_routes())
        .registry(registry.build())
        .build()
        .unwrap();
    let pipeline = Pipeline::builder()
        .with(RecordingMiddleware::new("entry", log.clone()))
        .build(triage);

    let mut request = Request::new("t", "I need help resetting my password");
    let response = pipeline
        .invoke(&mut request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        response.message(),
        "help-agent handled: I need help resetting my password"
    );
    assert_eq!(
        *log.lock().await,
        vec![
            "entry:before",
            "help-stage:before",
            "help-stage:after",
            "entry:after"
        ]
    );
    let seen = help.observations().await;
    assert_eq!(seen[0].routed_agent.as_deref(), Some("help-agent"));
}

#[tokio::test]
async fn test_pipeline_is_reusable_across_requests() {
    let (triage, agents) = test_helpers::recording_triage(&["help-agent", "data-agent"]);
    let pipeline = Pipeline::builder().build(triage);
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        pipeline
            .invoke(&mut Request::new("t", "weather?"), &cancel)
            .await
            .unwrap();
    }

    assert_eq!(agents["data-agent"].invocation_count(), 3);
}
