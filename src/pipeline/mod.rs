//! Middleware pipeline
//!
//! A [`Pipeline`] wraps one terminal [`Agent`] in an ordered list of
//! [`Middleware`]. It is assembled once by [`PipelineBuilder::build`], folding the
//! middleware from last to first so the first registered one is outermost:
//!
//! ```text
//! invoke → A.handle(next = B) → B.handle(next = terminal) → terminal.invoke
//! ```
//!
//! Each middleware may pass through, enrich the request context, short-circuit
//! with its own outcome, or call `next` and post-process the result. Every layer
//! checks the cancellation token before running, so nothing downstream of a
//! cancellation point is invoked.

pub mod builtin;

use crate::agent::{until_cancelled, Agent};
use crate::error::{Failure, Outcome};
use crate::protocol::{Request, Response};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

pub use builtin::{MessageValidationMiddleware, MetricsMiddleware, TracingMiddleware};

/// One stage wrapped around the rest of the pipeline
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Stage name used in logs and cancellation failures
    fn name(&self) -> &str;

    async fn handle(
        &self,
        request: &mut Request,
        cancel: &CancellationToken,
        next: &dyn Agent,
    ) -> Outcome<Response>;
}

struct MiddlewareLayer {
    middleware: Arc<dyn Middleware>,
    next: Arc<dyn Agent>,
}

#[async_trait]
impl Agent for MiddlewareLayer {
    async fn invoke(&self, request: &mut Request, cancel: &CancellationToken) -> Outcome<Response> {
        if cancel.is_cancelled() {
            debug!(stage = self.middleware.name(), "Cancelled before middleware");
            return Err(Failure::cancelled(self.middleware.name()));
        }
        let span = crate::middleware_span!(stage = self.middleware.name());
        self.middleware
            .handle(request, cancel, self.next.as_ref())
            .instrument(span)
            .await
    }
}

struct TerminalStage {
    agent: Arc<dyn Agent>,
}

#[async_trait]
impl Agent for TerminalStage {
    async fn invoke(&self, request: &mut Request, cancel: &CancellationToken) -> Outcome<Response> {
        if cancel.is_cancelled() {
            debug!("Cancelled before terminal handler");
            return Err(Failure::cancelled("terminal"));
        }
        until_cancelled(cancel, "terminal", self.agent.invoke(request, cancel)).await
    }
}

/// Collects middleware in registration order
#[derive(Default)]
pub struct PipelineBuilder {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; it runs after every middleware added before it
    pub fn with<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.with_shared(Arc::new(middleware))
    }

    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Compose the middleware around a terminal agent
    pub fn build<A: Agent + 'static>(self, terminal: A) -> Pipeline {
        self.build_shared(Arc::new(terminal))
    }

    pub fn build_shared(self, terminal: Arc<dyn Agent>) -> Pipeline {
        let stages = self
            .middleware
            .iter()
            .map(|m| m.name().to_string())
            .collect();

        let terminal: Arc<dyn Agent> = Arc::new(TerminalStage { agent: terminal });
        let entry = self
            .middleware
            .into_iter()
            .rev()
            .fold(terminal, |next, middleware| {
                Arc::new(MiddlewareLayer { middleware, next }) as Arc<dyn Agent>
            });

        Pipeline { entry, stages }
    }
}

/// Composed entry point
#[derive(Clone)]
pub struct Pipeline {
    entry: Arc<dyn Agent>,
    stages: Vec<String>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Run one request through every stage
    pub async fn invoke(&self, request: &mut Request, cancel: &CancellationToken) -> Outcome<Response> {
        self.entry.invoke(request, cancel).await
    }

    /// Middleware names in execution order
    pub fn stage_names(&self) -> &[String] {
        &self.stages
    }
}

#[async_trait]
impl Agent for Pipeline {
    async fn invoke(&self, request: &mut Request, cancel: &CancellationToken) -> Outcome<Response> {
        Pipeline::invoke(self, request, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::testing::{RecordingAgent, RecordingMiddleware};

    #[tokio::test]
    async fn test_empty_pipeline_calls_terminal() {
        let terminal = RecordingAgent::new("terminal");
        let pipeline = PipelineBuilder::new().build(terminal.clone());

        let response = pipeline
            .invoke(&mut Request::new("t", "hi"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.message(), "terminal handled: hi");
        assert_eq!(terminal.invocation_count(), 1);
        assert!(pipeline.stage_names().is_empty());
    }

    #[tokio::test]
    async fn test_registration_order_is_execution_order() {
        let log = RecordingMiddleware::shared_log();
        let pipeline = Pipeline::builder()
            .with(RecordingMiddleware::new("a", log.clone()))
            .with(RecordingMiddleware::new("b", log.clone()))
            .with(RecordingMiddleware::new("c", log.clone()))
            .build(RecordingAgent::new("terminal"));

        pipeline
            .invoke(&mut Request::new("t", "hi"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(pipeline.stage_names(), ["a", "b", "c"]);
        assert_eq!(
            *log.lock().await,
            vec!["a:before", "b:before", "c:before", "c:after", "b:after", "a:after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest() {
        let log = RecordingMiddleware::shared_log();
        let terminal = RecordingAgent::new("terminal");
        let pipeline = Pipeline::builder()
            .with(RecordingMiddleware::new("a", log.clone()))
            .with(RecordingMiddleware::aborting("b", log.clone()))
            .with(RecordingMiddleware::new("c", log.clone()))
            .build(terminal.clone());

        let err = pipeline
            .invoke(&mut Request::new("t", "hi"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::PipelineAborted);
        assert_eq!(terminal.invocation_count(), 0);
        assert_eq!(*log.lock().await, vec!["a:before", "b:abort", "a:after"]);
    }

    #[tokio::test]
    async fn test_pipelines_nest_as_agents() {
        let log = RecordingMiddleware::shared_log();
        let inner = Pipeline::builder()
            .with(RecordingMiddleware::new("inner", log.clone()))
            .build(RecordingAgent::new("terminal"));
        let outer = Pipeline::builder()
            .with(RecordingMiddleware::new("outer", log.clone()))
            .build(inner);

        outer
            .invoke(&mut Request::new("t", "hi"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            *log.lock().await,
            vec!["outer:before", "inner:before", "inner:after", "outer:after"]
        );
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_first_stage() {
        let log = RecordingMiddleware::shared_log();
        let terminal = RecordingAgent::new("terminal");
        let pipeline = Pipeline::builder()
            .with(RecordingMiddleware::new("a", log.clone()))
            .build(terminal.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline
            .invoke(&mut Request::new("t", "hi"), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(err.reason.contains("'a'"));
        assert!(log.lock().await.is_empty());
        assert_eq!(terminal.invocation_count(), 0);
    }
}
