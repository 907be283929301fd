//! Built-in middleware

use crate::agent::Agent;
use crate::error::{Failure, Outcome};
use crate::observability::metrics::{metrics, MetricsCollector};
use crate::pipeline::Middleware;
use crate::protocol::{Request, Response};
use async_trait::async_trait;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

/// Opens a request span and logs the outcome with its duration
#[derive(Debug, Default, Clone)]
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn handle(
        &self,
        request: &mut Request,
        cancel: &CancellationToken,
        next: &dyn Agent,
    ) -> Outcome<Response> {
        let span = crate::request_span!(
            thread_id = %request.thread_id(),
            message_chars = request.user_message().chars().count()
        );

        async move {
            let started = Instant::now();
            info!("Request received");

            let outcome = next.invoke(request, cancel).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &outcome {
                Ok(_) => info!(
                    elapsed_ms,
                    agent = request.context().routed_agent_name().unwrap_or("-"),
                    category = request.context().classification_label().unwrap_or("-"),
                    "Request completed"
                ),
                Err(failure) if failure.is_cancelled() => {
                    warn!(elapsed_ms, reason = %failure.reason, "Request cancelled")
                }
                Err(failure) => error!(
                    elapsed_ms,
                    kind = %failure.kind,
                    reason = %failure.reason,
                    "Request failed"
                ),
            }

            outcome
        }
        .instrument(span)
        .await
    }
}

/// Rejects requests the agents should never see
///
/// Empty thread ids, blank messages and messages over the character limit
/// short-circuit with `PipelineAborted`.
#[derive(Debug, Clone)]
pub struct MessageValidationMiddleware {
    max_chars: usize,
}

impl MessageValidationMiddleware {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    fn validate(&self, request: &Request) -> Outcome<()> {
        if request.thread_id().trim().is_empty() {
            return Err(Failure::pipeline_aborted("Request has no thread id"));
        }
        if request.user_message().trim().is_empty() {
            return Err(Failure::pipeline_aborted("User message is empty"));
        }
        let chars = request.user_message().chars().count();
        if chars > self.max_chars {
            return Err(Failure::pipeline_aborted(format!(
                "User message has {chars} characters, limit is {}",
                self.max_chars
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Middleware for MessageValidationMiddleware {
    fn name(&self) -> &str {
        "message_validation"
    }

    async fn handle(
        &self,
        request: &mut Request,
        cancel: &CancellationToken,
        next: &dyn Agent,
    ) -> Outcome<Response> {
        if let Err(failure) = self.validate(request) {
            warn!(reason = %failure.reason, "Rejecting request");
            return Err(failure);
        }
        next.invoke(request, cancel).await
    }
}

/// Records request counts, outcomes and durations
#[derive(Clone)]
pub struct MetricsMiddleware {
    collector: &'static MetricsCollector,
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsMiddleware {
    /// Record into the process-wide collector
    pub fn new() -> Self {
        Self {
            collector: metrics(),
        }
    }

    pub fn with_collector(collector: &'static MetricsCollector) -> Self {
        Self { collector }
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    fn name(&self) -> &str {
        "metrics"
    }

    async fn handle(
        &self,
        request: &mut Request,
        cancel: &CancellationToken,
        next: &dyn Agent,
    ) -> Outcome<Response> {
        self.collector.request_received();
        let started = Instant::now();

        let outcome = next.invoke(request, cancel).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => self.collector.request_succeeded(elapsed_ms),
            Err(failure) => self.collector.request_failed(failure.kind, elapsed_ms),
        }
        outcome
    }
}
