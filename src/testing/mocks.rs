//! Mock implementations for testing
//!
//! Agents, classifiers, middleware and an LLM provider that record what they see,
//! so pipelines and triage can be exercised without real handlers or models.

use crate::agent::Agent;
use crate::error::{Failure, Outcome};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
};
use crate::pipeline::Middleware;
use crate::protocol::{Request, Response};
use crate::routing::classifier::{Category, Classifier};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// What a [`RecordingAgent`] saw when it was invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub thread_id: String,
    pub message: String,
    pub category: Option<String>,
    pub routed_agent: Option<String>,
}

/// Agent that counts invocations and records the request it was given
///
/// Clones share state, so a test can keep one handle and register another.
#[derive(Debug, Clone)]
pub struct RecordingAgent {
    name: String,
    failure: Option<Failure>,
    invocations: Arc<AtomicUsize>,
    observations: Arc<Mutex<Vec<Observation>>>,
}

impl RecordingAgent {
    /// Replies with `"{name} handled: {message}"`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure: None,
            invocations: Arc::new(AtomicUsize::new(0)),
            observations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always fails with `failure`
    pub fn failing(name: impl Into<String>, failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub async fn observations(&self) -> Vec<Observation> {
        self.observations.lock().await.clone()
    }
}

#[async_trait]
impl Agent for RecordingAgent {
    async fn invoke(&self, request: &mut Request, _cancel: &CancellationToken) -> Outcome<Response> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.observations.lock().await.push(Observation {
            thread_id: request.thread_id().to_string(),
            message: request.user_message().to_string(),
            category: request.context().classification_label().map(str::to_string),
            routed_agent: request.context().routed_agent_name().map(str::to_string),
        });

        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(Response::assistant(
                request,
                format!("{} handled: {}", self.name, request.user_message()),
            )),
        }
    }
}

/// Agent that never finishes on its own; only cancellation ends it
#[derive(Debug, Clone, Default)]
pub struct PendingAgent {
    started: Arc<AtomicUsize>,
}

impl PendingAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for PendingAgent {
    async fn invoke(&self, _request: &mut Request, cancel: &CancellationToken) -> Outcome<Response> {
        self.started.fetch_add(1, Ordering::SeqCst);
        cancel.cancelled().await;
        Err(Failure::cancelled("pending-agent"))
    }
}

/// Classifier that always answers the same category
///
/// Clones share the call counter.
#[derive(Debug, Clone)]
pub struct FixedClassifier<C: Category> {
    category: C,
    calls: Arc<AtomicUsize>,
}

impl<C: Category> FixedClassifier<C> {
    pub fn new(category: C) -> Self {
        Self {
            category,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: Category> Classifier<C> for FixedClassifier<C> {
    async fn classify(&self, _request: &Request) -> Outcome<C> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.category.clone())
    }
}

/// Classifier that always fails with `ClassificationFailed`
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingClassifier;

#[async_trait]
impl<C: Category> Classifier<C> for FailingClassifier {
    async fn classify(&self, _request: &Request) -> Outcome<C> {
        Err(Failure::classification_failed("Mock classifier failure"))
    }
}

/// Classifier that never answers
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingClassifier;

#[async_trait]
impl<C: Category> Classifier<C> for PendingClassifier {
    async fn classify(&self, _request: &Request) -> Outcome<C> {
        std::future::pending().await
    }
}

/// Log shared between recording middleware in one pipeline
pub type StageLog = Arc<Mutex<Vec<String>>>;

/// Middleware that appends `"{name}:before"` and `"{name}:after"` around `next`
///
/// An aborting instance appends `"{name}:abort"` and returns `PipelineAborted`
/// without calling `next`.
#[derive(Debug, Clone)]
pub struct RecordingMiddleware {
    name: String,
    log: StageLog,
    abort: bool,
}

impl RecordingMiddleware {
    pub fn shared_log() -> StageLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn new(name: impl Into<String>, log: StageLog) -> Self {
        Self {
            name: name.into(),
            log,
            abort: false,
        }
    }

    pub fn aborting(name: impl Into<String>, log: StageLog) -> Self {
        Self {
            abort: true,
            ..Self::new(name, log)
        }
    }
}

#[async_trait]
impl Middleware for RecordingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        request: &mut Request,
        cancel: &CancellationToken,
        next: &dyn Agent,
    ) -> Outcome<Response> {
        if self.abort {
            self.log.lock().await.push(format!("{}:abort", self.name));
            return Err(Failure::pipeline_aborted(format!(
                "Stage '{}' rejected the request",
                self.name
            )));
        }

        self.log.lock().await.push(format!("{}:before", self.name));
        let outcome = next.invoke(request, cancel).await;
        self.log.lock().await.push(format!("{}:after", self.name));
        outcome
    }
}

/// Middleware that fires the cancellation token, then continues the chain
#[derive(Debug, Clone)]
pub struct CancellingMiddleware {
    name: String,
}

impl CancellingMiddleware {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Middleware for CancellingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        request: &mut Request,
        cancel: &CancellationToken,
        next: &dyn Agent,
    ) -> Outcome<Response> {
        cancel.cancel();
        next.invoke(request, cancel).await
    }
}

/// Mock LLM provider returning canned answers in rotation
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub responses: Vec<String>,
    pub should_fail: bool,
    current_response: Mutex<usize>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            ..Default::default()
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Every completion request received so far, in order
    pub async fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request);

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let mut current = self.current_response.lock().await;
        let content = if self.responses.is_empty() {
            "Mock response".to_string()
        } else {
            self.responses[*current % self.responses.len()].clone()
        };
        *current += 1;

        Ok(CompletionResponse {
            content: Some(content),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 2,
                total_tokens: 12,
            },
            finish_reason: FinishReason::Stop,
        })
    }
}
