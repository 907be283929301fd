//! Agents: the units that turn a request into a response
//!
//! An [`Agent`] has the same shape as the pipeline entry point, so a specialized
//! handler, the triage agent and a whole [`crate::pipeline::Pipeline`] can be
//! nested interchangeably.

pub mod context;
pub mod registry;
pub mod responders;
pub mod triage;

use crate::error::{Failure, Outcome};
use crate::protocol::{Request, Response};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use context::RequestContext;
pub use registry::{AgentRegistry, AgentRegistryBuilder};
pub use responders::StaticReplyAgent;
pub use triage::{TriageAgent, TriageAgentBuilder};

/// Handler contract
///
/// Implementations that suspend on I/O should observe `cancel` and return
/// `FailureKind::Cancelled` promptly once it fires.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn invoke(&self, request: &mut Request, cancel: &CancellationToken)
        -> Outcome<Response>;
}

#[async_trait]
impl<A: Agent + ?Sized> Agent for Arc<A> {
    async fn invoke(
        &self,
        request: &mut Request,
        cancel: &CancellationToken,
    ) -> Outcome<Response> {
        (**self).invoke(request, cancel).await
    }
}

/// Race a stage against the cancellation signal
///
/// The signal is polled first, so a stage that ignores the token is abandoned
/// as soon as it fires and the outcome is `Cancelled` naming `stage`.
pub async fn until_cancelled<T, F>(
    cancel: &CancellationToken,
    stage: &str,
    stage_future: F,
) -> Outcome<T>
where
    F: Future<Output = Outcome<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Failure::cancelled(stage)),
        result = stage_future => result,
    }
}
