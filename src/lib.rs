//! Agent Triage
//!
//! Routes conversational requests through an ordered middleware pipeline into a
//! triage agent that classifies each request and dispatches it to the agent
//! registered for that category.
//!
//! # Overview
//!
//! - [`pipeline`]: middleware chain composed once around a terminal agent
//! - [`agent`]: the [`Agent`] contract, the frozen registry, the triage agent and
//!   the per-request context agents use to share facts
//! - [`routing`]: classifiers, the built-in [`Intent`] categories and routing tables
//! - [`error`]: the request-path [`Outcome`] type
//! - [`config`] and [`bootstrap`]: TOML configuration and startup wiring
//!
//! # Quick Start
//!
//! ```rust
//! use agent_triage::agent::{AgentRegistry, StaticReplyAgent, TriageAgent};
//! use agent_triage::pipeline::{MessageValidationMiddleware, Pipeline};
//! use agent_triage::protocol::Request;
//! use agent_triage::routing::{Intent, KeywordClassifier, RoutingTable};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut agents = AgentRegistry::builder();
//! agents.register("help-agent", StaticReplyAgent::new("Happy to help: {message}"))?;
//! agents.register("data-agent", StaticReplyAgent::new("Looking up: {message}"))?;
//!
//! let triage = TriageAgent::builder()
//!     .classifier(
//!         KeywordClassifier::new()
//!             .rule(Intent::DataQuery, ["(?i)weather"])?
//!             .with_default(Intent::General),
//!     )
//!     .routes(RoutingTable::new("help-agent").route(Intent::DataQuery, "data-agent"))
//!     .registry(agents.build())
//!     .build()?;
//!
//! let pipeline = Pipeline::builder()
//!     .with(MessageValidationMiddleware::new(4000))
//!     .build(triage);
//!
//! let mut request = Request::new("thread-1", "What's the weather today?");
//! let response = pipeline.invoke(&mut request, &CancellationToken::new()).await?;
//! assert_eq!(response.message(), "Looking up: What's the weather today?");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod protocol;
pub mod routing;
pub mod testing;

pub use agent::{Agent, AgentRegistry, RequestContext, TriageAgent};
pub use config::{ConfigError, TriageConfig};
pub use error::{Failure, FailureKind, Outcome};
pub use pipeline::{Middleware, Pipeline, PipelineBuilder};
pub use protocol::{Request, Response, Role, Widget};
pub use routing::{Category, Classifier, Intent, RoutingTable};
