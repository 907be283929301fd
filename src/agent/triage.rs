//! Triage agent: classify, route, dispatch
//!
//! ```text
//! Start → Classifying → Routing → Dispatching → Done
//!                │          │                  ↗
//!                │          └→ FallbackRouting ┤
//!                ↓                             ↘
//!              Failed ←──────────────────────── Failed
//! ```
//!
//! - Classification failure ends the request as `ClassificationFailed`.
//! - A category with no route, or a route whose agent is not registered, moves to
//!   fallback routing.
//! - An unregistered fallback ends the request as `AgentNotFound` naming the
//!   fallback.
//! - Before dispatch, the category and the chosen agent name are recorded in the
//!   request context. Dispatch returns the agent's outcome untouched.
//! - A request that already carries a classification is rejected as a
//!   `ContractViolation` before the classifier runs.
//! - Route counts go to the collector given to the builder, if any.

use crate::agent::{until_cancelled, Agent, AgentRegistry};
use crate::config::ConfigError;
use crate::error::{Failure, Outcome};
use crate::observability::metrics::MetricsCollector;
use crate::protocol::{Request, Response};
use crate::routing::classifier::{Category, Classifier};
use crate::routing::table::RoutingTable;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// How the dispatched agent was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// The category's own route resolved
    Direct,
    /// No usable route; the fallback agent was used
    Fallback,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Direct => "direct",
            RouteKind::Fallback => "fallback",
        }
    }
}

enum TriageState<C: Category> {
    Classifying,
    Routing(C),
    FallbackRouting(C),
    Dispatching {
        category: C,
        agent_name: String,
        agent: Arc<dyn Agent>,
        route: RouteKind,
    },
}

/// Routes each request to the agent responsible for its category
pub struct TriageAgent<C: Category> {
    classifier: Arc<dyn Classifier<C>>,
    routes: Arc<RoutingTable<C>>,
    registry: AgentRegistry,
    metrics: Option<&'static MetricsCollector>,
}

impl<C: Category> TriageAgent<C> {
    pub fn builder() -> TriageAgentBuilder<C> {
        TriageAgentBuilder::default()
    }

    pub fn routes(&self) -> &RoutingTable<C> {
        &self.routes
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    async fn run(&self, request: &mut Request, cancel: &CancellationToken) -> Outcome<Response> {
        let mut state = TriageState::Classifying;

        loop {
            state = match state {
                TriageState::Classifying => {
                    if request.context().has_classification() {
                        warn!("Request was already triaged");
                        return Err(Failure::contract_violation(
                            "Request already carries a classification",
                        ));
                    }
                    let category =
                        until_cancelled(cancel, "classification", self.classifier.classify(request))
                            .await
                            .map_err(|failure| {
                                warn!(failure = %failure, "Classification failed");
                                failure
                            })?;
                    debug!(category = %category, "Request classified");
                    TriageState::Routing(category)
                }

                TriageState::Routing(category) => match self.routes.lookup(&category) {
                    Some(name) => match self.registry.resolve(name) {
                        Ok(agent) => TriageState::Dispatching {
                            agent_name: name.to_string(),
                            category,
                            agent,
                            route: RouteKind::Direct,
                        },
                        Err(_) => {
                            warn!(
                                category = %category,
                                agent = %name,
                                fallback = %self.routes.fallback(),
                                "Routed agent is not registered, using fallback"
                            );
                            TriageState::FallbackRouting(category)
                        }
                    },
                    None => {
                        debug!(
                            category = %category,
                            fallback = %self.routes.fallback(),
                            "No route for category, using fallback"
                        );
                        TriageState::FallbackRouting(category)
                    }
                },

                TriageState::FallbackRouting(category) => {
                    let fallback = self.routes.fallback();
                    let agent = self.registry.resolve(fallback).map_err(|_| {
                        warn!(category = %category, fallback = %fallback, "Fallback agent is not registered");
                        if let Some(metrics) = self.metrics {
                            metrics.record_unresolved_route();
                        }
                        Failure::agent_not_found(fallback)
                    })?;

                    TriageState::Dispatching {
                        agent_name: fallback.to_string(),
                        category,
                        agent,
                        route: RouteKind::Fallback,
                    }
                }

                TriageState::Dispatching {
                    category,
                    agent_name,
                    agent,
                    route,
                } => {
                    if cancel.is_cancelled() {
                        return Err(Failure::cancelled("dispatch"));
                    }

                    info!(
                        category = %category,
                        agent = %agent_name,
                        route = route.as_str(),
                        "Dispatching request"
                    );
                    request
                        .context_mut()
                        .record_routing(category, agent_name.clone())?;
                    if let Some(metrics) = self.metrics {
                        metrics.record_route(&agent_name, route);
                    }

                    let span = tracing::debug_span!("dispatch", agent = %agent_name);
                    return until_cancelled(cancel, "dispatch", agent.invoke(request, cancel))
                        .instrument(span)
                        .await;
                }
            };
        }
    }
}

#[async_trait]
impl<C: Category> Agent for TriageAgent<C> {
    async fn invoke(&self, request: &mut Request, cancel: &CancellationToken) -> Outcome<Response> {
        let span = crate::triage_span!(thread_id = %request.thread_id());
        self.run(request, cancel).instrument(span).await
    }
}

/// Assembles a [`TriageAgent`]; every collaborator is required
pub struct TriageAgentBuilder<C: Category> {
    classifier: Option<Arc<dyn Classifier<C>>>,
    routes: Option<RoutingTable<C>>,
    registry: Option<AgentRegistry>,
    metrics: Option<&'static MetricsCollector>,
}

impl<C: Category> Default for TriageAgentBuilder<C> {
    fn default() -> Self {
        Self {
            classifier: None,
            routes: None,
            registry: None,
            metrics: None,
        }
    }
}

impl<C: Category> TriageAgentBuilder<C> {
    pub fn classifier<K: Classifier<C> + 'static>(mut self, classifier: K) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn shared_classifier(mut self, classifier: Arc<dyn Classifier<C>>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn routes(mut self, routes: RoutingTable<C>) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Count routing decisions in `collector`; without one nothing is counted
    pub fn metrics(mut self, collector: &'static MetricsCollector) -> Self {
        self.metrics = Some(collector);
        self
    }

    /// Fails when a collaborator was never configured
    ///
    /// Routes to unregistered agents are allowed (they fall back at request
    /// time) but are logged here so a misconfiguration is visible at startup.
    pub fn build(self) -> Result<TriageAgent<C>, ConfigError> {
        let classifier = self
            .classifier
            .ok_or(ConfigError::MissingCollaborator("classifier"))?;
        let routes = self
            .routes
            .ok_or(ConfigError::MissingCollaborator("routing table"))?;
        let registry = self
            .registry
            .ok_or(ConfigError::MissingCollaborator("agent registry"))?;

        for target in routes.targets() {
            if !registry.contains(target) {
                warn!(agent = %target, "Routing table references an unregistered agent");
            }
        }

        Ok(TriageAgent {
            classifier,
            routes: Arc::new(routes),
            registry,
            metrics: self.metrics,
        })
    }
}
