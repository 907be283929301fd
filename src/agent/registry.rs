//! Agent registry
//!
//! Agents are registered by name on an [`AgentRegistryBuilder`] during startup.
//! [`AgentRegistryBuilder::build`] freezes the map into an [`AgentRegistry`], which
//! has no mutating methods and is shared behind an `Arc`, so concurrent lookups
//! need no locking.

use crate::agent::Agent;
use crate::config::{validate_agent_name, ConfigError};
use crate::error::{Failure, Outcome};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Startup-only registration surface
#[derive(Default)]
pub struct AgentRegistryBuilder {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under a unique, case-sensitive name
    pub fn register<A: Agent + 'static>(
        &mut self,
        name: impl Into<String>,
        agent: A,
    ) -> Result<&mut Self, ConfigError> {
        self.register_shared(name, Arc::new(agent))
    }

    /// Register an agent built by a factory; the factory runs once, here
    pub fn register_with<A, F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<&mut Self, ConfigError>
    where
        A: Agent + 'static,
        F: FnOnce() -> A,
    {
        let name = name.into();
        self.check_available(&name)?;
        self.register_shared(name, Arc::new(factory()))
    }

    /// Register an agent that is already shared elsewhere
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        agent: Arc<dyn Agent>,
    ) -> Result<&mut Self, ConfigError> {
        let name = name.into();
        self.check_available(&name)?;

        debug!(agent = %name, "Registered agent");
        self.agents.insert(name, agent);
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Freeze the registry
    pub fn build(self) -> AgentRegistry {
        info!(agents = self.agents.len(), "Agent registry frozen");
        AgentRegistry {
            agents: Arc::new(self.agents),
        }
    }

    fn check_available(&self, name: &str) -> Result<(), ConfigError> {
        validate_agent_name(name)?;
        if self.agents.contains_key(name) {
            return Err(ConfigError::DuplicateAgent(name.to_string()));
        }
        Ok(())
    }
}

/// Frozen name → agent map
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: Arc<HashMap<String, Arc<dyn Agent>>>,
}

impl AgentRegistry {
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::new()
    }

    /// Look up an agent by exact name
    pub fn resolve(&self, name: &str) -> Outcome<Arc<dyn Agent>> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| Failure::agent_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.names())
            .finish()
    }
}
