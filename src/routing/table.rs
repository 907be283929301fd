//! Category → agent routing table
//!
//! A pure one-to-one-or-none mapping from category to agent name, plus the one
//! fallback name used when a category has no route or its agent is missing.
//! Built once at startup and shared read-only.

use crate::config::{validate_agent_name, ConfigError, RoutingSection};
use crate::routing::classifier::Category;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct RoutingTable<C: Category> {
    routes: HashMap<C, String>,
    fallback: String,
}

impl<C: Category> RoutingTable<C> {
    /// Create a table with only a fallback
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            routes: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Add or replace the route for a category
    pub fn route(mut self, category: C, agent_name: impl Into<String>) -> Self {
        self.routes.insert(category, agent_name.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Replace the whole category map
    pub fn with_routes(mut self, routes: impl IntoIterator<Item = (C, String)>) -> Self {
        self.routes = routes.into_iter().collect();
        self
    }

    /// Agent name for an exact category match
    pub fn lookup(&self, category: &C) -> Option<&str> {
        self.routes.get(category).map(String::as_str)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Every distinct agent name this table can route to, fallback included
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self
            .routes
            .values()
            .map(String::as_str)
            .chain(std::iter::once(self.fallback.as_str()))
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<C> RoutingTable<C>
where
    C: Category + FromStr,
    C::Err: Display,
{
    /// Build from the `[routing]` section, parsing each key into a category
    pub fn from_config(section: &RoutingSection) -> Result<Self, ConfigError> {
        validate_agent_name(&section.fallback)?;

        let mut table = Self::new(section.fallback.clone());
        for (label, agent_name) in &section.routes {
            validate_agent_name(agent_name)?;
            let category = label
                .parse::<C>()
                .map_err(|e| ConfigError::UnknownCategory {
                    label: label.clone(),
                    reason: e.to_string(),
                })?;

            if let Some(previous) = table.routes.insert(category, agent_name.clone()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Category '{label}' is routed twice ('{previous}' and '{agent_name}')"
                )));
            }
        }

        Ok(table)
    }
}
