//! Inter-agent communication context
//!
//! Typed, per-request storage for the facts the triage agent derives so that
//! downstream stages can read them without re-classifying:
//!
//! - the classification (any [`Category`] type, read back with a typed accessor)
//! - the name of the agent the request was routed to
//! - opaque extension values for handlers this crate knows nothing about
//!
//! The original user message lives on [`crate::protocol::Request`] itself and
//! has no setter.
//!
//! Classification and routed name are write-once. A second write returns
//! [`FailureKind::ContractViolation`](crate::error::FailureKind) and leaves the
//! existing values in place.

use crate::error::{Failure, Outcome};
use crate::routing::classifier::Category;
use serde_json::Value;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;

struct StoredClassification {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
    label: String,
}

/// Request-scoped facts shared between pipeline stages
#[derive(Default)]
pub struct RequestContext {
    classification: Option<StoredClassification>,
    routed_agent: Option<String>,
    extensions: HashMap<String, Value>,
}

impl RequestContext {
    /// Record the triage result: the category and the agent it resolved to
    ///
    /// Both facts are checked before either is written, so a rejected call
    /// leaves the context untouched.
    pub fn record_routing<C: Category>(
        &mut self,
        category: C,
        agent_name: impl Into<String>,
    ) -> Outcome<()> {
        let agent_name = agent_name.into();
        self.ensure_unset(&agent_name)?;
        self.store_classification(category);
        self.routed_agent = Some(agent_name);
        Ok(())
    }

    /// Record only the classification
    pub fn set_classification<C: Category>(&mut self, category: C) -> Outcome<()> {
        if let Some(existing) = &self.classification {
            return Err(Failure::contract_violation(format!(
                "Classification already set to '{}'; refusing to overwrite with '{}'",
                existing.label, category
            )));
        }
        self.store_classification(category);
        Ok(())
    }

    /// Read the classification as `C`
    ///
    /// Fails with `ContextMismatch` when nothing was recorded or when the stored
    /// value is a different category type.
    pub fn classification<C: Category>(&self) -> Outcome<C> {
        let stored = self.classification.as_ref().ok_or_else(|| {
            Failure::context_mismatch("No classification has been recorded for this request")
        })?;

        stored
            .value
            .downcast_ref::<C>()
            .cloned()
            .ok_or_else(|| {
                Failure::context_mismatch(format!(
                    "Classification is a '{}', not a '{}'",
                    stored.type_name,
                    type_name::<C>()
                ))
            })
    }

    /// Display form of the classification, independent of its type
    pub fn classification_label(&self) -> Option<&str> {
        self.classification.as_ref().map(|c| c.label.as_str())
    }

    pub fn has_classification(&self) -> bool {
        self.classification.is_some()
    }

    /// Name of the agent the triage agent selected, if routing has completed
    pub fn routed_agent_name(&self) -> Option<&str> {
        self.routed_agent.as_deref()
    }

    pub fn insert_extension(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.extensions.insert(key.into(), value)
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    fn ensure_unset(&self, agent_name: &str) -> Outcome<()> {
        if let Some(existing) = &self.classification {
            return Err(Failure::contract_violation(format!(
                "Classification already set to '{}'; a second triage on the same request is not allowed",
                existing.label
            )));
        }
        if let Some(existing) = &self.routed_agent {
            return Err(Failure::contract_violation(format!(
                "Request already routed to '{existing}'; refusing to re-route to '{agent_name}'"
            )));
        }
        Ok(())
    }

    fn store_classification<C: Category>(&mut self, category: C) {
        let label = category.to_string();
        self.classification = Some(StoredClassification {
            value: Box::new(category),
            type_name: type_name::<C>(),
            label,
        });
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("classification", &self.classification_label())
            .field("routed_agent", &self.routed_agent)
            .field("extensions", &self.extensions)
            .finish()
    }
}
