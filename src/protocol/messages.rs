//! Request and response values exchanged with the hosting transport
//!
//! A [`Request`] is created per inbound message and owns its [`RequestContext`],
//! so facts written while it travels the pipeline can never leak into another
//! request. A [`Response`] is immutable once built.

use crate::agent::context::RequestContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Opaque widget descriptor attached to a response
///
/// Rendering is owned by the hosting UI; the pipeline only carries the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Widget(Value);

impl Widget {
    pub fn new(descriptor: Value) -> Self {
        Self(descriptor)
    }

    pub fn descriptor(&self) -> &Value {
        &self.0
    }
}

/// One inbound conversational request
#[derive(Debug)]
pub struct Request {
    thread_id: String,
    message: String,
    context: RequestContext,
}

impl Request {
    pub fn new(thread_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            message: message.into(),
            context: RequestContext::default(),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// The original user message, exactly as received
    pub fn user_message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }
}

/// A completed conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    role: Role,
    message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    widgets: Vec<Widget>,
    thread_id: String,
    created_at: DateTime<Utc>,
}

impl Response {
    pub fn new(role: Role, thread_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            widgets: Vec::new(),
            thread_id: thread_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Assistant reply on the request's thread
    pub fn assistant(request: &Request, message: impl Into<String>) -> Self {
        Self::new(Role::Assistant, request.thread_id(), message)
    }

    /// Attach widgets while building the response
    pub fn with_widgets(mut self, widgets: impl IntoIterator<Item = Widget>) -> Self {
        self.widgets.extend(widgets);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
