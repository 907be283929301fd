//! Config-defined reply agents
//!
//! A [`StaticReplyAgent`] renders a fixed template against the request and the
//! facts the triage agent recorded, which is enough to stand up a working
//! assistant from configuration alone.

use crate::agent::Agent;
use crate::config::AgentSection;
use crate::error::Outcome;
use crate::protocol::{Request, Response, Widget};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Agent that answers with a rendered template
///
/// Placeholders: `{message}`, `{category}`, `{agent}`, `{thread_id}`. Category and
/// agent render as empty strings when the request did not come through triage.
#[derive(Debug, Clone)]
pub struct StaticReplyAgent {
    template: String,
    widgets: Vec<Widget>,
}

impl StaticReplyAgent {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            widgets: Vec::new(),
        }
    }

    pub fn with_widgets(mut self, widgets: impl IntoIterator<Item = Widget>) -> Self {
        self.widgets.extend(widgets);
        self
    }

    pub fn from_config(section: &AgentSection) -> Self {
        Self::new(section.reply.clone())
            .with_widgets(section.widgets.iter().cloned().map(Widget::new))
    }

    fn render(&self, request: &Request) -> String {
        let context = request.context();
        self.template
            .replace("{category}", context.classification_label().unwrap_or_default())
            .replace("{agent}", context.routed_agent_name().unwrap_or_default())
            .replace("{thread_id}", request.thread_id())
            // Last, so user text containing placeholders is not expanded
            .replace("{message}", request.user_message())
    }
}

#[async_trait]
impl Agent for StaticReplyAgent {
    async fn invoke(&self, request: &mut Request, _cancel: &CancellationToken) -> Outcome<Response> {
        Ok(Response::assistant(request, self.render(request)).with_widgets(self.widgets.clone()))
    }
}
