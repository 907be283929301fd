//! LLM-backed classifier
//!
//! Asks a model to pick exactly one label from the allowed categories and parses
//! the answer back into a category. Any provider error or unusable answer is a
//! `ClassificationFailed` outcome.

use crate::error::{Failure, Outcome};
use crate::llm::provider::{CompletionRequest, LlmProvider, Message, MessageRole};
use crate::protocol::Request;
use crate::routing::classifier::{Category, Classifier};
use async_trait::async_trait;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are an intent classifier for a conversational assistant. \
Reply with exactly one label from the list you are given and nothing else.";

/// Classifier that delegates to an [`LlmProvider`]
pub struct LlmClassifier<C: Category> {
    provider: Arc<dyn LlmProvider>,
    model: String,
    /// Low by default so the same text keeps getting the same label
    temperature: f32,
    labels: Vec<C>,
}

impl<C> LlmClassifier<C>
where
    C: Category + FromStr,
    C::Err: Display,
{
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, labels: Vec<C>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            labels,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_completion_request(&self, request: &Request) -> CompletionRequest {
        let labels = self
            .labels
            .iter()
            .map(|c| format!("- {c}"))
            .collect::<Vec<_>>()
            .join("\n");

        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: MessageRole::System,
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: MessageRole::User,
                    content: format!(
                        "ALLOWED LABELS:\n{labels}\n\nMESSAGE:\n{}\n\nLABEL:",
                        request.user_message()
                    ),
                },
            ],
            max_tokens: Some(16),
            temperature: Some(self.temperature),
            metadata: [("thread_id".to_string(), request.thread_id().to_string())]
                .into_iter()
                .collect(),
        }
    }

    /// Take the first non-empty line, strip quotes and punctuation, parse it
    fn parse_label(&self, content: &str) -> Outcome<C> {
        let answer = content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| line.trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.'))
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(Failure::classification_failed(
                "LLM returned an empty classification",
            ));
        }

        let category = answer.parse::<C>().map_err(|e| {
            Failure::classification_failed(format!("LLM returned unusable label '{answer}': {e}"))
        })?;

        if !self.labels.contains(&category) {
            return Err(Failure::classification_failed(format!(
                "LLM returned label '{answer}' which is not one of the allowed labels"
            )));
        }

        Ok(category)
    }
}

#[async_trait]
impl<C> Classifier<C> for LlmClassifier<C>
where
    C: Category + FromStr,
    C::Err: Display,
{
    async fn classify(&self, request: &Request) -> Outcome<C> {
        let completion = self
            .provider
            .complete(self.build_completion_request(request))
            .await
            .map_err(|e| {
                warn!(provider = self.provider.name(), error = %e, "LLM classification request failed");
                Failure::classification_failed(format!("LLM provider error: {e}"))
            })?;

        let content = completion.content.unwrap_or_default();
        let category = self.parse_label(&content)?;

        debug!(
            provider = self.provider.name(),
            model = %completion.model,
            category = %category,
            "LLM classifier assigned category"
        );

        Ok(category)
    }
}
