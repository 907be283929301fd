//! Regex rule classifier
//!
//! Rules are evaluated in order and the first rule with a matching pattern decides
//! the category. Cheap and deterministic, which makes it a good first classifier
//! and a good stand-in for an LLM classifier in tests.

use crate::config::{ClassifierSection, ConfigError};
use crate::error::{Failure, Outcome};
use crate::protocol::Request;
use crate::routing::classifier::{Category, Classifier};
use async_trait::async_trait;
use regex::Regex;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

/// A category and the patterns that select it
#[derive(Debug, Clone)]
pub struct KeywordRule<C: Category> {
    pub category: C,
    pub patterns: Vec<Regex>,
}

impl<C: Category> KeywordRule<C> {
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// Ordered regex rules with an optional default category
#[derive(Debug, Clone)]
pub struct KeywordClassifier<C: Category> {
    rules: Vec<KeywordRule<C>>,
    default_category: Option<C>,
}

impl<C: Category> Default for KeywordClassifier<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Category> KeywordClassifier<C> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_category: None,
        }
    }

    /// Append a rule; fails on the first pattern that is not a valid regex
    pub fn rule<I, S>(mut self, category: C, patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| ConfigError::InvalidRule {
                    category: category.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if patterns.is_empty() {
            return Err(ConfigError::InvalidRule {
                category: category.to_string(),
                reason: "rule has no patterns".to_string(),
            });
        }

        self.rules.push(KeywordRule { category, patterns });
        Ok(self)
    }

    /// Category assigned when no rule matches
    pub fn with_default(mut self, category: C) -> Self {
        self.default_category = Some(category);
        self
    }

    pub fn rules(&self) -> &[KeywordRule<C>] {
        &self.rules
    }

    fn match_text(&self, text: &str) -> Option<&C> {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| &rule.category)
            .or(self.default_category.as_ref())
    }
}

impl<C> KeywordClassifier<C>
where
    C: Category + FromStr,
    C::Err: Display,
{
    /// Build from the `[classifier]` section
    pub fn from_config(section: &ClassifierSection) -> Result<Self, ConfigError> {
        let mut classifier = Self::new();

        for rule in &section.rules {
            let category = parse_category::<C>(&rule.category)?;
            classifier = classifier.rule(category, &rule.patterns)?;
        }

        if let Some(label) = &section.default_category {
            classifier = classifier.with_default(parse_category::<C>(label)?);
        }

        Ok(classifier)
    }
}

fn parse_category<C>(label: &str) -> Result<C, ConfigError>
where
    C: FromStr,
    C::Err: Display,
{
    label.parse::<C>().map_err(|e| ConfigError::UnknownCategory {
        label: label.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl<C: Category> Classifier<C> for KeywordClassifier<C> {
    async fn classify(&self, request: &Request) -> Outcome<C> {
        match self.match_text(request.user_message()) {
            Some(category) => {
                debug!(category = %category, "Keyword classifier matched");
                Ok(category.clone())
            }
            None => Err(Failure::classification_failed(format!(
                "No classifier rule matched and no default category is configured ({} rules)",
                self.rules.len()
            ))),
        }
    }
}
