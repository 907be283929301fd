//! Startup configuration
//!
//! Loaded once from TOML before any request is processed. Everything that can go
//! wrong while wiring the pipeline is a [`ConfigError`] and aborts startup; none of
//! these errors are ever produced on the request path.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Root configuration document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageConfig {
    #[serde(default)]
    pub pipeline: PipelineSection,
    pub routing: RoutingSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
    /// Static reply agents keyed by registry name
    #[serde(default)]
    pub agents: BTreeMap<String, AgentSection>,
}

/// Pipeline middleware settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSection {
    /// Longest accepted user message, in characters (default: 4000)
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Record request outcomes in the global metrics collector (default: true)
    #[serde(default = "default_metrics_enabled")]
    pub metrics: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            metrics: default_metrics_enabled(),
        }
    }
}

fn default_max_message_chars() -> usize {
    4000
}

fn default_metrics_enabled() -> bool {
    true
}

/// Category → agent routing table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingSection {
    /// Agent invoked when no route applies or the routed agent is missing
    pub fallback: String,
    /// Category label → agent name
    #[serde(default)]
    pub routes: HashMap<String, String>,
}

/// Keyword classifier rules
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassifierSection {
    /// Category used when no rule matches; unmatched text fails classification if absent
    pub default_category: Option<String>,
    /// Evaluated in order, first match wins
    #[serde(default)]
    pub rules: Vec<KeywordRuleConfig>,
}

/// One classifier rule: any pattern matching assigns the category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordRuleConfig {
    pub category: String,
    pub patterns: Vec<String>,
}

/// Static reply agent definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// Reply template; supports {message}, {category}, {agent} and {thread_id}
    pub reply: String,
    /// Widget descriptors attached verbatim to every reply
    #[serde(default)]
    pub widgets: Vec<serde_json::Value>,
}

/// Fatal configuration and wiring errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid agent name: {0}")]
    InvalidAgentName(String),
    #[error("Agent '{0}' is already registered")]
    DuplicateAgent(String),
    #[error("Missing required collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error("Unknown category '{label}': {reason}")]
    UnknownCategory { label: String, reason: String },
    #[error("Invalid classifier rule for '{category}': {reason}")]
    InvalidRule { category: String, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TriageConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TriageConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check names and limits; category labels are checked when the classifier is built
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing.fallback.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "[routing] fallback must name an agent".to_string(),
            ));
        }
        validate_agent_name(&self.routing.fallback)?;

        for target in self.routing.routes.values() {
            validate_agent_name(target)?;
        }
        for name in self.agents.keys() {
            validate_agent_name(name)?;
        }

        if self.pipeline.max_message_chars == 0 {
            return Err(ConfigError::InvalidConfig(
                "[pipeline] max_message_chars must be greater than zero".to_string(),
            ));
        }

        for rule in &self.classifier.rules {
            if rule.patterns.is_empty() {
                return Err(ConfigError::InvalidRule {
                    category: rule.category.clone(),
                    reason: "rule has no patterns".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Agent names must match `[a-zA-Z0-9._-]+`; matching is case-sensitive
pub fn validate_agent_name(name: &str) -> Result<(), ConfigError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if name.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidAgentName(format!(
            "Agent name '{name}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
