//! Built-in conversational intent categories
//!
//! Hosts are free to define their own category enum; this one covers the
//! common assistant intents and is what the CLI classifies into.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Intent of a conversational request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    HelpRequest,
    ActionRequest,
    DataQuery,
    Feedback,
    General,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::HelpRequest,
        Intent::ActionRequest,
        Intent::DataQuery,
        Intent::Feedback,
        Intent::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::HelpRequest => "help_request",
            Intent::ActionRequest => "action_request",
            Intent::DataQuery => "data_query",
            Intent::Feedback => "feedback",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized intent label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown intent '{0}'")]
pub struct UnknownIntent(pub String);

impl FromStr for Intent {
    type Err = UnknownIntent;

    /// Accepts snake_case, PascalCase, kebab-case and any casing of those
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "helprequest" | "help" => Ok(Intent::HelpRequest),
            "actionrequest" | "action" => Ok(Intent::ActionRequest),
            "dataquery" | "query" => Ok(Intent::DataQuery),
            "feedback" => Ok(Intent::Feedback),
            "general" => Ok(Intent::General),
            _ => Err(UnknownIntent(s.to_string())),
        }
    }
}
