//! Classification and routing
//!
//! ## Classifiers (classifier.rs)
//!
//! The [`Classifier`] trait assigns one [`Category`] to a request. Two
//! implementations ship with the crate: [`KeywordClassifier`] (ordered regex
//! rules) and [`LlmClassifier`] (delegates to an LLM provider).
//!
//! ## Routing table (table.rs)
//!
//! [`RoutingTable`] maps a category to at most one agent name and carries the
//! fallback name. The triage agent in [`crate::agent::triage`] applies it.

pub mod classifier;
pub mod intent;
pub mod keyword_classifier;
pub mod llm_classifier;
pub mod table;

pub use classifier::{Category, Classifier};
pub use intent::Intent;
pub use keyword_classifier::{KeywordClassifier, KeywordRule};
pub use llm_classifier::LlmClassifier;
pub use table::RoutingTable;
