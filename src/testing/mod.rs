//! Testing utilities and mock implementations
//!
//! Recording agents, scripted classifiers and middleware, and a mock LLM provider
//! for exercising pipelines without real handlers or models.

pub mod mocks;

pub use mocks::*;
