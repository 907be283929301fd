//! Classifier abstraction
//!
//! A [`Classifier`] assigns exactly one [`Category`] to a request. The core is
//! generic over the category type; callers bring their own closed enumeration.

use crate::error::Outcome;
use crate::protocol::Request;
use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;

/// Bound for caller-defined category enumerations
///
/// `Display` provides the label used in logs, metrics and reply templates.
pub trait Category: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> Category for T where T: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {}

/// Assigns a category to a request
///
/// Implementations may suspend (an LLM call, a remote model). Internal errors
/// must come back as `FailureKind::ClassificationFailed`, never as a panic.
#[async_trait]
pub trait Classifier<C: Category>: Send + Sync {
    async fn classify(&self, request: &Request) -> Outcome<C>;
}

#[async_trait]
impl<C: Category, K: Classifier<C> + ?Sized> Classifier<C> for Arc<K> {
    async fn classify(&self, request: &Request) -> Outcome<C> {
        (**self).classify(request).await
    }
}
