//! # Joke Providers
//!
//! The fetch capability the reconciler depends on.
//!
//! The reconciler only sees the [`JokeProvider`] trait and the [`FetchError`]
//! classification; transport details stay inside the implementations.

pub mod chucknorris;

pub use chucknorris::ChuckNorrisClient;

use crate::crd::JokeCategory;
use async_trait::async_trait;

/// Errors returned by a joke provider
///
/// The reconciler treats every variant as "fetch failed" but keeps the message text
/// in the status condition so users can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Upstream does not know the requested category
    #[error("category {category} is not supported")]
    UnsupportedCategory { category: String },
    /// Request could not be sent or upstream answered with an error status
    #[error("could not send request: {0}")]
    Transport(String),
    /// Upstream answered but the body was not a joke
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::UnsupportedCategory { .. } => "unsupported_category",
            FetchError::Transport(_) => "transport",
            FetchError::Decode(_) => "decode",
        }
    }
}

/// Source of jokes for a category
#[async_trait]
pub trait JokeProvider: Send + Sync {
    /// Fetch one joke for `category`
    async fn fetch(&self, category: JokeCategory) -> Result<String, FetchError>;
}
