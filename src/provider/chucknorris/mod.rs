//! # ChuckNorris API Client
//!
//! REST client for `api.chucknorris.io`.
//!
//! - `GET {base_url}/jokes/random?category={category}`
//! - Uses reqwest with rustls (no OpenSSL dependencies)
//! - Base URL is configurable so tests can point it at a mock server

mod types;

pub use types::JokeResponse;

use crate::crd::JokeCategory;
use crate::provider::{FetchError, JokeProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// HTTP implementation of [`JokeProvider`]
#[derive(Debug, Clone)]
pub struct ChuckNorrisClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChuckNorrisClient {
    /// Create a client for `base_url` with a per-request timeout
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chucknorris-controller/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client for joke API")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn random_joke_url(&self) -> String {
        format!("{}/jokes/random", self.base_url)
    }
}

#[async_trait]
impl JokeProvider for ChuckNorrisClient {
    async fn fetch(&self, category: JokeCategory) -> Result<String, FetchError> {
        let url = self.random_joke_url();
        debug!(url = %url, category = %category, "Requesting joke from upstream");

        let response = self
            .http
            .get(&url)
            .query(&[("category", category.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::UnsupportedCategory {
                category: category.as_str().to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Transport(format!(
                "upstream returned HTTP {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let joke: JokeResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        if joke.value.is_empty() {
            return Err(FetchError::Decode(
                "response did not contain a joke".to_string(),
            ));
        }

        debug!(joke_id = %joke.id, category = %category, "Fetched joke from upstream");
        Ok(joke.value)
    }
}
