//! Response types for the upstream joke API.

use serde::Deserialize;

/// Body of `GET /jokes/random`
///
/// Only `value` is required; the other fields are informational.
#[derive(Debug, Clone, Deserialize)]
pub struct JokeResponse {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// The joke itself
    pub value: String,
}
