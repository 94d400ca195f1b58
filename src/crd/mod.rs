//! # Custom Resource Definitions
//!
//! CRD types for the ChuckNorris controller.
//!
//! This module contains the `ChuckNorris` custom resource, the closed set of joke
//! categories it may request, and (in `status`) the status record the reconciler owns.

mod status;

pub use status::{ChuckNorrisStatus, Condition, ConditionStatus};

use kube::CustomResource;
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// ChuckNorris Custom Resource Definition
///
/// Declares which joke category the resource wants. The controller fetches a joke
/// from the upstream API and records it, together with an audit trail of fetch
/// outcomes, in the status subresource.
///
/// # Example
///
/// ```yaml
/// apiVersion: jokes.example.com/v1alpha1
/// kind: ChuckNorris
/// metadata:
///   name: dev-joke
///   namespace: default
/// spec:
///   category: dev
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ChuckNorris",
    group = "jokes.example.com",
    version = "v1alpha1",
    plural = "chucknorris",
    namespaced,
    status = "ChuckNorrisStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Category", "type":"string", "jsonPath":".spec.category"}, {"name":"Joke", "type":"string", "jsonPath":".status.joke"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ChuckNorrisSpec {
    /// Joke category to request from the upstream API
    /// Changing it bumps `metadata.generation` and triggers a fresh fetch
    pub category: JokeCategory,
}

/// Joke categories supported by the upstream API
///
/// The CRD schema carries this list as an enum, so the API server rejects any other
/// value at admission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JokeCategory {
    Animal,
    Career,
    Celebrity,
    Dev,
    Explicit,
    Fashion,
    Food,
    History,
    Money,
    Movie,
    Music,
    Political,
    Religion,
    Science,
    Sport,
    Travel,
}

impl JokeCategory {
    /// Every supported category, in the order the upstream API lists them
    pub const ALL: [JokeCategory; 16] = [
        JokeCategory::Animal,
        JokeCategory::Career,
        JokeCategory::Celebrity,
        JokeCategory::Dev,
        JokeCategory::Explicit,
        JokeCategory::Fashion,
        JokeCategory::Food,
        JokeCategory::History,
        JokeCategory::Money,
        JokeCategory::Movie,
        JokeCategory::Music,
        JokeCategory::Political,
        JokeCategory::Religion,
        JokeCategory::Science,
        JokeCategory::Sport,
        JokeCategory::Travel,
    ];

    /// Wire name used both in the CRD and in the upstream query string
    pub fn as_str(self) -> &'static str {
        match self {
            JokeCategory::Animal => "animal",
            JokeCategory::Career => "career",
            JokeCategory::Celebrity => "celebrity",
            JokeCategory::Dev => "dev",
            JokeCategory::Explicit => "explicit",
            JokeCategory::Fashion => "fashion",
            JokeCategory::Food => "food",
            JokeCategory::History => "history",
            JokeCategory::Money => "money",
            JokeCategory::Movie => "movie",
            JokeCategory::Music => "music",
            JokeCategory::Political => "political",
            JokeCategory::Religion => "religion",
            JokeCategory::Science => "science",
            JokeCategory::Sport => "sport",
            JokeCategory::Travel => "travel",
        }
    }
}

impl fmt::Display for JokeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a category outside the supported set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("category {0} is not supported")]
pub struct UnsupportedCategory(pub String);

impl FromStr for JokeCategory {
    type Err = UnsupportedCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JokeCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnsupportedCategory(s.to_string()))
    }
}

impl JsonSchema for JokeCategory {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("JokeCategory")
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        // Plain string enum keeps the schema structural for the API server
        let values: Vec<&'static str> = JokeCategory::ALL.iter().map(|c| c.as_str()).collect();
        schemars::json_schema!({
            "type": "string",
            "enum": values,
            "description": "Joke category to request from the upstream API."
        })
    }
}
