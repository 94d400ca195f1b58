//! # ChuckNorris Status
//!
//! Status types for tracking the fetched joke and the history of fetch outcomes.

use crate::constants::{
    CONDITION_TYPE_FETCH_UPSTREAM, MESSAGE_FETCH_SUCCEEDED, REASON_FETCH_FAILED,
    REASON_FETCH_SUCCEEDED,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Status of the ChuckNorris resource
///
/// Written only by the reconciler. `conditions` is an append-only audit log: entries are
/// pushed at the end and never edited, removed or reordered.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChuckNorrisStatus {
    /// Last joke successfully fetched from upstream
    /// Empty means no fetch has succeeded yet
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub joke: String,
    /// Generation of the spec the current joke was fetched for
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Chronological history of fetch outcomes
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ChuckNorrisStatus {
    /// True when the status already reflects `generation`: a joke is present and it was
    /// fetched for the current spec.
    pub fn is_settled(&self, generation: Option<i64>) -> bool {
        !self.joke.is_empty() && self.observed_generation == generation
    }

    /// Most recent condition of the given type, if any
    pub fn latest_condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .rev()
            .find(|c| c.r#type == condition_type)
    }

    /// Record a successful fetch: store the joke, advance `observed_generation` and append
    /// a `FetchSucceeded` condition.
    pub fn record_fetch_success(
        &mut self,
        joke: String,
        generation: Option<i64>,
        now: DateTime<Utc>,
    ) {
        self.joke = joke;
        self.observed_generation = generation;
        self.push_condition(Condition::fetch_succeeded(now));
    }

    /// Record a failed fetch. The joke and `observed_generation` are left alone so a
    /// failing category is never mistaken for a settled one.
    pub fn record_fetch_failure(&mut self, message: &str, now: DateTime<Utc>) {
        self.push_condition(Condition::fetch_failed(message, now));
    }

    fn push_condition(&mut self, mut condition: Condition) {
        // Transition times never go backwards, even if the wall clock does
        if let (Some(previous), Some(current)) = (
            self.conditions.last().and_then(Condition::transition_time),
            condition.transition_time(),
        ) {
            if current < previous {
                condition.last_transition_time = Some(format_time(previous));
            }
        }
        self.conditions.push(condition);
    }
}

/// Condition represents one observation about the resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Time the condition was recorded (RFC3339)
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Machine-readable reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    pub fn new(
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            r#type: condition_type.to_string(),
            status,
            last_transition_time: Some(format_time(now)),
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
        }
    }

    pub fn fetch_succeeded(now: DateTime<Utc>) -> Self {
        Self::new(
            CONDITION_TYPE_FETCH_UPSTREAM,
            ConditionStatus::True,
            REASON_FETCH_SUCCEEDED,
            MESSAGE_FETCH_SUCCEEDED,
            now,
        )
    }

    pub fn fetch_failed(message: &str, now: DateTime<Utc>) -> Self {
        Self::new(
            CONDITION_TYPE_FETCH_UPSTREAM,
            ConditionStatus::False,
            REASON_FETCH_FAILED,
            message,
            now,
        )
    }

    /// Parsed `last_transition_time`, if present and valid
    pub fn transition_time(&self) -> Option<DateTime<Utc>> {
        self.last_transition_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Tri-state condition status, serialized the way Kubernetes conditions are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}
