//! # Reconciliation Configuration
//!
//! Upstream API, timeouts, backoff and concurrency settings.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_JOKE_API_URL, DEFAULT_MAX_CONCURRENT_RECONCILES, DEFAULT_RECONCILE_DEADLINE_SECS,
    MAX_BACKOFF_SECS,
};
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Base URL of the upstream joke API (`JOKE_API_URL`)
    pub joke_api_url: String,
    /// Per-request HTTP timeout (`FETCH_TIMEOUT_SECS`)
    pub fetch_timeout_secs: u64,
    /// Deadline for the fetch step of one reconciliation (`RECONCILE_DEADLINE_SECS`)
    pub reconcile_deadline_secs: u64,
    /// First retry delay after a failure (`BACKOFF_MIN_SECS`)
    pub backoff_min_secs: u64,
    /// Retry delay cap (`BACKOFF_MAX_SECS`)
    pub backoff_max_secs: u64,
    /// Reconciliations running at once, 0 for unbounded (`MAX_CONCURRENT_RECONCILES`)
    pub max_concurrent_reconciles: u16,
    /// Restrict the watch to one namespace (`WATCH_NAMESPACE`); all namespaces if unset
    pub watch_namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            joke_api_url: DEFAULT_JOKE_API_URL.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            reconcile_deadline_secs: DEFAULT_RECONCILE_DEADLINE_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            watch_namespace: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };
        // Zero would make every request or reconciliation time out immediately
        let positive = |key: &str, default: u64| match parse(key, default) {
            0 => default,
            value => value,
        };
        let backoff = |key: &str, default: u64| parse(key, default).min(MAX_BACKOFF_SECS);
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            joke_api_url: non_empty("JOKE_API_URL").unwrap_or(defaults.joke_api_url),
            fetch_timeout_secs: positive("FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            reconcile_deadline_secs: positive(
                "RECONCILE_DEADLINE_SECS",
                defaults.reconcile_deadline_secs,
            ),
            backoff_min_secs: backoff("BACKOFF_MIN_SECS", defaults.backoff_min_secs),
            backoff_max_secs: backoff("BACKOFF_MAX_SECS", defaults.backoff_max_secs),
            max_concurrent_reconciles: lookup("MAX_CONCURRENT_RECONCILES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_concurrent_reconciles),
            watch_namespace: non_empty("WATCH_NAMESPACE"),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn reconcile_deadline(&self) -> Duration {
        Duration::from_secs(self.reconcile_deadline_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ControllerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.joke_api_url, "https://api.chucknorris.io");
        assert!(config.watch_namespace.is_none());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("JOKE_API_URL", "http://mock:8080"),
            ("FETCH_TIMEOUT_SECS", "3"),
            ("RECONCILE_DEADLINE_SECS", "7"),
            ("BACKOFF_MIN_SECS", "2"),
            ("BACKOFF_MAX_SECS", "20"),
            ("MAX_CONCURRENT_RECONCILES", "8"),
            ("WATCH_NAMESPACE", "jokes"),
        ]));
        assert_eq!(config.joke_api_url, "http://mock:8080");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
        assert_eq!(config.reconcile_deadline(), Duration::from_secs(7));
        assert_eq!(config.backoff_min_secs, 2);
        assert_eq!(config.backoff_max_secs, 20);
        assert_eq!(config.max_concurrent_reconciles, 8);
        assert_eq!(config.watch_namespace.as_deref(), Some("jokes"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("FETCH_TIMEOUT_SECS", "soon"),
            ("MAX_CONCURRENT_RECONCILES", "-1"),
            ("WATCH_NAMESPACE", "  "),
            ("JOKE_API_URL", ""),
        ]));
        assert_eq!(config.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(
            config.max_concurrent_reconciles,
            DEFAULT_MAX_CONCURRENT_RECONCILES
        );
        assert!(config.watch_namespace.is_none());
        assert_eq!(config.joke_api_url, DEFAULT_JOKE_API_URL);
    }

    #[test]
    fn test_zero_timeouts_fall_back() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("FETCH_TIMEOUT_SECS", "0"),
            ("RECONCILE_DEADLINE_SECS", "0"),
        ]));
        assert_eq!(config.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(
            config.reconcile_deadline_secs,
            DEFAULT_RECONCILE_DEADLINE_SECS
        );
    }

    #[test]
    fn test_backoff_is_capped_at_one_day() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("BACKOFF_MIN_SECS", "20000000000000"),
            ("BACKOFF_MAX_SECS", "20000000000000"),
        ]));
        assert_eq!(config.backoff_min_secs, MAX_BACKOFF_SECS);
        assert_eq!(config.backoff_max_secs, MAX_BACKOFF_SECS);
    }
}
