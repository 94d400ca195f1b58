//! # Constants
//!
//! Default values for controller and server configuration, plus the fixed
//! identifiers written into `ChuckNorris` status conditions.

/// Default HTTP port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// How long to wait for the HTTP server to bind before giving up (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Poll interval while waiting for the HTTP server to become ready (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Delay before restarting the watch after an unclassified or auth error (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Initial backoff for 429 watch errors (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_START_MS: u64 = 500;

/// Maximum backoff for 429 watch errors (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_MAX_MS: u64 = 30_000;

/// Base URL of the upstream joke API
pub const DEFAULT_JOKE_API_URL: &str = "https://api.chucknorris.io";

/// Per-request timeout for the upstream joke API (seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Deadline for a single reconciliation's fetch step (seconds)
pub const DEFAULT_RECONCILE_DEADLINE_SECS: u64 = 30;

/// Minimum retry backoff after a failed reconciliation (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Maximum retry backoff after a failed reconciliation (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Upper bound for any retry backoff (seconds)
pub const MAX_BACKOFF_SECS: u64 = 86_400;

/// Fallback requeue when the backoff table cannot be locked (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 30;

/// Maximum number of reconciliations running at once (0 = unbounded)
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 4;

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "chucknorris-controller";

/// Condition type recording the outcome of the upstream fetch
pub const CONDITION_TYPE_FETCH_UPSTREAM: &str = "FetchUpstream";

/// Condition reason for a successful fetch
pub const REASON_FETCH_SUCCEEDED: &str = "FetchSucceeded";

/// Condition reason for a failed fetch
pub const REASON_FETCH_FAILED: &str = "FetchFailed";

/// Condition message for a successful fetch
pub const MESSAGE_FETCH_SUCCEEDED: &str = "Successfully fetched value from upstream";
