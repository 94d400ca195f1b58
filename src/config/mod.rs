//! # Controller Configuration
//!
//! Controller-level configuration loaded from environment variables (populated from a
//! ConfigMap via `envFrom` in the deployment).
//!
//! All configuration has sensible defaults and can be overridden via environment variables.
//! Values that fail to parse fall back to their defaults.

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;

/// Load configuration from environment variables with defaults
pub fn load_config() -> (ControllerConfig, ServerConfig) {
    (ControllerConfig::from_env(), ServerConfig::from_env())
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
