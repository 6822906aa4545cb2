//! Service configuration, read from the environment with defaults.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INACTIVITY_SECS: u64 = 5 * 60;
pub const DEFAULT_AVATAR_URL: &str = "/api/v1/user/avatars/default.webp";
pub const DEFAULT_AVATAR_DIR: &str = "data/avatars";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Cached users idle longer than this are persisted and evicted by the sweep.
    pub inactivity_threshold: Duration,
    /// Avatar URL given to users created without one.
    pub default_avatar_url: String,
    pub avatar_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold: Duration::from_secs(DEFAULT_INACTIVITY_SECS),
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
            avatar_dir: PathBuf::from(DEFAULT_AVATAR_DIR),
        }
    }
}

impl ServiceConfig {
    /// Reads `SOCIAL_INACTIVITY_SECS`, `SOCIAL_DEFAULT_AVATAR_URL`, `SOCIAL_AVATAR_DIR`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            inactivity_threshold: Duration::from_secs(env_parse(
                "SOCIAL_INACTIVITY_SECS",
                DEFAULT_INACTIVITY_SECS,
            )),
            default_avatar_url: std::env::var("SOCIAL_DEFAULT_AVATAR_URL")
                .unwrap_or(defaults.default_avatar_url),
            avatar_dir: std::env::var("SOCIAL_AVATAR_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.avatar_dir),
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
                default
            }
        },
        Err(_) => default,
    }
}
