//! Process configuration for the API binary.

use social_core::{env_parse, ServiceConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:3002";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen: SocketAddr,
    /// SQLite database file; the in-memory store is used when unset.
    pub db_path: Option<PathBuf>,
    pub sweep_interval: Duration,
    pub service: ServiceConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3002)),
            db_path: None,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            service: ServiceConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Reads `SOCIAL_LISTEN`, `SOCIAL_DB_PATH`, `SOCIAL_SWEEP_INTERVAL_SECS` and the
    /// service variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen: env_parse("SOCIAL_LISTEN", defaults.listen),
            db_path: std::env::var("SOCIAL_DB_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            sweep_interval: Duration::from_secs(env_parse(
                "SOCIAL_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
            service: ServiceConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_matches_the_documented_address() {
        assert_eq!(ApiConfig::default().listen, DEFAULT_LISTEN.parse::<SocketAddr>().unwrap());
    }
}
