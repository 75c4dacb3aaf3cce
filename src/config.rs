use std::time::Duration;

use tracing::warn;
use worker::Env;

use crate::cache::DEFAULT_TTL;
use crate::fetcher::graphql::DEFAULT_DOC_ID;

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_LOG_LEVEL: &str = "info";

/// Settings read from Worker vars (see `wrangler.toml`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub cache_ttl: Duration,
    pub sweep_interval: Duration,
    pub fetch_timeout: Duration,
    pub graphql_doc_id: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            graphql_doc_id: DEFAULT_DOC_ID.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env(env: &Env) -> Self {
        Self::from_lookup(|name| env.var(name).ok().map(|v| v.to_string()))
    }

    /// Builds a config from any name → value lookup. Unset vars use the
    /// default; unparsable ones are logged and use the default too.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| match lookup(name) {
            None => default,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => Duration::from_secs(n),
                _ => {
                    warn!(var = name, value = %raw, "[config] invalid duration, using default");
                    default
                }
            },
        };

        Self {
            cache_ttl: secs("CACHE_TTL_SECS", defaults.cache_ttl),
            sweep_interval: secs("SWEEP_INTERVAL_SECS", defaults.sweep_interval),
            fetch_timeout: secs("FETCH_TIMEOUT_SECS", defaults.fetch_timeout),
            graphql_doc_id: lookup("GRAPHQL_DOC_ID")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.graphql_doc_id),
            log_level: lookup("LOG_LEVEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.log_level),
        }
    }
}
