//! Runtime configuration for the tracker CLI.
//!
//! Values come from the environment (a `.env` file is loaded first) and can
//! be overridden per-subcommand on the command line.

use anyhow::{Context, Result};
use std::time::Duration;

use amana_transit::poller::DEFAULT_REFRESH_INTERVAL;

pub const DEFAULT_API_URL: &str =
    "https://www.amanabootcamp.org/api/fs-classwork-data/amana-transportation";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub api_url: String,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TrackerConfig {
    /// Reads `AMANA_API_URL`, `AMANA_REFRESH_SECS` and `AMANA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("AMANA_API_URL") {
            config.api_url = url;
        }
        if let Some(secs) = lookup("AMANA_REFRESH_SECS") {
            config.refresh_interval = parse_secs("AMANA_REFRESH_SECS", &secs)?;
        }
        if let Some(secs) = lookup("AMANA_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("AMANA_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got {value:?}"))?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = TrackerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = TrackerConfig::from_lookup(lookup(&[
            ("AMANA_API_URL", "http://localhost:8080/transit"),
            ("AMANA_REFRESH_SECS", "5"),
            ("AMANA_TIMEOUT_SECS", " 12 "),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:8080/transit");
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_rejects_bad_seconds() {
        assert!(TrackerConfig::from_lookup(lookup(&[("AMANA_REFRESH_SECS", "soon")])).is_err());
        assert!(TrackerConfig::from_lookup(lookup(&[("AMANA_TIMEOUT_SECS", "0")])).is_err());
    }
}
