use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::client::ClientConfig;
use crate::error::{Result, WikiError};
use crate::retry::RetryPolicy;

/// Server settings plus the wiki client configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub client: ClientConfig,
    /// Verbose logging for this crate when no `RUST_LOG` is set.
    pub debug: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let ip = IpAddr::from_str(&host)
            .map_err(|e| WikiError::Config(format!("Invalid host address: {}", e)))?;
        let port: u16 = parse_var(&lookup, "PORT")?.unwrap_or(3000);

        let defaults = ClientConfig::default();
        let mut client = defaults.clone();

        if let Some(api_url) = lookup("WIKI_API_URL") {
            client = client.with_api_url(api_url);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "WIKI_TIMEOUT_SECS")? {
            client = client.with_timeout(Duration::from_secs(secs));
        }

        let ttl = parse_var::<u64, _>(&lookup, "WIKI_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);
        let max_size =
            parse_var(&lookup, "WIKI_CACHE_MAX_SIZE")?.unwrap_or(defaults.cache_max_size);
        client = client.with_cache(ttl, max_size);

        if let Some(rate) = parse_var::<f64, _>(&lookup, "WIKI_RATE_LIMIT")? {
            client = client.with_rate_limit(rate);
        }
        if let Some(max_retries) = parse_var::<u32, _>(&lookup, "WIKI_MAX_RETRIES")? {
            let retry = RetryPolicy { max_retries, ..defaults.retry };
            client = client.with_retry(retry);
        }

        let debug = lookup("WIKI_DEBUG").is_some_and(|v| v.eq_ignore_ascii_case("true"));

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            client,
            debug,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| WikiError::Config(format!("Invalid {}: {}", key, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = config(&[]).unwrap();
        assert_eq!(config.server_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.client.cache_max_size, 100);
        assert_eq!(config.client.retry.max_retries, 3);
        assert!(!config.debug);
    }

    #[test]
    fn overrides_from_env() {
        let config = config(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("WIKI_API_URL", "http://localhost:9000/api.php"),
            ("WIKI_CACHE_TTL_SECS", "60"),
            ("WIKI_CACHE_MAX_SIZE", "5"),
            ("WIKI_RATE_LIMIT", "2.5"),
            ("WIKI_MAX_RETRIES", "5"),
            ("WIKI_TIMEOUT_SECS", "3"),
            ("WIKI_DEBUG", "TRUE"),
        ])
        .unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.client.api_url, "http://localhost:9000/api.php");
        assert_eq!(config.client.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.client.cache_max_size, 5);
        assert_eq!(config.client.requests_per_second, 2.5);
        assert_eq!(config.client.retry.max_retries, 5);
        assert_eq!(config.client.retry.initial_delay, Duration::from_secs(1));
        assert_eq!(config.client.timeout, Duration::from_secs(3));
        assert!(config.debug);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let err = config(&[("PORT", "not-a-port")]).unwrap_err();
        assert!(matches!(err, WikiError::Config(msg) if msg.contains("PORT")));

        let err = config(&[("HOST", "localhost:80")]).unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
