//! Startup configuration, read from the environment (and `.env` via dotenvy).

use std::net::SocketAddr;

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 3050;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Postgres URL. Without one the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        };

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DB_MAX_CONNECTIONS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let log_filter = lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.into());

        Ok(Config {
            database_url,
            bind_addr,
            max_connections,
            log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.bind_addr, "0.0.0.0:3050".parse().unwrap());
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn reads_all_keys() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/cycles"),
            ("BIND_ADDR", "127.0.0.1:9999"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/cycles"));
        assert_eq!(config.bind_addr.port(), 9999);
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn blank_database_url_means_memory() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let err = Config::from_lookup(lookup_from(&[("BIND_ADDR", "not-an-addr")])).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for BIND_ADDR: not-an-addr");

        assert!(Config::from_lookup(lookup_from(&[("DB_MAX_CONNECTIONS", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("DB_MAX_CONNECTIONS", "many")])).is_err());
    }
}
