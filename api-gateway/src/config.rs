//! Gateway configuration read from the environment.
//!
//! | Env var                    | Default         |
//! |----------------------------|-----------------|
//! | `GATEWAY_ADDR`             | `0.0.0.0:8080`  |
//! | `STORE_BACKEND`            | `postgres`      |
//! | `DATABASE_MAX_CONNECTIONS` | `10`            |
//! | `RUN_MIGRATIONS`           | `true`          |
//! | `PERSIST_FAULTS`           | `true`          |
//! | `BWS_DATABASE_URL_ID`      | `database-url`  |
//!
//! `DATABASE_URL` itself goes through [`crate::secrets`].

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: expected {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local store for development; nothing survives a restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub backend: StoreBackend,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub persist_faults: bool,
    /// Bitwarden secret id holding the database URL.
    pub database_secret_id: String,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("STORE_BACKEND") {
            Some(raw) => raw.parse::<StoreBackend>().map_err(|()| ConfigError::Invalid {
                var: "STORE_BACKEND",
                value: raw,
                expected: "postgres or memory",
            })?,
            None => StoreBackend::Postgres,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DATABASE_MAX_CONNECTIONS",
                        value: raw,
                        expected: "a positive integer",
                    })
                }
            },
            None => 10,
        };

        Ok(Self {
            bind_addr: get("GATEWAY_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            backend,
            database_max_connections,
            run_migrations: flag(get("RUN_MIGRATIONS"), "RUN_MIGRATIONS", true)?,
            persist_faults: flag(get("PERSIST_FAULTS"), "PERSIST_FAULTS", true)?,
            database_secret_id: get("BWS_DATABASE_URL_ID")
                .unwrap_or_else(|| "database-url".to_string()),
        })
    }
}

fn flag(raw: Option<String>, var: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw,
            expected: "a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.backend, StoreBackend::Postgres);
        assert_eq!(cfg.database_max_connections, 10);
        assert!(cfg.run_migrations);
        assert!(cfg.persist_faults);
        assert_eq!(cfg.database_secret_id, "database-url");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = config(&[
            ("GATEWAY_ADDR", "127.0.0.1:9000"),
            ("STORE_BACKEND", "Memory"),
            ("DATABASE_MAX_CONNECTIONS", "3"),
            ("RUN_MIGRATIONS", "no"),
            ("PERSIST_FAULTS", "0"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.backend, StoreBackend::Memory);
        assert_eq!(cfg.database_max_connections, 3);
        assert!(!cfg.run_migrations);
        assert!(!cfg.persist_faults);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("STORE_BACKEND", "  "), ("RUN_MIGRATIONS", "")]).unwrap();
        assert_eq!(cfg.backend, StoreBackend::Postgres);
        assert!(cfg.run_migrations);
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = config(&[("DATABASE_MAX_CONNECTIONS", "many")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));

        assert!(config(&[("DATABASE_MAX_CONNECTIONS", "0")]).is_err());
        assert!(config(&[("STORE_BACKEND", "mongo")]).is_err());
        assert!(config(&[("PERSIST_FAULTS", "maybe")]).is_err());
    }
}
