/// Configuration for the admin tool
///
/// Loaded from environment variables, with a `.env` file picked up in
/// development.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `DATABASE_MIN_CONNECTIONS`: idle connections kept open (default: 2)
/// - `DATABASE_CONNECT_TIMEOUT_SECONDS`: acquire timeout (default: 30)
/// - `PASSWORD_MEMORY_KIB`: Argon2 memory cost (default: 65536)
/// - `PASSWORD_ITERATIONS`: Argon2 passes (default: 3)
/// - `PASSWORD_PARALLELISM`: Argon2 lanes (default: 4)
/// - `RUST_LOG`: log filter (default: `tenantry_admin=debug,tenantry_shared=debug`)

use anyhow::Context;
use std::{env, str::FromStr};
use tenantry_shared::{auth::password::PasswordConfig, db::pool::DatabaseConfig};

/// Complete tool configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection pool settings
    pub database: DatabaseConfig,

    /// Argon2 cost parameters for new password hashes
    pub password: PasswordConfig,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a numeric variable
    /// doesn't parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let pool_defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", pool_defaults.max_connections)?,
            min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", pool_defaults.min_connections)?,
            connect_timeout_seconds: parse_or(
                &lookup,
                "DATABASE_CONNECT_TIMEOUT_SECONDS",
                pool_defaults.connect_timeout_seconds,
            )?,
            ..pool_defaults
        };

        if database.min_connections > database.max_connections {
            anyhow::bail!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                database.min_connections,
                database.max_connections
            );
        }

        let password_defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parse_or(&lookup, "PASSWORD_MEMORY_KIB", password_defaults.memory_kib)?,
            iterations: parse_or(&lookup, "PASSWORD_ITERATIONS", password_defaults.iterations)?,
            parallelism: parse_or(&lookup, "PASSWORD_PARALLELISM", password_defaults.parallelism)?,
        };

        Ok(Self { database, password })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgresql://localhost/tenantry")]))
                .unwrap();

        assert_eq!(config.database.url, "postgresql://localhost/tenantry");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.database.connect_timeout_seconds, 30);
        assert_eq!(config.password, PasswordConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/tenantry"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("DATABASE_MIN_CONNECTIONS", "5"),
            ("PASSWORD_MEMORY_KIB", "19456"),
            ("PASSWORD_ITERATIONS", " 2 "),
            ("PASSWORD_PARALLELISM", "1"),
        ]))
        .unwrap();

        assert_eq!(config.database.max_connections, 25);
        assert_eq!(config.database.min_connections, 5);
        assert_eq!(config.password.memory_kib, 19456);
        assert_eq!(config.password.iterations, 2);
        assert_eq!(config.password.parallelism, 1);
    }

    #[test]
    fn test_database_url_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).is_err());
    }

    #[test]
    fn test_invalid_number() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/tenantry"),
            ("PASSWORD_ITERATIONS", "three"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PASSWORD_ITERATIONS"));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/tenantry"),
            ("DATABASE_MAX_CONNECTIONS", "2"),
            ("DATABASE_MIN_CONNECTIONS", "8"),
        ]));
        assert!(result.is_err());
    }
}
