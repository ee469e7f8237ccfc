use std::{env, fmt::Display, str::FromStr};

use anyhow::{Context, Result, anyhow};
use strum_macros::{Display as StrumDisplay, EnumString};
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StoreBackend {
    Mysql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    // Rate limiting
    pub rate_mark_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_default_per_min: u32,

    pub api_prefix: String,
    pub bulk_max_items: usize,

    pub log_dir: String,
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            database_url: None,
            store_backend: StoreBackend::Mysql,
            db_max_connections: 5,
            run_migrations: true,
            rate_mark_per_min: 600,
            rate_register_per_min: 120,
            rate_default_per_min: 1000,
            api_prefix: "/api".to_string(),
            bulk_max_items: 200,
            log_dir: "logs".to_string(),
            log_level: Level::DEBUG,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or(defaults.server_addr),
            database_url: env::var("DATABASE_URL").ok(),
            store_backend: parse_var("STORE_BACKEND", defaults.store_backend)?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            run_migrations: parse_var("RUN_MIGRATIONS", defaults.run_migrations)?,

            rate_mark_per_min: parse_var("RATE_MARK_PER_MIN", defaults.rate_mark_per_min)?,
            rate_register_per_min: parse_var(
                "RATE_REGISTER_PER_MIN",
                defaults.rate_register_per_min,
            )?,
            rate_default_per_min: parse_var("RATE_DEFAULT_PER_MIN", defaults.rate_default_per_min)?,

            api_prefix: env::var("API_PREFIX").unwrap_or(defaults.api_prefix),
            bulk_max_items: parse_var("BULK_MAX_ITEMS", defaults.bulk_max_items)?,

            log_dir: env::var("LOG_DIR").unwrap_or(defaults.log_dir),
            log_level: parse_var("LOG_LEVEL", defaults.log_level)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.store_backend == StoreBackend::Mysql && self.database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set for the mysql store backend"));
        }
        if self.bulk_max_items == 0 {
            return Err(anyhow!("BULK_MAX_ITEMS must be at least 1"));
        }
        if !self.api_prefix.starts_with('/') {
            return Err(anyhow!("API_PREFIX must start with '/'"));
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Invalid {} value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_need_a_database_url_for_mysql() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let memory = Config {
            store_backend: StoreBackend::Memory,
            ..Config::default()
        };
        assert!(memory.validate().is_ok());
    }

    #[test]
    fn backend_names_parse_lowercase() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("mysql".parse::<StoreBackend>().unwrap(), StoreBackend::Mysql);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn prefix_must_be_absolute() {
        let config = Config {
            store_backend: StoreBackend::Memory,
            api_prefix: "api".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
