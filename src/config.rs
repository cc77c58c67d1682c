// ⚙️ Configuration - database path, environment name, policy constants
//
// Only the database path and the environment name come from the process
// environment. Windows and banking thresholds are constants with a home here
// so no call site hardcodes them.

use crate::error::{Error, Result};
use crate::freshness::FreshnessPolicy;
use std::path::PathBuf;
use std::str::FromStr;

pub const DATABASE_PATH_VAR: &str = "DOG_WALKER_DB";
pub const ENVIRONMENT_VAR: &str = "DOG_WALKER_ENV";

pub const DEFAULT_DATABASE_PATH: &str = "db/dog_walker.db";
pub const DEFAULT_MAIN_BANK_THRESHOLD: f64 = 30_000.0;
pub const DEFAULT_HOME_COUNTRY: &str = "USA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(Error::parse(
                "environment",
                input,
                "expected development, test or production",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BankingPolicy {
    /// A bank is a "main bank" once a user's summed balance there exceeds this
    pub main_bank_threshold: f64,

    /// Funds at banks outside this country count as international
    pub home_country: String,
}

impl Default for BankingPolicy {
    fn default() -> Self {
        BankingPolicy {
            main_bank_threshold: DEFAULT_MAIN_BANK_THRESHOLD,
            home_country: DEFAULT_HOME_COUNTRY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub environment: Environment,
    pub freshness: FreshnessPolicy,
    pub banking: BankingPolicy,
}

impl Config {
    /// Read `DOG_WALKER_DB` and `DOG_WALKER_ENV`, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup(DATABASE_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }

        if let Some(env) = lookup(ENVIRONMENT_VAR) {
            config.environment = env.parse()?;
        }

        Ok(config)
    }

    /// Default `tracing` filter for this environment (overridden by `RUST_LOG`)
    pub fn default_log_filter(&self) -> &'static str {
        if self.environment.is_development() {
            "dog_walker=debug"
        } else {
            "dog_walker=info"
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            environment: Environment::Development,
            freshness: FreshnessPolicy::default(),
            banking: BankingPolicy::default(),
        }
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
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();

        assert_eq!(config.database_path, PathBuf::from("db/dog_walker.db"));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.banking.main_bank_threshold, 30_000.0);
        assert_eq!(config.banking.home_country, "USA");
        assert_eq!(config.default_log_filter(), "dog_walker=debug");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DOG_WALKER_DB", "/tmp/kennel.db"),
            ("DOG_WALKER_ENV", "Production"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/kennel.db"));
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.default_log_filter(), "dog_walker=info");
    }

    #[test]
    fn test_blank_path_keeps_default() {
        let config = Config::from_lookup(lookup_from(&[("DOG_WALKER_DB", "  ")])).unwrap();
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
    }

    #[test]
    fn test_unknown_environment_is_a_parse_error() {
        let result = Config::from_lookup(lookup_from(&[("DOG_WALKER_ENV", "staging")]));
        assert!(matches!(result, Err(Error::Parse { what: "environment", .. })));
    }
}
