// Store configuration
// Defaults to the platform data directory, overridable from the environment

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Overrides the database file location
pub const DB_PATH_ENV: &str = "WALLFLOW_DB_PATH";

/// Overrides how many search history entries are kept
pub const HISTORY_LIMIT_ENV: &str = "WALLFLOW_HISTORY_LIMIT";

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub history_limit: usize,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Load the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(DB_PATH_ENV).filter(|p| !p.is_empty()) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(limit) = lookup(HISTORY_LIMIT_ENV) {
            config.history_limit = limit
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {:?}", HISTORY_LIMIT_ENV, limit))?;
            if config.history_limit == 0 {
                anyhow::bail!("{} must be at least 1", HISTORY_LIMIT_ENV);
            }
        }

        Ok(config)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wallflow");

        Self::new(data_dir.join("wallflow.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert!(config.db_path.ends_with("wallflow/wallflow.db"));
    }

    #[test]
    fn test_env_overrides() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            (DB_PATH_ENV, "/tmp/store.db"),
            (HISTORY_LIMIT_ENV, "10"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/store.db"));
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn test_invalid_history_limit() {
        let result = StoreConfig::from_lookup(lookup_from(&[(HISTORY_LIMIT_ENV, "lots")]));
        assert!(result.is_err());

        let result = StoreConfig::from_lookup(lookup_from(&[(HISTORY_LIMIT_ENV, "0")]));
        assert!(result.is_err());
    }
}
