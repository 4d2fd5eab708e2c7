//! Environment-driven configuration.
//!
//! # Responsibility
//! - Collect runtime knobs (store location, logging, paging, copy naming).
//! - Provide deterministic defaults when variables are missing or invalid.
//!
//! # Invariants
//! - Loading never fails; malformed values fall back to defaults.
//! - Numeric limits are always positive.

use crate::logging::default_log_level;
use std::env;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "CATALOG_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CATALOG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CATALOG_LOG_DIR";
pub const ENV_TREE_PAGE_SIZE: &str = "CATALOG_TREE_PAGE_SIZE";
pub const ENV_SIBLING_PAGE_SIZE: &str = "CATALOG_SIBLING_PAGE_SIZE";
pub const ENV_COPY_NAME_ATTEMPTS: &str = "CATALOG_COPY_NAME_ATTEMPTS";

const DEFAULT_TREE_PAGE_SIZE: u32 = 100;
const DEFAULT_SIBLING_PAGE_SIZE: u32 = 200;
const DEFAULT_COPY_NAME_ATTEMPTS: u32 = 50;

/// Numeric limits consumed by `CategoryService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLimits {
    /// Page size for tree and trash aggregation.
    pub tree_page_size: u32,
    /// Page size for root-level sibling scans.
    pub sibling_page_size: u32,
    /// Number of `(copy N)` suffixes tried before giving up.
    pub copy_name_attempts: u32,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            tree_page_size: DEFAULT_TREE_PAGE_SIZE,
            sibling_page_size: DEFAULT_SIBLING_PAGE_SIZE,
            copy_name_attempts: DEFAULT_COPY_NAME_ATTEMPTS,
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// SQLite file for the embedded node store. `None` means in-memory.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling logs. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub limits: ServiceLimits,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            limits: ServiceLimits::default(),
        }
    }
}

impl CatalogConfig {
    /// Loads configuration from process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            db_path: non_empty(lookup(ENV_DB_PATH)).map(PathBuf::from),
            log_level: non_empty(lookup(ENV_LOG_LEVEL)).unwrap_or(defaults.log_level),
            log_dir: non_empty(lookup(ENV_LOG_DIR)).map(PathBuf::from),
            limits: ServiceLimits {
                tree_page_size: parse_positive(
                    lookup(ENV_TREE_PAGE_SIZE),
                    defaults.limits.tree_page_size,
                ),
                sibling_page_size: parse_positive(
                    lookup(ENV_SIBLING_PAGE_SIZE),
                    defaults.limits.sibling_page_size,
                ),
                copy_name_attempts: parse_positive(
                    lookup(ENV_COPY_NAME_ATTEMPTS),
                    defaults.limits.copy_name_attempts,
                ),
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_positive(value: Option<String>, default_value: u32) -> u32 {
    non_empty(value)
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|parsed| *parsed > 0)
        .unwrap_or(default_value)
}

#[cfg(test)]
mod tests {
    use super::{
        CatalogConfig, ServiceLimits, ENV_COPY_NAME_ATTEMPTS, ENV_DB_PATH, ENV_SIBLING_PAGE_SIZE,
        ENV_TREE_PAGE_SIZE,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(pairs: &[(&str, &str)]) -> CatalogConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CatalogConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_variables_use_defaults() {
        let config = load(&[]);
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.limits, ServiceLimits::default());
        assert_eq!(config.limits.copy_name_attempts, 50);
    }

    #[test]
    fn valid_values_override_defaults() {
        let config = load(&[
            (ENV_DB_PATH, "/tmp/catalog.db"),
            (ENV_TREE_PAGE_SIZE, "25"),
            (ENV_SIBLING_PAGE_SIZE, " 7 "),
            (ENV_COPY_NAME_ATTEMPTS, "3"),
        ]);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/catalog.db")));
        assert_eq!(config.limits.tree_page_size, 25);
        assert_eq!(config.limits.sibling_page_size, 7);
        assert_eq!(config.limits.copy_name_attempts, 3);
    }

    #[test]
    fn malformed_or_zero_values_fall_back() {
        let config = load(&[
            (ENV_DB_PATH, "   "),
            (ENV_TREE_PAGE_SIZE, "0"),
            (ENV_SIBLING_PAGE_SIZE, "many"),
        ]);
        assert_eq!(config.db_path, None);
        assert_eq!(config.limits, ServiceLimits::default());
    }
}
