//! Process configuration resolved from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `ROLLCALL_DB_PATH` | `<temp dir>/rollcall.sqlite3` |
//! | `ROLLCALL_LOG_LEVEL` | `debug` in debug builds, `info` in release |
//! | `ROLLCALL_LOG_DIR` | unset: file logging disabled |
//!
//! Blank values count as unset.

use rollcall_core::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "ROLLCALL_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "ROLLCALL_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "ROLLCALL_LOG_DIR";
const DEFAULT_DB_FILE_NAME: &str = "rollcall.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; used by `from_env` and tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        Self {
            db_path: value(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level: value(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: value(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiConfig, DB_PATH_ENV, LOG_DIR_ENV, LOG_LEVEL_ENV};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config(pairs: &[(&str, &str)]) -> ApiConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config(&[]);
        assert!(config.db_path.ends_with("rollcall.sqlite3"));
        assert_eq!(config.log_level, rollcall_core::default_log_level());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn blank_values_fall_back_and_set_values_are_trimmed() {
        let config = config(&[
            (DB_PATH_ENV, " /var/lib/rollcall/db.sqlite3 "),
            (LOG_LEVEL_ENV, "   "),
            (LOG_DIR_ENV, "/var/log/rollcall"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/var/lib/rollcall/db.sqlite3"));
        assert_eq!(config.log_level, rollcall_core::default_log_level());
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/rollcall")));
    }
}
