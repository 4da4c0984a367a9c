use std::path::PathBuf;

use crate::db::Database;

/// Runtime configuration. Values come from the environment (and an optional
/// `.env` file); command-line flags override them in `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    /// `None` means use the bundled dataset.
    pub jobs_path: Option<PathBuf>,
    pub log_level: String,
}

impl Config {
    pub fn load() -> Self {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Config {
            db_path: get("JOBTRACK_DB")
                .map(PathBuf::from)
                .unwrap_or_else(Database::default_path),
            jobs_path: get("JOBTRACK_JOBS").map(PathBuf::from),
            log_level: get("JOBTRACK_LOG").unwrap_or_else(|| "warn".to_string()),
        }
    }

    pub fn with_overrides(mut self, db: Option<PathBuf>, jobs: Option<PathBuf>) -> Self {
        if let Some(db) = db {
            self.db_path = db;
        }
        if let Some(jobs) = jobs {
            self.jobs_path = Some(jobs);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.db_path, Database::default_path());
        assert!(config.jobs_path.is_none());
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_env_values() {
        let config = config_from(&[
            ("JOBTRACK_DB", "/tmp/jt.db"),
            ("JOBTRACK_JOBS", "/tmp/jobs.json"),
            ("JOBTRACK_LOG", "debug"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/tmp/jt.db"));
        assert_eq!(config.jobs_path, Some(PathBuf::from("/tmp/jobs.json")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let config = config_from(&[("JOBTRACK_JOBS", "  "), ("JOBTRACK_LOG", "")]);
        assert!(config.jobs_path.is_none());
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_flags_override_env() {
        let config = config_from(&[("JOBTRACK_DB", "/tmp/env.db")])
            .with_overrides(Some(PathBuf::from("/tmp/flag.db")), None);
        assert_eq!(config.db_path, PathBuf::from("/tmp/flag.db"));
        assert!(config.jobs_path.is_none());
    }
}
