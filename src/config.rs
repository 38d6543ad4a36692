use std::env;
use std::path::PathBuf;

pub const CATALOG_PATH_ENV: &str = "SPEC_CATALOG_PATH";
pub const CLASSIFIER_RULES_PATH_ENV: &str = "CLASSIFIER_RULES_PATH";
pub const LOG_DIR_ENV: &str = "LOG_DIR";

pub const DEFAULT_CATALOG_PATH: &str = "specs/spec_catalog.json";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Process-level settings, read from the environment once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub catalog_path: PathBuf,
    /// Replaces the built-in classifier rules when set.
    pub classifier_rules_path: Option<PathBuf>,
    pub log_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            classifier_rules_path: None,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Self {
            catalog_path: non_empty(CATALOG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_path),
            classifier_rules_path: non_empty(CLASSIFIER_RULES_PATH_ENV).map(PathBuf::from),
            log_dir: non_empty(LOG_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(|_| None);
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_reads_overrides() {
        let vars: HashMap<&str, &str> = [
            (CATALOG_PATH_ENV, "/etc/specharvest/catalog.json"),
            (CLASSIFIER_RULES_PATH_ENV, "rules.json"),
            (LOG_DIR_ENV, "  "),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.catalog_path, PathBuf::from("/etc/specharvest/catalog.json"));
        assert_eq!(config.classifier_rules_path, Some(PathBuf::from("rules.json")));
        assert_eq!(config.log_dir, PathBuf::from(DEFAULT_LOG_DIR));
    }
}
