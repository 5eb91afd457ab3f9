//! Configuration loading and resolution.
//!
//! Each setting resolves as: explicit value (CLI flag) > environment
//! variable > default.

use anyhow::{Context, Result};
use glue_crawl::{GlueMode, DEFAULT_TIMEOUT_MILLIS};
use serde::Serialize;
use std::path::PathBuf;

pub const ENV_DRIVER_PATH: &str = "GLUE_CRAWL_DRIVER_PATH";
pub const ENV_GLUE_MODE: &str = "GLUE_CRAWL_GLUE_MODE";
pub const ENV_TIMEOUT_MS: &str = "GLUE_CRAWL_TIMEOUT_MS";
pub const ENV_CACHE_CAPACITY: &str = "GLUE_CRAWL_CACHE_CAPACITY";
pub const ENV_OUTPUT: &str = "GLUE_CRAWL_OUTPUT";

/// Values given explicitly, usually from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub driver_path: Option<PathBuf>,
    pub glue_mode: Option<GlueMode>,
    pub timeout_millis: Option<u64>,
    pub cache_capacity: Option<usize>,
    pub output: Option<PathBuf>,
}

/// Resolved executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutorConfig {
    /// Browser binary; located automatically when `None`.
    pub driver_path: Option<PathBuf>,
    pub glue_mode: GlueMode,
    /// Page timeout for jobs that do not set one.
    pub timeout_millis: u64,
    /// Handler cache bound; `None` is unbounded.
    pub cache_capacity: Option<usize>,
    /// JSON-lines file registered as the `jsonl` sink.
    pub output: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            driver_path: None,
            glue_mode: GlueMode::Plain,
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            cache_capacity: None,
            output: None,
        }
    }
}

impl ExecutorConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with(
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let glue_mode = match overrides.glue_mode {
            Some(mode) => mode,
            None => match env(ENV_GLUE_MODE) {
                Some(v) => v
                    .parse()
                    .with_context(|| format!("invalid {ENV_GLUE_MODE}"))?,
                None => defaults.glue_mode,
            },
        };

        let timeout_millis = match overrides.timeout_millis {
            Some(ms) => ms,
            None => match env(ENV_TIMEOUT_MS) {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid {ENV_TIMEOUT_MS}: '{v}'"))?,
                None => defaults.timeout_millis,
            },
        };
        if timeout_millis == 0 {
            anyhow::bail!("timeout must be positive");
        }

        let cache_capacity = match overrides.cache_capacity {
            Some(n) => Some(n),
            None => env(ENV_CACHE_CAPACITY)
                .map(|v| {
                    v.trim()
                        .parse::<usize>()
                        .with_context(|| format!("invalid {ENV_CACHE_CAPACITY}: '{v}'"))
                })
                .transpose()?,
        }
        .filter(|n| *n > 0);

        Ok(Self {
            driver_path: overrides
                .driver_path
                .or_else(|| env(ENV_DRIVER_PATH).map(PathBuf::from)),
            glue_mode,
            timeout_millis,
            cache_capacity,
            output: overrides.output.or_else(|| env(ENV_OUTPUT).map(PathBuf::from)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::resolve_with(ConfigOverrides::default(), env(&[])).unwrap();
        assert_eq!(config, ExecutorConfig::default());
    }

    #[test]
    fn test_env_then_explicit() {
        let vars = env(&[
            (ENV_GLUE_MODE, "injected"),
            (ENV_TIMEOUT_MS, "8000"),
            (ENV_CACHE_CAPACITY, "64"),
            (ENV_DRIVER_PATH, "/usr/bin/chromium"),
        ]);
        let config = ExecutorConfig::resolve_with(ConfigOverrides::default(), &vars).unwrap();
        assert_eq!(config.glue_mode, GlueMode::Injected);
        assert_eq!(config.timeout_millis, 8000);
        assert_eq!(config.cache_capacity, Some(64));
        assert_eq!(config.driver_path, Some(PathBuf::from("/usr/bin/chromium")));

        let explicit = ConfigOverrides {
            glue_mode: Some(GlueMode::Plain),
            timeout_millis: Some(1000),
            cache_capacity: Some(0),
            ..Default::default()
        };
        let config = ExecutorConfig::resolve_with(explicit, &vars).unwrap();
        assert_eq!(config.glue_mode, GlueMode::Plain);
        assert_eq!(config.timeout_millis, 1000);
        assert_eq!(config.cache_capacity, None);
    }

    #[test]
    fn test_invalid_env_values() {
        assert!(
            ExecutorConfig::resolve_with(ConfigOverrides::default(), env(&[(ENV_GLUE_MODE, "spring")]))
                .is_err()
        );
        assert!(
            ExecutorConfig::resolve_with(ConfigOverrides::default(), env(&[(ENV_TIMEOUT_MS, "soon")]))
                .is_err()
        );
        assert!(
            ExecutorConfig::resolve_with(ConfigOverrides::default(), env(&[(ENV_TIMEOUT_MS, "0")]))
                .is_err()
        );
    }
}
