use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Scoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    /// Cutoffs k at which hits are reported (strictly increasing).
    #[serde(default = "default_cutoffs")]
    pub cutoffs: Vec<usize>,
    /// Worker threads for record scoring; 0 lets rayon decide.
    #[serde(default)]
    pub threads: usize,
}

/// Memo table sizes for the date and amount matchers (0 disables a table)
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub date_capacity: usize,
    #[serde(default = "default_cache_capacity")]
    pub amount_capacity: usize,
}

fn default_cutoffs() -> Vec<usize> {
    vec![1, 5, 10, 50]
}

fn default_cache_capacity() -> usize {
    100_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            evaluation: EvaluationConfig::default(),
            cache: CacheConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            cutoffs: default_cutoffs(),
            threads: 0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            date_capacity: default_cache_capacity(),
            amount_capacity: default_cache_capacity(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// Loads environment variables from .env file (if present) first.
    /// Looks for the config file in this order:
    /// 1. Path specified in QAEVAL_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (optional)
    ///
    /// Falls back to built-in defaults when neither is present.
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        if let Ok(path) = std::env::var("QAEVAL_CONFIG") {
            return Self::load_from(Path::new(&path));
        }

        let local = PathBuf::from("config.toml");
        if local.is_file() {
            return Self::load_from(&local);
        }

        log::debug!("No config file found, using defaults");
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_cutoffs(&self.evaluation.cutoffs)
    }
}

/// Cutoffs must be non-empty, positive and strictly increasing.
pub fn validate_cutoffs(cutoffs: &[usize]) -> Result<()> {
    if cutoffs.is_empty() {
        anyhow::bail!("evaluation.cutoffs must not be empty");
    }
    if cutoffs.contains(&0) {
        anyhow::bail!("evaluation.cutoffs must be greater than 0");
    }
    if cutoffs.windows(2).any(|w| w[0] >= w[1]) {
        anyhow::bail!("evaluation.cutoffs must be strictly increasing, got {:?}", cutoffs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn with_config_env(config_path: &Path, f: impl FnOnce()) {
        let original = std::env::var("QAEVAL_CONFIG").ok();
        std::env::set_var("QAEVAL_CONFIG", config_path);
        f();
        std::env::remove_var("QAEVAL_CONFIG");
        if let Some(val) = original {
            std::env::set_var("QAEVAL_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
log_level = "debug"

[evaluation]
cutoffs = [1, 3, 20]
threads = 4

[cache]
date_capacity = 10
"#,
        )
        .unwrap();

        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.evaluation.cutoffs, vec![1, 3, 20]);
            assert_eq!(config.evaluation.threads, 4);
            assert_eq!(config.cache.date_capacity, 10);
            assert_eq!(config.cache.amount_capacity, 100_000);
        });
    }

    #[test]
    fn test_config_empty_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.evaluation.cutoffs, vec![1, 5, 10, 50]);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_rejects_unsorted_cutoffs() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[evaluation]\ncutoffs = [5, 1]\n").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn test_validate_cutoffs() {
        assert!(validate_cutoffs(&[1, 5, 10, 50]).is_ok());
        assert!(validate_cutoffs(&[]).is_err());
        assert!(validate_cutoffs(&[0, 1]).is_err());
        assert!(validate_cutoffs(&[1, 1]).is_err());
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(Path::new("nonexistent.toml"), || {
            let config = Config::load();
            assert!(config.is_err());
        });
    }
}
