use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "REDDITMOD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Origin that page-tier requests are restricted to.
    #[serde(default = "default_page_origin")]
    pub page_origin: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            page_origin: default_page_origin(),
        }
    }
}

fn default_user_agent() -> String {
    format!("redditmod/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_page_origin() -> String {
    "https://www.reddit.com".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionConfig {
    #[serde(default = "default_extraction_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_extraction_endpoint(),
            api_key: String::new(),
        }
    }
}

fn default_extraction_endpoint() -> String {
    "https://mercury.postlight.com/parser".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginationConfig {
    #[serde(default = "default_threshold_px")]
    pub threshold_px: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            threshold_px: default_threshold_px(),
        }
    }
}

fn default_threshold_px() -> u32 {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.fetch.user_agent.is_empty() {
        base.fetch.user_agent = other.fetch.user_agent;
    }
    if !other.fetch.timeout.is_zero() {
        base.fetch.timeout = other.fetch.timeout;
    }
    if !other.fetch.page_origin.is_empty() {
        base.fetch.page_origin = other.fetch.page_origin;
    }

    if !other.extraction.endpoint.is_empty() {
        base.extraction.endpoint = other.extraction.endpoint;
    }
    if !other.extraction.api_key.is_empty() {
        base.extraction.api_key = other.extraction.api_key;
    }

    if other.media.workers != 0 {
        base.media.workers = other.media.workers;
    }
    if other.pagination.threshold_px != 0 {
        base.pagination.threshold_px = other.pagination.threshold_px;
    }
    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    base
}

/// Overlays `PREFIX_SECTION__KEY` variables directly onto `cfg`.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "fetch.user_agent" => cfg.fetch.user_agent = value,
        "fetch.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.fetch.timeout = duration;
            }
        }
        "fetch.page_origin" => cfg.fetch.page_origin = value,
        "extraction.endpoint" => cfg.extraction.endpoint = value,
        "extraction.api_key" => cfg.extraction.api_key = value,
        "media.workers" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.media.workers = parsed;
            }
        }
        "pagination.threshold_px" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.pagination.threshold_px = parsed;
            }
        }
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("redditmod").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("REDDITMOD_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.pagination.threshold_px, 200);
        assert_eq!(cfg.media.workers, 2);
        assert_eq!(cfg.extraction.endpoint, default_extraction_endpoint());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "fetch:\n  timeout: 5s\nextraction:\n  api_key: secret\npagination:\n  threshold_px: 350\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("REDDITMOD_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.fetch.timeout, Duration::from_secs(5));
        assert_eq!(cfg.extraction.api_key, "secret");
        assert_eq!(cfg.pagination.threshold_px, 350);
        assert_eq!(cfg.fetch.page_origin, default_page_origin());
    }

    #[test]
    fn env_overrides() {
        env::set_var("REDDITMOD_TEST_ENV_MEDIA__WORKERS", "5");
        env::set_var("REDDITMOD_TEST_ENV_FETCH__TIMEOUT", "3s");
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("REDDITMOD_TEST_ENV".into()),
        })
        .unwrap();
        assert_eq!(cfg.media.workers, 5);
        assert_eq!(cfg.fetch.timeout, Duration::from_secs(3));
        env::remove_var("REDDITMOD_TEST_ENV_MEDIA__WORKERS");
        env::remove_var("REDDITMOD_TEST_ENV_FETCH__TIMEOUT");
    }
}
