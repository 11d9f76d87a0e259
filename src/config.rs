use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::SckanError;
use crate::sparql::DEFAULT_ENDPOINT;

pub const DEFAULT_CONFIG_FILE: &str = "sckan-compare.json";
pub const DEFAULT_MAX_CACHE_DAYS: u32 = 7;
pub const DEFAULT_ASSET_DIR: &str = "assets";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub max_cache_days: Option<u32>,
    #[serde(default)]
    pub asset_dir: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub endpoint: String,
    pub cache_dir: Utf8PathBuf,
    pub max_cache_days: u32,
    pub asset_dir: Utf8PathBuf,
    pub request_timeout: Option<Duration>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `sckan-compare.json` in the working directory when it
    /// exists; otherwise falls back to defaults.
    pub fn load(path: Option<&str>) -> Result<Config, SckanError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| SckanError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| SckanError::ConfigParse(err.to_string()))
    }

    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SckanError> {
        Self::resolve_config(Self::load(path)?)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SckanError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let endpoint = config
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(SckanError::InvalidArgument(format!(
                "endpoint must be an http(s) URL: {endpoint}"
            )));
        }

        let cache_dir = match config.cache_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_cache_dir()?,
        };

        Ok(ResolvedConfig {
            schema_version,
            endpoint,
            cache_dir,
            max_cache_days: config.max_cache_days.unwrap_or(DEFAULT_MAX_CACHE_DAYS),
            asset_dir: Utf8PathBuf::from(
                config
                    .asset_dir
                    .unwrap_or_else(|| DEFAULT_ASSET_DIR.to_string()),
            ),
            request_timeout: config.request_timeout_secs.map(Duration::from_secs),
        })
    }
}

pub fn default_cache_dir() -> Result<Utf8PathBuf, SckanError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("sckan-compare")).ok()
        })
        .ok_or_else(|| SckanError::Storage("unable to resolve cache directory".to_string()))
}
