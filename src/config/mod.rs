use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub mod defaults;
pub mod duration_serde;

use crate::errors::{ConfigError, ConfigResult};
use crate::models::{SourceDescriptor, SourceType};
use crate::utils::url::UrlUtils;
use defaults::*;

/// HTTP settings applied to every source fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout, no overall run deadline
    #[serde(default = "default_fetch_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// A source entry as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub source_type: Option<SourceType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Destination of the merged guide
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, with `EPG_MERGE_*` environment
    /// variables layered on top. A missing file is an error.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> ConfigResult<Self> {
        let path = config_file.as_ref();
        let path_display = path.display().to_string();

        if !path.exists() {
            return Err(ConfigError::NotFound { path: path_display });
        }

        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR));

        let config = Self::extract(figment, &path_display)?;
        info!("Configuration loaded from: {}", path_display);
        Ok(config)
    }

    /// Parse configuration from TOML text without touching the environment
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Self::extract(Figment::new().merge(Toml::string(contents)), "<inline>")
    }

    fn extract(figment: Figment, origin: &str) -> ConfigResult<Self> {
        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::load(origin, e))?;

        if config.fetch.timeout.is_zero() {
            return Err(ConfigError::invalid("fetch.timeout", "must be greater than zero"));
        }
        Ok(config)
    }

    /// Validated source list in configured order. Entries without a url are
    /// skipped with a warning.
    pub fn source_descriptors(&self) -> Vec<SourceDescriptor> {
        self.sources
            .iter()
            .enumerate()
            .filter_map(|(index, source)| {
                let url = match source.url.as_deref().map(str::trim) {
                    Some(url) if !url.is_empty() => url,
                    _ => {
                        warn!(
                            "Source #{} ({}) has no url, skipping",
                            index + 1,
                            source.name.as_deref().unwrap_or("unnamed")
                        );
                        return None;
                    }
                };

                if !UrlUtils::is_http_url(url) {
                    warn!(
                        "Source #{} url is not an http(s) URL and will likely fail to fetch: {}",
                        index + 1,
                        UrlUtils::obfuscate_credentials(url)
                    );
                }

                Some(SourceDescriptor {
                    url: url.to_string(),
                    name: source.name.clone().filter(|name| !name.trim().is_empty()),
                    source_type: source.source_type,
                })
            })
            .collect()
    }

    /// Output path, falling back to the default file name
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH))
    }
}
