//! A complete merge run
//!
//! [`RunPlan::load`] does everything that can end a run before any network
//! traffic: loading the config, applying overrides, checking that sources
//! remain and reading the remap table. [`RunPlan::execute`] then merges and
//! writes the guide. Per-source failures never surface here.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{Config, FetchConfig};
use crate::data_mapping::RemapTable;
use crate::errors::{AppError, ConfigError};
use crate::generator;
use crate::models::{MergeStatistics, SourceDescriptor};
use crate::pipeline::MergeEngine;
use crate::utils::{HttpFetcher, SourceFetcher};

/// Paths and overrides resolved from the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub mapping_path: PathBuf,
    /// Replaces the config file's output path
    pub output: Option<PathBuf>,
    /// Replaces the config file's fetch timeout
    pub timeout: Option<Duration>,
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub bytes_written: u64,
    pub stats: MergeStatistics,
}

/// Validated inputs of a run
#[derive(Debug)]
pub struct RunPlan {
    pub fetch: FetchConfig,
    pub sources: Vec<SourceDescriptor>,
    pub table: RemapTable,
    pub output: PathBuf,
}

impl RunPlan {
    /// Errors are [`AppError`]s: a missing or invalid config, a zero timeout
    /// override, no usable sources, or an unreadable mapping file.
    pub fn load(options: &RunOptions) -> Result<Self, AppError> {
        let mut config = Config::load_from_file(&options.config_path)?;

        if let Some(timeout) = options.timeout {
            if timeout.is_zero() {
                return Err(ConfigError::invalid("--timeout", "must be greater than zero").into());
            }
            config.fetch.timeout = timeout;
        }
        let output = options
            .output
            .clone()
            .unwrap_or_else(|| config.output_path());

        let sources = config.source_descriptors();
        if sources.is_empty() {
            return Err(AppError::NoSources {
                path: options.config_path.display().to_string(),
            });
        }

        let table = RemapTable::load_from_file(&options.mapping_path)?;

        Ok(Self {
            fetch: config.fetch,
            sources,
            table,
            output,
        })
    }

    /// Merge every source through `fetcher` and write the guide
    pub async fn execute(self, fetcher: Box<dyn SourceFetcher>) -> Result<RunReport> {
        info!(
            "Merging {} sources (timeout={})",
            self.sources.len(),
            humantime::format_duration(self.fetch.timeout)
        );

        let engine = MergeEngine::new(fetcher);
        let (document, stats) = engine.merge(&self.sources, &self.table).await;

        if stats.sources_merged == 0 {
            warn!("No source could be merged, writing an empty guide");
        }
        if stats.programmes_dropped_incomplete > 0 {
            info!(
                "Dropped {} incomplete programme entries",
                stats.programmes_dropped_incomplete
            );
        }

        let bytes_written =
            generator::write_to_path(&document, &self.output).map_err(AppError::from)?;
        info!(
            "Merged XMLTV saved to {} ({} sources skipped)",
            self.output.display(),
            stats.sources_skipped
        );

        Ok(RunReport {
            output: self.output,
            bytes_written,
            stats,
        })
    }
}

/// Load, merge over HTTP, and write the guide
pub async fn run(options: &RunOptions) -> Result<RunReport> {
    let plan = RunPlan::load(options)?;
    let fetcher = HttpFetcher::new(&plan.fetch).context("Failed to set up source fetching")?;
    plan.execute(Box::new(fetcher)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Records requested urls and answers every one with the same body
    #[derive(Default)]
    struct CountingFetcher {
        requested: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SourceFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(Bytes::from_static(br#"<tv><channel id="x"/></tv>"#))
        }
    }

    fn options(dir: &Path, config: &str) -> RunOptions {
        let config_path = dir.join("config.toml");
        std::fs::write(&config_path, config).unwrap();
        RunOptions {
            config_path,
            mapping_path: dir.join("channel_mappings.toml"),
            output: Some(dir.join("epg.xml")),
            timeout: None,
        }
    }

    const ONE_SOURCE: &str = r#"
[[sources]]
url = "http://guide.example/a.xml"
"#;

    #[test]
    fn test_zero_timeout_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            timeout: Some(Duration::ZERO),
            ..options(dir.path(), ONE_SOURCE)
        };

        let result = RunPlan::load(&options);
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            timeout: Some(Duration::from_secs(7)),
            ..options(
                dir.path(),
                &format!("output = \"elsewhere.xml\"\n{ONE_SOURCE}"),
            )
        };

        let plan = RunPlan::load(&options).unwrap();
        assert_eq!(plan.fetch.timeout, Duration::from_secs(7));
        assert_eq!(plan.output, dir.path().join("epg.xml"));
        assert!(plan.table.is_empty());
    }

    #[test]
    fn test_config_output_is_used_without_override() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            output: None,
            ..options(
                dir.path(),
                &format!("output = \"elsewhere.xml\"\n{ONE_SOURCE}"),
            )
        };

        let plan = RunPlan::load(&options).unwrap();
        assert_eq!(plan.output, PathBuf::from("elsewhere.xml"));
    }

    #[test]
    fn test_no_sources_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), "[[sources]]\nname = \"no url\"\n");

        let result = RunPlan::load(&options);
        assert!(matches!(result, Err(AppError::NoSources { .. })));
        assert!(!dir.path().join("epg.xml").exists());
    }

    #[tokio::test]
    async fn test_execute_writes_guide_through_given_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        let plan = RunPlan::load(&options(dir.path(), ONE_SOURCE)).unwrap();
        let fetcher = CountingFetcher::default();
        let requested = fetcher.requested.clone();

        let report = plan.execute(Box::new(fetcher)).await.unwrap();

        assert_eq!(*requested.lock().unwrap(), ["http://guide.example/a.xml"]);
        assert_eq!(report.stats.sources_merged, 1);
        let written = std::fs::read_to_string(dir.path().join("epg.xml")).unwrap();
        assert_eq!(written.len() as u64, report.bytes_written);
        assert!(written.contains(r#"<channel id="x">"#));
    }
}
