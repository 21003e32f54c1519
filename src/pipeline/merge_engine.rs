//! Sequential merge of every configured source into one document
//!
//! Sources are processed one at a time in configured order. Each goes through
//! fetch, decompress, format detection and normalization; a failure at any
//! stage skips that source only. Channels are deduplicated on their remapped
//! id with the first source to declare an id winning. Programmes are appended
//! as they arrive and never deduplicated.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::data_mapping::RemapTable;
use crate::errors::{SourceError, SourceResult};
use crate::ingestor;
use crate::models::{
    MergeStatistics, MergedDocument, NormalizedSource, SourceDescriptor, SourceSummary, SourceType,
};
use crate::pipeline::observer::{MergeObserver, TracingObserver};
use crate::utils::{DecompressionService, SourceFetcher, detect};

pub struct MergeEngine {
    fetcher: Box<dyn SourceFetcher>,
    observer: Arc<dyn MergeObserver>,
}

impl MergeEngine {
    /// Engine reporting through [`TracingObserver`]
    pub fn new(fetcher: Box<dyn SourceFetcher>) -> Self {
        Self {
            fetcher,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn MergeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Merge `sources` in order. Never fails: sources that cannot be
    /// processed are reported to the observer and left out.
    pub async fn merge(
        &self,
        sources: &[SourceDescriptor],
        table: &RemapTable,
    ) -> (MergedDocument, MergeStatistics) {
        let started = Instant::now();
        let mut document = MergedDocument::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut stats = MergeStatistics {
            sources_total: sources.len(),
            ..MergeStatistics::default()
        };

        for source in sources {
            self.observer.source_started(source);

            let (format, normalized) = match self.process_source(source, table).await {
                Ok(processed) => processed,
                Err(e) => {
                    self.observer.source_skipped(source, &e);
                    stats.sources_skipped += 1;
                    continue;
                }
            };

            for remap in &normalized.remapped {
                self.observer.channel_remapped(source, &remap.from, &remap.to);
            }

            let mut summary = SourceSummary {
                format,
                channels_added: 0,
                channels_discarded: 0,
                programmes_added: normalized.programmes.len(),
            };

            for channel in normalized.channels {
                if seen.contains(&channel.id) {
                    self.observer.duplicate_channel(source, &channel.id);
                    summary.channels_discarded += 1;
                    continue;
                }
                seen.insert(channel.id.clone());
                document.push_channel(channel);
                summary.channels_added += 1;
            }

            for programme in normalized.programmes {
                document.push_programme(programme);
            }

            stats.sources_merged += 1;
            stats.channels_merged += summary.channels_added;
            stats.channels_discarded_duplicate += summary.channels_discarded;
            stats.programmes_merged += summary.programmes_added;
            stats.programmes_dropped_incomplete += normalized.dropped_programmes;
            self.observer.source_merged(source, &summary);
        }

        stats.duration = started.elapsed();
        info!(
            "Merge completed: sources={}/{} channels={} programmes={} duration={}",
            stats.sources_merged,
            stats.sources_total,
            stats.channels_merged,
            stats.programmes_merged,
            humantime::format_duration(stats.duration)
        );
        (document, stats)
    }

    /// Fetch, decompress, detect and normalize a single source
    async fn process_source(
        &self,
        source: &SourceDescriptor,
        table: &RemapTable,
    ) -> SourceResult<(SourceType, NormalizedSource)> {
        let raw = self.fetcher.fetch(&source.url).await?;
        let data = DecompressionService::maybe_decompress(raw)?;
        let format = detect(&data, source.source_type)
            .source_type()
            .ok_or(SourceError::UnknownFormat)?;
        let normalized = ingestor::normalize(&data, format, table)?;
        Ok((format, normalized))
    }
}
