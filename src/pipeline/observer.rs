//! Merge progress reporting
//!
//! The merge engine never logs directly. It reports what happens to each
//! source through a [`MergeObserver`], so the CLI can log through `tracing`
//! while tests record events or discard them.

use tracing::{debug, info, warn};

use crate::errors::SourceError;
use crate::models::{SourceDescriptor, SourceSummary};

/// Receives per-source merge events in the order they happen
pub trait MergeObserver: Send + Sync {
    /// Processing of `source` is about to begin
    fn source_started(&self, source: &SourceDescriptor);

    /// `source` failed at some stage and contributed nothing
    fn source_skipped(&self, source: &SourceDescriptor, reason: &SourceError);

    /// `source` was merged into the document
    fn source_merged(&self, source: &SourceDescriptor, summary: &SourceSummary);

    /// The remap table changed a channel id while normalizing `source`
    fn channel_remapped(&self, source: &SourceDescriptor, from: &str, to: &str);

    /// A channel from `source` lost to an earlier source with the same id
    fn duplicate_channel(&self, source: &SourceDescriptor, id: &str);
}

/// Default observer that forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl MergeObserver for TracingObserver {
    fn source_started(&self, source: &SourceDescriptor) {
        info!("Processing source: {}", source.display_name());
    }

    fn source_skipped(&self, source: &SourceDescriptor, reason: &SourceError) {
        warn!(
            "Skipping source {} ({} failed): {}",
            source.display_name(),
            reason.stage(),
            reason
        );
    }

    fn source_merged(&self, source: &SourceDescriptor, summary: &SourceSummary) {
        info!(
            "Merged {} source {}: channels_added={} channels_discarded={} programmes_added={}",
            summary.format,
            source.display_name(),
            summary.channels_added,
            summary.channels_discarded,
            summary.programmes_added
        );
    }

    fn channel_remapped(&self, _source: &SourceDescriptor, from: &str, to: &str) {
        debug!("Remapped channel {} -> {}", from, to);
    }

    fn duplicate_channel(&self, source: &SourceDescriptor, id: &str) {
        debug!(
            "Discarding duplicate channel {} from {}",
            id,
            source.display_name()
        );
    }
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MergeObserver for NoopObserver {
    fn source_started(&self, _source: &SourceDescriptor) {}

    fn source_skipped(&self, _source: &SourceDescriptor, _reason: &SourceError) {}

    fn source_merged(&self, _source: &SourceDescriptor, _summary: &SourceSummary) {}

    fn channel_remapped(&self, _source: &SourceDescriptor, _from: &str, _to: &str) {}

    fn duplicate_channel(&self, _source: &SourceDescriptor, _id: &str) {}
}
