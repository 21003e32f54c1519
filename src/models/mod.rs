//! Core data model shared by the normalizers, the merge engine and the
//! XMLTV generator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::url::UrlUtils;

/// Declared content type of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Xml,
    Json,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Xml => "xml",
            SourceType::Json => "json",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured EPG source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub url: String,
    pub name: Option<String>,
    pub source_type: Option<SourceType>,
}

impl SourceDescriptor {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            name: None,
            source_type: None,
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    /// Name used in log output; falls back to the url with credentials masked
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => UrlUtils::obfuscate_credentials(&self.url),
        }
    }
}

/// A child element carried through from a source without interpretation,
/// such as `<icon src="..."/>` or `<category lang="en">News</category>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
}

impl XmlElement {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
        }
    }
}

/// A channel after id remapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    /// Remapped channel id, unique within a merged document
    pub id: String,
    /// Never empty; falls back to the remapped id
    pub display_name: String,
    /// Attributes of the `<display-name>` element, e.g. `lang`
    pub display_name_attributes: Vec<(String, String)>,
    pub extras: Vec<XmlElement>,
}

impl ChannelRecord {
    /// Build a channel, substituting the id when no usable display name
    /// exists. Names are stored trimmed, as XMLTV text is read back trimmed.
    pub fn new(id: String, display_name: Option<String>) -> Self {
        let display_name = display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| match id.trim() {
                "" => id.clone(),
                trimmed => trimmed.to_string(),
            });
        Self {
            id,
            display_name,
            display_name_attributes: Vec::new(),
            extras: Vec::new(),
        }
    }
}

/// A programme after its channel reference has been remapped.
/// Start and stop are kept exactly as the source wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammeRecord {
    pub channel_ref: String,
    pub start: String,
    pub stop: String,
    pub title: String,
    pub title_attributes: Vec<(String, String)>,
    pub description: String,
    pub description_attributes: Vec<(String, String)>,
    /// Attributes other than start, stop and channel, in source order
    pub attributes: Vec<(String, String)>,
    pub extras: Vec<XmlElement>,
}

impl ProgrammeRecord {
    pub fn new(channel_ref: String, start: String, stop: String) -> Self {
        Self {
            channel_ref,
            start,
            stop,
            title: String::new(),
            title_attributes: Vec::new(),
            description: String::new(),
            description_attributes: Vec::new(),
            attributes: Vec::new(),
            extras: Vec::new(),
        }
    }
}

/// A channel id that the remap table changed during normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRemap {
    pub from: String,
    pub to: String,
}

/// Records produced from a single source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedSource {
    pub channels: Vec<ChannelRecord>,
    pub programmes: Vec<ProgrammeRecord>,
    pub remapped: Vec<ChannelRemap>,
    /// JSON programme entries discarded for missing channel, start or stop
    pub dropped_programmes: usize,
}

/// The merged guide: channels in first-seen order, then programmes in
/// arrival order. Channel ids are pairwise distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedDocument {
    channels: Vec<ChannelRecord>,
    programmes: Vec<ProgrammeRecord>,
}

impl MergedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channels(&self) -> &[ChannelRecord] {
        &self.channels
    }

    pub fn programmes(&self) -> &[ProgrammeRecord] {
        &self.programmes
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.programmes.is_empty()
    }

    /// Only the merge engine grows a document; it owns the seen-id set that
    /// keeps channel ids distinct.
    pub(crate) fn push_channel(&mut self, channel: ChannelRecord) {
        self.channels.push(channel);
    }

    pub(crate) fn push_programme(&mut self, programme: ProgrammeRecord) {
        self.programmes.push(programme);
    }
}

/// Per-source outcome passed to the merge observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSummary {
    pub format: SourceType,
    pub channels_added: usize,
    pub channels_discarded: usize,
    pub programmes_added: usize,
}

/// Statistics about a merge run
#[derive(Debug, Clone, Default)]
pub struct MergeStatistics {
    pub sources_total: usize,
    pub sources_merged: usize,
    pub sources_skipped: usize,
    pub channels_merged: usize,
    pub channels_discarded_duplicate: usize,
    pub programmes_merged: usize,
    pub programmes_dropped_incomplete: usize,
    pub duration: Duration,
}
