//! Channel id remapping
//!
//! The remap table is an exact-match lookup from a source's channel id to the
//! id written to the merged guide. Ids missing from the table pass through
//! unchanged. The table is loaded once per run from a TOML file:
//!
//! ```toml
//! [[mappings]]
//! original_id = "bbc1.uk"
//! new_id = "BBC One"
//!
//! [[mappings]]
//! original_id = 101
//! new_id = "uk.one"
//! ```

use figment::{
    Figment,
    providers::{Format, Toml},
};
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::errors::{ConfigError, ConfigResult};

/// Read-only channel id lookup table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapTable {
    mappings: HashMap<String, String>,
}

impl RemapTable {
    /// Identity table
    pub fn new() -> Self {
        Self::default()
    }

    /// Remapped id for `original_id`, or `original_id` itself when unmapped
    pub fn remap<'a>(&'a self, original_id: &'a str) -> &'a str {
        self.mappings
            .get(original_id)
            .map(String::as_str)
            .unwrap_or(original_id)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Load the table from a TOML mapping file. A missing file yields the
    /// identity table; an unreadable one is an error.
    pub fn load_from_file<P: AsRef<Path>>(mapping_file: P) -> ConfigResult<Self> {
        let path = mapping_file.as_ref();
        let path_display = path.display().to_string();

        if !path.exists() {
            warn!(
                "Mapping file not found: {}. No mappings will be applied.",
                path_display
            );
            return Ok(Self::new());
        }

        let table = Self::extract(Figment::new().merge(Toml::file(path)), &path_display)?;
        if table.is_empty() {
            info!("No channel mappings loaded");
        } else {
            info!("Loaded {} channel mappings", table.len());
        }
        Ok(table)
    }

    /// Parse a mapping table from TOML text
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Self::extract(Figment::new().merge(Toml::string(contents)), "<inline>")
    }

    fn extract(figment: Figment, origin: &str) -> ConfigResult<Self> {
        let file: MappingFile = figment
            .extract()
            .map_err(|e| ConfigError::load(origin, e))?;
        Ok(file.mappings.into_iter().collect())
    }
}

impl FromIterator<MappingEntry> for RemapTable {
    fn from_iter<I: IntoIterator<Item = MappingEntry>>(iter: I) -> Self {
        let mut mappings = HashMap::new();
        for (index, entry) in iter.into_iter().enumerate() {
            match (entry.original_id.and_then(IdValue::into_id), entry.new_id.and_then(IdValue::into_id)) {
                (Some(original), Some(new)) => {
                    mappings.insert(original, new);
                }
                _ => debug!("Dropping mapping entry #{} with a missing id", index + 1),
            }
        }
        Self { mappings }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RemapTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(original, new)| MappingEntry {
                original_id: Some(IdValue::Text(original.into())),
                new_id: Some(IdValue::Text(new.into())),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    mappings: Vec<MappingEntry>,
}

/// One `{original_id, new_id}` pair as written in the mapping file
#[derive(Debug, Deserialize)]
pub struct MappingEntry {
    original_id: Option<IdValue>,
    new_id: Option<IdValue>,
}

/// Ids may be written as strings or bare integers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Integer(i64),
    Unsupported(IgnoredAny),
}

impl IdValue {
    fn into_id(self) -> Option<String> {
        match self {
            IdValue::Text(text) if !text.is_empty() => Some(text),
            IdValue::Integer(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_test::traced_test;

    #[test]
    fn test_unmapped_ids_pass_through() {
        let table: RemapTable = [("1", "uk.one")].into_iter().collect();
        for id in ["2", "uk.one", "", "UK.ONE", " 1"] {
            assert_eq!(table.remap(id), id);
        }
        assert_eq!(RemapTable::new().remap("anything"), "anything");
    }

    #[test]
    fn test_mapped_ids_are_replaced() {
        let table: RemapTable = [("1", "uk.one"), ("chA", "Channel A")].into_iter().collect();
        assert_eq!(table.remap("1"), "uk.one");
        assert_eq!(table.remap("chA"), "Channel A");
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let table: RemapTable = [("bbc1", "BBC One")].into_iter().collect();
        assert_eq!(table.remap("BBC1"), "BBC1");
    }

    #[test]
    fn test_parse_mapping_file() {
        let table = RemapTable::from_toml_str(
            r#"
[[mappings]]
original_id = "id1"
new_id = "id 1"

[[mappings]]
original_id = 101
new_id = "uk.one"

[[mappings]]
original_id = "missing-new"

[[mappings]]
new_id = "missing-original"

[[mappings]]
original_id = ""
new_id = "empty-original"

[[mappings]]
original_id = true
new_id = "bool-original"
"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.remap("id1"), "id 1");
        assert_eq!(table.remap("101"), "uk.one");
        assert_eq!(table.remap("missing-new"), "missing-new");
    }

    #[test]
    fn test_empty_file_is_identity() {
        assert!(RemapTable::from_toml_str("").unwrap().is_empty());
        assert!(RemapTable::from_toml_str("mappings = []").unwrap().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_missing_file_is_identity() {
        let table = RemapTable::load_from_file("/nonexistent/epg-merge/mappings.toml").unwrap();
        assert!(table.is_empty());
        assert!(logs_contain(
            "Mapping file not found: /nonexistent/epg-merge/mappings.toml"
        ));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[mappings]\noriginal_id = ").unwrap();

        let result = RemapTable::load_from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Load { .. })));
    }

    #[test]
    fn test_later_entries_win() {
        let table = RemapTable::from_toml_str(
            r#"
[[mappings]]
original_id = "1"
new_id = "first"

[[mappings]]
original_id = "1"
new_id = "second"
"#,
        )
        .unwrap();
        assert_eq!(table.remap("1"), "second");
    }
}
