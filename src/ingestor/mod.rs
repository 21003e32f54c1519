//! Source normalizers
//!
//! Each normalizer turns the decompressed bytes of one source into owned
//! channel and programme records with channel ids already remapped.

use crate::data_mapping::RemapTable;
use crate::errors::ParseError;
use crate::models::{NormalizedSource, SourceType};

pub mod ingest_json;
pub mod ingest_xmltv;

pub use ingest_json::parse_json;
pub use ingest_xmltv::parse_xmltv;

/// Dispatch to the normalizer for `format`
pub fn normalize(
    data: &[u8],
    format: SourceType,
    table: &RemapTable,
) -> Result<NormalizedSource, ParseError> {
    match format {
        SourceType::Xml => parse_xmltv(data, table),
        SourceType::Json => parse_json(data, table),
    }
}
