//! Content type detection for downloaded source payloads

use crate::models::SourceType;

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// Outcome of format detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    Xml,
    Json,
    Unknown,
}

impl DetectedFormat {
    /// Parseable source type, if any
    pub fn source_type(self) -> Option<SourceType> {
        match self {
            DetectedFormat::Xml => Some(SourceType::Xml),
            DetectedFormat::Json => Some(SourceType::Json),
            DetectedFormat::Unknown => None,
        }
    }
}

impl From<SourceType> for DetectedFormat {
    fn from(source_type: SourceType) -> Self {
        match source_type {
            SourceType::Xml => DetectedFormat::Xml,
            SourceType::Json => DetectedFormat::Json,
        }
    }
}

/// Classify a payload. A declared type always wins; otherwise the first
/// non-whitespace byte decides.
pub fn detect(data: &[u8], declared: Option<SourceType>) -> DetectedFormat {
    if let Some(declared) = declared {
        return declared.into();
    }

    match strip_leading_whitespace(data).first() {
        Some(b'<') => DetectedFormat::Xml,
        Some(b'{') | Some(b'[') => DetectedFormat::Json,
        _ => DetectedFormat::Unknown,
    }
}

/// Skip a UTF-8 BOM and ASCII whitespace
pub fn strip_leading_whitespace(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    &data[start..]
}
