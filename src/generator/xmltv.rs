//! XMLTV output
//!
//! Renders a [`MergedDocument`] as indented XMLTV. All channels are written
//! before any programme. Elements without text or children are self-closing.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use quick_xml::escape::escape;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::SerializeError;
use crate::models::{ChannelRecord, MergedDocument, ProgrammeRecord, XmlElement};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const INDENT: &str = "  ";

/// Render the document as UTF-8 XMLTV bytes
pub fn serialize(document: &MergedDocument) -> Result<Vec<u8>, SerializeError> {
    let mut out = String::with_capacity(
        256 + document.channels().len() * 160 + document.programmes().len() * 320,
    );
    render(document, &mut out).map_err(|e| SerializeError::Xml(e.to_string()))?;
    Ok(out.into_bytes())
}

/// Serialize and atomically replace `path`. The document is written to a
/// temporary file next to the destination and renamed over it.
pub fn write_to_path(document: &MergedDocument, path: &Path) -> Result<u64, SerializeError> {
    let bytes = serialize(document)?;
    let io_error = |source: std::io::Error| SerializeError::Io {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(dir).map_err(io_error)?;
    temp_file.write_all(&bytes).map_err(io_error)?;
    temp_file.flush().map_err(io_error)?;
    debug!("Wrote {} bytes to {}", bytes.len(), temp_file.path().display());

    temp_file.persist(path).map_err(|e| io_error(e.error))?;

    info!(
        "XMLTV written to {}: channels={} programmes={} bytes={}",
        path.display(),
        document.channels().len(),
        document.programmes().len(),
        bytes.len()
    );
    Ok(bytes.len() as u64)
}

fn render(document: &MergedDocument, out: &mut String) -> std::fmt::Result {
    writeln!(out, "{XML_DECLARATION}")?;
    if document.is_empty() {
        return writeln!(out, "<tv/>");
    }

    writeln!(out, "<tv>")?;
    for channel in document.channels() {
        write_channel(out, channel)?;
    }
    for programme in document.programmes() {
        write_programme(out, programme)?;
    }
    writeln!(out, "</tv>")
}

fn write_channel(out: &mut String, channel: &ChannelRecord) -> std::fmt::Result {
    writeln!(out, "{INDENT}<channel id=\"{}\">", escape(channel.id.as_str()))?;
    write_text_element(
        out,
        2,
        "display-name",
        &channel.display_name_attributes,
        &channel.display_name,
    )?;
    for extra in &channel.extras {
        write_element(out, 2, extra)?;
    }
    writeln!(out, "{INDENT}</channel>")
}

fn write_programme(out: &mut String, programme: &ProgrammeRecord) -> std::fmt::Result {
    write!(
        out,
        "{INDENT}<programme start=\"{}\" stop=\"{}\" channel=\"{}\"",
        escape(programme.start.as_str()),
        escape(programme.stop.as_str()),
        escape(programme.channel_ref.as_str())
    )?;
    write_attributes(out, &programme.attributes)?;
    writeln!(out, ">")?;

    write_text_element(out, 2, "title", &programme.title_attributes, &programme.title)?;
    write_text_element(
        out,
        2,
        "desc",
        &programme.description_attributes,
        &programme.description,
    )?;
    for extra in &programme.extras {
        write_element(out, 2, extra)?;
    }
    writeln!(out, "{INDENT}</programme>")
}

fn write_element(out: &mut String, depth: usize, element: &XmlElement) -> std::fmt::Result {
    write!(out, "{}<{}", INDENT.repeat(depth), element.name)?;
    write_attributes(out, &element.attributes)?;
    match element.text.as_deref() {
        Some(text) if !text.is_empty() => {
            writeln!(out, ">{}</{}>", escape(text), element.name)
        }
        _ => writeln!(out, "/>"),
    }
}

fn write_text_element(
    out: &mut String,
    depth: usize,
    name: &str,
    attributes: &[(String, String)],
    text: &str,
) -> std::fmt::Result {
    write!(out, "{}<{name}", INDENT.repeat(depth))?;
    write_attributes(out, attributes)?;
    if text.is_empty() {
        writeln!(out, "/>")
    } else {
        writeln!(out, ">{}</{name}>", escape(text))
    }
}

fn write_attributes(out: &mut String, attributes: &[(String, String)]) -> std::fmt::Result {
    for (key, value) in attributes {
        write!(out, " {}=\"{}\"", key, escape(value.as_str()))?;
    }
    Ok(())
}
