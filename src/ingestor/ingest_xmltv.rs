//! XMLTV source normalization
//!
//! Walks the document with quick-xml and builds owned channel and programme
//! records from the direct children of the root element. Channel ids and
//! programme channel references are remapped as they are read. Child elements
//! other than the first `display-name`, `title` and `desc` are carried along
//! untouched so that icons, categories and similar data survive the merge.
//!
//! Text is decoded with the encoding named in the XML declaration, so
//! ISO-8859-1 and other legacy guides are read as well as UTF-8 ones.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::encoding::Decoder;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::data_mapping::RemapTable;
use crate::errors::ParseError;
use crate::models::{ChannelRecord, ChannelRemap, NormalizedSource, ProgrammeRecord, XmlElement};

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];
const CHANNEL: &[u8] = b"channel";
const PROGRAMME: &[u8] = b"programme";
const DISPLAY_NAME: &str = "display-name";
const TITLE: &str = "title";
const DESC: &str = "desc";

// Open element depth at which each kind of element lives
const ENTRY_DEPTH: usize = 1;
const CHILD_DEPTH: usize = 2;

/// Parse XMLTV bytes into remapped records
pub fn parse_xmltv(data: &[u8], table: &RemapTable) -> Result<NormalizedSource, ParseError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::with_capacity(8192);

    let mut normalized = NormalizedSource::default();
    let mut depth = 0usize;
    let mut root_seen = false;
    let mut entry: Option<Entry> = None;
    let mut child: Option<XmlElement> = None;
    let mut text = String::new();

    loop {
        buf.clear();
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(position, e))?;
        // Switches from UTF-8 once the declaration names another encoding
        let decoder = reader.decoder();

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));

                if depth == 0 {
                    if root_seen {
                        return Err(xml_error(position, "junk after document element"));
                    }
                    root_seen = true;
                } else if depth == ENTRY_DEPTH {
                    entry = Entry::start(e, decoder, position)?;
                } else if depth == CHILD_DEPTH && entry.is_some() {
                    child = Some(XmlElement {
                        name: decode(decoder, e.name().as_ref(), position)?.into_owned(),
                        attributes: read_attributes(e, decoder, position)?,
                        text: None,
                    });
                    text.clear();
                }

                if is_empty {
                    close_element(
                        depth + 1,
                        &mut entry,
                        &mut child,
                        &mut text,
                        table,
                        &mut normalized,
                    );
                } else {
                    depth += 1;
                }
            }
            Event::End(_) => {
                close_element(depth, &mut entry, &mut child, &mut text, table, &mut normalized);
                depth = depth.saturating_sub(1);
            }
            Event::Text(ref e) => {
                let raw = decode(decoder, e, position)?;
                if child.is_some() && depth == CHILD_DEPTH + 1 {
                    let decoded = unescape(&raw).map_err(|err| xml_error(position, err))?;
                    text.push_str(&decoded);
                } else if depth == 0 && !raw.trim().is_empty() {
                    return Err(xml_error(position, "text outside of the document element"));
                }
            }
            Event::CData(ref e) => {
                if child.is_some() && depth == CHILD_DEPTH + 1 {
                    text.push_str(&decode(decoder, e, position)?);
                }
            }
            Event::GeneralRef(ref e) => {
                let resolved = resolve_reference(&decode(decoder, e, position)?, position)?;
                if child.is_some() && depth == CHILD_DEPTH + 1 {
                    text.push_str(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(xml_error(reader.buffer_position() as u64, "no element found"));
    }
    if depth != 0 {
        return Err(xml_error(
            reader.buffer_position() as u64,
            format!("document ended with {depth} unclosed element(s)"),
        ));
    }

    debug!(
        "Parsed XMLTV source: channels={} programmes={} remapped={}",
        normalized.channels.len(),
        normalized.programmes.len(),
        normalized.remapped.len()
    );
    Ok(normalized)
}

/// A `<channel>` or `<programme>` being assembled
enum Entry {
    Channel {
        id: String,
        display_name: String,
        display_name_attributes: Vec<(String, String)>,
        extras: Vec<XmlElement>,
        position: u64,
    },
    Programme(ProgrammeRecord),
}

impl Entry {
    fn start(e: &BytesStart, decoder: Decoder, position: u64) -> Result<Option<Self>, ParseError> {
        let entry = match e.name().as_ref() {
            CHANNEL => {
                let id = read_attributes(e, decoder, position)?
                    .into_iter()
                    .find(|(key, _)| key == "id")
                    .map(|(_, value)| value)
                    .unwrap_or_default();
                Some(Entry::Channel {
                    id,
                    display_name: String::new(),
                    display_name_attributes: Vec::new(),
                    extras: Vec::new(),
                    position,
                })
            }
            PROGRAMME => {
                let mut programme = ProgrammeRecord::new(String::new(), String::new(), String::new());
                for (key, value) in read_attributes(e, decoder, position)? {
                    match key.as_str() {
                        "channel" => programme.channel_ref = value,
                        "start" => programme.start = value,
                        "stop" => programme.stop = value,
                        _ => programme.attributes.push((key, value)),
                    }
                }
                Some(Entry::Programme(programme))
            }
            _ => None,
        };
        Ok(entry)
    }

    fn add_child(&mut self, mut element: XmlElement, text: &str) {
        let text = text.trim();
        let (field, extras) = match self {
            Entry::Channel {
                display_name,
                display_name_attributes,
                extras,
                ..
            } => {
                let field = (element.name == DISPLAY_NAME)
                    .then_some((display_name, display_name_attributes));
                (field, extras)
            }
            Entry::Programme(programme) => {
                let field = match element.name.as_str() {
                    TITLE => Some((&mut programme.title, &mut programme.title_attributes)),
                    DESC => Some((
                        &mut programme.description,
                        &mut programme.description_attributes,
                    )),
                    _ => None,
                };
                (field, &mut programme.extras)
            }
        };

        // First non-empty occurrence fills the field, later ones are extras.
        // An empty one only lends its attributes until text arrives.
        if let Some((value, attributes)) = field {
            if text.is_empty() {
                if value.is_empty() && attributes.is_empty() {
                    *attributes = element.attributes;
                }
                return;
            }
            if value.is_empty() {
                *value = text.to_string();
                *attributes = element.attributes;
                return;
            }
        }
        element.text = non_empty(text);
        extras.push(element);
    }

    fn finish(self, table: &RemapTable, normalized: &mut NormalizedSource) {
        match self {
            Entry::Channel {
                id,
                display_name,
                display_name_attributes,
                extras,
                position,
            } => {
                if id.is_empty() {
                    debug!("Skipping channel without an id attribute at byte {}", position);
                    return;
                }
                let new_id = table.remap(&id).to_string();
                if new_id != id {
                    normalized.remapped.push(ChannelRemap {
                        from: id,
                        to: new_id.clone(),
                    });
                }
                let mut channel = ChannelRecord::new(new_id, Some(display_name));
                channel.display_name_attributes = display_name_attributes;
                channel.extras = extras;
                normalized.channels.push(channel);
            }
            Entry::Programme(mut programme) => {
                programme.channel_ref = table.remap(&programme.channel_ref).to_string();
                normalized.programmes.push(programme);
            }
        }
    }
}

/// Handle the end of the element that was open at `depth`
fn close_element(
    depth: usize,
    entry: &mut Option<Entry>,
    child: &mut Option<XmlElement>,
    text: &mut String,
    table: &RemapTable,
    normalized: &mut NormalizedSource,
) {
    if depth == CHILD_DEPTH + 1 {
        if let (Some(entry), Some(element)) = (entry.as_mut(), child.take()) {
            entry.add_child(element, text);
        }
        text.clear();
    } else if depth == ENTRY_DEPTH + 1
        && let Some(entry) = entry.take()
    {
        entry.finish(table, normalized);
    }
}

/// Attributes in document order, decoded and with entities resolved
fn read_attributes(
    e: &BytesStart,
    decoder: Decoder,
    position: u64,
) -> Result<Vec<(String, String)>, ParseError> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(position, err))?;
        let key = decode(decoder, attr.key.as_ref(), position)?.into_owned();
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(|err| xml_error(position, err))?;
        attributes.push((key, value.into_owned()));
    }
    Ok(attributes)
}

/// Resolve `&name;` or `&#NN;`/`&#xNN;` given the text between `&` and `;`
fn resolve_reference(name: &str, position: u64) -> Result<String, ParseError> {
    if let Some(resolved) = resolve_predefined_entity(name) {
        return Ok(resolved.to_string());
    }

    let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(decimal) = name.strip_prefix('#') {
        decimal.parse::<u32>().ok()
    } else {
        None
    };

    code.and_then(char::from_u32)
        .map(String::from)
        .ok_or_else(|| xml_error(position, format!("undefined entity &{name};")))
}

fn decode<'b>(decoder: Decoder, bytes: &'b [u8], position: u64) -> Result<Cow<'b, str>, ParseError> {
    decoder
        .decode(bytes)
        .map_err(|err| xml_error(position, format!("undecodable text: {err}")))
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn xml_error(position: u64, message: impl std::fmt::Display) -> ParseError {
    ParseError::Xml {
        position,
        message: message.to_string(),
    }
}
