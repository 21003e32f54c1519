//! JSON source normalization
//!
//! JSON guides have no fixed schema, so each field is looked up through an
//! ordered list of accepted keys. The top level must be an object carrying
//! `channels` and either or both of `programs` and `programmes`.
//!
//! Values that become element text in XMLTV (display name, title,
//! description) are trimmed the same way the XMLTV reader trims them.
//! Values that become attributes are kept verbatim.

use serde_json::{Map, Value};
use tracing::debug;

use crate::data_mapping::RemapTable;
use crate::errors::ParseError;
use crate::models::{ChannelRecord, ChannelRemap, NormalizedSource, ProgrammeRecord};

const CHANNEL_ID_KEYS: &[&str] = &["id", "channel", "guid"];
const CHANNEL_NAME_KEYS: &[&str] = &["display-name", "name", "title"];
const PROGRAMME_LIST_KEYS: &[&str] = &["programs", "programmes"];
const DESCRIPTION_KEYS: &[&str] = &["desc", "description"];

type Object = Map<String, Value>;

/// Parse a JSON guide into remapped records
pub fn parse_json(data: &[u8], table: &RemapTable) -> Result<NormalizedSource, ParseError> {
    let root = match serde_json::from_slice::<Value>(data)? {
        Value::Object(root) => root,
        other => {
            return Err(ParseError::structure(format!(
                "expected a JSON object at the top level, found {}",
                type_name(&other)
            )));
        }
    };

    let mut normalized = NormalizedSource::default();

    for entry in entries(&root, "channels") {
        let Some(id) = first_present(entry, CHANNEL_ID_KEYS) else {
            debug!("Skipping JSON channel without an id");
            continue;
        };
        let new_id = table.remap(&id).to_string();
        if new_id != id {
            normalized.remapped.push(ChannelRemap {
                from: id,
                to: new_id.clone(),
            });
        }
        let display_name = first_text(entry, CHANNEL_NAME_KEYS);
        normalized
            .channels
            .push(ChannelRecord::new(new_id, display_name));
    }

    for list in PROGRAMME_LIST_KEYS {
        for entry in entries(&root, list) {
            match programme_from(entry, table) {
                Some(programme) => normalized.programmes.push(programme),
                None => normalized.dropped_programmes += 1,
            }
        }
    }

    if normalized.dropped_programmes > 0 {
        debug!(
            "Dropped {} JSON programme entries missing channel, start or stop",
            normalized.dropped_programmes
        );
    }
    Ok(normalized)
}

/// Programme from a JSON entry, or `None` when channel, start or stop is absent
fn programme_from(entry: &Object, table: &RemapTable) -> Option<ProgrammeRecord> {
    let channel = first_present(entry, &["channel"])?;
    let start = first_present(entry, &["start"])?;
    let stop = first_present(entry, &["stop"])?;

    let mut programme = ProgrammeRecord::new(table.remap(&channel).to_string(), start, stop);
    programme.title = first_text(entry, &["title"]).unwrap_or_default();
    programme.description = first_text(entry, DESCRIPTION_KEYS).unwrap_or_default();
    Some(programme)
}

/// Object entries of the array under `key`. A missing key or non-array value
/// yields nothing; non-object elements are skipped.
fn entries<'a>(root: &'a Object, key: &str) -> impl Iterator<Item = &'a Object> {
    root.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// The first of `keys` whose value is a non-empty string or a number
pub fn first_present(entry: &Object, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match entry.get(*key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// Like [`first_present`] but trimmed; whitespace-only values count as absent
fn first_text(entry: &Object, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match entry.get(*key)? {
        Value::String(text) => Some(text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MergedDocument;
    use rstest::rstest;
    use serde_json::json;

    fn parse(value: Value) -> NormalizedSource {
        parse_json(value.to_string().as_bytes(), &RemapTable::new()).unwrap()
    }

    fn object(value: Value) -> Object {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[rstest]
    #[case::id_first(json!({"id": "a", "channel": "b", "guid": "c"}), Some("a"))]
    #[case::channel_second(json!({"channel": "b", "guid": "c"}), Some("b"))]
    #[case::guid_last(json!({"guid": "c"}), Some("c"))]
    #[case::empty_string_is_absent(json!({"id": "", "channel": "b"}), Some("b"))]
    #[case::null_is_absent(json!({"id": null, "guid": "c"}), Some("c"))]
    #[case::number_is_stringified(json!({"id": 101}), Some("101"))]
    #[case::bool_is_absent(json!({"id": true}), None)]
    #[case::nothing(json!({"name": "x"}), None)]
    fn test_channel_id_fallback_chain(#[case] entry: Value, #[case] expected: Option<&str>) {
        assert_eq!(
            first_present(&object(entry), CHANNEL_ID_KEYS).as_deref(),
            expected
        );
    }

    #[rstest]
    #[case::display_name_first(json!({"id": "1", "display-name": "D", "name": "N", "title": "T"}), "D")]
    #[case::name_second(json!({"id": "1", "name": "N", "title": "T"}), "N")]
    #[case::title_last(json!({"id": "1", "title": "T"}), "T")]
    #[case::falls_back_to_id(json!({"id": "1"}), "1")]
    fn test_channel_name_fallback_chain(#[case] entry: Value, #[case] expected: &str) {
        let parsed = parse(json!({ "channels": [entry] }));
        assert_eq!(parsed.channels[0].display_name, expected);
    }

    #[test]
    fn test_channels_are_remapped() {
        let table: RemapTable = [("1", "uk.one")].into_iter().collect();
        let data = json!({
            "channels": [{"id": "1"}, {"id": "2", "name": "Two"}],
            "programs": [{"channel": "1", "start": "s", "stop": "e"}]
        })
        .to_string();

        let parsed = parse_json(data.as_bytes(), &table).unwrap();
        assert_eq!(parsed.channels[0].id, "uk.one");
        assert_eq!(parsed.channels[0].display_name, "uk.one");
        assert_eq!(parsed.channels[1].id, "2");
        assert_eq!(parsed.programmes[0].channel_ref, "uk.one");
        assert_eq!(parsed.remapped.len(), 1);
    }

    #[test]
    fn test_programs_precede_programmes() {
        let parsed = parse(json!({
            "programmes": [{"channel": "c", "start": "2", "stop": "3", "title": "second"}],
            "programs": [{"channel": "c", "start": "1", "stop": "2", "title": "first"}]
        }));
        let titles: Vec<_> = parsed.programmes.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[test]
    fn test_incomplete_programmes_are_dropped_and_counted() {
        let parsed = parse(json!({
            "programs": [
                {"channel": "c", "start": "1", "stop": "2"},
                {"channel": "c", "start": "1"},
                {"start": "1", "stop": "2"},
                {"channel": "", "start": "1", "stop": "2"},
                "not an object"
            ]
        }));
        assert_eq!(parsed.programmes.len(), 1);
        assert_eq!(parsed.dropped_programmes, 3);
    }

    #[test]
    fn test_programme_text_fields() {
        let parsed = parse(json!({
            "programs": [
                {"channel": "c", "start": 1, "stop": 2, "title": "T", "desc": "D", "description": "ignored"},
                {"channel": "c", "start": "1", "stop": "2", "description": "Long"},
                {"channel": "c", "start": "1", "stop": "2"}
            ]
        }));
        assert_eq!(parsed.programmes[0].start, "1");
        assert_eq!(parsed.programmes[0].title, "T");
        assert_eq!(parsed.programmes[0].description, "D");
        assert_eq!(parsed.programmes[1].description, "Long");
        assert_eq!(parsed.programmes[2].title, "");
        assert_eq!(parsed.programmes[2].description, "");
    }

    #[test]
    fn test_text_values_are_trimmed_and_attribute_values_are_not() {
        let parsed = parse(json!({
            "channels": [
                {"id": " padded ", "display-name": "   ", "name": " Padded "},
                {"id": "bare", "name": "\t"}
            ],
            "programs": [
                {"channel": " padded ", "start": "s ", "stop": "e", "title": "T\n", "desc": "  Long day  "}
            ]
        }));
        assert_eq!(parsed.channels[0].id, " padded ");
        assert_eq!(parsed.channels[0].display_name, "Padded");
        assert_eq!(parsed.channels[1].display_name, "bare");

        let programme = &parsed.programmes[0];
        assert_eq!(programme.channel_ref, " padded ");
        assert_eq!(programme.start, "s ");
        assert_eq!(programme.title, "T");
        assert_eq!(programme.description, "Long day");
    }

    #[test]
    fn test_padded_values_survive_xmltv_round_trip() {
        let parsed = parse(json!({
            "channels": [{"id": "c", "name": " Padded "}, {"id": " spaced "}],
            "programs": [{"channel": "c", "start": "1", "stop": "2", "title": "T\n", "desc": " D "}]
        }));

        let mut document = MergedDocument::new();
        for channel in parsed.channels.clone() {
            document.push_channel(channel);
        }
        for programme in parsed.programmes.clone() {
            document.push_programme(programme);
        }
        let bytes = crate::generator::serialize(&document).unwrap();
        let reparsed = crate::ingestor::parse_xmltv(&bytes, &RemapTable::new()).unwrap();

        assert_eq!(reparsed.channels, parsed.channels);
        assert_eq!(reparsed.programmes, parsed.programmes);
    }

    #[test]
    fn test_missing_sections_yield_nothing() {
        let parsed = parse(json!({"channels": "nope"}));
        assert!(parsed.channels.is_empty());
        assert!(parsed.programmes.is_empty());
    }

    #[test]
    fn test_non_object_top_level_is_a_structure_error() {
        let result = parse_json(b"[1, 2, 3]", &RemapTable::new());
        assert!(matches!(result, Err(ParseError::Structure { .. })));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let result = parse_json(b"{\"channels\": [", &RemapTable::new());
        assert!(matches!(result, Err(ParseError::Json(_))));
    }
}
