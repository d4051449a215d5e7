//! Name lookup within a fetched collection.
//!
//! Every comparison trims and lowercases the query and lowercases the record
//! side. Functions additionally compare with a leading [`FUNCTION_SIGIL`] on
//! both sides, so `send`, `$send` and `$SEND` all find a record named `$send`.
//! First match in collection order wins.

use crate::models::{EnumTable, EventRecord, FunctionRecord, ObjectCollection, ObjectKind};
use crate::{MetadataError, Result};
use serde::Serialize;

/// Prefix that marks a callable reference.
pub const FUNCTION_SIGIL: char = '$';

/// A record found by [`find`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatchedRecord {
    Function(FunctionRecord),
    Event(EventRecord),
    /// The enum whose name or one of whose values matched.
    Enum { name: String, values: Vec<String> },
}

impl MatchedRecord {
    pub fn kind(&self) -> ObjectKind {
        match self {
            MatchedRecord::Function(_) => ObjectKind::Function,
            MatchedRecord::Event(_) => ObjectKind::Event,
            MatchedRecord::Enum { .. } => ObjectKind::Enum,
        }
    }

    /// Display name of the matched record.
    pub fn name(&self) -> &str {
        match self {
            MatchedRecord::Function(record) => &record.name,
            MatchedRecord::Event(record) => &record.name,
            MatchedRecord::Enum { name, .. } => name,
        }
    }
}

/// Find the record named `target` in `collection`.
///
/// Returns `Ok(None)` when nothing matches. Fails with
/// [`MetadataError::UnsupportedSearchType`] when `collection` does not hold
/// records of `kind`.
pub fn find(kind: ObjectKind, collection: &ObjectCollection, target: &str) -> Result<Option<MatchedRecord>> {
    let query = normalize(target);

    let found = match (kind, collection) {
        (ObjectKind::Function, ObjectCollection::Functions(records)) => {
            find_function(records, &query).map(|record| MatchedRecord::Function(record.clone()))
        }
        (ObjectKind::Event, ObjectCollection::Events(records)) => {
            find_event(records, &query).map(|record| MatchedRecord::Event(record.clone()))
        }
        (ObjectKind::Enum, ObjectCollection::Enums(table)) => {
            find_enum(table, &query).map(|(name, values)| MatchedRecord::Enum {
                name: name.to_string(),
                values: values.to_vec(),
            })
        }
        (kind, collection) => {
            return Err(MetadataError::UnsupportedSearchType {
                kind: format!("{} in a {} collection", kind, collection.kind()),
            });
        }
    };

    Ok(found)
}

/// Like [`find`], returning `default` when nothing matches.
pub fn find_or(
    kind: ObjectKind,
    collection: &ObjectCollection,
    target: &str,
    default: MatchedRecord,
) -> Result<MatchedRecord> {
    Ok(find(kind, collection, target)?.unwrap_or(default))
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn with_sigil(name: &str) -> String {
    if name.starts_with(FUNCTION_SIGIL) {
        name.to_string()
    } else {
        format!("{}{}", FUNCTION_SIGIL, name)
    }
}

fn find_function<'a>(records: &'a [FunctionRecord], query: &str) -> Option<&'a FunctionRecord> {
    let query = with_sigil(query);
    records
        .iter()
        .find(|record| record.names().any(|name| with_sigil(&normalize(name)) == query))
}

fn find_event<'a>(records: &'a [EventRecord], query: &str) -> Option<&'a EventRecord> {
    records.iter().find(|record| normalize(&record.name) == query)
}

fn find_enum<'a>(table: &'a EnumTable, query: &str) -> Option<(&'a str, &'a [String])> {
    // Key match anywhere in the table beats a value match.
    table
        .iter()
        .find(|entry| normalize(&entry.name) == query)
        .or_else(|| {
            table
                .iter()
                .find(|entry| entry.values.iter().any(|value| normalize(value) == query))
        })
        .map(|entry| (entry.name.as_str(), entry.values.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn functions(value: serde_json::Value) -> ObjectCollection {
        ObjectCollection::from_value(ObjectKind::Function, value).unwrap()
    }

    fn events(value: serde_json::Value) -> ObjectCollection {
        ObjectCollection::from_value(ObjectKind::Event, value).unwrap()
    }

    fn enums(value: serde_json::Value) -> ObjectCollection {
        ObjectCollection::from_value(ObjectKind::Enum, value).unwrap()
    }

    #[test]
    fn test_function_alias_match() {
        let collection = functions(json!([{"name": "$send", "aliases": ["$sendmsg"]}]));

        let found = find(ObjectKind::Function, &collection, "sendmsg").unwrap().unwrap();
        assert_eq!(found.name(), "$send");
        assert_eq!(found.kind(), ObjectKind::Function);
    }

    #[test]
    fn test_function_match_ignores_case_and_sigil() {
        let collection = functions(json!([
            {"name": "$ping", "description": "Latency"},
            {"name": "$sendMessage", "description": "Sends a message"}
        ]));

        for query in ["sendmessage", "$SENDMESSAGE", "  SendMessage  "] {
            let found = find(ObjectKind::Function, &collection, query).unwrap();
            assert_eq!(found.map(|m| m.name().to_string()), Some("$sendMessage".to_string()));
        }
    }

    #[test]
    fn test_function_alias_without_sigil_on_record() {
        let collection = functions(json!([{"name": "$send", "aliases": ["msg"]}]));
        assert!(find(ObjectKind::Function, &collection, "$msg").unwrap().is_some());
    }

    #[test]
    fn test_function_first_match_wins() {
        let collection = functions(json!([
            {"name": "$first", "aliases": ["$dup"]},
            {"name": "$dup"}
        ]));

        let found = find(ObjectKind::Function, &collection, "dup").unwrap().unwrap();
        assert_eq!(found.name(), "$first");
    }

    #[test]
    fn test_event_match_is_exact_without_aliases() {
        let collection = events(json!([
            {"name": "Ready", "aliases": ["Started"]},
            {"name": "messageCreate"}
        ]));

        assert_eq!(
            find(ObjectKind::Event, &collection, "ready").unwrap().map(|m| m.name().to_string()),
            Some("Ready".to_string())
        );
        assert!(find(ObjectKind::Event, &collection, "started").unwrap().is_none());
        assert!(find(ObjectKind::Event, &collection, "message").unwrap().is_none());
    }

    #[test]
    fn test_event_missing_returns_none() {
        let collection = events(json!([{"name": "Ready"}]));
        assert_eq!(find(ObjectKind::Event, &collection, "missing").unwrap(), None);
    }

    #[test]
    fn test_enum_value_match() {
        let collection = enums(json!({"Color": ["Red", "Green"]}));

        match find(ObjectKind::Enum, &collection, "red").unwrap() {
            Some(MatchedRecord::Enum { name, values }) => {
                assert_eq!(name, "Color");
                assert_eq!(values, vec!["Red".to_string(), "Green".to_string()]);
            }
            other => panic!("expected enum match, got {:?}", other),
        }
    }

    #[test]
    fn test_enum_key_match_beats_earlier_value_match() {
        let collection = enums(json!({
            "Shape": ["Circle", "Color"],
            "Color": ["Red", "Green"]
        }));

        let found = find(ObjectKind::Enum, &collection, "COLOR").unwrap().unwrap();
        assert_eq!(found.name(), "Color");
    }

    #[test]
    fn test_kind_mismatch_is_unsupported_search_type() {
        let collection = events(json!([{"name": "Ready"}]));
        let err = find(ObjectKind::Function, &collection, "ready").unwrap_err();
        assert!(matches!(err, MetadataError::UnsupportedSearchType { .. }));
    }

    #[test]
    fn test_find_or_returns_default() {
        let collection = enums(json!({"Color": ["Red"]}));
        let default = MatchedRecord::Enum {
            name: "none".to_string(),
            values: Vec::new(),
        };

        let found = find_or(ObjectKind::Enum, &collection, "blue", default.clone()).unwrap();
        assert_eq!(found, default);
    }

    #[test]
    fn test_matched_record_serializes_with_kind_tag() {
        let matched = MatchedRecord::Enum {
            name: "Color".to_string(),
            values: vec!["Red".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&matched).unwrap(),
            json!({"kind": "enum", "name": "Color", "values": ["Red"]})
        );
    }
}
