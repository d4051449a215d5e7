//! Metadata documents published by extension repositories.
//!
//! Each repository ships `metadata/functions.json`, `metadata/events.json` and
//! `metadata/enums.json`. The first two are arrays of records, the last is an
//! object mapping enum names to their allowed values.

use crate::{MetadataError, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The three kinds of metadata object an extension publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Function,
    Event,
    Enum,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 3] = [ObjectKind::Function, ObjectKind::Event, ObjectKind::Enum];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Function => "function",
            ObjectKind::Event => "event",
            ObjectKind::Enum => "enum",
        }
    }

    /// Plural form used in cache keys and document names.
    pub fn plural(&self) -> &'static str {
        match self {
            ObjectKind::Function => "functions",
            ObjectKind::Event => "events",
            ObjectKind::Enum => "enums",
        }
    }

    /// File name of the remote document, e.g. `functions.json`.
    pub fn document_name(&self) -> String {
        format!("{}.json", self.plural())
    }
}

impl FromStr for ObjectKind {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "function" | "functions" => Ok(ObjectKind::Function),
            "event" | "events" => Ok(ObjectKind::Event),
            "enum" | "enums" => Ok(ObjectKind::Enum),
            _ => Err(MetadataError::UnsupportedSearchType {
                kind: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A callable exposed by an extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Sigil-prefixed name, e.g. `$sendMessage`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    /// Fields the matcher does not look at (args, output, version, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FunctionRecord {
    /// The primary name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().flatten().map(String::as_str))
    }
}

/// A gateway event an extension can listen for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One named enum and its allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub name: String,
    pub values: Vec<String>,
}

/// Enum document: a JSON object from enum name to value list.
///
/// Entries keep the order they appear in the document, which is the order
/// the matcher scans values in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumTable {
    entries: Vec<EnumDefinition>,
}

impl EnumTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an enum, keeping the position of an existing name.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.values = values,
            None => self.entries.push(EnumDefinition { name, values }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnumDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Vec<String>)> for EnumTable {
    fn from_iter<I: IntoIterator<Item = (N, Vec<String>)>>(iter: I) -> Self {
        let mut table = EnumTable::new();
        for (name, values) in iter {
            table.insert(name, values);
        }
        table
    }
}

impl Serialize for EnumTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EnumTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EnumTableVisitor;

        impl<'de> Visitor<'de> for EnumTableVisitor {
            type Value = EnumTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping enum names to arrays of strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<EnumTable, A::Error> {
                let mut table = EnumTable::new();
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    table.insert(name, values);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(EnumTableVisitor)
    }
}

/// A fetched or cached metadata document.
///
/// Serializes to the exact shape of the remote document. Deserialization is
/// always directed by an [`ObjectKind`] since function and event arrays are
/// structurally ambiguous.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObjectCollection {
    Functions(Vec<FunctionRecord>),
    Events(Vec<EventRecord>),
    Enums(EnumTable),
}

impl ObjectCollection {
    /// Parse a document body as the shape `kind` requires.
    pub fn from_json_str(kind: ObjectKind, body: &str) -> serde_json::Result<Self> {
        match kind {
            ObjectKind::Function => serde_json::from_str(body).map(ObjectCollection::Functions),
            ObjectKind::Event => serde_json::from_str(body).map(ObjectCollection::Events),
            ObjectKind::Enum => serde_json::from_str(body).map(ObjectCollection::Enums),
        }
    }

    /// Interpret an already-parsed JSON value as the shape `kind` requires.
    pub fn from_value(kind: ObjectKind, value: Value) -> serde_json::Result<Self> {
        match kind {
            ObjectKind::Function => serde_json::from_value(value).map(ObjectCollection::Functions),
            ObjectKind::Event => serde_json::from_value(value).map(ObjectCollection::Events),
            ObjectKind::Enum => serde_json::from_value(value).map(ObjectCollection::Enums),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectCollection::Functions(_) => ObjectKind::Function,
            ObjectCollection::Events(_) => ObjectKind::Event,
            ObjectCollection::Enums(_) => ObjectKind::Enum,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ObjectCollection::Functions(records) => records.len(),
            ObjectCollection::Events(records) => records.len(),
            ObjectCollection::Enums(table) => table.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
