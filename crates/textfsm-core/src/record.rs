use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

/// One element of a `List` column.
///
/// A plain capture contributes its matched text; a pattern with nested
/// named groups contributes a map keyed by group name, in group order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ListItem {
    Text(String),
    Map(IndexMap<String, String>),
}

impl fmt::Display for ListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListItem::Text(text) => f.write_str(text),
            ListItem::Map(map) => {
                write!(f, "{}", map.iter().map(|(k, v)| format!("{k}={v}")).join(" "))
            }
        }
    }
}

/// One cell of an emitted record: scalar text, or the accumulated items of
/// a `List` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecordValue {
    Text(String),
    List(Vec<ListItem>),
}

impl RecordValue {
    /// Empty text or an empty list; what `Required` treats as missing.
    pub fn is_empty(&self) -> bool {
        match self {
            RecordValue::Text(text) => text.is_empty(),
            RecordValue::List(items) => items.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RecordValue::Text(text) => Some(text),
            RecordValue::List(_) => None,
        }
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Text(text) => f.write_str(text),
            RecordValue::List(items) => write!(f, "{}", items.iter().join(", ")),
        }
    }
}

impl From<&str> for RecordValue {
    fn from(text: &str) -> Self {
        RecordValue::Text(text.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(text: String) -> Self {
        RecordValue::Text(text)
    }
}

/// One emitted row, parallel to the template header.
pub type Record = Vec<RecordValue>;
