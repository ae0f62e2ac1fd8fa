use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{Sqlite, SqliteArguments};
use std::fmt;

/// Primary key or index value of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreKey {
    Int(i64),
    Text(String),
}

impl StoreKey {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(StoreKey::Int),
            Value::String(s) => Some(StoreKey::Text(s.clone())),
            Value::Bool(b) => Some(StoreKey::Int(i64::from(*b))),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            StoreKey::Int(v) => Value::from(*v),
            StoreKey::Text(v) => Value::from(v.clone()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StoreKey::Int(v) => Some(*v),
            StoreKey::Text(_) => None,
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKey::Int(v) => write!(f, "{}", v),
            StoreKey::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for StoreKey {
    fn from(value: i64) -> Self {
        StoreKey::Int(value)
    }
}

impl From<bool> for StoreKey {
    fn from(value: bool) -> Self {
        StoreKey::Int(i64::from(value))
    }
}

impl From<String> for StoreKey {
    fn from(value: String) -> Self {
        StoreKey::Text(value)
    }
}

impl From<&str> for StoreKey {
    fn from(value: &str) -> Self {
        StoreKey::Text(value.to_string())
    }
}

impl From<&String> for StoreKey {
    fn from(value: &String) -> Self {
        StoreKey::Text(value.clone())
    }
}

pub(crate) fn bind_key<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    key: &StoreKey,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match key {
        StoreKey::Int(v) => query.bind(*v),
        StoreKey::Text(v) => query.bind(v.clone()),
    }
}

pub(crate) fn bind_key_as<'q, O>(
    query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    key: &StoreKey,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    match key {
        StoreKey::Int(v) => query.bind(*v),
        StoreKey::Text(v) => query.bind(v.clone()),
    }
}

/// Reads a dotted key path (`guest.id`) out of a JSON record.
pub(crate) fn read_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, segment| current.get(segment))
        .filter(|value| !value.is_null())
}

/// Writes a dotted key path, creating intermediate objects as needed.
pub(crate) fn write_path(record: &mut Value, path: &str, value: Value) -> bool {
    let mut current = record;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(map) = current.as_object_mut() else {
            return false;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return true;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_nested_paths_and_skips_null() {
        let record = json!({"id": 4, "meta": {"parent": "w-1"}, "gone": null});
        assert_eq!(read_path(&record, "id"), Some(&json!(4)));
        assert_eq!(read_path(&record, "meta.parent"), Some(&json!("w-1")));
        assert_eq!(read_path(&record, "gone"), None);
        assert_eq!(read_path(&record, "missing.path"), None);
    }

    #[test]
    fn writes_nested_paths() {
        let mut record = json!({"name": "x"});
        assert!(write_path(&mut record, "id", json!(7)));
        assert!(write_path(&mut record, "a.b", json!("c")));
        assert_eq!(record, json!({"name": "x", "id": 7, "a": {"b": "c"}}));
    }

    #[test]
    fn keys_convert_from_json() {
        assert_eq!(StoreKey::from_json(&json!(3)), Some(StoreKey::Int(3)));
        assert_eq!(
            StoreKey::from_json(&json!("g-1")),
            Some(StoreKey::Text("g-1".into()))
        );
        assert_eq!(StoreKey::from_json(&json!({"a": 1})), None);
    }
}
