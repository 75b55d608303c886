//! Typed records delivered to subscribers.
//!
//! A [`Record`] is one backend document: its identifier plus its field map.
//! The identifier always comes from the backend; a field named `id` inside the
//! stored data never overrides it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::DocumentSnapshot;

/// One document as seen by application code.
///
/// Serializes flat, with `id` next to the document's fields:
///
/// ```
/// use averzo_livedata::record::Record;
/// use serde_json::json;
///
/// let record = Record::from_value("p1", json!({"name": "Lamp", "id": "stale"}));
/// assert_eq!(record.id, "p1");
/// assert_eq!(
///     serde_json::to_value(&record).unwrap(),
///     json!({"id": "p1", "name": "Lamp"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The backend document identifier.
    pub id: String,

    /// The document's fields, without any `id` key.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Builds a record, dropping any `id` key from `fields`.
    pub fn new(id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Builds a record from a JSON value; non-object values yield no fields.
    pub fn from_value(id: impl Into<String>, value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::new(id, fields),
            _ => Self::new(id, Map::new()),
        }
    }

    /// Builds a record from an existing document snapshot.
    ///
    /// Returns `None` when the snapshot reports a missing document.
    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Option<Self> {
        snapshot
            .data
            .as_ref()
            .map(|data| Self::new(snapshot.id.clone(), data.clone()))
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == "id" {
            return None;
        }
        self.fields.get(field)
    }

    /// Returns the record as a single JSON object including `id`.
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(object)
    }

    /// Deserializes the record (with `id`) into an application type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_value())
    }
}
