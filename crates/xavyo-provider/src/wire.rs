//! Wire representation of platform objects.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-assigned, immutable object identifier.
///
/// Never blank, and never `.` or `..`: URL path normalisation would turn
/// those into the collection endpoint instead of a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Returns `None` for an identifier that cannot name a member.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() || id == "." || id == ".." {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ObjectId {
    type Error = String;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        ObjectId::new(id.clone()).ok_or_else(|| format!("invalid object identifier '{id}'"))
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An object as the platform serializes it: identifier plus attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct WireObject {
    pub id: ObjectId,
    /// Every other top-level member of the JSON object.
    pub attributes: Map<String, Value>,
}

impl WireObject {
    pub fn new(id: ObjectId, attributes: Map<String, Value>) -> Self {
        Self { id, attributes }
    }

    /// Split a JSON object into identifier and attributes.
    ///
    /// Numeric identifiers are accepted and kept in their decimal form.
    pub fn from_value(value: Value, id_field: &str) -> Result<Self, String> {
        let Value::Object(mut attributes) = value else {
            return Err("expected a JSON object".to_string());
        };
        let id = match attributes.remove(id_field) {
            Some(Value::String(s)) => ObjectId::new(s),
            Some(Value::Number(n)) => ObjectId::new(n.to_string()),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(format!(
                    "identifier '{id_field}' has unsupported type: {other}"
                ))
            }
        };
        let id = id.ok_or_else(|| format!("missing identifier '{id_field}'"))?;
        Ok(Self { id, attributes })
    }

    pub fn get(&self, wire_name: &str) -> Option<&Value> {
        self.attributes.get(wire_name)
    }

    /// JSON form with the identifier written back under `id_field`.
    pub fn to_value(&self, id_field: &str) -> Value {
        let mut object = self.attributes.clone();
        object.insert(id_field.to_string(), Value::String(self.id.0.clone()));
        Value::Object(object)
    }
}
