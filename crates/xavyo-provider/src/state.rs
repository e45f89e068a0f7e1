//! Desired state and field schema
//!
//! [`DesiredState`] records, per field, whether the caller has an opinion.
//! A key holding `null` is an explicit "clear this field"; a missing key
//! means "leave whatever the platform has". Serializers rely on that
//! distinction to build partial updates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};

/// Value type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Bool,
    Integer,
    StringList,
    Object,
}

impl FieldKind {
    /// Whether `value` has this kind. `null` is handled by callers.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldKind::Object => value.is_object(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Bool => "bool",
            FieldKind::Integer => "integer",
            FieldKind::StringList => "list of strings",
            FieldKind::Object => "object",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field participates in writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldMode {
    /// Must be present (and non-null) on create.
    Required,
    Optional,
    /// Sent on create only; later changes require replacing the object.
    CreateOnly,
    /// Assigned by the platform; never sent.
    Computed,
}

/// Which write a payload is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteIntent {
    Create,
    Update,
}

/// One field of a resource schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name in desired state.
    pub name: &'static str,
    /// Name in the wire representation.
    pub wire_name: &'static str,
    pub kind: FieldKind,
    pub mode: FieldMode,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind, mode: FieldMode) -> Self {
        Self {
            name,
            wire_name: name,
            kind,
            mode,
        }
    }

    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, FieldMode::Required)
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, FieldMode::Optional)
    }

    pub const fn create_only(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, FieldMode::CreateOnly)
    }

    pub const fn computed(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, FieldMode::Computed)
    }

    /// Use a different name on the wire (e.g. `displayName` for `display_name`).
    #[must_use]
    pub const fn wire(mut self, wire_name: &'static str) -> Self {
        self.wire_name = wire_name;
        self
    }

    /// Whether this field is part of a payload for `intent`.
    pub fn is_sent_on(&self, intent: WriteIntent) -> bool {
        match self.mode {
            FieldMode::Required | FieldMode::Optional => true,
            FieldMode::CreateOnly => intent == WriteIntent::Create,
            FieldMode::Computed => false,
        }
    }
}

/// Caller-owned description of one object instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredState {
    fields: BTreeMap<String, Value>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`DesiredState::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Record an opinion for `name`. Setting `Value::Null` is an explicit clear.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Explicitly clear `name` on the platform.
    pub fn clear(&mut self, name: impl Into<String>) {
        self.fields.insert(name.into(), Value::Null);
    }

    /// Drop any opinion about `name`.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Present with an explicit `null`.
    pub fn is_cleared(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(Value::Null))
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_strings(&self, name: &str) -> Option<Vec<&str>> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check this state against `fields` before anything is sent.
    ///
    /// Rejects unknown field names, values of the wrong kind, and required
    /// fields that are missing on create or cleared on any write.
    pub fn validate(
        &self,
        resource: &str,
        fields: &[FieldSpec],
        intent: WriteIntent,
    ) -> ProviderResult<()> {
        let invalid = |message: String| ProviderError::InvalidState {
            resource: resource.to_string(),
            message,
        };

        for name in self.fields.keys() {
            if !fields.iter().any(|spec| spec.name == name.as_str()) {
                return Err(invalid(format!("unknown field '{name}'")));
            }
        }

        for spec in fields {
            match self.fields.get(spec.name) {
                None if spec.mode == FieldMode::Required && intent == WriteIntent::Create => {
                    return Err(invalid(format!("missing required field '{}'", spec.name)));
                }
                None => {}
                Some(Value::Null) if spec.mode == FieldMode::Required => {
                    return Err(invalid(format!(
                        "required field '{}' cannot be cleared",
                        spec.name
                    )));
                }
                Some(Value::Null) => {}
                Some(value) if !spec.kind.accepts(value) => {
                    return Err(invalid(format!(
                        "field '{}' must be a {}",
                        spec.name, spec.kind
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, Value)> for DesiredState {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
