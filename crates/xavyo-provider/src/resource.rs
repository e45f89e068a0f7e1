//! Per-type resource adapters
//!
//! A [`ResourceAdapter`] is the only code that differs between object
//! types: where the collection lives, which API generation serves it, and
//! the field table mapping desired state onto the wire. The generic
//! serialization below covers the common case; adapters override a method
//! only when their payload shape really differs.

use serde_json::{Map, Value};

use crate::client::{Endpoint, HttpMethod};
use crate::state::{DesiredState, FieldMode, FieldSpec, WriteIntent};
use crate::wire::{ObjectId, WireObject};

/// A wire value that could not be written back into desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Serialization and endpoint contract for one object type.
pub trait ResourceAdapter: Send + Sync {
    /// Stable type name used in errors and logs, e.g. `xavyo_user`.
    fn type_name(&self) -> &'static str;

    /// Collection endpoint; create posts here, members live beneath it.
    fn collection(&self) -> Endpoint;

    /// Field table, in the order drift is reported.
    fn fields(&self) -> &'static [FieldSpec];

    /// Verb used for updates.
    ///
    /// `PATCH` sends only the fields present in desired state. `PUT`
    /// replaces the whole object, so the reconciler merges desired fields
    /// over the current remote representation first.
    fn update_method(&self) -> HttpMethod {
        HttpMethod::Patch
    }

    /// Wire member holding the server-assigned identifier.
    fn id_field(&self) -> &'static str {
        "id"
    }

    fn member(&self, id: &ObjectId) -> Endpoint {
        self.collection().child(id.as_str())
    }

    /// Build the write payload for `intent`.
    ///
    /// Fields absent from `state` are omitted, never defaulted. Explicit
    /// clears go out as `null`.
    fn serialize(&self, state: &DesiredState, intent: WriteIntent) -> Map<String, Value> {
        let mut payload = Map::new();
        for spec in self.fields() {
            if !spec.is_sent_on(intent) {
                continue;
            }
            if let Some(value) = state.get(spec.name) {
                payload.insert(spec.wire_name.to_string(), value.clone());
            }
        }
        payload
    }

    /// Full replacement payload: `current` with desired fields laid over it.
    ///
    /// Computed and create-only members of `current` are dropped since the
    /// platform owns them.
    fn serialize_replacement(
        &self,
        state: &DesiredState,
        current: &WireObject,
    ) -> Map<String, Value> {
        let mut payload = current.attributes.clone();
        for spec in self.fields() {
            if matches!(spec.mode, FieldMode::Computed | FieldMode::CreateOnly) {
                payload.remove(spec.wire_name);
            }
        }
        payload.extend(self.serialize(state, WriteIntent::Update));
        payload
    }

    /// Decode a success body into a wire object.
    fn deserialize(&self, body: Value) -> Result<WireObject, String> {
        WireObject::from_value(body, self.id_field())
    }

    /// Map a wire object back into desired state.
    ///
    /// Members the platform did not return stay absent. A member of the
    /// wrong type is an error, not a silent skip.
    fn flatten(&self, object: &WireObject) -> Result<DesiredState, FieldError> {
        let mut state = DesiredState::new();
        for spec in self.fields() {
            let Some(value) = object.get(spec.wire_name) else {
                continue;
            };
            if !value.is_null() && !spec.kind.accepts(value) {
                return Err(FieldError {
                    field: spec.name.to_string(),
                    message: format!("expected {} but platform returned {value}", spec.kind),
                });
            }
            state.set(spec.name, value.clone());
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiVersion;
    use crate::state::FieldKind;
    use serde_json::json;

    struct Widget;

    impl ResourceAdapter for Widget {
        fn type_name(&self) -> &'static str {
            "xavyo_widget"
        }

        fn collection(&self) -> Endpoint {
            Endpoint::new(ApiVersion::V2, "/widgets")
        }

        fn fields(&self) -> &'static [FieldSpec] {
            const FIELDS: &[FieldSpec] = &[
                FieldSpec::required("name", FieldKind::String),
                FieldSpec::optional("display_name", FieldKind::String).wire("displayName"),
                FieldSpec::optional("size", FieldKind::Integer),
                FieldSpec::create_only("flavor", FieldKind::String),
                FieldSpec::computed("created_at", FieldKind::String).wire("createdAt"),
            ];
            FIELDS
        }
    }

    fn wire(value: Value) -> WireObject {
        WireObject::from_value(value, "id").unwrap()
    }

    #[test]
    fn test_member_endpoint() {
        let id = ObjectId::new("w-1").unwrap();
        assert_eq!(Widget.member(&id).path(), "/api/v2/widgets/w-1");
    }

    #[test]
    fn test_serialize_omits_absent_fields() {
        let state = DesiredState::new().with("size", 3);
        let payload = Widget.serialize(&state, WriteIntent::Update);
        assert_eq!(Value::Object(payload), json!({"size": 3}));
    }

    #[test]
    fn test_serialize_sends_explicit_clear_as_null() {
        let mut state = DesiredState::new();
        state.clear("display_name");
        let payload = Widget.serialize(&state, WriteIntent::Update);
        assert_eq!(Value::Object(payload), json!({"displayName": null}));
    }

    #[test]
    fn test_create_only_and_computed() {
        let state = DesiredState::new()
            .with("name", "w")
            .with("flavor", "mint")
            .with("created_at", "2024-01-01T00:00:00Z");
        let create = Widget.serialize(&state, WriteIntent::Create);
        assert_eq!(Value::Object(create), json!({"name": "w", "flavor": "mint"}));

        let update = Widget.serialize(&state, WriteIntent::Update);
        assert_eq!(Value::Object(update), json!({"name": "w"}));
    }

    #[test]
    fn test_replacement_keeps_unset_remote_fields() {
        let current = wire(json!({
            "id": "w-1",
            "name": "old",
            "displayName": "Old",
            "size": 2,
            "flavor": "mint",
            "createdAt": "2024-01-01T00:00:00Z",
        }));
        let state = DesiredState::new().with("name", "new");
        let payload = Widget.serialize_replacement(&state, &current);
        assert_eq!(
            Value::Object(payload),
            json!({"name": "new", "displayName": "Old", "size": 2})
        );
    }

    #[test]
    fn test_flatten_maps_wire_names() {
        let object = wire(json!({
            "id": "w-1",
            "name": "w",
            "displayName": null,
            "createdAt": "2024-01-01T00:00:00Z",
            "extra": true,
        }));
        let state = Widget.flatten(&object).unwrap();
        assert_eq!(state.get_str("name"), Some("w"));
        assert!(state.is_cleared("display_name"));
        assert!(!state.is_set("size"));
        assert_eq!(state.get_str("created_at"), Some("2024-01-01T00:00:00Z"));
        assert!(!state.is_set("extra"));
    }

    #[test]
    fn test_flatten_surfaces_type_mismatch() {
        let object = wire(json!({"id": "w-1", "name": "w", "size": "large"}));
        let err = Widget.flatten(&object).unwrap_err();
        assert_eq!(err.field, "size");
        assert!(err.message.contains("integer"));
    }
}
