use crate::client::{ApiVersion, Endpoint, HttpMethod};
use crate::resource::ResourceAdapter;
use crate::state::{FieldKind, FieldSpec};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::String),
    FieldSpec::required("effect", FieldKind::String),
    FieldSpec::optional("description", FieldKind::String),
    FieldSpec::optional("priority", FieldKind::Integer),
    FieldSpec::optional("resource_type", FieldKind::String),
    FieldSpec::optional("action", FieldKind::String),
    FieldSpec::optional("status", FieldKind::String),
    FieldSpec::computed("created_at", FieldKind::String),
    FieldSpec::computed("updated_at", FieldKind::String),
];

/// Authorization policy (`xavyo_policy`), served by the v2 API.
///
/// The v2 policy endpoint only accepts full replacements.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyResource;

impl ResourceAdapter for PolicyResource {
    fn type_name(&self) -> &'static str {
        "xavyo_policy"
    }

    fn collection(&self) -> Endpoint {
        Endpoint::new(ApiVersion::V2, "/authorization/policies")
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn update_method(&self) -> HttpMethod {
        HttpMethod::Put
    }
}
