use crate::client::{ApiVersion, Endpoint};
use crate::resource::ResourceAdapter;
use crate::state::{FieldKind, FieldSpec};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::String),
    FieldSpec::optional("description", FieldKind::String),
    FieldSpec::create_only("app_type", FieldKind::String),
    FieldSpec::optional("redirect_uris", FieldKind::StringList),
    FieldSpec::optional("enabled", FieldKind::Bool),
    FieldSpec::optional("metadata", FieldKind::Object),
    FieldSpec::computed("client_id", FieldKind::String),
    FieldSpec::computed("created_at", FieldKind::String),
];

/// Registered application (`xavyo_application`), served by the v2 API.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationResource;

impl ResourceAdapter for ApplicationResource {
    fn type_name(&self) -> &'static str {
        "xavyo_application"
    }

    fn collection(&self) -> Endpoint {
        Endpoint::new(ApiVersion::V2, "/applications")
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }
}
