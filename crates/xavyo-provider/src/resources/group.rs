use crate::client::{ApiVersion, Endpoint};
use crate::query::DataSource;
use crate::resource::ResourceAdapter;
use crate::state::{FieldKind, FieldSpec};

const GROUPS_PATH: &str = "/admin/groups";

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("display_name", FieldKind::String),
    FieldSpec::optional("description", FieldKind::String),
    FieldSpec::optional("parent_id", FieldKind::String),
    FieldSpec::create_only("group_type", FieldKind::String),
    FieldSpec::computed("member_count", FieldKind::Integer),
    FieldSpec::computed("created_at", FieldKind::String),
    FieldSpec::computed("updated_at", FieldKind::String),
];

/// Tenant group (`xavyo_group`).
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupResource;

impl ResourceAdapter for GroupResource {
    fn type_name(&self) -> &'static str {
        "xavyo_group"
    }

    fn collection(&self) -> Endpoint {
        Endpoint::new(ApiVersion::V1, GROUPS_PATH)
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }
}

/// Filterable list of groups (`xavyo_groups`).
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupsDataSource;

impl DataSource for GroupsDataSource {
    fn type_name(&self) -> &'static str {
        "xavyo_groups"
    }

    fn collection(&self) -> Endpoint {
        Endpoint::new(ApiVersion::V1, GROUPS_PATH)
    }

    fn items_key(&self) -> &'static str {
        "groups"
    }
}
