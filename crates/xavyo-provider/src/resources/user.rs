use crate::client::{ApiVersion, Endpoint};
use crate::query::DataSource;
use crate::resource::ResourceAdapter;
use crate::state::{FieldKind, FieldSpec};

const USERS_PATH: &str = "/admin/users";

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("email", FieldKind::String),
    FieldSpec::optional("display_name", FieldKind::String),
    FieldSpec::optional("first_name", FieldKind::String),
    FieldSpec::optional("last_name", FieldKind::String),
    FieldSpec::optional("is_active", FieldKind::Bool),
    FieldSpec::optional("roles", FieldKind::StringList),
    FieldSpec::computed("status", FieldKind::String),
    FieldSpec::computed("email_verified", FieldKind::Bool),
    FieldSpec::computed("created_at", FieldKind::String),
    FieldSpec::computed("updated_at", FieldKind::String),
];

/// Tenant user account (`xavyo_user`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UserResource;

impl ResourceAdapter for UserResource {
    fn type_name(&self) -> &'static str {
        "xavyo_user"
    }

    fn collection(&self) -> Endpoint {
        Endpoint::new(ApiVersion::V1, USERS_PATH)
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }
}

/// Filterable list of users (`xavyo_users`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UsersDataSource;

impl DataSource for UsersDataSource {
    fn type_name(&self) -> &'static str {
        "xavyo_users"
    }

    fn collection(&self) -> Endpoint {
        Endpoint::new(ApiVersion::V1, USERS_PATH)
    }

    fn items_key(&self) -> &'static str {
        "users"
    }
}
