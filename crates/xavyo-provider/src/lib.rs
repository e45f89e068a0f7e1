//! xavyo Provider
//!
//! Declarative reconciliation of xavyo platform objects (users, groups,
//! policies, applications) against the platform's REST API.
//!
//! The crate is one generic engine plus data-only adapters:
//!
//! - [`client`]: authenticated transport with tenant scoping
//! - [`classify`]: status and body to [`ErrorKind`]
//! - [`reconcile`]: the Create/Read/Update/Delete/Import state machine
//! - [`query`]: filtered, sorted, paginated list calls
//! - [`resources`]: the concrete resource types
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use xavyo_provider::prelude::*;
//! use xavyo_provider::resources::GroupResource;
//!
//! # async fn run() -> ProviderResult<()> {
//! let client = Arc::new(ApiClient::new(ProviderConfig::from_env()?)?);
//! let groups = Reconciler::new(client, GroupResource);
//!
//! let mut binding = Binding::new(DesiredState::new().with("display_name", "Engineering"));
//! let ctx = CallContext::background();
//! groups.apply_create(&mut binding, &ctx).await?;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod drift;
pub mod error;
pub mod logging;
pub mod query;
pub mod reconcile;
pub mod resource;
pub mod resources;
pub mod state;
pub mod wire;

pub use classify::classify;
pub use client::{ApiClient, ApiVersion, CallContext, Endpoint, HttpMethod, RawResponse};
pub use config::{ConfigError, ProviderConfig, TenantScope};
pub use drift::{DriftReport, FieldChange};
pub use error::{
    ApiError, ErrorKind, Operation, ProviderError, ProviderResult, TransportFailure,
    TransportFailureKind,
};
pub use query::{
    DataSource, FilterClause, FilterOperator, ListEnvelope, ListReader, QuerySpec, SortDirection,
};
pub use reconcile::{Binding, Deletion, Observed, Phase, Plan, Reconciler, Snapshot};
pub use resource::{FieldError, ResourceAdapter};
pub use state::{DesiredState, FieldKind, FieldMode, FieldSpec, WriteIntent};
pub use wire::{ObjectId, WireObject};

/// Common imports for driving reconciliations.
pub mod prelude {
    pub use crate::client::{ApiClient, CallContext};
    pub use crate::config::ProviderConfig;
    pub use crate::error::{ErrorKind, ProviderError, ProviderResult};
    pub use crate::query::{ListReader, QuerySpec};
    pub use crate::reconcile::{Binding, Deletion, Observed, Plan, Reconciler};
    pub use crate::state::DesiredState;
    pub use crate::wire::ObjectId;
}
