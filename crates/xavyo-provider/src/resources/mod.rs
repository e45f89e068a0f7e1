//! Concrete resource adapters and data sources.
//!
//! Each adapter is data only: an endpoint and a field table. All lifecycle
//! behavior comes from [`crate::reconcile::Reconciler`].

mod application;
mod group;
mod policy;
mod user;

pub use application::ApplicationResource;
pub use group::{GroupResource, GroupsDataSource};
pub use policy::PolicyResource;
pub use user::{UserResource, UsersDataSource};
