//! Reconciliation state machine
//!
//! One generic lifecycle shared by every resource type:
//!
//! ```text
//! Absent -> Creating -> Present -> (Updating -> Present)* -> Deleting -> Absent
//!                       Present -> Reading -> Present
//! ```
//!
//! Every write is followed by a mandatory Read so server-assigned and
//! defaulted fields are captured. NotFound is absence on Read, success on
//! Delete, and a hard failure everywhere else. Nothing is retried.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::client::{ApiClient, CallContext, Endpoint, HttpMethod, RawResponse};
use crate::drift::{self, DriftReport};
use crate::error::{ApiError, ErrorKind, Operation, ProviderError, ProviderResult};
use crate::resource::ResourceAdapter;
use crate::state::{DesiredState, WriteIntent};
use crate::wire::{ObjectId, WireObject};

/// Lifecycle phase of a [`Binding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Absent,
    Creating,
    Present,
    Reading,
    Updating,
    Deleting,
}

/// Desired state together with the identifier it is bound to.
///
/// The identifier is never invented locally: it comes from a successful
/// create, an import, or a previous reconciliation the caller persisted.
/// `state` only ever holds what the caller set; what the platform reported
/// lives in [`Binding::last_observed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    id: Option<ObjectId>,
    state: DesiredState,
    phase: Phase,
    observed: Option<Snapshot>,
}

impl Binding {
    /// Unbound state for an object that does not exist yet.
    pub fn new(state: DesiredState) -> Self {
        Self {
            id: None,
            state,
            phase: Phase::Absent,
            observed: None,
        }
    }

    /// Rebuild a binding from an identifier recorded by an earlier run.
    pub fn restore(id: ObjectId, state: DesiredState) -> Self {
        Self {
            id: Some(id),
            state,
            phase: Phase::Present,
            observed: None,
        }
    }

    pub fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }

    pub fn state(&self) -> &DesiredState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DesiredState {
        &mut self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_bound(&self) -> bool {
        self.id.is_some()
    }

    /// Snapshot from the most recent successful read of the bound object.
    pub fn last_observed(&self) -> Option<&Snapshot> {
        self.observed.as_ref()
    }

    fn unbind(&mut self) {
        self.id = None;
        self.phase = Phase::Absent;
        self.observed = None;
    }
}

/// A wire object and its field-mapped desired state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub object: WireObject,
    pub state: DesiredState,
}

impl Snapshot {
    pub fn id(&self) -> &ObjectId {
        &self.object.id
    }
}

/// Outcome of a Read.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Present(Snapshot),
    /// The platform reports NotFound; the caller should drop its identifier.
    Absent,
}

impl Observed {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Observed::Present(snapshot) => Some(snapshot),
            Observed::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Observed::Absent)
    }
}

/// Outcome of a Delete. Both variants satisfy the caller's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    AlreadyAbsent,
}

/// What it would take to converge a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Create,
    NoChange,
    Update(DriftReport),
}

/// Generic reconciler for one resource type.
pub struct Reconciler<A> {
    client: Arc<ApiClient>,
    adapter: A,
}

impl<A: ResourceAdapter> Reconciler<A> {
    pub fn new(client: Arc<ApiClient>, adapter: A) -> Self {
        Self { client, adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Create the object, then read it back.
    pub async fn create(
        &self,
        state: &DesiredState,
        ctx: &CallContext,
    ) -> ProviderResult<Snapshot> {
        let id = self.create_object(state, ctx).await?;
        self.read_back(Operation::Create, &id, ctx).await
    }

    /// Read by identifier. NotFound is reported as [`Observed::Absent`].
    pub async fn read(&self, id: &ObjectId, ctx: &CallContext) -> ProviderResult<Observed> {
        self.fetch(Operation::Read, id, ctx).await
    }

    /// Send the fields present in `state`, then read the object back.
    pub async fn update(
        &self,
        id: &ObjectId,
        state: &DesiredState,
        ctx: &CallContext,
    ) -> ProviderResult<Snapshot> {
        self.write_update(id, state, ctx).await?;
        self.read_back(Operation::Update, id, ctx).await
    }

    /// Delete by identifier. A missing object counts as deleted.
    pub async fn delete(&self, id: &ObjectId, ctx: &CallContext) -> ProviderResult<Deletion> {
        let endpoint = self.adapter.member(id);
        match self
            .send(Operation::Delete, Some(id), HttpMethod::Delete, &endpoint, None, ctx)
            .await
        {
            Ok(_) => {
                info!(resource = self.adapter.type_name(), id = %id, "Object deleted");
                Ok(Deletion::Deleted)
            }
            Err(e) if e.is_not_found() => {
                info!(
                    resource = self.adapter.type_name(),
                    id = %id,
                    "Object already absent, delete satisfied"
                );
                Ok(Deletion::AlreadyAbsent)
            }
            Err(e) => Err(e),
        }
    }

    /// Read an object this engine did not create. Absence is an error.
    pub async fn import(&self, id: &ObjectId, ctx: &CallContext) -> ProviderResult<Snapshot> {
        match self.fetch(Operation::Import, id, ctx).await? {
            Observed::Present(snapshot) => {
                info!(resource = self.adapter.type_name(), id = %id, "Object imported");
                Ok(snapshot)
            }
            Observed::Absent => Err(self.vanished(Operation::Import, id, "nothing to import")),
        }
    }

    /// Read the bound object and compare it with the binding's state.
    pub async fn plan(&self, binding: &Binding, ctx: &CallContext) -> ProviderResult<Plan> {
        let Some(id) = binding.id() else {
            return Ok(Plan::Create);
        };
        match self.read(id, ctx).await? {
            Observed::Absent => Ok(Plan::Create),
            Observed::Present(snapshot) => {
                let fields = self.adapter.fields();
                let report = drift::detect(binding.state(), &snapshot.state, fields);
                if report.is_empty() {
                    Ok(Plan::NoChange)
                } else {
                    debug!(
                        resource = self.adapter.type_name(),
                        id = %id,
                        fields = ?report.fields().collect::<Vec<_>>(),
                        "Drift detected"
                    );
                    Ok(Plan::Update(report))
                }
            }
        }
    }

    /// Create the binding's object and bind it.
    ///
    /// The identifier is recorded as soon as the platform assigns it, so a
    /// failed read-back leaves the binding pointing at the new object.
    pub async fn apply_create(
        &self,
        binding: &mut Binding,
        ctx: &CallContext,
    ) -> ProviderResult<Snapshot> {
        if let Some(id) = binding.id() {
            return Err(self.precondition(
                Operation::Create,
                format!("already bound to {id}"),
            ));
        }

        binding.phase = Phase::Creating;
        let id = match self.create_object(&binding.state, ctx).await {
            Ok(id) => id,
            Err(e) => {
                binding.phase = Phase::Absent;
                return Err(e);
            }
        };
        binding.id = Some(id.clone());
        binding.phase = Phase::Reading;

        let result = self.read_back(Operation::Create, &id, ctx).await;
        binding.phase = Phase::Present;
        let snapshot = result?;
        binding.observed = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Re-read the bound object. Absence unbinds.
    pub async fn refresh(
        &self,
        binding: &mut Binding,
        ctx: &CallContext,
    ) -> ProviderResult<Observed> {
        let id = self.bound_id(binding, Operation::Read)?;

        binding.phase = Phase::Reading;
        let result = self.read(&id, ctx).await;
        binding.phase = Phase::Present;

        let observed = result?;
        match &observed {
            Observed::Present(snapshot) => binding.observed = Some(snapshot.clone()),
            Observed::Absent => {
                warn!(
                    resource = self.adapter.type_name(),
                    id = %id,
                    "Object no longer exists, clearing identifier"
                );
                binding.unbind();
            }
        }
        Ok(observed)
    }

    /// Push the binding's state to the bound object.
    pub async fn apply_update(
        &self,
        binding: &mut Binding,
        ctx: &CallContext,
    ) -> ProviderResult<Snapshot> {
        let id = self.bound_id(binding, Operation::Update)?;

        binding.phase = Phase::Updating;
        if let Err(e) = self.write_update(&id, &binding.state, ctx).await {
            binding.phase = Phase::Present;
            return Err(e);
        }

        binding.phase = Phase::Reading;
        let result = self.read_back(Operation::Update, &id, ctx).await;
        binding.phase = Phase::Present;
        let snapshot = result?;
        binding.observed = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Delete the bound object. The identifier is kept if the delete fails.
    pub async fn destroy(
        &self,
        binding: &mut Binding,
        ctx: &CallContext,
    ) -> ProviderResult<Deletion> {
        let id = self.bound_id(binding, Operation::Delete)?;

        binding.phase = Phase::Deleting;
        match self.delete(&id, ctx).await {
            Ok(outcome) => {
                binding.unbind();
                Ok(outcome)
            }
            Err(e) => {
                binding.phase = Phase::Present;
                Err(e)
            }
        }
    }

    /// Import an existing object as a new binding.
    pub async fn import_into(&self, id: &ObjectId, ctx: &CallContext) -> ProviderResult<Binding> {
        let snapshot = self.import(id, ctx).await?;
        Ok(Binding {
            id: Some(snapshot.object.id.clone()),
            state: snapshot.state.clone(),
            phase: Phase::Present,
            observed: Some(snapshot),
        })
    }

    async fn create_object(
        &self,
        state: &DesiredState,
        ctx: &CallContext,
    ) -> ProviderResult<ObjectId> {
        let resource = self.adapter.type_name();
        state.validate(resource, self.adapter.fields(), WriteIntent::Create)?;

        let body = Value::Object(self.adapter.serialize(state, WriteIntent::Create));
        let endpoint = self.adapter.collection();
        let response = self
            .send(Operation::Create, None, HttpMethod::Post, &endpoint, Some(&body), ctx)
            .await?;

        let created = self.decode(Operation::Create, None, &response.body)?;
        info!(resource, id = %created.id, "Object created");
        Ok(created.id)
    }

    async fn write_update(
        &self,
        id: &ObjectId,
        state: &DesiredState,
        ctx: &CallContext,
    ) -> ProviderResult<()> {
        let resource = self.adapter.type_name();
        state.validate(resource, self.adapter.fields(), WriteIntent::Update)?;

        let method = self.adapter.update_method();
        let payload = match method {
            HttpMethod::Put => match self.fetch(Operation::Update, id, ctx).await? {
                Observed::Present(current) => {
                    self.adapter.serialize_replacement(state, &current.object)
                }
                Observed::Absent => {
                    return Err(self.vanished(Operation::Update, id, "object does not exist"))
                }
            },
            _ => self.adapter.serialize(state, WriteIntent::Update),
        };

        if payload.is_empty() {
            debug!(resource, id = %id, "No fields to send, skipping write");
            return Ok(());
        }

        let body = Value::Object(payload);
        let endpoint = self.adapter.member(id);
        self.send(Operation::Update, Some(id), method, &endpoint, Some(&body), ctx)
            .await?;
        info!(resource, id = %id, method = %method, "Object updated");
        Ok(())
    }

    async fn fetch(
        &self,
        operation: Operation,
        id: &ObjectId,
        ctx: &CallContext,
    ) -> ProviderResult<Observed> {
        let endpoint = self.adapter.member(id);
        let response = match self
            .send(operation, Some(id), HttpMethod::Get, &endpoint, None, ctx)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                debug!(resource = self.adapter.type_name(), id = %id, "Object not found");
                return Ok(Observed::Absent);
            }
            Err(e) => return Err(e),
        };

        let object = self.decode(operation, Some(id), &response.body)?;
        if object.id != *id {
            warn!(
                resource = self.adapter.type_name(),
                requested = %id,
                returned = %object.id,
                "Platform returned a different identifier"
            );
        }
        self.snapshot(object).map(Observed::Present)
    }

    async fn read_back(
        &self,
        operation: Operation,
        id: &ObjectId,
        ctx: &CallContext,
    ) -> ProviderResult<Snapshot> {
        match self.fetch(operation, id, ctx).await? {
            Observed::Present(snapshot) => Ok(snapshot),
            Observed::Absent => Err(self.vanished(
                operation,
                id,
                "object disappeared before it could be read back",
            )),
        }
    }

    async fn send(
        &self,
        operation: Operation,
        id: Option<&ObjectId>,
        method: HttpMethod,
        endpoint: &Endpoint,
        body: Option<&Value>,
        ctx: &CallContext,
    ) -> ProviderResult<RawResponse> {
        let response = self
            .client
            .execute(method, endpoint, &[], body, ctx)
            .await
            .map_err(|failure| ProviderError::Transport {
                operation,
                resource: self.adapter.type_name().to_string(),
                id: id.map(ToString::to_string),
                failure,
            })?;

        if response.is_success() {
            return Ok(response);
        }
        Err(ProviderError::Api {
            operation,
            resource: self.adapter.type_name().to_string(),
            id: id.map(ToString::to_string),
            error: classify(response.status, &response.body),
        })
    }

    fn decode(
        &self,
        operation: Operation,
        id: Option<&ObjectId>,
        body: &str,
    ) -> ProviderResult<WireObject> {
        let decode_error = |message: String| ProviderError::Decode {
            operation,
            resource: self.adapter.type_name().to_string(),
            id: id.map(ToString::to_string),
            message,
        };
        let value: Value = serde_json::from_str(body)
            .map_err(|e| decode_error(format!("response is not JSON: {e}")))?;
        self.adapter.deserialize(value).map_err(decode_error)
    }

    fn snapshot(&self, object: WireObject) -> ProviderResult<Snapshot> {
        let state = self
            .adapter
            .flatten(&object)
            .map_err(|e| ProviderError::FieldAssignment {
                resource: self.adapter.type_name().to_string(),
                id: Some(object.id.to_string()),
                field: e.field,
                message: e.message,
            })?;
        Ok(Snapshot { object, state })
    }

    fn bound_id(&self, binding: &Binding, operation: Operation) -> ProviderResult<ObjectId> {
        binding
            .id
            .clone()
            .ok_or_else(|| self.precondition(operation, "binding has no identifier".to_string()))
    }

    fn precondition(&self, operation: Operation, message: String) -> ProviderError {
        ProviderError::Precondition {
            operation,
            resource: self.adapter.type_name().to_string(),
            message,
        }
    }

    fn vanished(&self, operation: Operation, id: &ObjectId, message: &str) -> ProviderError {
        ProviderError::Api {
            operation,
            resource: self.adapter.type_name().to_string(),
            id: Some(id.to_string()),
            error: ApiError::new(ErrorKind::NotFound, ErrorKind::NotFound.code(), message, 404),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiVersion;
    use crate::config::ProviderConfig;
    use crate::state::{FieldKind, FieldSpec};
    use serde_json::json;

    struct Team;

    impl ResourceAdapter for Team {
        fn type_name(&self) -> &'static str {
            "xavyo_team"
        }

        fn collection(&self) -> Endpoint {
            Endpoint::new(ApiVersion::V1, "/teams")
        }

        fn fields(&self) -> &'static [FieldSpec] {
            const FIELDS: &[FieldSpec] = &[
                FieldSpec::required("name", FieldKind::String),
                FieldSpec::optional("size", FieldKind::Integer),
            ];
            FIELDS
        }
    }

    fn reconciler() -> Reconciler<Team> {
        let config = ProviderConfig::new("http://127.0.0.1:9", "token").unwrap();
        Reconciler::new(Arc::new(ApiClient::new(config).unwrap()), Team)
    }

    #[test]
    fn test_new_binding_is_absent() {
        let binding = Binding::new(DesiredState::new().with("name", "core"));
        assert_eq!(binding.phase(), Phase::Absent);
        assert!(!binding.is_bound());

        let restored = Binding::restore(ObjectId::new("t-1").unwrap(), DesiredState::new());
        assert_eq!(restored.phase(), Phase::Present);
        assert_eq!(restored.id().map(ObjectId::as_str), Some("t-1"));
    }

    #[test]
    fn test_decode_failures_are_structured() {
        let r = reconciler();
        let err = r.decode(Operation::Create, None, "").unwrap_err();
        assert!(matches!(err, ProviderError::Decode { .. }));

        let err = r
            .decode(Operation::Create, None, r#"{"name":"core"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("missing identifier"));
    }

    #[test]
    fn test_snapshot_surfaces_field_assignment_errors() {
        let r = reconciler();
        let object = WireObject::from_value(json!({"id": "t-1", "size": "big"}), "id").unwrap();
        let err = r.snapshot(object).unwrap_err();
        match err {
            ProviderError::FieldAssignment { field, id, .. } => {
                assert_eq!(field, "size");
                assert_eq!(id.as_deref(), Some("t-1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unbound_operations_fail_precondition() {
        let r = reconciler();
        let ctx = CallContext::background();
        let mut binding = Binding::new(DesiredState::new().with("name", "core"));

        let err = r.apply_update(&mut binding, &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Precondition {
                operation: Operation::Update,
                ..
            }
        ));
        assert!(r.destroy(&mut binding, &ctx).await.is_err());
        assert!(r.refresh(&mut binding, &ctx).await.is_err());
        assert_eq!(binding.phase(), Phase::Absent);
    }

    #[tokio::test]
    async fn test_create_on_bound_binding_is_rejected() {
        let r = reconciler();
        let mut binding = Binding::restore(
            ObjectId::new("t-1").unwrap(),
            DesiredState::new().with("name", "core"),
        );
        let err = r
            .apply_create(&mut binding, &CallContext::background())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already bound to t-1"));
        assert_eq!(binding.id().map(ObjectId::as_str), Some("t-1"));
    }

    #[tokio::test]
    async fn test_invalid_state_is_rejected_before_sending() {
        let r = reconciler();
        let mut binding = Binding::new(DesiredState::new().with("size", 3));
        let err = r
            .apply_create(&mut binding, &CallContext::background())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidState { .. }));
        assert!(!binding.is_bound());
        assert_eq!(binding.phase(), Phase::Absent);
    }

    #[tokio::test]
    async fn test_plan_for_unbound_is_create() {
        let r = reconciler();
        let binding = Binding::new(DesiredState::new().with("name", "core"));
        let plan = r.plan(&binding, &CallContext::background()).await.unwrap();
        assert_eq!(plan, Plan::Create);
    }
}
