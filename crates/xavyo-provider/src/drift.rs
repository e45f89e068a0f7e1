//! Drift detection
//!
//! Compares what the caller wants with what a Read observed. Only fields the
//! caller has an opinion on are compared; computed fields never drift.

use serde::Serialize;
use serde_json::Value;

use crate::state::{DesiredState, FieldMode, FieldSpec};

/// One field whose remote value differs from the desired one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub desired: Value,
    /// `None` when the platform did not report the field at all.
    pub actual: Option<Value>,
    /// The field can only be set at creation time.
    pub create_only: bool,
}

/// Field-level differences between desired and observed state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriftReport {
    changes: Vec<FieldChange>,
}

impl DriftReport {
    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.field.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether converging needs the object recreated rather than updated.
    pub fn requires_replacement(&self) -> bool {
        self.changes.iter().any(|c| c.create_only)
    }
}

/// Report every schema field set in `desired` whose observed value differs.
///
/// An explicit clear matches a field the platform omits or reports as null.
pub fn detect(
    desired: &DesiredState,
    observed: &DesiredState,
    fields: &[FieldSpec],
) -> DriftReport {
    let changes = fields
        .iter()
        .filter(|spec| spec.mode != FieldMode::Computed)
        .filter_map(|spec| {
            let wanted = desired.get(spec.name)?;
            let actual = observed.get(spec.name);
            let in_sync = match (wanted, actual) {
                (Value::Null, None | Some(Value::Null)) => true,
                (wanted, Some(actual)) => wanted == actual,
                (_, None) => false,
            };
            (!in_sync).then(|| FieldChange {
                field: spec.name.to_string(),
                desired: wanted.clone(),
                actual: actual.cloned(),
                create_only: spec.mode == FieldMode::CreateOnly,
            })
        })
        .collect();
    DriftReport { changes }
}
