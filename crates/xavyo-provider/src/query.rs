//! Query builder and list reader
//!
//! A [`QuerySpec`] encodes conjunctive filters, an optional sort and one
//! offset-based page. [`ListReader::list`] returns exactly one page; paging
//! through a whole collection is left to the caller.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::client::{ApiClient, CallContext, Endpoint, HttpMethod};
use crate::error::{Operation, ProviderError, ProviderResult};
use crate::wire::WireObject;

/// Largest page the platform serves.
pub const MAX_PAGE_LIMIT: u32 = 1000;

pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Comparison applied by one filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Ne,
    Contains,
    StartsWith,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Filters, sort and one page window for a list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub filters: Vec<FilterClause>,
    pub sort: Option<Sort>,
    pub limit: u32,
    pub offset: u64,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter. Filters combine with AND.
    #[must_use]
    pub fn filter(
        mut self,
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        self.filters.push(FilterClause {
            field: field.into(),
            operator,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn filter_eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(field, FilterOperator::Eq, value)
    }

    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Reject queries the platform would refuse or silently reinterpret.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            return Err(ProviderError::InvalidQuery(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}, got {}",
                self.limit
            )));
        }
        if let Some(clause) = self.filters.iter().find(|c| c.field.trim().is_empty()) {
            return Err(ProviderError::InvalidQuery(format!(
                "filter on operator '{}' has no field",
                clause.operator
            )));
        }
        if self
            .sort
            .as_ref()
            .is_some_and(|sort| sort.field.trim().is_empty())
        {
            return Err(ProviderError::InvalidQuery("sort field is empty".to_string()));
        }
        Ok(())
    }

    /// Query parameters in wire order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() * 3 + 4);
        for (i, clause) in self.filters.iter().enumerate() {
            pairs.push((format!("filter[{i}].field"), clause.field.clone()));
            pairs.push((format!("filter[{i}].operator"), clause.operator.to_string()));
            pairs.push((format!("filter[{i}].value"), clause.value.clone()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort".to_string(), sort.field.clone()));
            pairs.push(("sortDirection".to_string(), sort.direction.as_str().to_string()));
        }
        pairs.push(("limit".to_string(), self.limit.to_string()));
        pairs.push(("skip".to_string(), self.offset.to_string()));
        pairs
    }
}

/// One page of a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEnvelope {
    pub items: Vec<WireObject>,
    /// Server-reported total, never less than `offset + items.len()`.
    pub total_count: u64,
    pub offset: u64,
    pub limit: u32,
}

impl ListEnvelope {
    /// Offset of the page after this one.
    pub fn next_offset(&self) -> u64 {
        self.offset.saturating_add(self.items.len() as u64)
    }

    pub fn has_more(&self) -> bool {
        !self.items.is_empty() && self.next_offset() < self.total_count
    }
}

/// A read-only, filterable collection.
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn collection(&self) -> Endpoint;

    /// Envelope member holding the page; `items` is also accepted.
    fn items_key(&self) -> &'static str {
        "items"
    }

    fn id_field(&self) -> &'static str {
        "id"
    }
}

/// Executes list queries against a [`DataSource`].
pub struct ListReader<D> {
    client: Arc<ApiClient>,
    source: D,
}

impl<D: DataSource> ListReader<D> {
    pub fn new(client: Arc<ApiClient>, source: D) -> Self {
        Self { client, source }
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// Fetch one page.
    pub async fn list(
        &self,
        spec: &QuerySpec,
        ctx: &CallContext,
    ) -> ProviderResult<ListEnvelope> {
        spec.validate()?;
        let resource = self.source.type_name();
        let endpoint = self.source.collection();

        let response = self
            .client
            .execute(HttpMethod::Get, &endpoint, &spec.to_query_pairs(), None, ctx)
            .await
            .map_err(|failure| ProviderError::Transport {
                operation: Operation::List,
                resource: resource.to_string(),
                id: None,
                failure,
            })?;

        if !response.is_success() {
            return Err(ProviderError::Api {
                operation: Operation::List,
                resource: resource.to_string(),
                id: None,
                error: classify(response.status, &response.body),
            });
        }

        let envelope = self
            .parse_page(spec, &response.body)
            .map_err(|message| ProviderError::Decode {
                operation: Operation::List,
                resource: resource.to_string(),
                id: None,
                message,
            })?;
        debug!(
            resource,
            returned = envelope.items.len(),
            total = envelope.total_count,
            offset = spec.offset,
            "Listed objects"
        );
        Ok(envelope)
    }

    fn parse_page(&self, spec: &QuerySpec, body: &str) -> Result<ListEnvelope, String> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| format!("response is not JSON: {e}"))?;

        let (raw_items, reported_total) = match value {
            Value::Array(items) => (items, None),
            Value::Object(mut map) => {
                let items_key = self.source.items_key();
                let items = map
                    .remove(items_key)
                    .or_else(|| map.remove("items"))
                    .ok_or_else(|| format!("envelope has no '{items_key}' array"))?;
                let Value::Array(items) = items else {
                    return Err(format!("'{items_key}' is not an array"));
                };
                let total = match map.get("total").or_else(|| map.get("totalCount")) {
                    Some(raw) => {
                        let total = raw.as_u64();
                        if total.is_none() {
                            warn!(
                                resource = self.source.type_name(),
                                total = %raw,
                                "Ignoring non-numeric total, counting items seen instead"
                            );
                        }
                        total
                    }
                    None => None,
                };
                (items, total)
            }
            _ => return Err("expected a JSON object or array".to_string()),
        };

        let mut items = raw_items
            .into_iter()
            .map(|item| WireObject::from_value(item, self.source.id_field()))
            .collect::<Result<Vec<_>, _>>()?;

        let limit = spec.limit as usize;
        if items.len() > limit {
            warn!(
                resource = self.source.type_name(),
                returned = items.len(),
                limit,
                "Platform returned more items than requested, truncating"
            );
            items.truncate(limit);
        }

        let floor = spec.offset.saturating_add(items.len() as u64);
        Ok(ListEnvelope {
            total_count: reported_total.unwrap_or(floor).max(floor),
            items,
            offset: spec.offset,
            limit: spec.limit,
        })
    }
}
