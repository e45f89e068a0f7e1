//! HTTP transport for the xavyo REST API.
//!
//! [`ApiClient`] executes one request at a time against a versioned
//! endpoint, injecting the bearer credential and tenant scope. It never
//! retries; network failures come back as [`TransportFailure`] and HTTP
//! failures come back as a [`RawResponse`] for the classifier.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::{header, Client};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ConfigError, ProviderConfig};
use crate::error::{ProviderResult, TransportFailure};

/// Header carrying the tenant scope.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

const USER_AGENT: &str = concat!("xavyo-provider/", env!("CARGO_PKG_VERSION"));

/// API generation an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    fn segments(&self) -> [&'static str; 2] {
        match self {
            ApiVersion::V1 => ["api", "v1"],
            ApiVersion::V2 => ["api", "v2"],
        }
    }
}

/// HTTP method for API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether this method may carry a request body.
    pub fn is_write(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioned API path, kept as raw segments so identifiers are
/// percent-encoded exactly once when the URL is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    version: ApiVersion,
    segments: Vec<String>,
}

impl Endpoint {
    /// Endpoint for a collection path such as `/admin/users`.
    pub fn new(version: ApiVersion, path: &str) -> Self {
        Self {
            version,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Endpoint for one member of this collection.
    #[must_use]
    pub fn child(&self, id: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Self {
            version: self.version,
            segments,
        }
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Path relative to the API root, e.g. `/api/v1/admin/users`.
    pub fn path(&self) -> String {
        let version = self.version.segments();
        let segments = version
            .iter()
            .copied()
            .chain(self.segments.iter().map(String::as_str));
        let mut path = String::new();
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

/// Deadline and cancellation for one blocking call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Duration>,
}

impl CallContext {
    /// A context that is never cancelled and relies on the client timeout.
    pub fn background() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Bound each call made with this context; the tighter of this and the
    /// client timeout wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Authenticated client for the platform API.
///
/// Holds only immutable configuration, so one instance can be shared
/// (`Arc<ApiClient>`) across independent reconciliations.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ProviderConfig,
}

impl ApiClient {
    /// Create a client from provider configuration.
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(config: ProviderConfig, http: Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Absolute URL for an endpoint.
    pub fn url_for(&self, endpoint: &Endpoint) -> Result<Url, TransportFailure> {
        let mut url = self.config.api_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                TransportFailure::unavailable(format!(
                    "base URL cannot carry a path: {}",
                    self.config.api_url
                ))
            })?;
            segments.pop_if_empty();
            segments.extend(endpoint.version.segments());
            segments.extend(endpoint.segments.iter());
        }
        Ok(url)
    }

    /// Execute one request.
    ///
    /// `body` is only sent for write methods; `None` sends no payload at all.
    /// Non-success statuses are returned as-is for classification.
    pub async fn execute(
        &self,
        method: HttpMethod,
        endpoint: &Endpoint,
        query: &[(String, String)],
        body: Option<&Value>,
        ctx: &CallContext,
    ) -> Result<RawResponse, TransportFailure> {
        if ctx.is_cancelled() {
            return Err(TransportFailure::cancelled());
        }

        let url = self.url_for(endpoint)?;
        let path = endpoint.path();

        let mut request = self
            .http
            .request(method.to_reqwest(), url)
            .bearer_auth(self.config.token.expose())
            .header(header::ACCEPT, "application/json");

        if let Some(tenant) = &self.config.tenant {
            request = request.header(TENANT_HEADER, tenant.as_str());
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        match body {
            Some(payload) if method.is_write() => {
                let bytes = serde_json::to_vec(payload).map_err(|e| {
                    TransportFailure::unavailable(format!("failed to encode request body: {e}"))
                })?;
                request = request
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(bytes);
            }
            Some(_) => {
                warn!(method = %method, path = %path, "Dropping request body for non-write method");
            }
            None => {}
        }

        debug!(method = %method, path = %path, "Sending API request");
        let started = Instant::now();

        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<RawResponse, reqwest::Error>(RawResponse { status, body })
        };

        let bounded = async {
            match ctx.deadline {
                Some(deadline) => match tokio::time::timeout(deadline, exchange).await {
                    Ok(result) => result.map_err(TransportFailure::from),
                    Err(_) => Err(TransportFailure::deadline_exceeded(format!(
                        "call exceeded deadline of {}ms",
                        deadline.as_millis()
                    ))),
                },
                None => exchange.await.map_err(TransportFailure::from),
            }
        };

        let result = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => Err(TransportFailure::cancelled()),
            result = bounded => result,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => {
                debug!(
                    method = %method,
                    path = %path,
                    status = response.status,
                    elapsed_ms,
                    "Received API response"
                );
            }
            Err(failure) => {
                warn!(
                    method = %method,
                    path = %path,
                    error = %failure,
                    elapsed_ms,
                    "API request failed"
                );
            }
        }
        result
    }
}
