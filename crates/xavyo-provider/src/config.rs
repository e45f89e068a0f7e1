//! Provider configuration
//!
//! Built once at startup from the environment (or any variable reader) and
//! read-only afterwards.

use std::fmt;
use std::time::Duration;

use url::Url;

/// Base URL used when `XAVYO_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://api.xavyo.net";

/// Per-call timeout used when `XAVYO_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_TOKEN: &str = "XAVYO_API_TOKEN";
pub const ENV_TENANT_ID: &str = "XAVYO_TENANT_ID";
pub const ENV_API_URL: &str = "XAVYO_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "XAVYO_TIMEOUT_SECS";

/// Tenant (organization) identifier attached to every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScope(String);

impl TenantScope {
    /// Returns `None` for a blank identifier, which means "no tenant".
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque bearer credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                ENV_API_TOKEN.into(),
                "token must not be empty".into(),
            ));
        }
        Ok(Self(token))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken([REDACTED])")
    }
}

/// Process-wide provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the platform, without the API generation prefix.
    pub api_url: Url,

    /// Bearer credential injected into every call.
    pub token: ApiToken,

    /// Tenant scope; `None` means default/single-tenant context.
    pub tenant: Option<TenantScope>,

    /// Bounded per-call timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Configuration for the given URL and credential with default timeout
    /// and no tenant scope.
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            token: ApiToken::new(token)?,
            tenant: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = TenantScope::new(tenant);
        self
    }

    /// Per-call timeout. A zero timeout is rejected by [`ProviderConfig::validate`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check invariants that builder helpers cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(zero_timeout());
        }
        Ok(())
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `XAVYO_API_TOKEN`: bearer credential
    ///
    /// Optional:
    /// - `XAVYO_TENANT_ID`: default tenant scope
    /// - `XAVYO_API_URL`: base URL (default: `https://api.xavyo.net`)
    /// - `XAVYO_TIMEOUT_SECS`: per-call timeout in seconds (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// Tests supply variables this way instead of mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let token = reader(ENV_API_TOKEN)
            .map_err(|_| ConfigError::MissingVar(ENV_API_TOKEN.into()))?;
        let token = ApiToken::new(token)?;

        let api_url = reader(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_url = parse_api_url(&api_url)?;

        let tenant = reader(ENV_TENANT_ID).ok().and_then(TenantScope::new);

        let timeout_secs = match reader(ENV_TIMEOUT_SECS) {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue(ENV_TIMEOUT_SECS.into(), e.to_string()))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(zero_timeout());
        }

        Ok(Self {
            api_url,
            token,
            tenant,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn zero_timeout() -> ConfigError {
    ConfigError::InvalidValue(ENV_TIMEOUT_SECS.into(), "timeout must be greater than zero".into())
}

fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidValue(ENV_API_URL.into(), e.to_string()))?;
    match url.scheme() {
        "https" | "http" => {}
        other => {
            return Err(ConfigError::InvalidValue(
                ENV_API_URL.into(),
                format!("unsupported scheme: {other}"),
            ))
        }
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::InvalidValue(
            ENV_API_URL.into(),
            "URL has no host".into(),
        ));
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
