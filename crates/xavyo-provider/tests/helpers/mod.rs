//! Shared fixtures for provider integration tests.

#![allow(dead_code)]

pub mod mock_platform;

use std::sync::Arc;
use std::time::Duration;

use xavyo_provider::{ApiClient, ProviderConfig};

pub const TEST_TOKEN: &str = "test-token-0123456789";
pub const TEST_TENANT: &str = "org-acme";

/// Client for `server_uri` with a short timeout and the test tenant.
pub fn test_client(server_uri: &str) -> Arc<ApiClient> {
    let config = ProviderConfig::new(server_uri, TEST_TOKEN)
        .unwrap()
        .with_tenant(TEST_TENANT)
        .with_timeout(Duration::from_secs(5));
    Arc::new(ApiClient::new(config).unwrap())
}

/// Client without a tenant scope.
pub fn untenanted_client(server_uri: &str) -> Arc<ApiClient> {
    let config = ProviderConfig::new(server_uri, TEST_TOKEN).unwrap();
    Arc::new(ApiClient::new(config).unwrap())
}
