// GCP authentication and Artifact Registry permission checks

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::locations::DEFAULT_API_URL;
use super::models::AuthResult;
use crate::config::RegistryConfig;

/// Environment variable holding a pre-issued OAuth access token
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// The only permission required to push into a repository
pub const UPLOAD_PERMISSION: &str = "artifactregistry.repositories.uploadArtifacts";

/// Printed when authentication cannot be established
pub const AUTH_GUIDANCE: &[&str] = &[
    "Failed to authenticate with GCP",
    "Please ensure that you have set the correct GCP Project and Location",
    "You can find the correct values in the GCP Console",
    "https://console.cloud.google.com/apis/credentials",
    "",
    "You can also set the GCP Project and Location in the registry config file",
    "",
    "Please ensure that you have the correct permissions to write to the Artifact Registry",
    "",
];

/// Where access tokens come from
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// `GOOGLE_OAUTH_ACCESS_TOKEN`, falling back to `gcloud auth print-access-token`
    Ambient,
    /// A fixed token
    Static(String),
}

impl TokenSource {
    pub async fn access_token(&self) -> Result<String, AuthError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Ambient => {
                if let Some(token) = env_token() {
                    debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                    return Ok(token);
                }
                gcloud_access_token().await
            }
        }
    }

    /// Token if one is readily available, without invoking gcloud
    pub fn cached_token(&self) -> Option<String> {
        match self {
            TokenSource::Static(token) => Some(token.clone()),
            TokenSource::Ambient => env_token(),
        }
    }
}

fn env_token() -> Option<String> {
    token_from(|key| std::env::var(key).ok())
}

/// Read the access token variable through `lookup`; an empty value counts as unset
fn token_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    lookup(ACCESS_TOKEN_ENV).filter(|token| !token.is_empty())
}

async fn gcloud_access_token() -> Result<String, AuthError> {
    debug!("Executing: gcloud auth print-access-token");

    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| AuthError::Token(format!("failed to execute gcloud: {}", e)))?;

    if !output.status.success() {
        return Err(AuthError::Token(format!(
            "gcloud auth print-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(AuthError::Token(
            "gcloud returned an empty access token".to_string(),
        ));
    }
    Ok(token)
}

#[derive(Debug, Serialize)]
struct TestIamPermissionsRequest<'a> {
    permissions: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct TestIamPermissionsResponse {
    #[serde(default)]
    permissions: Vec<String>,
}

/// Verifies that the caller may upload into the configured repository
#[derive(Debug, Clone)]
pub struct GcpAuthenticator {
    http_client: Client,
    api_url: String,
    token_source: TokenSource,
}

impl GcpAuthenticator {
    pub fn new(http_client: Client, token_source: TokenSource) -> Self {
        Self::with_api_url(http_client, DEFAULT_API_URL, token_source)
    }

    pub fn with_api_url(
        http_client: Client,
        api_url: impl Into<String>,
        token_source: TokenSource,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_source,
        }
    }

    fn permissions_url(&self, config: &RegistryConfig) -> String {
        format!(
            "{}/v1/{}:testIamPermissions",
            self.api_url,
            config.repository_resource()
        )
    }

    /// Check the upload permission on the target repository
    pub async fn validate_auth(&self, config: &RegistryConfig) -> Result<(), AuthError> {
        info!("Authenticating with GCP");
        let token = self.token_source.access_token().await?;

        let expected = [UPLOAD_PERMISSION];
        let url = self.permissions_url(config);
        info!("Testing Artifact Registry permissions...");
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&TestIamPermissionsRequest {
                permissions: &expected,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Error testing Artifact Registry permissions: {}", body);
            return Err(AuthError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let granted: TestIamPermissionsResponse = response.json().await?;

        let granted_set: BTreeSet<&str> = granted.permissions.iter().map(String::as_str).collect();
        let expected_set: BTreeSet<&str> = expected.iter().copied().collect();
        if granted_set != expected_set {
            warn!(
                "Incorrect IAM permissions, received {}",
                granted.permissions.join(", ")
            );
            return Err(AuthError::PermissionDenied {
                received: granted.permissions,
            });
        }

        info!("Authenticated for {}", config.repository_resource());
        Ok(())
    }

    /// Fallback when `validate_auth` fails: nothing can be done non-interactively
    pub fn authenticate(&self) -> AuthResult {
        AuthResult {
            authenticated: false,
        }
    }
}
