// Artifact Registry locations listing

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::DirectoryError;
use super::models::{ApiErrorResponse, Location, LocationList};

/// Public Artifact Registry API endpoint
pub const DEFAULT_API_URL: &str = "https://artifactregistry.googleapis.com";

/// Anything that can list the valid locations of a project
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Fetch the locations for `project_id`, in the order the server reports them
    async fn fetch_locations(&self, project_id: &str) -> Result<Vec<Location>, DirectoryError>;
}

/// HTTP client for the `v1beta2` locations endpoint
///
/// Every call issues exactly one GET; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct LocationDirectory {
    http_client: Client,
    api_url: String,
    bearer_token: Option<String>,
}

impl LocationDirectory {
    pub fn new(http_client: Client) -> Self {
        Self::with_api_url(http_client, DEFAULT_API_URL)
    }

    pub fn with_api_url(http_client: Client, api_url: impl Into<String>) -> Self {
        Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    /// Attach an access token to listing requests
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn locations_url(&self, project_id: &str) -> String {
        format!(
            "{}/v1beta2/projects/{}/locations?alt=json",
            self.api_url,
            urlencoding::encode(project_id)
        )
    }
}

/// Decode a 2xx body as either the success or the error shape
fn decode_locations(url: &str, body: &[u8]) -> Result<Vec<Location>, DirectoryError> {
    let success_err = match serde_json::from_slice::<LocationList>(body) {
        Ok(list) => return Ok(list.locations),
        Err(e) => e,
    };

    match serde_json::from_slice::<ApiErrorResponse>(body) {
        Ok(error_response) => Err(DirectoryError::Reported {
            message: error_response.error.message,
        }),
        Err(_) => Err(DirectoryError::MalformedResponse {
            url: url.to_string(),
            reason: success_err.to_string(),
        }),
    }
}

#[async_trait]
impl LocationSource for LocationDirectory {
    async fn fetch_locations(&self, project_id: &str) -> Result<Vec<Location>, DirectoryError> {
        let url = self.locations_url(project_id);
        debug!("Fetching locations from {}", url);

        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|source| DirectoryError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Unreachable {
                url,
                status_code: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| DirectoryError::Transport {
                url: url.clone(),
                source,
            })?;

        let locations = decode_locations(&url, &body)?;
        debug!("Received {} locations for project {}", locations.len(), project_id);
        Ok(locations)
    }
}
