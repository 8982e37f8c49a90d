use thiserror::Error;

/// Failure to obtain the location listing
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to get json from url: {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to get json from url: {url}, status code: {status_code}")]
    Unreachable { url: String, status_code: u16 },

    #[error("failed to parse response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("{message}")]
    Reported { message: String },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required configuration: {}", .fields.iter().map(|f| format!("{f} must be set")).collect::<Vec<_>>().join(", "))]
    MissingFields { fields: Vec<&'static str> },

    #[error("Failed to get locations from GCP: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Invalid location '{requested}'. The valid locations are {}", .valid_candidates.join(" "))]
    InvalidLocation {
        requested: String,
        valid_candidates: Vec<String>,
    },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to obtain a GCP access token: {0}")]
    Token(String),

    #[error("Failed to reach the Artifact Registry API: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Error testing Artifact Registry permissions (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("incorrect IAM permissions, received {}", .received.join(", "))]
    PermissionDenied { received: Vec<String> },
}

/// Errors raised by the registry component itself
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("registry is not configured; call configure first")]
    NotConfigured,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Push(#[from] anyhow::Error),
}
