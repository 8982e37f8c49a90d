use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A region reported by the locations endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Full resource name (e.g., "projects/my-project/locations/us")
    pub name: String,
    /// Short region identifier matched against the configured location
    pub location_id: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Success shape of the locations listing
#[derive(Debug, Deserialize)]
pub(crate) struct LocationList {
    pub locations: Vec<Location>,
}

/// Error payload returned by Google APIs
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[allow(dead_code)]
    pub code: i32,
    pub message: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub status: String,
}

/// Error shape wrapper: `{"error": {...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// Local image to push, split into name and tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub tag: String,
}

impl ImageRef {
    /// Parse `name[:tag]`, defaulting the tag to "latest"
    ///
    /// A colon that belongs to a registry port (e.g. "localhost:5000/app") is
    /// not treated as a tag separator. Digest references (`name@sha256:...`)
    /// are rejected since the pushed image needs a tag.
    pub fn parse(reference: &str) -> Result<Self> {
        if reference.contains('@') {
            bail!(
                "Image reference '{}' is pinned by digest; push needs a tagged image (name:tag)",
                reference
            );
        }

        let last_segment_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match reference[last_segment_start..].rfind(':') {
            Some(pos) => {
                let split = last_segment_start + pos;
                (&reference[..split], &reference[split + 1..])
            }
            None => (reference, "latest"),
        };

        if name.split('/').any(str::is_empty) {
            bail!("Invalid image reference '{}': empty name segment", reference);
        }
        if tag.is_empty() {
            bail!("Invalid image reference '{}': empty tag", reference);
        }

        Ok(Self {
            name: name.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Last path segment of the image name (e.g. "app" for "ghcr.io/org/app")
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

/// Result record of a successful push, consumed by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Repository path of the pushed image, without tag
    pub image: String,
    pub tag: String,
}

impl Artifact {
    pub fn reference(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// Outcome of the interactive authentication fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthResult {
    pub authenticated: bool,
}
