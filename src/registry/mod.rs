pub mod auth;
pub mod error;
pub mod locations;
pub mod models;
pub mod push;
pub mod validation;

pub use auth::{GcpAuthenticator, TokenSource, AUTH_GUIDANCE};
pub use error::{AuthError, ComponentError, DirectoryError, ValidationError};
pub use locations::{LocationDirectory, LocationSource};
pub use models::{Artifact, AuthResult, ImageRef, Location};
pub use push::DockerPusher;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use crate::config::{configure, RawRegistryConfig, RegistryConfig, Settings};

/// Accepts host configuration and checks it
#[async_trait]
pub trait ConfigurableValidator: Send + Sync {
    /// Take the host configuration block; fails on missing fields
    fn configure(&mut self, raw: RawRegistryConfig) -> Result<(), ComponentError>;

    /// Run the full validation, including the location lookup
    async fn validate(&self) -> Result<(), ComponentError>;
}

/// Establishes that the caller may push
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Check existing credentials against the target repository
    async fn validate_auth(&self) -> Result<(), ComponentError>;

    /// Fallback invoked when `validate_auth` fails
    async fn authenticate(&self) -> Result<AuthResult, ComponentError>;
}

/// Publishes a built image
#[async_trait]
pub trait Pusher: Send + Sync {
    async fn push(&self, image: &ImageRef) -> Result<Artifact, ComponentError>;
}

/// Google Artifact Registry component
pub struct ArtifactRegistry {
    config: Option<RegistryConfig>,
    directory: Arc<dyn LocationSource>,
    authenticator: GcpAuthenticator,
    pusher: DockerPusher,
}

impl ArtifactRegistry {
    pub fn new(
        directory: Arc<dyn LocationSource>,
        authenticator: GcpAuthenticator,
        pusher: DockerPusher,
    ) -> Self {
        Self {
            config: None,
            directory,
            authenticator,
            pusher,
        }
    }

    /// Wire the component from loaded settings
    pub fn from_settings(http_client: Client, settings: &Settings, token_source: TokenSource) -> Self {
        let directory = LocationDirectory::with_api_url(http_client.clone(), &settings.api_url)
            .with_bearer_token(token_source.cached_token());
        let authenticator =
            GcpAuthenticator::with_api_url(http_client, &settings.api_url, token_source);
        Self::new(
            Arc::new(directory),
            authenticator,
            DockerPusher::new(&settings.container_cli),
        )
    }

    pub fn config(&self) -> Option<&RegistryConfig> {
        self.config.as_ref()
    }

    fn configured(&self) -> Result<&RegistryConfig, ComponentError> {
        self.config.as_ref().ok_or(ComponentError::NotConfigured)
    }
}

#[async_trait]
impl ConfigurableValidator for ArtifactRegistry {
    fn configure(&mut self, raw: RawRegistryConfig) -> Result<(), ComponentError> {
        self.config = Some(configure(raw)?);
        Ok(())
    }

    async fn validate(&self) -> Result<(), ComponentError> {
        let config = self.configured()?;
        validation::validate(config, self.directory.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl Authenticator for ArtifactRegistry {
    async fn validate_auth(&self) -> Result<(), ComponentError> {
        let config = self.configured()?;
        self.authenticator.validate_auth(config).await?;
        Ok(())
    }

    async fn authenticate(&self) -> Result<AuthResult, ComponentError> {
        Ok(self.authenticator.authenticate())
    }
}

#[async_trait]
impl Pusher for ArtifactRegistry {
    async fn push(&self, image: &ImageRef) -> Result<Artifact, ComponentError> {
        let config = self.configured()?;
        Ok(self.pusher.push(config, image).await?)
    }
}
