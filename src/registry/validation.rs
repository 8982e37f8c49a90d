// Registry configuration validation

use tracing::debug;

use super::error::ValidationError;
use super::locations::LocationSource;
use crate::config::RegistryConfig;

/// Collect every empty required field, named by its host configuration key
pub fn missing_fields(config: &RegistryConfig) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if config.cloud_project.is_empty() {
        debug!("Project is empty");
        missing.push("project");
    }
    if config.location.is_empty() {
        debug!("Location is empty");
        missing.push("version");
    }
    if config.repository_id.is_empty() {
        debug!("RepositoryId is empty");
        missing.push("repository_id");
    }
    missing
}

/// Check that all required fields are present
pub fn check_required(config: &RegistryConfig) -> Result<(), ValidationError> {
    let fields = missing_fields(config);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields { fields })
    }
}

/// Check that `location` is one of the locations the directory reports for `project_id`
pub async fn validate_location(
    directory: &dyn LocationSource,
    project_id: &str,
    location: &str,
) -> Result<(), ValidationError> {
    let locations = directory.fetch_locations(project_id).await?;

    if locations.iter().any(|l| l.location_id == location) {
        return Ok(());
    }

    Err(ValidationError::InvalidLocation {
        requested: location.to_string(),
        valid_candidates: locations.into_iter().map(|l| l.location_id).collect(),
    })
}

/// Validate a registry configuration
///
/// Field presence is checked first and reported all at once; the location is
/// only looked up once the configuration is structurally complete.
pub async fn validate(
    config: &RegistryConfig,
    directory: &dyn LocationSource,
) -> Result<(), ValidationError> {
    debug!("Starting validations");
    check_required(config)?;
    validate_location(directory, &config.cloud_project, &config.location).await
}
