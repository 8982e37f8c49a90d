// Plugin configuration: host block, typed registry config and settings loading

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::registry::error::ValidationError;
use crate::registry::locations::DEFAULT_API_URL;
use crate::registry::validation::check_required;

/// Default settings file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "gar.toml";

/// Registry block exactly as the user writes it
///
/// Keys are kept as the host exposes them: `version` carries the location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRegistryConfig {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub repository_id: String,
}

/// Validated registry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub cloud_project: String,
    pub location: String,
    pub repository_id: String,
}

impl RegistryConfig {
    /// Resource name of the target repository
    pub fn repository_resource(&self) -> String {
        format!(
            "projects/{}/locations/{}/repositories/{}",
            self.cloud_project, self.location, self.repository_id
        )
    }

    /// Docker registry host serving this location
    pub fn registry_host(&self) -> String {
        format!("{}-docker.pkg.dev", self.location)
    }
}

/// Convert the host block into a typed config, rejecting missing fields
pub fn configure(raw: RawRegistryConfig) -> Result<RegistryConfig, ValidationError> {
    let config = RegistryConfig {
        cloud_project: raw.project,
        location: raw.version,
        repository_id: raw.repository_id,
    };
    check_required(&config)?;
    Ok(config)
}

/// Full settings for a run
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub registry: RawRegistryConfig,

    /// Base URL of the Artifact Registry API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Container CLI used for tag and push (docker or podman)
    #[serde(default = "default_container_cli")]
    pub container_cli: String,
}

fn env_source() -> Environment {
    Environment::with_prefix("GAR")
        .prefix_separator("_")
        .separator("__")
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_container_cli() -> String {
    "docker".to_string()
}

impl Settings {
    /// Load settings from an optional file, then `GAR_`-prefixed environment variables
    ///
    /// When `path` is given the file must exist; otherwise `gar.toml` is used if present.
    /// Nested keys use `__`, e.g. `GAR_REGISTRY__PROJECT`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, env_source())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Message(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                tracing::info!("Loading config file: {}", path.display());
                builder = builder.add_source(File::from(path));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    tracing::info!("Loading config file: {}", DEFAULT_CONFIG_FILE);
                    builder = builder.add_source(File::from(default_path));
                } else {
                    tracing::debug!("Optional config file not found: {}", DEFAULT_CONFIG_FILE);
                }
            }
        }

        let config = builder.add_source(env).build()?;

        let root_value: serde_json::Value = config.try_deserialize()?;

        let mut unused_fields = Vec::new();
        let settings: Settings = serde_ignored::deserialize(root_value, |path| {
            unused_fields.push(path.to_string());
        })
        .map_err(|e| ConfigError::Message(format!("Failed to deserialize settings: {}", e)))?;

        for field in &unused_fields {
            tracing::warn!("Unknown configuration field: {}", field);
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env() -> Environment {
        env_source().source(Some(HashMap::new()))
    }

    fn write_config(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_configure_maps_host_keys() {
        let config = configure(RawRegistryConfig {
            project: "demo".to_string(),
            version: "us".to_string(),
            repository_id: "apps".to_string(),
        })
        .unwrap();

        assert_eq!(config.cloud_project, "demo");
        assert_eq!(config.location, "us");
        assert_eq!(config.repository_id, "apps");
        assert_eq!(
            config.repository_resource(),
            "projects/demo/locations/us/repositories/apps"
        );
        assert_eq!(config.registry_host(), "us-docker.pkg.dev");
    }

    #[test]
    fn test_configure_reports_all_missing_fields() {
        let err = configure(RawRegistryConfig::default()).unwrap_err();
        match err {
            ValidationError::MissingFields { fields } => {
                assert_eq!(fields, vec!["project", "version", "repository_id"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_configure_does_not_trim() {
        let config = configure(RawRegistryConfig {
            project: " demo".to_string(),
            version: "us".to_string(),
            repository_id: "apps".to_string(),
        })
        .unwrap();
        assert_eq!(config.cloud_project, " demo");
    }

    #[test]
    fn test_load_toml_file() {
        let file = write_config(
            r#"
container_cli = "podman"

[registry]
project = "demo"
version = "europe-west1"
repository_id = "apps"
"#,
            ".toml",
        );

        let settings = Settings::load_with_env(Some(file.path()), no_env()).unwrap();
        assert_eq!(settings.registry.project, "demo");
        assert_eq!(settings.registry.version, "europe-west1");
        assert_eq!(settings.registry.repository_id, "apps");
        assert_eq!(settings.container_cli, "podman");
        assert_eq!(settings.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_load_yaml_file() {
        let file = write_config(
            "registry:\n  project: demo\n  version: us\n  repository_id: apps\n",
            ".yaml",
        );

        let settings = Settings::load_with_env(Some(file.path()), no_env()).unwrap();
        assert_eq!(settings.registry.version, "us");
        assert_eq!(settings.container_cli, "docker");
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = Settings::load_with_env(Some(Path::new("/nonexistent/gar.toml")), no_env())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/gar.toml"));
    }

    #[test]
    fn test_partial_registry_block_defaults_to_empty() {
        let file = write_config("[registry]\nproject = \"demo\"\n", ".toml");

        let settings = Settings::load_with_env(Some(file.path()), no_env()).unwrap();
        let err = configure(settings.registry).unwrap_err();
        match err {
            ValidationError::MissingFields { fields } => {
                assert_eq!(fields, vec!["version", "repository_id"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(
            "[registry]\nproject = \"demo\"\nversion = \"us\"\nrepository_id = \"apps\"\n",
            ".toml",
        );

        let env = env_source().source(Some(HashMap::from([(
            "GAR_REGISTRY__VERSION".to_string(),
            "asia-east1".to_string(),
        )])));

        let settings = Settings::load_with_env(Some(file.path()), env).unwrap();
        assert_eq!(settings.registry.version, "asia-east1");
        assert_eq!(settings.registry.project, "demo");
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let file = write_config(
            "unexpected = true\n[registry]\nproject = \"demo\"\nversion = \"us\"\nrepository_id = \"apps\"\n",
            ".toml",
        );

        let settings = Settings::load_with_env(Some(file.path()), no_env()).unwrap();
        assert_eq!(settings.registry.repository_id, "apps");
    }
}
