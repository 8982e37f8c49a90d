// Container registry operations (tag and push)

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use super::models::{Artifact, ImageRef};
use crate::config::RegistryConfig;

/// Artifact Registry repository path for `image`, without tag
pub fn target_image(config: &RegistryConfig, image: &ImageRef) -> String {
    format!(
        "{}/{}/{}/{}",
        config.registry_host(),
        config.cloud_project,
        config.repository_id,
        image.short_name()
    )
}

/// Tag a local image with a new reference
pub(crate) async fn docker_tag(container_cli: &str, source: &str, target: &str) -> Result<()> {
    info!("Tagging image: {} => {}", source, target);

    let mut cmd = Command::new(container_cli);
    cmd.arg("tag").arg(source).arg(target);

    debug!("Executing command: {:?}", cmd);

    let status = cmd
        .status()
        .await
        .with_context(|| format!("Failed to execute {} tag", container_cli))?;

    if !status.success() {
        bail!("{} tag failed with status: {}", container_cli, status);
    }

    Ok(())
}

/// Push image to container registry
pub(crate) async fn docker_push(container_cli: &str, image_tag: &str) -> Result<()> {
    info!("Pushing image to registry: {}", image_tag);

    let mut cmd = Command::new(container_cli);
    cmd.arg("push").arg(image_tag);

    debug!("Executing command: {:?}", cmd);

    let output = cmd
        .output()
        .await
        .with_context(|| format!("Failed to execute {} push", container_cli))?;

    debug!("{}", String::from_utf8_lossy(&output.stdout));

    if !output.status.success() {
        bail!(
            "{} push failed with status: {}: {}",
            container_cli,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}

/// Pushes local images into Artifact Registry through a container CLI
#[derive(Debug, Clone)]
pub struct DockerPusher {
    container_cli: String,
}

impl DockerPusher {
    pub fn new(container_cli: impl Into<String>) -> Self {
        Self {
            container_cli: container_cli.into(),
        }
    }

    pub async fn push(&self, config: &RegistryConfig, image: &ImageRef) -> Result<Artifact> {
        let artifact = Artifact {
            image: target_image(config, image),
            tag: image.tag.clone(),
        };
        let target = artifact.reference();

        docker_tag(&self.container_cli, &image.to_string(), &target).await?;
        docker_push(&self.container_cli, &target).await?;

        info!("Pushed image: {}", target);
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RegistryConfig {
        RegistryConfig {
            cloud_project: "demo".to_string(),
            location: "europe-west1".to_string(),
            repository_id: "apps".to_string(),
        }
    }

    #[test]
    fn test_target_image_uses_location_host() {
        let image = ImageRef::parse("ghcr.io/org/web:1.0").unwrap();
        assert_eq!(
            target_image(&config(), &image),
            "europe-west1-docker.pkg.dev/demo/apps/web"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_push_succeeds_when_cli_succeeds() {
        // `true` accepts any arguments and exits 0
        let pusher = DockerPusher::new("true");
        let artifact = pusher
            .push(&config(), &ImageRef::parse("web:1.0").unwrap())
            .await
            .unwrap();

        assert_eq!(artifact.image, "europe-west1-docker.pkg.dev/demo/apps/web");
        assert_eq!(artifact.tag, "1.0");
        assert_eq!(
            artifact.reference(),
            "europe-west1-docker.pkg.dev/demo/apps/web:1.0"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_push_fails_when_tag_fails() {
        let pusher = DockerPusher::new("false");
        let err = pusher
            .push(&config(), &ImageRef::parse("web").unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("false tag failed"));
    }

    #[tokio::test]
    async fn test_push_fails_when_cli_missing() {
        let pusher = DockerPusher::new("gar-push-no-such-cli");
        let err = pusher
            .push(&config(), &ImageRef::parse("web").unwrap())
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("Failed to execute gar-push-no-such-cli tag"));
    }
}
