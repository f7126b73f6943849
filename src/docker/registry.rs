use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::image::{PushImageOptions, TagImageOptions};
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::fmt;
use tracing::{debug, info};

/// Credentials for pushing to a registry
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tags images locally and publishes them
#[async_trait]
pub trait Registry: Send + Sync {
    /// Applies every `repo:tag` reference in `tags` to `image`
    async fn tag(&self, image: &str, tags: &[String]) -> Result<()>;

    /// Pushes the local `repo:tag` reference to `registry`
    async fn push(&self, tag: &str, registry: &str, auth: Option<&RegistryAuth>) -> Result<()>;
}

/// Splits `repo:tag` at the last colon that belongs to the tag part
pub fn split_reference(reference: &str) -> (&str, &str) {
    match reference.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo, tag),
        _ => (reference, "latest"),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DockerRegistry;

impl DockerRegistry {
    pub fn new() -> Self {
        Self
    }

    fn client() -> Result<Docker> {
        Docker::connect_with_local_defaults().context("Failed to connect to Docker daemon")
    }
}

#[async_trait]
impl Registry for DockerRegistry {
    async fn tag(&self, image: &str, tags: &[String]) -> Result<()> {
        let docker = Self::client()?;
        for reference in tags {
            let (repo, tag) = split_reference(reference);
            docker
                .tag_image(
                    image,
                    Some(TagImageOptions {
                        repo: repo.to_string(),
                        tag: tag.to_string(),
                    }),
                )
                .await
                .with_context(|| format!("Failed to tag {} as {}", image, reference))?;
            debug!(image, reference = %reference, "Tagged image");
        }
        Ok(())
    }

    async fn push(&self, tag: &str, registry: &str, auth: Option<&RegistryAuth>) -> Result<()> {
        let docker = Self::client()?;
        let (repo, tag_name) = split_reference(tag);
        let remote_repo = format!("{}/{}", registry.trim_end_matches('/'), repo);

        docker
            .tag_image(
                tag,
                Some(TagImageOptions {
                    repo: remote_repo.clone(),
                    tag: tag_name.to_string(),
                }),
            )
            .await
            .with_context(|| format!("Failed to tag {} for {}", tag, registry))?;

        let credentials = auth.map(|a| DockerCredentials {
            username: Some(a.username.clone()),
            password: Some(a.password.clone()),
            serveraddress: Some(registry.to_string()),
            ..Default::default()
        });

        let mut stream = docker.push_image(
            &remote_repo,
            Some(PushImageOptions {
                tag: tag_name.to_string(),
            }),
            credentials,
        );

        while let Some(item) = stream.next().await {
            let info = item.with_context(|| format!("Push of {}:{} failed", remote_repo, tag_name))?;
            if let Some(error) = info.error {
                anyhow::bail!("Push of {}:{} failed: {}", remote_repo, tag_name, error);
            }
            if let Some(status) = info.status {
                debug!(target: "mcp_forge::docker::push", "{}", status);
            }
        }

        info!(reference = %format!("{}:{}", remote_repo, tag_name), "Image pushed");
        Ok(())
    }
}
