use super::context::{build_context_archive, CONTEXT_DOCKERFILE_NAME};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::image::{BuildImageOptions, RemoveImageOptions};
use bollard::Docker;
use bytes::Bytes;
use futures_util::stream::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Builds and removes container images
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Builds `dockerfile` against the `context` directory and tags the result with `tag`.
    /// Returns the image id.
    async fn build(&self, context: &Path, dockerfile: &str, tag: &str) -> Result<String>;

    /// Removes an image by id or reference
    async fn remove(&self, image: &str) -> Result<()>;
}

/// Image builder backed by the local Docker daemon
#[derive(Debug, Clone, Default)]
pub struct DockerImageBuilder {
    excluded: Vec<PathBuf>,
}

impl DockerImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workspace-relative paths never sent to the daemon
    pub fn with_excluded(mut self, excluded: Vec<PathBuf>) -> Self {
        self.excluded = excluded;
        self
    }

    fn client() -> Result<Docker> {
        Docker::connect_with_local_defaults().context("Failed to connect to Docker daemon")
    }
}

#[async_trait]
impl ImageBuilder for DockerImageBuilder {
    async fn build(&self, context: &Path, dockerfile: &str, tag: &str) -> Result<String> {
        let docker = Self::client()?;

        let context_dir = context.to_path_buf();
        let dockerfile_text = dockerfile.to_string();
        let excluded = self.excluded.clone();
        let archive = tokio::task::spawn_blocking(move || {
            build_context_archive(&context_dir, &dockerfile_text, &excluded)
        })
        .await
        .context("Context archive task panicked")??;

        info!(tag, context_bytes = archive.len(), "Sending build context to Docker");

        let options = BuildImageOptions {
            dockerfile: CONTEXT_DOCKERFILE_NAME.to_string(),
            t: tag.to_string(),
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        let mut stream = docker.build_image(options, None, Some(Bytes::from(archive)));
        let mut image_id: Option<String> = None;

        while let Some(item) = stream.next().await {
            let info = item.with_context(|| format!("Docker build of {} failed", tag))?;

            if let Some(error) = info.error {
                anyhow::bail!("Docker build of {} failed: {}", tag, error);
            }
            if let Some(line) = info.stream.as_deref().map(str::trim_end) {
                if !line.is_empty() {
                    debug!(target: "mcp_forge::docker::build", "{}", line);
                }
                if let Some(id) = line.strip_prefix("Successfully built ") {
                    image_id = Some(id.trim().to_string());
                }
            }
            if let Some(id) = info.aux.and_then(|aux| aux.id) {
                image_id = Some(id);
            }
        }

        let image_id = image_id.unwrap_or_else(|| {
            warn!(tag, "Docker did not report an image id, using the tag");
            tag.to_string()
        });
        info!(tag, image_id = %image_id, "Image built");
        Ok(image_id)
    }

    async fn remove(&self, image: &str) -> Result<()> {
        let docker = Self::client()?;
        let options = RemoveImageOptions {
            force: true,
            noprune: false,
        };
        match docker.remove_image(image, Some(options), None).await {
            Ok(removed) => {
                debug!(image, layers = removed.len(), "Image removed");
                Ok(())
            }
            Err(e) if is_not_found(&e) => {
                debug!(image, "Image not present, nothing to remove");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to remove image {}", image)),
        }
    }
}

/// The daemon answers 404 for references that were never tagged or are already gone
fn is_not_found(error: &bollard::errors::Error) -> bool {
    matches!(
        error,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}
