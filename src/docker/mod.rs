//! Docker daemon integration: image builds, removal, tagging and pushes

pub mod builder;
pub mod context;
pub mod registry;

pub use builder::{DockerImageBuilder, ImageBuilder};
pub use registry::{DockerRegistry, Registry, RegistryAuth};

use bollard::Docker;
use tracing::debug;

/// Check if the Docker daemon is reachable
pub async fn check_docker_available() -> bool {
    let docker = match Docker::connect_with_local_defaults() {
        Ok(d) => d,
        Err(e) => {
            debug!("Failed to connect to Docker: {}", e);
            return false;
        }
    };

    match docker.version().await {
        Ok(v) => {
            debug!(
                "Docker API version: {}",
                v.api_version.unwrap_or_else(|| "unknown".to_string())
            );
            true
        }
        Err(e) => {
            debug!("Failed to get Docker version: {}", e);
            false
        }
    }
}
