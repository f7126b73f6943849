//! Manifest, server config and Dockerfile generation

pub mod dockerfile;
pub mod manifest;
pub mod server_config;

pub use dockerfile::{DockerfileGenerator, TemplateDockerfileGenerator};
pub use manifest::{DefaultManifestGenerator, Manifest, ManifestGenerator};
pub use server_config::{ConfigGenerator, ServerConfig, YamlConfigGenerator};
