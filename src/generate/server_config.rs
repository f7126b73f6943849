//! Server configuration synthesis

use super::manifest::Manifest;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SERVER_PORT: u16 = 3000;

pub trait ConfigGenerator: Send + Sync {
    fn generate(&self, manifest: &Manifest, environment: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub tools: Vec<ModuleToggle>,
    pub connectors: Vec<ModuleToggle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<CredentialRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub port: u16,
    pub log_level: String,
    pub hot_reload: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleToggle {
    pub name: String,
    pub path: PathBuf,
    pub enabled: bool,
}

/// Credentials are referenced by environment variable, never embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRef {
    pub name: String,
    pub env: String,
}

impl ServerConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse server config")
    }
}

/// Emits the server config as YAML with per-environment defaults
#[derive(Debug, Clone)]
pub struct YamlConfigGenerator {
    port: u16,
}

impl Default for YamlConfigGenerator {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
        }
    }
}

impl YamlConfigGenerator {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

fn is_valid_environment(environment: &str) -> bool {
    !environment.is_empty()
        && environment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_development(environment: &str) -> bool {
    matches!(environment, "development" | "dev" | "local" | "test")
}

impl ConfigGenerator for YamlConfigGenerator {
    fn generate(&self, manifest: &Manifest, environment: &str) -> Result<String> {
        if !is_valid_environment(environment) {
            anyhow::bail!(
                "Invalid environment label '{}': use letters, digits, '-' or '_'",
                environment
            );
        }

        let development = is_development(environment);
        let config = ServerConfig {
            server: ServerSection {
                name: manifest.name.clone(),
                version: manifest.version.clone(),
                environment: environment.to_string(),
                port: self.port,
                log_level: if development { "debug" } else { "info" }.to_string(),
                hot_reload: development,
            },
            tools: manifest
                .tools
                .iter()
                .map(|t| ModuleToggle {
                    name: t.name.clone(),
                    path: t.path.clone(),
                    enabled: true,
                })
                .collect(),
            connectors: manifest
                .connectors
                .iter()
                .map(|c| ModuleToggle {
                    name: c.name.clone(),
                    path: c.path.clone(),
                    enabled: true,
                })
                .collect(),
            credentials: manifest
                .credentials
                .iter()
                .map(|name| CredentialRef {
                    name: name.to_lowercase(),
                    env: name.clone(),
                })
                .collect(),
        };

        let body = serde_yaml::to_string(&config).context("Failed to serialize server config")?;
        Ok(format!(
            "# Generated by mcp-forge for {} ({})\n{}",
            manifest.name, environment, body
        ))
    }
}
