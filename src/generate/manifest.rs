//! Merges module metadata into the server manifest

use crate::modules::{Module, ModuleLanguage, ToolParam};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub language: ModuleLanguage,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ToolParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub language: ModuleLanguage,
    pub path: PathBuf,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub connector_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

/// Merged description of every module plus aggregated capabilities and dependencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub tools: Vec<ToolEntry>,
    pub connectors: Vec<ConnectorEntry>,
    pub capabilities: Vec<String>,
    /// Runtimes the image must provide (`python`, `node`)
    pub dependencies: Vec<String>,
    /// Environment variable names of all declared credentials
    pub credentials: Vec<String>,
}

impl Manifest {
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    pub fn requires_runtime(&self, runtime: &str) -> bool {
        self.dependencies.iter().any(|d| d == runtime)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

pub trait ManifestGenerator: Send + Sync {
    /// Fails only when the module set is internally inconsistent
    fn generate(&self, modules: &[Module]) -> Result<Manifest>;
}

#[derive(Debug, Clone)]
pub struct DefaultManifestGenerator {
    name: String,
    version: String,
}

impl DefaultManifestGenerator {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Names the server after the workspace directory
    pub fn for_workspace(base_path: &Path) -> Self {
        let name = base_path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("mcp-server");
        Self::new(name, DEFAULT_SERVER_VERSION)
    }
}

impl ManifestGenerator for DefaultManifestGenerator {
    fn generate(&self, modules: &[Module]) -> Result<Manifest> {
        let mut seen = HashSet::new();
        for module in modules {
            if !seen.insert(module.identifier()) {
                anyhow::bail!(
                    "{} '{}' appears more than once in the module set",
                    module.kind,
                    module.name
                );
            }
        }

        let tools: Vec<ToolEntry> = modules
            .iter()
            .filter(|m| m.is_tool())
            .map(|m| ToolEntry {
                name: m.name.clone(),
                description: m.description.clone(),
                version: m.version.clone(),
                language: m.language,
                path: m.path.clone(),
                params: m.params.clone(),
                returns: m.returns.clone(),
            })
            .collect();

        let connectors: Vec<ConnectorEntry> = modules
            .iter()
            .filter(|m| m.is_connector())
            .map(|m| ConnectorEntry {
                name: m.name.clone(),
                description: m.description.clone(),
                version: m.version.clone(),
                language: m.language,
                path: m.path.clone(),
                connector_type: m.connector_type.clone(),
                methods: m.methods.clone(),
            })
            .collect();

        let mut capabilities = BTreeSet::new();
        if !tools.is_empty() {
            capabilities.insert("tools".to_string());
        }
        if !connectors.is_empty() {
            capabilities.insert("connectors".to_string());
        }
        for connector in &connectors {
            if let Some(kind) = &connector.connector_type {
                capabilities.insert(format!("connector:{}", kind));
            }
        }

        let dependencies: BTreeSet<String> = modules
            .iter()
            .map(|m| m.language.runtime().to_string())
            .collect();

        let credentials: BTreeSet<String> = modules
            .iter()
            .flat_map(|m| m.credentials.iter().map(|c| c.name.clone()))
            .collect();

        Ok(Manifest {
            name: self.name.clone(),
            version: self.version.clone(),
            tools,
            connectors,
            capabilities: capabilities.into_iter().collect(),
            dependencies: dependencies.into_iter().collect(),
            credentials: credentials.into_iter().collect(),
        })
    }
}
