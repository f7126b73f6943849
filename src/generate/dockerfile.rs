//! Dockerfile templating for the assembled server

use super::manifest::Manifest;
use super::server_config::ServerConfig;
use crate::modules::{Module, ModuleKind};
use anyhow::{Context, Result};
use std::collections::BTreeSet;

pub const DEFAULT_PYTHON_IMAGE: &str = "python:3.12-slim";
pub const DEFAULT_NODE_IMAGE: &str = "node:20-slim";
const CONFIG_PATH_IN_IMAGE: &str = "/app/config.yaml";

pub trait DockerfileGenerator: Send + Sync {
    fn generate(&self, manifest: &Manifest, config: &str, modules: &[Module]) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct TemplateDockerfileGenerator {
    /// Workspace-relative directory holding the generated config
    artifacts_dir: String,
    base_image: Option<String>,
    server_command: Vec<String>,
}

impl TemplateDockerfileGenerator {
    pub fn new(artifacts_dir: impl Into<String>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
            base_image: None,
            server_command: vec![
                "mcp-server".to_string(),
                "--config".to_string(),
                CONFIG_PATH_IN_IMAGE.to_string(),
            ],
        }
    }

    pub fn with_base_image(mut self, image: impl Into<String>) -> Self {
        self.base_image = Some(image.into());
        self
    }

    pub fn with_server_command(mut self, command: Vec<String>) -> Self {
        self.server_command = command;
        self
    }

    fn base_image(&self, manifest: &Manifest) -> String {
        if let Some(image) = &self.base_image {
            return image.clone();
        }
        if manifest.requires_runtime("python") {
            DEFAULT_PYTHON_IMAGE.to_string()
        } else {
            DEFAULT_NODE_IMAGE.to_string()
        }
    }
}

impl Default for TemplateDockerfileGenerator {
    fn default() -> Self {
        Self::new(".mcp-forge")
    }
}

impl DockerfileGenerator for TemplateDockerfileGenerator {
    fn generate(&self, manifest: &Manifest, config: &str, modules: &[Module]) -> Result<String> {
        if self.server_command.is_empty() {
            anyhow::bail!("Server command cannot be empty");
        }
        let server = ServerConfig::from_yaml(config)
            .context("Generated config is not valid server configuration")?
            .server;

        let needs_python = manifest.requires_runtime("python");
        let needs_node = manifest.requires_runtime("node");
        let base_image = self.base_image(manifest);

        let mut lines = vec![
            format!(
                "# Generated by mcp-forge for {} {}",
                manifest.name, manifest.version
            ),
            format!("FROM {}", base_image),
            String::new(),
            format!(
                "LABEL org.opencontainers.image.title=\"{}\" \\\n      org.opencontainers.image.version=\"{}\" \\\n      io.mcp-forge.tools=\"{}\" \\\n      io.mcp-forge.connectors=\"{}\"",
                manifest.name,
                manifest.version,
                manifest.tool_count(),
                manifest.connector_count()
            ),
            String::new(),
        ];

        if needs_python && needs_node && self.base_image.is_none() {
            lines.push(
                "RUN apt-get update \\\n    && apt-get install -y --no-install-recommends nodejs npm \\\n    && rm -rf /var/lib/apt/lists/*"
                    .to_string(),
            );
            lines.push(String::new());
        }

        lines.push("WORKDIR /app".to_string());

        let module_dirs: BTreeSet<&'static str> =
            modules.iter().map(|m| m.kind.directory()).collect();
        for kind in [ModuleKind::Tool, ModuleKind::Connector] {
            let dir = kind.directory();
            if module_dirs.contains(dir) {
                lines.push(format!("COPY {dir}/ /app/{dir}/"));
            }
        }
        lines.push(format!(
            "COPY {}/config.yaml {}",
            self.artifacts_dir, CONFIG_PATH_IN_IMAGE
        ));
        lines.push(format!(
            "COPY {}/manifest.yaml /app/manifest.yaml",
            self.artifacts_dir
        ));
        lines.push(String::new());

        let search_dirs: Vec<&str> = module_dirs.iter().copied().collect();
        if needs_python {
            lines.push(format!(
                "RUN find {} -name requirements.txt -exec pip install --no-cache-dir -r {{}} \\;",
                search_dirs.join(" ")
            ));
        }
        if needs_node {
            lines.push(format!(
                "RUN for f in $(find {} -name package.json -not -path '*/node_modules/*'); do \\\n      (cd \"$(dirname \"$f\")\" && npm install --omit=dev); \\\n    done",
                search_dirs.join(" ")
            ));
        }
        if needs_python || needs_node {
            lines.push(String::new());
        }

        lines.push(format!(
            "ENV MCP_SERVER_NAME=\"{}\" \\\n    MCP_ENVIRONMENT=\"{}\" \\\n    MCP_CONFIG={}",
            server.name, server.environment, CONFIG_PATH_IN_IMAGE
        ));
        if !manifest.credentials.is_empty() {
            lines.push(format!(
                "# Credentials are supplied at run time: {}",
                manifest.credentials.join(", ")
            ));
        }
        lines.push(String::new());
        lines.push(format!("EXPOSE {}", server.port));

        let command = self
            .server_command
            .iter()
            .map(|part| format!("\"{}\"", part.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("CMD [{}]", command));

        let mut dockerfile = lines.join("\n");
        dockerfile.push('\n');
        Ok(dockerfile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::manifest::{DefaultManifestGenerator, ManifestGenerator};
    use crate::generate::server_config::{ConfigGenerator, YamlConfigGenerator};
    use crate::modules::ModuleLanguage;

    fn render(modules: &[Module]) -> String {
        let manifest = DefaultManifestGenerator::new("demo", "1.0.0")
            .generate(modules)
            .unwrap();
        let config = YamlConfigGenerator::new(4000)
            .generate(&manifest, "staging")
            .unwrap();
        TemplateDockerfileGenerator::default()
            .generate(&manifest, &config, modules)
            .unwrap()
    }

    #[test]
    fn test_python_only_workspace() {
        let modules = vec![Module::new(
            "echo",
            ModuleKind::Tool,
            ModuleLanguage::Python,
            "tools/echo.py",
        )];
        let dockerfile = render(&modules);

        assert!(dockerfile.contains("FROM python:3.12-slim"));
        assert!(dockerfile.contains("COPY tools/ /app/tools/"));
        assert!(!dockerfile.contains("COPY connectors/"));
        assert!(dockerfile.contains("COPY .mcp-forge/config.yaml /app/config.yaml"));
        assert!(dockerfile.contains("pip install"));
        assert!(!dockerfile.contains("npm install"));
        assert!(dockerfile.contains("MCP_ENVIRONMENT=\"staging\""));
        assert!(dockerfile.contains("EXPOSE 4000"));
        assert!(dockerfile.ends_with("CMD [\"mcp-server\", \"--config\", \"/app/config.yaml\"]\n"));
    }

    #[test]
    fn test_mixed_runtimes_install_node() {
        let modules = vec![
            Module::new("echo", ModuleKind::Tool, ModuleLanguage::Python, "tools/echo.py"),
            Module::new("db", ModuleKind::Connector, ModuleLanguage::TypeScript, "connectors/db.ts")
                .with_credential("DB_URL", true),
        ];
        let dockerfile = render(&modules);

        assert!(dockerfile.contains("apt-get install -y --no-install-recommends nodejs npm"));
        assert!(dockerfile.contains("COPY connectors/ /app/connectors/"));
        assert!(dockerfile.contains("npm install --omit=dev"));
        assert!(dockerfile.contains("# Credentials are supplied at run time: DB_URL"));
    }

    #[test]
    fn test_node_only_uses_node_image() {
        let modules = vec![Module::new(
            "search",
            ModuleKind::Tool,
            ModuleLanguage::JavaScript,
            "tools/search.js",
        )];
        assert!(render(&modules).contains("FROM node:20-slim"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let modules = vec![Module::new(
            "echo",
            ModuleKind::Tool,
            ModuleLanguage::Python,
            "tools/echo.py",
        )];
        let manifest = DefaultManifestGenerator::new("demo", "1.0.0")
            .generate(&modules)
            .unwrap();
        let result = TemplateDockerfileGenerator::default().generate(&manifest, "not: [valid", &modules);
        assert!(result.is_err());
    }
}
