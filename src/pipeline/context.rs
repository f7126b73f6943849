//! The set of collaborators a build drives

use super::checkpoint::CHECKPOINT_FILE;
use super::options::GeneratorOptions;
use crate::config::ForgeConfig;
use crate::credentials::{
    CredentialDiscoverer, CredentialPrompter, DefaultCredentialDiscoverer, TerminalPrompter,
};
use crate::docker::{DockerImageBuilder, DockerRegistry, ImageBuilder, Registry};
use crate::generate::{
    ConfigGenerator, DefaultManifestGenerator, DockerfileGenerator, ManifestGenerator,
    TemplateDockerfileGenerator, YamlConfigGenerator,
};
use crate::modules::{DefaultValidator, FsModuleLoader, ModuleLoader, ModuleValidator};
use std::path::PathBuf;
use std::sync::Arc;

pub const ENV_FILE: &str = ".env";

/// Looks up a credential value by environment variable name
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct Collaborators {
    pub loader: Arc<dyn ModuleLoader>,
    pub validator: Arc<dyn ModuleValidator>,
    pub discoverer: Arc<dyn CredentialDiscoverer>,
    pub prompter: Arc<dyn CredentialPrompter>,
    pub manifest: Arc<dyn ManifestGenerator>,
    pub config: Arc<dyn ConfigGenerator>,
    pub dockerfile: Arc<dyn DockerfileGenerator>,
    pub image_builder: Arc<dyn ImageBuilder>,
    pub registry: Arc<dyn Registry>,
    pub env: EnvLookup,
}

impl Collaborators {
    /// Filesystem loader, built-in generators and the local Docker daemon
    pub fn docker(options: &GeneratorOptions, config: &ForgeConfig) -> Self {
        let mut dockerfile = TemplateDockerfileGenerator::new(options.output_dir.clone());
        if let Some(image) = &config.base_image {
            dockerfile = dockerfile.with_base_image(image.clone());
        }

        let excluded = vec![
            PathBuf::from(&options.output_dir).join(ENV_FILE),
            PathBuf::from(&options.output_dir).join(CHECKPOINT_FILE),
        ];

        Self {
            loader: Arc::new(FsModuleLoader::new()),
            validator: Arc::new(DefaultValidator::new()),
            discoverer: Arc::new(DefaultCredentialDiscoverer),
            prompter: Arc::new(TerminalPrompter),
            manifest: Arc::new(DefaultManifestGenerator::for_workspace(&options.base_path)),
            config: Arc::new(YamlConfigGenerator::new(config.server_port)),
            dockerfile: Arc::new(dockerfile),
            image_builder: Arc::new(DockerImageBuilder::new().with_excluded(excluded)),
            registry: Arc::new(DockerRegistry::new()),
            env: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ModuleValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_discoverer(mut self, discoverer: Arc<dyn CredentialDiscoverer>) -> Self {
        self.discoverer = discoverer;
        self
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn CredentialPrompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_manifest(mut self, manifest: Arc<dyn ManifestGenerator>) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_config(mut self, config: Arc<dyn ConfigGenerator>) -> Self {
        self.config = config;
        self
    }

    pub fn with_dockerfile(mut self, dockerfile: Arc<dyn DockerfileGenerator>) -> Self {
        self.dockerfile = dockerfile;
        self
    }

    pub fn with_image_builder(mut self, builder: Arc<dyn ImageBuilder>) -> Self {
        self.image_builder = builder;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::LoadedModules;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::Path;

    struct EmptyLoader;

    #[async_trait]
    impl ModuleLoader for EmptyLoader {
        async fn load(&self, _base_path: &Path) -> Result<LoadedModules> {
            Ok(LoadedModules::default())
        }
    }

    #[tokio::test]
    async fn test_overrides_replace_defaults() {
        let options = GeneratorOptions::new("/work/demo");
        let collaborators = Collaborators::docker(&options, &ForgeConfig::default())
            .with_loader(Arc::new(EmptyLoader))
            .with_env(|name| (name == "TOKEN").then(|| "t".to_string()));

        let loaded = collaborators
            .loader
            .load(Path::new("/does/not/exist"))
            .await
            .unwrap();
        assert!(loaded.is_empty());
        assert_eq!((collaborators.env)("TOKEN").as_deref(), Some("t"));
        assert_eq!((collaborators.env)("OTHER"), None);
    }
}
