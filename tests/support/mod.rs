//! Recording test doubles for every build collaborator

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mcp_forge::credentials::{
    CredentialDiscoverer, CredentialPrompter, CredentialRequirement, DefaultCredentialDiscoverer,
};
use mcp_forge::docker::{ImageBuilder, Registry, RegistryAuth};
use mcp_forge::generate::{
    ConfigGenerator, DefaultManifestGenerator, DockerfileGenerator, Manifest, ManifestGenerator,
    TemplateDockerfileGenerator, YamlConfigGenerator,
};
use mcp_forge::modules::{
    DefaultValidator, LoadedModules, Module, ModuleKind, ModuleLanguage, ModuleLoader,
    ModuleValidator, ValidationReport,
};
use mcp_forge::pipeline::Collaborators;
use mcp_forge::{BuildStep, GeneratorOptions, ProgressEvent, ProgressHandler};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Ordered record of collaborator calls shared by all fakes
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

pub fn tool(name: &str) -> Module {
    Module::new(
        name,
        ModuleKind::Tool,
        ModuleLanguage::Python,
        format!("tools/{}.py", name),
    )
    .with_description(format!("The {} tool", name))
}

pub fn connector(name: &str) -> Module {
    Module::new(
        name,
        ModuleKind::Connector,
        ModuleLanguage::Python,
        format!("connectors/{}.py", name),
    )
    .with_description(format!("The {} connector", name))
    .with_methods(["query"])
}

pub struct StaticLoader {
    pub modules: Mutex<Vec<Module>>,
    pub warnings: Vec<String>,
    log: CallLog,
}

impl StaticLoader {
    pub fn set_modules(&self, modules: Vec<Module>) {
        *self.modules.lock().unwrap() = modules;
    }
}

#[async_trait]
impl ModuleLoader for StaticLoader {
    async fn load(&self, _base_path: &Path) -> Result<LoadedModules> {
        self.log.record("load");
        Ok(LoadedModules {
            modules: self.modules.lock().unwrap().clone(),
            warnings: self.warnings.clone(),
        })
    }
}

struct RecordingValidator {
    inner: DefaultValidator,
    log: CallLog,
}

impl ModuleValidator for RecordingValidator {
    fn validate(&self, modules: &[Module]) -> ValidationReport {
        self.log.record("validate");
        self.inner.validate(modules)
    }
}

struct RecordingDiscoverer {
    log: CallLog,
}

impl CredentialDiscoverer for RecordingDiscoverer {
    fn discover(&self, modules: &[Module]) -> Vec<CredentialRequirement> {
        self.log.record("discover");
        DefaultCredentialDiscoverer.discover(modules)
    }
}

pub struct ScriptedPrompter {
    pub answers: HashMap<String, String>,
    log: CallLog,
}

#[async_trait]
impl CredentialPrompter for ScriptedPrompter {
    async fn prompt(&self, requirement: &CredentialRequirement) -> Result<Option<String>> {
        self.log.record(format!("prompt:{}", requirement.name));
        Ok(self.answers.get(&requirement.name).cloned())
    }
}

struct RecordingManifest {
    inner: DefaultManifestGenerator,
    log: CallLog,
}

impl ManifestGenerator for RecordingManifest {
    fn generate(&self, modules: &[Module]) -> Result<Manifest> {
        self.log.record("manifest");
        self.inner.generate(modules)
    }
}

struct RecordingConfig {
    inner: YamlConfigGenerator,
    log: CallLog,
}

impl ConfigGenerator for RecordingConfig {
    fn generate(&self, manifest: &Manifest, environment: &str) -> Result<String> {
        self.log.record("config");
        self.inner.generate(manifest, environment)
    }
}

struct RecordingDockerfile {
    inner: TemplateDockerfileGenerator,
    log: CallLog,
}

impl DockerfileGenerator for RecordingDockerfile {
    fn generate(&self, manifest: &Manifest, config: &str, modules: &[Module]) -> Result<String> {
        self.log.record("dockerfile");
        self.inner.generate(manifest, config, modules)
    }
}

#[derive(Debug, Clone)]
pub enum BuildBehavior {
    Succeed(String),
    Fail(String),
    /// Never finishes; used to exercise cancellation
    Hang,
}

pub struct FakeImageBuilder {
    pub behavior: Mutex<BuildBehavior>,
    pub built_tags: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
    pub fail_remove: Mutex<bool>,
    pub build_started: Notify,
    log: CallLog,
}

impl FakeImageBuilder {
    pub fn set_behavior(&self, behavior: BuildBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    pub fn built_tags(&self) -> Vec<String> {
        self.built_tags.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageBuilder for FakeImageBuilder {
    async fn build(&self, _context: &Path, _dockerfile: &str, tag: &str) -> Result<String> {
        self.log.record("build");
        self.built_tags.lock().unwrap().push(tag.to_string());
        self.build_started.notify_one();

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            BuildBehavior::Succeed(id) => Ok(id),
            BuildBehavior::Fail(message) => Err(anyhow!(message)),
            BuildBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(anyhow!("build hung"))
            }
        }
    }

    async fn remove(&self, image: &str) -> Result<()> {
        self.log.record("remove");
        self.removed.lock().unwrap().push(image.to_string());
        if *self.fail_remove.lock().unwrap() {
            return Err(anyhow!("No such image: {}", image));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub fail_tag: Mutex<bool>,
    pub fail_push: Mutex<bool>,
    pub tagged: Mutex<Vec<(String, Vec<String>)>>,
    pub pushed: Mutex<Vec<(String, String, bool)>>,
    log: CallLog,
}

impl FakeRegistry {
    pub fn tagged(&self) -> Vec<(String, Vec<String>)> {
        self.tagged.lock().unwrap().clone()
    }

    pub fn pushed(&self) -> Vec<(String, String, bool)> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn tag(&self, image: &str, tags: &[String]) -> Result<()> {
        self.log.record("tag");
        if *self.fail_tag.lock().unwrap() {
            return Err(anyhow!("registry unavailable"));
        }
        self.tagged
            .lock()
            .unwrap()
            .push((image.to_string(), tags.to_vec()));
        Ok(())
    }

    async fn push(&self, tag: &str, registry: &str, auth: Option<&RegistryAuth>) -> Result<()> {
        self.log.record("push");
        if *self.fail_push.lock().unwrap() {
            return Err(anyhow!("denied: requested access to the resource is denied"));
        }
        self.pushed
            .lock()
            .unwrap()
            .push((tag.to_string(), registry.to_string(), auth.is_some()));
        Ok(())
    }
}

/// Collects every progress event it sees
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn step_events(&self) -> Vec<BuildStep> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.step().cloned())
            .collect()
    }
}

impl ProgressHandler for RecordingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct PanickingProgress;

impl ProgressHandler for PanickingProgress {
    fn on_progress(&self, _event: &ProgressEvent) {
        panic!("progress handler failure");
    }
}

/// A temporary workspace wired to recording fakes
pub struct Harness {
    pub workspace: TempDir,
    pub log: CallLog,
    pub loader: Arc<StaticLoader>,
    pub prompter_answers: HashMap<String, String>,
    pub builder: Arc<FakeImageBuilder>,
    pub registry: Arc<FakeRegistry>,
    pub env: HashMap<String, String>,
}

impl Harness {
    pub fn new(modules: Vec<Module>) -> Self {
        let log = CallLog::default();
        let workspace = tempfile::Builder::new()
            .prefix("forge-ws")
            .tempdir()
            .unwrap();
        Self {
            loader: Arc::new(StaticLoader {
                modules: Mutex::new(modules),
                warnings: Vec::new(),
                log: log.clone(),
            }),
            builder: Arc::new(FakeImageBuilder {
                behavior: Mutex::new(BuildBehavior::Succeed("sha256:0123456789abcdef".to_string())),
                built_tags: Mutex::new(Vec::new()),
                removed: Mutex::new(Vec::new()),
                fail_remove: Mutex::new(false),
                build_started: Notify::new(),
                log: log.clone(),
            }),
            registry: Arc::new(FakeRegistry {
                log: log.clone(),
                ..Default::default()
            }),
            prompter_answers: HashMap::new(),
            env: HashMap::new(),
            workspace,
            log,
        }
    }

    pub fn path(&self) -> &Path {
        self.workspace.path()
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.path().join(".mcp-forge")
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.artifacts_dir().join("checkpoint.json")
    }

    pub fn options(&self) -> GeneratorOptions {
        GeneratorOptions::new(self.path())
            .with_skip_prompts(true)
            .with_environment("production")
    }

    pub fn collaborators(&self) -> Collaborators {
        let env = self.env.clone();
        Collaborators {
            loader: self.loader.clone(),
            validator: Arc::new(RecordingValidator {
                inner: DefaultValidator::new(),
                log: self.log.clone(),
            }),
            discoverer: Arc::new(RecordingDiscoverer {
                log: self.log.clone(),
            }),
            prompter: Arc::new(ScriptedPrompter {
                answers: self.prompter_answers.clone(),
                log: self.log.clone(),
            }),
            manifest: Arc::new(RecordingManifest {
                inner: DefaultManifestGenerator::new("demo-server", "1.2.0"),
                log: self.log.clone(),
            }),
            config: Arc::new(RecordingConfig {
                inner: YamlConfigGenerator::default(),
                log: self.log.clone(),
            }),
            dockerfile: Arc::new(RecordingDockerfile {
                inner: TemplateDockerfileGenerator::default(),
                log: self.log.clone(),
            }),
            image_builder: self.builder.clone(),
            registry: self.registry.clone(),
            env: Arc::new(move |name| env.get(name).cloned()),
        }
    }
}
