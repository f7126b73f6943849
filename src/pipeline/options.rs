use super::checkpoint::DEFAULT_RESUME_WINDOW;
use crate::docker::RegistryAuth;
use crate::progress::ProgressHandler;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_OUTPUT_DIR: &str = ".mcp-forge";

/// Options for a single build invocation
#[derive(Clone)]
pub struct GeneratorOptions {
    pub base_path: PathBuf,
    pub dry_run: bool,
    pub environment: String,
    pub skip_prompts: bool,
    pub progress: Option<Arc<dyn ProgressHandler>>,
    pub resume: bool,
    pub resume_window: Duration,
    pub image_name: Option<String>,
    pub registry: Option<String>,
    pub registry_auth: Option<RegistryAuth>,
    /// Directory under `base_path` that receives generated artifacts and the checkpoint
    pub output_dir: String,
}

impl GeneratorOptions {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            dry_run: false,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            skip_prompts: false,
            progress: None,
            resume: false,
            resume_window: DEFAULT_RESUME_WINDOW,
            image_name: None,
            registry: None,
            registry_auth: None,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_skip_prompts(mut self, skip_prompts: bool) -> Self {
        self.skip_prompts = skip_prompts;
        self
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = Some(handler);
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_resume_window(mut self, window: Duration) -> Self {
        self.resume_window = window;
        self
    }

    pub fn with_image_name(mut self, name: impl Into<String>) -> Self {
        self.image_name = Some(name.into());
        self
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    pub fn with_registry_auth(mut self, auth: RegistryAuth) -> Self {
        self.registry_auth = Some(auth);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.base_path.join(&self.output_dir)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl fmt::Debug for GeneratorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorOptions")
            .field("base_path", &self.base_path)
            .field("dry_run", &self.dry_run)
            .field("environment", &self.environment)
            .field("skip_prompts", &self.skip_prompts)
            .field("progress", &self.progress.is_some())
            .field("resume", &self.resume)
            .field("resume_window", &self.resume_window)
            .field("image_name", &self.image_name)
            .field("registry", &self.registry)
            .field("registry_auth", &self.registry_auth)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}
