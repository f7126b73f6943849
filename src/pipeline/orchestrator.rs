use super::checkpoint::{Checkpoint, CheckpointManager, CheckpointScope, ResumeCheck};
use super::context::{Collaborators, ENV_FILE};
use super::error::{describe, BuildError};
use super::options::GeneratorOptions;
use super::policy::{SkipReason, StepAction, STEP_POLICIES};
use super::result::BuildResult;
use super::step::{StepId, StepTracker, TransitionError};
use crate::credentials::{resolve_credentials, write_env_file};
use crate::generate::Manifest;
use crate::modules::Module;
use crate::progress::{notify, ProgressEvent};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const MANIFEST_FILE: &str = "manifest.yaml";
pub const CONFIG_FILE: &str = "config.yaml";
pub const DOCKERFILE_FILE: &str = "Dockerfile";

const FALLBACK_IMAGE_NAME: &str = "mcp-server";

/// Outputs produced by earlier steps and consumed by later ones
#[derive(Debug, Default)]
struct BuildState {
    modules: Vec<Module>,
    module_names: Vec<String>,
    manifest: Option<Manifest>,
    config: Option<String>,
    dockerfile: Option<String>,
    image_id: Option<String>,
    tags: Vec<String>,
}

/// Outcome of an explicit rollback
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_image: Option<String>,
    pub checkpoint_cleared: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Runs the eight build steps for one workspace. Constructed per invocation.
pub struct BuildOrchestrator {
    options: GeneratorOptions,
    collaborators: Collaborators,
    checkpoints: CheckpointManager,
    tracker: StepTracker,
    cancel: CancellationToken,
    state: BuildState,
    resume_from: Option<Checkpoint>,
    resumed_from: Option<u8>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl BuildOrchestrator {
    pub fn new(options: GeneratorOptions, collaborators: Collaborators) -> Self {
        let checkpoints =
            CheckpointManager::in_dir(&options.artifacts_dir(), options.resume_window);
        let tracker = StepTracker::new(options.progress.clone());
        Self {
            options,
            collaborators,
            checkpoints,
            tracker,
            cancel: CancellationToken::new(),
            state: BuildState::default(),
            resume_from: None,
            resumed_from: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    pub fn can_resume_build(&self) -> ResumeCheck {
        self.checkpoints.can_resume_build()
    }

    /// Executes the build. Never panics on collaborator failure; every
    /// problem ends up in the returned result.
    pub async fn run(mut self) -> BuildResult {
        let start = Instant::now();
        info!(
            workspace = %self.options.base_path.display(),
            environment = %self.options.environment,
            dry_run = self.options.dry_run,
            resume = self.options.resume,
            "Starting build"
        );
        self.emit(ProgressEvent::BuildStarted {
            base_path: self.options.base_path.display().to_string(),
            dry_run: self.options.dry_run,
            resume: self.options.resume,
        });

        self.resume_from = self.initial_resume_point();

        for policy in STEP_POLICIES.iter() {
            let id = policy.step;
            let resume_step = self.resume_from.as_ref().map(|cp| cp.step);

            if let StepAction::Skip(reason) = policy.action(self.options.dry_run, resume_step) {
                if let Err(e) = self.skip(id, reason) {
                    self.reject_transition(e);
                    break;
                }
                continue;
            }

            if let Err(e) = self.tracker.start_step(id) {
                self.reject_transition(e);
                break;
            }
            debug!(step = id.number(), "{}", id.name());

            let outcome = if self.cancel.is_cancelled() {
                Err(BuildError::Cancelled)
            } else {
                self.execute(id).await
            };

            match outcome {
                Ok(message) => {
                    if let Err(e) = self.tracker.complete_step(id, message) {
                        self.reject_transition(e);
                        break;
                    }
                    self.save_checkpoint(id);
                }
                Err(err) => {
                    warn!(step = id.number(), error = %err, "Build step failed");
                    if let Err(e) = self.tracker.fail_step(id, err.to_string()) {
                        warn!(error = %e, "Step transition rejected");
                    }
                    self.errors.extend(err.messages());
                    break;
                }
            }
        }

        self.finish(start)
    }

    /// Removes the image recorded by the checkpoint (if any) and clears the
    /// checkpoint. Failures are reported as warnings.
    pub async fn rollback(&self) -> RollbackOutcome {
        let mut outcome = RollbackOutcome::default();

        match self.checkpoints.read_checkpoint() {
            Ok(Some(Checkpoint {
                image_id: Some(image),
                ..
            })) => match self.collaborators.image_builder.remove(&image).await {
                Ok(()) => {
                    info!(image = %image, "Removed image from interrupted build");
                    outcome.removed_image = Some(image);
                }
                Err(e) => {
                    let message = format!("Failed to remove image {}: {}", image, describe(&e));
                    warn!("{}", message);
                    outcome.warnings.push(message);
                }
            },
            Ok(_) => debug!("No image recorded in checkpoint"),
            Err(e) => {
                let message = format!("Ignoring unreadable checkpoint: {}", e);
                warn!("{}", message);
                outcome.warnings.push(message);
            }
        }

        match self.checkpoints.clear_checkpoint() {
            Ok(cleared) => outcome.checkpoint_cleared = cleared,
            Err(e) => {
                warn!(error = %e, "Failed to clear checkpoint");
                outcome.warnings.push(e.to_string());
            }
        }

        outcome
    }

    fn initial_resume_point(&mut self) -> Option<Checkpoint> {
        if !self.options.resume {
            if let Ok(Some(cp)) = self.checkpoints.read_checkpoint() {
                info!(
                    step = cp.step,
                    "Found checkpoint from an interrupted build, pass --resume to continue it"
                );
            }
            return None;
        }

        let check = self.checkpoints.can_resume_build();
        if check.can_resume {
            return check.checkpoint;
        }

        let reason = check
            .message
            .unwrap_or_else(|| "No checkpoint found".to_string());
        let warning = format!(
            "{}; starting a fresh build",
            BuildError::StaleCheckpoint(reason)
        );
        warn!("{}", warning);
        self.warnings.push(warning);
        None
    }

    /// Validates the checkpoint against the loaded modules and the run's
    /// environment and image override. Runs once step 1 has loaded the modules.
    fn reconcile_resume(&mut self) {
        let mut checkpoint = match self.resume_from.take() {
            Some(cp) => cp,
            None => return,
        };

        let mismatch = checkpoint.scope_mismatch(&self.checkpoint_scope());
        if let Some(changed) = mismatch {
            let warning = format!("{}; starting a fresh build", changed);
            warn!("{}", warning);
            self.warnings.push(warning);
            return;
        }

        if checkpoint.step >= StepId::BuildImage.number() {
            match &checkpoint.image_id {
                Some(image) => self.state.image_id = Some(image.clone()),
                None => checkpoint.step = StepId::GenerateDockerfile.number(),
            }
        }

        info!(step = checkpoint.step, "Resuming interrupted build");
        self.resumed_from = Some(checkpoint.step);
        self.resume_from = Some(checkpoint);
    }

    async fn execute(&mut self, id: StepId) -> Result<String, BuildError> {
        match id {
            StepId::LoadModules => self.load_modules().await,
            StepId::ValidateModules => self.validate_modules(),
            StepId::CollectCredentials => self.collect_credentials().await,
            StepId::GenerateManifest => self.generate_manifest(),
            StepId::GenerateConfig => self.generate_config(),
            StepId::GenerateDockerfile => self.generate_dockerfile(),
            StepId::BuildImage => self.build_image().await,
            StepId::PublishImage => self.publish_image().await,
        }
    }

    async fn load_modules(&mut self) -> Result<String, BuildError> {
        let base = self.options.base_path.clone();
        let loaded = cancellable(&self.cancel, self.collaborators.loader.load(&base), |e| {
            BuildError::ModuleLoad(describe(&e))
        })
        .await?;

        for warning in &loaded.warnings {
            warn!("{}", warning);
        }
        self.warnings.extend(loaded.warnings);

        if loaded.modules.is_empty() {
            return Err(BuildError::NoModulesFound { path: base });
        }

        let mut names: Vec<String> = loaded.modules.iter().map(Module::identifier).collect();
        names.sort();
        self.state.module_names = names;
        self.state.modules = loaded.modules;
        self.reconcile_resume();

        let tools = self.state.modules.iter().filter(|m| m.is_tool()).count();
        Ok(format!(
            "Loaded {} tool(s) and {} connector(s)",
            tools,
            self.state.modules.len() - tools
        ))
    }

    fn validate_modules(&mut self) -> Result<String, BuildError> {
        let report = self.collaborators.validator.validate(&self.state.modules);
        self.warnings.extend(report.warnings);
        if !report.valid {
            return Err(BuildError::ValidationFailed {
                errors: report.errors,
            });
        }
        Ok(format!("Validated {} module(s)", self.state.modules.len()))
    }

    async fn collect_credentials(&mut self) -> Result<String, BuildError> {
        let requirements = self.collaborators.discoverer.discover(&self.state.modules);
        let env = self.collaborators.env.clone();

        let resolved = cancellable(
            &self.cancel,
            resolve_credentials(
                &requirements,
                self.options.skip_prompts,
                self.collaborators.prompter.as_ref(),
                |name: &str| env(name),
            ),
            |e| BuildError::Credentials(describe(&e)),
        )
        .await?;

        for warning in &resolved.warnings {
            warn!(credential = %warning.name, "{}", warning);
            self.warnings.push(warning.to_string());
        }

        if !resolved.values.is_empty() {
            let dir = self.options.artifacts_dir();
            std::fs::create_dir_all(&dir).map_err(|source| BuildError::Artifact {
                path: dir.clone(),
                source,
            })?;
            write_env_file(&dir.join(ENV_FILE), &resolved.values)
                .map_err(|e| BuildError::Credentials(describe(&e)))?;
        }

        Ok(format!(
            "Resolved {} of {} credential(s)",
            resolved.values.len(),
            requirements.len()
        ))
    }

    fn generate_manifest(&mut self) -> Result<String, BuildError> {
        let manifest = self
            .collaborators
            .manifest
            .generate(&self.state.modules)
            .map_err(|e| BuildError::ManifestGeneration(describe(&e)))?;
        let yaml = manifest
            .to_yaml()
            .map_err(|e| BuildError::ManifestGeneration(describe(&e)))?;
        self.write_artifact(MANIFEST_FILE, &yaml)?;

        let message = format!(
            "Manifest {} v{} with {} tool(s) and {} connector(s)",
            manifest.name,
            manifest.version,
            manifest.tool_count(),
            manifest.connector_count()
        );
        self.state.manifest = Some(manifest);
        Ok(message)
    }

    fn generate_config(&mut self) -> Result<String, BuildError> {
        let manifest = self.state.manifest.as_ref().ok_or_else(|| {
            BuildError::ConfigGeneration("manifest has not been generated".to_string())
        })?;
        let config = self
            .collaborators
            .config
            .generate(manifest, &self.options.environment)
            .map_err(|e| BuildError::ConfigGeneration(describe(&e)))?;
        self.write_artifact(CONFIG_FILE, &config)?;
        self.state.config = Some(config);
        Ok(format!(
            "Server config for environment {}",
            self.options.environment
        ))
    }

    fn generate_dockerfile(&mut self) -> Result<String, BuildError> {
        let (manifest, config) = match (&self.state.manifest, &self.state.config) {
            (Some(manifest), Some(config)) => (manifest, config),
            _ => {
                return Err(BuildError::DockerfileGeneration(
                    "manifest and config have not been generated".to_string(),
                ))
            }
        };
        let dockerfile = self
            .collaborators
            .dockerfile
            .generate(manifest, config, &self.state.modules)
            .map_err(|e| BuildError::DockerfileGeneration(describe(&e)))?;
        self.write_artifact(DOCKERFILE_FILE, &dockerfile)?;
        self.state.dockerfile = Some(dockerfile);
        Ok(format!(
            "Dockerfile written to {}",
            self.options.artifacts_dir().join(DOCKERFILE_FILE).display()
        ))
    }

    async fn build_image(&mut self) -> Result<String, BuildError> {
        let dockerfile = self.state.dockerfile.clone().ok_or_else(|| {
            BuildError::ImageBuild("Dockerfile has not been generated".to_string())
        })?;
        let attempt_tag = format!("{}:build-{}", self.image_name(), attempt_id());
        info!(tag = %attempt_tag, "Building image");

        let built = cancellable(
            &self.cancel,
            self.collaborators
                .image_builder
                .build(&self.options.base_path, &dockerfile, &attempt_tag),
            |e| BuildError::ImageBuild(describe(&e)),
        )
        .await;

        match built {
            Ok(image_id) => {
                let message = format!("Built image {} ({})", attempt_tag, short_id(&image_id));
                self.state.image_id = Some(image_id);
                Ok(message)
            }
            Err(err) => {
                self.rollback_image(&attempt_tag).await;
                Err(err)
            }
        }
    }

    /// Removes whatever the failed attempt left behind. Never fails the caller.
    async fn rollback_image(&mut self, build_attempt: &str) {
        info!(image = %build_attempt, "Rolling back failed image build");
        let removed = match self.collaborators.image_builder.remove(build_attempt).await {
            Ok(()) => true,
            Err(e) => {
                let warning = format!(
                    "Rollback could not remove {}: {}",
                    build_attempt,
                    describe(&e)
                );
                warn!("{}", warning);
                self.warnings.push(warning);
                false
            }
        };
        self.emit(ProgressEvent::Rollback {
            image: build_attempt.to_string(),
            removed,
        });
    }

    async fn publish_image(&mut self) -> Result<String, BuildError> {
        let image = self
            .state
            .image_id
            .clone()
            .ok_or_else(|| BuildError::Registry("No built image to tag".to_string()))?;
        let tags = self.image_tags();

        cancellable(
            &self.cancel,
            self.collaborators.registry.tag(&image, &tags),
            |e| BuildError::Registry(describe(&e)),
        )
        .await?;
        self.state.tags = tags.clone();

        let registry = match self.options.registry.clone() {
            Some(registry) => registry,
            None => return Ok(format!("Tagged {}", tags.join(", "))),
        };

        for tag in &tags {
            cancellable(
                &self.cancel,
                self.collaborators.registry.push(
                    tag,
                    &registry,
                    self.options.registry_auth.as_ref(),
                ),
                |e| BuildError::Registry(describe(&e)),
            )
            .await?;
        }

        Ok(format!(
            "Pushed {} tag(s) to {}",
            tags.len(),
            registry.trim_end_matches('/')
        ))
    }

    fn image_name(&self) -> String {
        match (&self.options.image_name, &self.state.manifest) {
            (Some(name), _) => name.clone(),
            (None, Some(manifest)) => image_repository(&manifest.name),
            (None, None) => FALLBACK_IMAGE_NAME.to_string(),
        }
    }

    fn image_tags(&self) -> Vec<String> {
        let name = self.image_name();
        let mut tags = vec![
            "latest".to_string(),
            image_tag(&self.options.environment),
        ];
        if let Some(manifest) = &self.state.manifest {
            tags.push(image_tag(&manifest.version));
        }

        let mut references: Vec<String> = Vec::new();
        for tag in tags {
            let reference = format!("{}:{}", name, tag);
            if !tag.is_empty() && !references.contains(&reference) {
                references.push(reference);
            }
        }
        references
    }

    fn skip(&mut self, id: StepId, reason: SkipReason) -> Result<(), TransitionError> {
        self.tracker.skip_step(id, reason.describe())?;
        if reason == SkipReason::CompletedPreviously {
            self.save_checkpoint(id);
        }
        Ok(())
    }

    fn checkpoint_scope(&self) -> CheckpointScope<'_> {
        CheckpointScope::new(&self.state.module_names, &self.options.environment)
            .with_image_name(self.options.image_name.as_deref())
    }

    /// Records progress after `id`. On resume the recorded step never moves backwards.
    fn save_checkpoint(&mut self, id: StepId) {
        let step = match &self.resume_from {
            Some(cp) if cp.step > id.number() => {
                StepId::from_number(cp.step).unwrap_or(id)
            }
            _ => id,
        };
        if let Err(e) = self.checkpoints.write_checkpoint(
            step.number(),
            step.name(),
            self.checkpoint_scope(),
            self.state.image_id.as_deref(),
        ) {
            let warning = format!("Failed to write checkpoint: {}", e);
            warn!("{}", warning);
            self.warnings.push(warning);
        }
    }

    fn write_artifact(&self, file_name: &str, content: &str) -> Result<PathBuf, BuildError> {
        let dir = self.options.artifacts_dir();
        let path = dir.join(file_name);
        std::fs::create_dir_all(&dir)
            .and_then(|_| std::fs::write(&path, content))
            .map_err(|source| BuildError::Artifact {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "Artifact written");
        Ok(path)
    }

    /// A rejected transition ends the build without touching the checkpoint.
    fn reject_transition(&mut self, error: TransitionError) {
        warn!(error = %error, "Step transition rejected");
        self.errors.push(error.to_string());
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.options.progress {
            notify(handler.as_ref(), &event);
        }
    }

    fn finish(mut self, start: Instant) -> BuildResult {
        let success = self.errors.is_empty() && self.tracker.all_succeeded();

        if success {
            if let Err(e) = self.checkpoints.clear_checkpoint() {
                let warning = format!("Failed to clear checkpoint: {}", e);
                warn!("{}", warning);
                self.warnings.push(warning);
            }
        }

        let duration = start.elapsed();
        if success {
            info!(duration_ms = duration.as_millis(), "Build succeeded");
        } else {
            warn!(
                duration_ms = duration.as_millis(),
                errors = self.errors.len(),
                "Build failed"
            );
        }
        self.emit(ProgressEvent::BuildFinished {
            success,
            total_time: duration,
        });

        let tool_count = self.state.modules.iter().filter(|m| m.is_tool()).count();
        let connector_count = self.state.modules.len() - tool_count;

        BuildResult {
            success,
            tool_count,
            connector_count,
            steps: self.tracker.into_steps(),
            errors: self.errors,
            warnings: self.warnings,
            duration,
            image_id: self.state.image_id,
            tags: self.state.tags,
            resumed_from: self.resumed_from,
            artifacts_dir: self.options.artifacts_dir(),
        }
    }
}

/// Awaits `operation` unless the build is cancelled first
async fn cancellable<T, F, M>(
    token: &CancellationToken,
    operation: F,
    map_err: M,
) -> Result<T, BuildError>
where
    F: Future<Output = anyhow::Result<T>>,
    M: FnOnce(anyhow::Error) -> BuildError,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(BuildError::Cancelled),
        result = operation => result.map_err(map_err),
    }
}

/// Lowercases and replaces characters Docker rejects in repository names
pub fn image_repository(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    if trimmed.is_empty() {
        FALLBACK_IMAGE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

fn image_tag(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .take(128)
        .collect();
    replaced.trim_start_matches(['.', '-']).to_string()
}

fn attempt_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn short_id(image_id: &str) -> &str {
    let id = image_id.strip_prefix("sha256:").unwrap_or(image_id);
    &id[..id.len().min(12)]
}
