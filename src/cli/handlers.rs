//! Subcommand handlers. Each returns the process exit code.

use super::commands::{BuildArgs, RollbackArgs, StatusArgs};
use super::output::OutputFormatter;
use crate::config::ForgeConfig;
use crate::docker::check_docker_available;
use crate::pipeline::{BuildOrchestrator, CheckpointManager, Collaborators};
use crate::progress::LoggingHandler;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub async fn handle_build(args: &BuildArgs, quiet: bool, cancel: CancellationToken) -> i32 {
    let config = match load_config() {
        Ok(c) => c,
        Err(code) => return code,
    };
    let workspace = match resolve_workspace(args.path.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return 1;
        }
    };

    let mut options = config
        .generator_options(&workspace)
        .with_dry_run(args.dry_run)
        .with_skip_prompts(args.skip_prompts)
        .with_resume(args.resume);
    if let Some(environment) = &args.environment {
        options = options.with_environment(environment.clone());
    }
    if let Some(secs) = args.resume_window {
        options = options.with_resume_window(Duration::from_secs(secs));
    }
    if let Some(image) = &args.image {
        options = options.with_image_name(image.clone());
    }
    if let Some(registry) = &args.registry {
        options = options.with_registry(registry.clone());
    }
    if !quiet {
        options = options.with_progress(Arc::new(LoggingHandler));
    }

    if !args.dry_run && !check_docker_available().await {
        warn!("Docker daemon is not reachable, the image build step will fail");
    }

    debug!(?options, "Build options");
    let collaborators = Collaborators::docker(&options, &config);
    let result = BuildOrchestrator::new(options, collaborators)
        .with_cancellation(cancel)
        .run()
        .await;

    let formatter = OutputFormatter::new(args.format.into());
    let emitted = formatter
        .format_build(&result)
        .and_then(|text| write_output(&text, args.output.as_deref()));
    if let Err(e) = emitted {
        error!("Failed to write output: {:#}", e);
        eprintln!("Error: {:#}", e);
        return 1;
    }

    if result.success {
        0
    } else {
        1
    }
}

pub async fn handle_status(args: &StatusArgs) -> i32 {
    let config = match load_config() {
        Ok(c) => c,
        Err(code) => return code,
    };
    let workspace = match resolve_workspace(args.path.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return 1;
        }
    };

    let manager =
        CheckpointManager::in_dir(&workspace.join(&config.output_dir), config.resume_window());
    let check = manager.can_resume_build();
    info!(can_resume = check.can_resume, "Checked workspace checkpoint");

    match OutputFormatter::new(args.format.into()).format_status(&workspace, &check) {
        Ok(text) => {
            println!("{}", text.trim_end());
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub async fn handle_rollback(args: &RollbackArgs) -> i32 {
    let config = match load_config() {
        Ok(c) => c,
        Err(code) => return code,
    };
    let workspace = match resolve_workspace(args.path.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return 1;
        }
    };

    let options = config.generator_options(&workspace);
    let collaborators = Collaborators::docker(&options, &config);
    let outcome = BuildOrchestrator::new(options, collaborators).rollback().await;

    match OutputFormatter::new(args.format.into()).format_rollback(&outcome) {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return 1;
        }
    }

    if outcome.warnings.is_empty() {
        0
    } else {
        1
    }
}

fn load_config() -> Result<ForgeConfig, i32> {
    let config = ForgeConfig::default();
    match config.validate() {
        Ok(()) => {
            debug!("{}", config);
            Ok(config)
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            Err(1)
        }
    }
}

fn resolve_workspace(path: Option<&Path>) -> Result<PathBuf> {
    let path = path.unwrap_or_else(|| Path::new("."));
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Workspace not found: {}", path.display()))?;
    if !canonical.is_dir() {
        anyhow::bail!("Workspace is not a directory: {}", canonical.display());
    }
    Ok(canonical)
}

fn write_output(text: &str, destination: Option<&Path>) -> Result<()> {
    match destination {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!(path = %path.display(), "Output written");
        }
        None => println!("{}", text.trim_end()),
    }
    Ok(())
}
