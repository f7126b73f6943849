//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted {
                base_path,
                dry_run,
                resume,
            } => {
                info!(workspace = %base_path, dry_run, resume, "Starting build");
            }
            ProgressEvent::StepStarted { step } => {
                info!(
                    step = step.number,
                    progress = format!("{}/8", step.number),
                    "{}",
                    step.name
                );
            }
            ProgressEvent::StepCompleted { step, message } => {
                info!(
                    step = step.number,
                    duration_ms = step.duration_ms.unwrap_or_default(),
                    "{}",
                    message
                );
            }
            ProgressEvent::StepSkipped { step, reason } => {
                debug!(step = step.number, name = %step.name, reason = %reason, "Step skipped");
            }
            ProgressEvent::StepFailed { step, error } => {
                error!(step = step.number, name = %step.name, error = %error, "Step failed");
            }
            ProgressEvent::Rollback { image, removed } => {
                if *removed {
                    info!(image = %image, "Rolled back partial image");
                } else {
                    warn!(image = %image, "Rollback could not remove partial image");
                }
            }
            ProgressEvent::BuildFinished {
                success,
                total_time,
            } => {
                if *success {
                    info!(total_time_ms = total_time.as_millis(), "Build complete");
                } else {
                    warn!(total_time_ms = total_time.as_millis(), "Build failed");
                }
            }
        }
    }
}
