//! Progress handler trait and events

use crate::pipeline::step::BuildStep;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::warn;

/// Events emitted while a build runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Build started
    BuildStarted {
        base_path: String,
        dry_run: bool,
        resume: bool,
    },

    /// A step moved from pending to running
    StepStarted { step: BuildStep },

    /// A step finished successfully
    StepCompleted { step: BuildStep, message: String },

    /// A step was skipped (dry run or already completed in a previous run)
    StepSkipped { step: BuildStep, reason: String },

    /// A step failed; the remaining steps will not run
    StepFailed { step: BuildStep, error: String },

    /// A partially built image was removed after a failed build
    Rollback { image: String, removed: bool },

    /// Build finished, successfully or not
    BuildFinished { success: bool, total_time: Duration },
}

impl ProgressEvent {
    /// The step snapshot carried by step events
    pub fn step(&self) -> Option<&BuildStep> {
        match self {
            ProgressEvent::StepStarted { step }
            | ProgressEvent::StepCompleted { step, .. }
            | ProgressEvent::StepSkipped { step, .. }
            | ProgressEvent::StepFailed { step, .. } => Some(step),
            _ => None,
        }
    }

    /// One-line human description of the event
    pub fn message(&self) -> String {
        match self {
            ProgressEvent::BuildStarted { base_path, .. } => format!("Building {}", base_path),
            ProgressEvent::StepStarted { step } => format!("{}...", step.name),
            ProgressEvent::StepCompleted { message, .. } => message.clone(),
            ProgressEvent::StepSkipped { reason, .. } => format!("Skipped: {}", reason),
            ProgressEvent::StepFailed { error, .. } => format!("Failed: {}", error),
            ProgressEvent::Rollback { image, removed } => {
                if *removed {
                    format!("Removed partial image {}", image)
                } else {
                    format!("Could not remove partial image {}", image)
                }
            }
            ProgressEvent::BuildFinished { success, total_time } => format!(
                "Build {} in {:.1}s",
                if *success { "succeeded" } else { "failed" },
                total_time.as_secs_f64()
            ),
        }
    }
}

/// Trait for handling progress events during a build
pub trait ProgressHandler: Send + Sync {
    /// Called synchronously when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Adapts a `(step, message)` callback to a [`ProgressHandler`]; non-step events are ignored
pub struct StepCallback<F>(pub F);

impl<F> ProgressHandler for StepCallback<F>
where
    F: Fn(&BuildStep, &str) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        if let Some(step) = event.step() {
            (self.0)(step, &event.message());
        }
    }
}

/// Delivers `event` to `handler`, swallowing any panic it raises.
/// Progress reporting never affects the build outcome.
pub fn notify(handler: &dyn ProgressHandler, event: &ProgressEvent) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.on_progress(event))) {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        warn!(error = %reason, "Progress handler panicked, continuing build");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::step::StepId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingHandler;

    impl ProgressHandler for PanickingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            panic!("handler exploded");
        }
    }

    #[test]
    fn test_noop_handler() {
        NoOpHandler.on_progress(&ProgressEvent::BuildStarted {
            base_path: "/test".to_string(),
            dry_run: false,
            resume: false,
        });
    }

    #[test]
    fn test_notify_counts_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        notify(
            &handler,
            &ProgressEvent::StepStarted {
                step: BuildStep::pending(StepId::LoadModules),
            },
        );
        notify(
            &handler,
            &ProgressEvent::BuildFinished {
                success: true,
                total_time: Duration::from_secs(1),
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_notify_swallows_panics() {
        notify(
            &PanickingHandler,
            &ProgressEvent::Rollback {
                image: "demo:build-1".to_string(),
                removed: true,
            },
        );
    }

    #[test]
    fn test_step_callback_receives_step_and_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = StepCallback(move |step: &BuildStep, message: &str| {
            sink.lock().unwrap().push((step.number, message.to_string()));
        });

        handler.on_progress(&ProgressEvent::StepCompleted {
            step: BuildStep::pending(StepId::GenerateManifest),
            message: "Manifest with 2 tools".to_string(),
        });
        handler.on_progress(&ProgressEvent::BuildFinished {
            success: true,
            total_time: Duration::from_secs(1),
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (4, "Manifest with 2 tools".to_string()));
    }

    #[test]
    fn test_event_debug() {
        let event = ProgressEvent::Rollback {
            image: "demo".to_string(),
            removed: false,
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("Rollback"));
        assert!(event.message().contains("Could not remove"));
    }
}
