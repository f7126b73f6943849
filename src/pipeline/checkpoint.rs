//! Persisted build progress so an interrupted build can resume

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const CHECKPOINT_FILE: &str = "checkpoint.json";
pub const DEFAULT_RESUME_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Last completed step (1..=8)
    pub step: u8,
    pub step_name: String,
    pub timestamp: DateTime<Utc>,
    pub module_names: Vec<String>,
    /// Absent in checkpoints written before the environment was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Explicit image name override of the interrupted build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

/// Build settings a resumed build must share with the interrupted one
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointScope<'a> {
    pub module_names: &'a [String],
    pub environment: Option<&'a str>,
    pub image_name: Option<&'a str>,
}

impl<'a> CheckpointScope<'a> {
    pub fn new(module_names: &'a [String], environment: &'a str) -> Self {
        Self {
            module_names,
            environment: Some(environment),
            image_name: None,
        }
    }

    pub fn with_image_name(mut self, image_name: Option<&'a str>) -> Self {
        self.image_name = image_name;
        self
    }
}

impl Checkpoint {
    /// Describes the first setting that differs from `scope`, if any
    pub fn scope_mismatch(&self, scope: &CheckpointScope<'_>) -> Option<String> {
        if !self.matches_modules(scope.module_names) {
            return Some("Modules changed since the interrupted build".to_string());
        }
        if self.environment.as_deref() != scope.environment {
            return Some(format!(
                "Environment changed since the interrupted build ({} to {})",
                self.environment.as_deref().unwrap_or("unrecorded"),
                scope.environment.unwrap_or("none")
            ));
        }
        if self.image_name.as_deref() != scope.image_name {
            return Some(format!(
                "Image name changed since the interrupted build ({} to {})",
                self.image_name.as_deref().unwrap_or("default"),
                scope.image_name.unwrap_or("default")
            ));
        }
        None
    }

    /// Order-insensitive comparison against a freshly loaded module set
    pub fn matches_modules(&self, names: &[String]) -> bool {
        let mut recorded = self.module_names.clone();
        let mut current = names.to_vec();
        recorded.sort();
        current.sort();
        recorded == current
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or_default()
    }
}

/// Outcome of [`CheckpointManager::can_resume_build`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeCheck {
    pub can_resume: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResumeCheck {
    fn denied(message: impl Into<String>, checkpoint: Option<Checkpoint>) -> Self {
        Self {
            can_resume: false,
            checkpoint,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to access checkpoint {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode checkpoint: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid checkpoint step {0}")]
    InvalidStep(u8),
}

/// Reads and writes the checkpoint file of one workspace
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    path: PathBuf,
    resume_window: Duration,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>, resume_window: Duration) -> Self {
        Self {
            path: path.into(),
            resume_window,
        }
    }

    /// Manager for `<artifacts_dir>/checkpoint.json`
    pub fn in_dir(artifacts_dir: &Path, resume_window: Duration) -> Self {
        Self::new(artifacts_dir.join(CHECKPOINT_FILE), resume_window)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resume_window(&self) -> Duration {
        self.resume_window
    }

    /// Overwrites the checkpoint atomically (temp file, then rename)
    pub fn write_checkpoint(
        &self,
        step: u8,
        step_name: &str,
        scope: CheckpointScope<'_>,
        image_id: Option<&str>,
    ) -> Result<Checkpoint, CheckpointError> {
        if !(1..=8).contains(&step) {
            return Err(CheckpointError::InvalidStep(step));
        }

        let checkpoint = Checkpoint {
            step,
            step_name: step_name.to_string(),
            timestamp: Utc::now(),
            module_names: scope.module_names.to_vec(),
            environment: scope.environment.map(str::to_string),
            image_name: scope.image_name.map(str::to_string),
            image_id: image_id.map(str::to_string),
        };
        let json = serde_json::to_string_pretty(&checkpoint)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| CheckpointError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))?;

        debug!(step, path = %self.path.display(), "Checkpoint written");
        Ok(checkpoint)
    }

    /// `Ok(None)` when no checkpoint exists
    pub fn read_checkpoint(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.io_error(source)),
        }
    }

    pub fn can_resume_build(&self) -> ResumeCheck {
        self.can_resume_build_at(Utc::now())
    }

    /// Resume decision evaluated at `now`. Unreadable checkpoints are
    /// reported as not resumable rather than as errors.
    pub fn can_resume_build_at(&self, now: DateTime<Utc>) -> ResumeCheck {
        let checkpoint = match self.read_checkpoint() {
            Ok(Some(cp)) => cp,
            Ok(None) => return ResumeCheck::denied("No checkpoint found", None),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable checkpoint");
                return ResumeCheck::denied(format!("Checkpoint is unreadable: {}", e), None);
            }
        };

        if !(1..=8).contains(&checkpoint.step) {
            return ResumeCheck::denied(
                format!("Checkpoint records unknown step {}", checkpoint.step),
                Some(checkpoint),
            );
        }

        let age = checkpoint.age_at(now);
        if age > self.resume_window {
            return ResumeCheck::denied(
                format!(
                    "Checkpoint is too old ({} minutes, limit {} minutes)",
                    age.as_secs() / 60,
                    self.resume_window.as_secs() / 60
                ),
                Some(checkpoint),
            );
        }

        let message = format!(
            "Can resume after step {} ({})",
            checkpoint.step, checkpoint.step_name
        );
        ResumeCheck {
            can_resume: true,
            checkpoint: Some(checkpoint),
            message: Some(message),
        }
    }

    /// Removes the checkpoint. Returns whether a file was removed.
    pub fn clear_checkpoint(&self) -> Result<bool, CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Checkpoint cleared");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
