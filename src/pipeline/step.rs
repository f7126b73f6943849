//! Build steps and the tracker that moves them through their lifecycle

use crate::progress::{notify, ProgressEvent, ProgressHandler};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The eight build steps, in execution order. Numbers are part of the checkpoint format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepId {
    LoadModules = 1,
    ValidateModules = 2,
    CollectCredentials = 3,
    GenerateManifest = 4,
    GenerateConfig = 5,
    GenerateDockerfile = 6,
    BuildImage = 7,
    PublishImage = 8,
}

impl StepId {
    pub const ALL: [StepId; 8] = [
        StepId::LoadModules,
        StepId::ValidateModules,
        StepId::CollectCredentials,
        StepId::GenerateManifest,
        StepId::GenerateConfig,
        StepId::GenerateDockerfile,
        StepId::BuildImage,
        StepId::PublishImage,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.number() == number)
    }

    pub fn name(self) -> &'static str {
        match self {
            StepId::LoadModules => "Loading modules",
            StepId::ValidateModules => "Validating modules",
            StepId::CollectCredentials => "Collecting credentials",
            StepId::GenerateManifest => "Generating manifest",
            StepId::GenerateConfig => "Generating config",
            StepId::GenerateDockerfile => "Generating Dockerfile",
            StepId::BuildImage => "Building image",
            StepId::PublishImage => "Tagging and pushing image",
        }
    }

    fn index(self) -> usize {
        self as usize - 1
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Skipped,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Skipped | StepStatus::Failed
        )
    }

    fn can_transition_to(self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Running)
                | (StepStatus::Pending, StepStatus::Skipped)
                | (StepStatus::Pending, StepStatus::Failed)
                | (StepStatus::Running, StepStatus::Completed)
                | (StepStatus::Running, StepStatus::Failed)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Snapshot of one step's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStep {
    pub number: u8,
    pub name: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildStep {
    pub fn pending(id: StepId) -> Self {
        Self {
            number: id.number(),
            name: id.name().to_string(),
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            error: None,
        }
    }

    pub fn id(&self) -> Option<StepId> {
        StepId::from_number(self.number)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }

    fn finish(&mut self, status: StepStatus) {
        let now = Utc::now();
        let started = *self.started_at.get_or_insert(now);
        self.status = status;
        self.completed_at = Some(now);
        self.duration_ms = Some(
            (now - started)
                .to_std()
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        );
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Step {step} cannot move from {from} to {to}")]
    InvalidTransition {
        step: u8,
        from: StepStatus,
        to: StepStatus,
    },

    #[error("Step {step} cannot start while step {blocking} is {status}")]
    OutOfOrder {
        step: u8,
        blocking: u8,
        status: StepStatus,
    },
}

/// Ordered list of the eight steps. Transitions only move forward and each
/// one is reported to the progress handler with a fresh snapshot.
pub struct StepTracker {
    steps: Vec<BuildStep>,
    progress: Option<Arc<dyn ProgressHandler>>,
}

impl StepTracker {
    pub fn new(progress: Option<Arc<dyn ProgressHandler>>) -> Self {
        Self {
            steps: StepId::ALL.iter().map(|id| BuildStep::pending(*id)).collect(),
            progress,
        }
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    pub fn step(&self, id: StepId) -> &BuildStep {
        &self.steps[id.index()]
    }

    pub fn into_steps(self) -> Vec<BuildStep> {
        self.steps
    }

    /// True when every step reached `completed` or `skipped`
    pub fn all_succeeded(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.status, StepStatus::Completed | StepStatus::Skipped))
    }

    pub fn start_step(&mut self, id: StepId) -> Result<(), TransitionError> {
        self.check_predecessors(id)?;
        self.transition(id, StepStatus::Running)?;
        self.steps[id.index()].started_at = Some(Utc::now());
        self.emit(ProgressEvent::StepStarted {
            step: self.step(id).clone(),
        });
        Ok(())
    }

    pub fn complete_step(
        &mut self,
        id: StepId,
        message: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.transition(id, StepStatus::Completed)?;
        self.steps[id.index()].finish(StepStatus::Completed);
        self.emit(ProgressEvent::StepCompleted {
            step: self.step(id).clone(),
            message: message.into(),
        });
        Ok(())
    }

    pub fn fail_step(
        &mut self,
        id: StepId,
        error: impl Into<String>,
    ) -> Result<(), TransitionError> {
        let error = error.into();
        self.transition(id, StepStatus::Failed)?;
        let step = &mut self.steps[id.index()];
        step.finish(StepStatus::Failed);
        step.error = Some(error.clone());
        self.emit(ProgressEvent::StepFailed {
            step: self.step(id).clone(),
            error,
        });
        Ok(())
    }

    pub fn skip_step(
        &mut self,
        id: StepId,
        reason: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.check_predecessors(id)?;
        self.transition(id, StepStatus::Skipped)?;
        self.steps[id.index()].finish(StepStatus::Skipped);
        self.emit(ProgressEvent::StepSkipped {
            step: self.step(id).clone(),
            reason: reason.into(),
        });
        Ok(())
    }

    fn transition(&mut self, id: StepId, to: StepStatus) -> Result<(), TransitionError> {
        let step = &mut self.steps[id.index()];
        let from = step.status;
        if from.can_transition_to(to) {
            step.status = to;
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                step: id.number(),
                from,
                to,
            })
        }
    }

    fn check_predecessors(&self, id: StepId) -> Result<(), TransitionError> {
        match self.steps[..id.index()]
            .iter()
            .find(|s| !matches!(s.status, StepStatus::Completed | StepStatus::Skipped))
        {
            Some(blocking) => Err(TransitionError::OutOfOrder {
                step: id.number(),
                blocking: blocking.number,
                status: blocking.status,
            }),
            None => Ok(()),
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress {
            notify(handler.as_ref(), &event);
        }
    }
}
