//! Dry-run and resume behavior of each step

use super::step::StepId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicy {
    pub step: StepId,
    /// Executes during a dry run; otherwise skipped
    pub runs_in_dry_run: bool,
    /// Re-executes on resume even when the checkpoint says it already completed
    pub replay_on_resume: bool,
}

const fn policy(step: StepId, runs_in_dry_run: bool, replay_on_resume: bool) -> StepPolicy {
    StepPolicy {
        step,
        runs_in_dry_run,
        replay_on_resume,
    }
}

/// Generation steps replay to rebuild in-memory outputs. Steps with side
/// effects outside the workspace do not.
pub const STEP_POLICIES: [StepPolicy; 8] = [
    policy(StepId::LoadModules, true, true),
    policy(StepId::ValidateModules, true, true),
    policy(StepId::CollectCredentials, true, false),
    policy(StepId::GenerateManifest, true, true),
    policy(StepId::GenerateConfig, true, true),
    policy(StepId::GenerateDockerfile, true, true),
    policy(StepId::BuildImage, false, false),
    policy(StepId::PublishImage, false, false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DryRun,
    CompletedPreviously,
}

impl SkipReason {
    pub fn describe(self) -> &'static str {
        match self {
            SkipReason::DryRun => "dry run",
            SkipReason::CompletedPreviously => "completed in a previous run",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Run,
    Skip(SkipReason),
}

impl StepPolicy {
    pub fn for_step(step: StepId) -> &'static StepPolicy {
        &STEP_POLICIES[step.number() as usize - 1]
    }

    /// Decides whether the step runs, given the dry-run flag and the step
    /// recorded by a valid checkpoint (if resuming)
    pub fn action(&self, dry_run: bool, resume_from: Option<u8>) -> StepAction {
        if dry_run && !self.runs_in_dry_run {
            return StepAction::Skip(SkipReason::DryRun);
        }
        match resume_from {
            Some(done) if self.step.number() <= done && !self.replay_on_resume => {
                StepAction::Skip(SkipReason::CompletedPreviously)
            }
            _ => StepAction::Run,
        }
    }
}
