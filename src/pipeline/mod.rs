//! Build pipeline: step tracking, checkpoints and the orchestrator that drives them

pub mod checkpoint;
pub mod context;
pub mod error;
pub mod options;
pub mod orchestrator;
pub mod policy;
pub mod result;
pub mod step;

pub use checkpoint::{
    Checkpoint, CheckpointError, CheckpointManager, CheckpointScope, ResumeCheck,
};
pub use context::Collaborators;
pub use error::BuildError;
pub use options::GeneratorOptions;
pub use orchestrator::{BuildOrchestrator, RollbackOutcome};
pub use policy::{StepPolicy, STEP_POLICIES};
pub use result::BuildResult;
pub use step::{BuildStep, StepId, StepStatus, StepTracker, TransitionError};
