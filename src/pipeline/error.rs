use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a build. `StaleCheckpoint` is the only variant that is
/// never fatal; it is reported as a warning before a fresh build starts.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No modules found in {}", path.display())]
    NoModulesFound { path: PathBuf },

    #[error("Failed to load modules: {0}")]
    ModuleLoad(String),

    #[error("Validation failed with {} error(s)", errors.len())]
    ValidationFailed { errors: Vec<String> },

    #[error("Credential collection failed: {0}")]
    Credentials(String),

    #[error("Manifest generation failed: {0}")]
    ManifestGeneration(String),

    #[error("Config generation failed: {0}")]
    ConfigGeneration(String),

    #[error("Dockerfile generation failed: {0}")]
    DockerfileGeneration(String),

    #[error("Image build failed: {0}")]
    ImageBuild(String),

    #[error("Registry operation failed: {0}")]
    Registry(String),

    #[error("Failed to write {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot resume: {0}")]
    StaleCheckpoint(String),

    #[error("Build cancelled")]
    Cancelled,
}

impl BuildError {
    /// Messages copied into `BuildResult::errors`
    pub fn messages(&self) -> Vec<String> {
        match self {
            BuildError::ValidationFailed { errors } if !errors.is_empty() => errors.clone(),
            other => vec![other.to_string()],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

/// Formats an `anyhow` chain on one line so the root cause survives into step errors
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_modules_message() {
        let err = BuildError::NoModulesFound {
            path: PathBuf::from("/work/demo"),
        };
        assert_eq!(err.to_string(), "No modules found in /work/demo");
        assert_eq!(err.messages(), vec!["No modules found in /work/demo"]);
    }

    #[test]
    fn test_validation_messages_are_individual_errors() {
        let err = BuildError::ValidationFailed {
            errors: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Validation failed with 2 error(s)");
        assert_eq!(err.messages(), vec!["a", "b"]);
    }

    #[test]
    fn test_cancelled() {
        assert!(BuildError::Cancelled.is_cancelled());
        assert_eq!(BuildError::Cancelled.to_string(), "Build cancelled");
        assert!(!BuildError::ImageBuild("x".to_string()).is_cancelled());
    }

    #[test]
    fn test_describe_keeps_context_chain() {
        let err = anyhow::anyhow!("daemon unreachable").context("Failed to build image");
        assert_eq!(describe(&err), "Failed to build image: daemon unreachable");
    }
}
