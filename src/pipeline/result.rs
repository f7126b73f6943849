use super::step::{BuildStep, StepStatus};
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one build invocation. Always carries all eight steps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub success: bool,
    pub tool_count: usize,
    pub connector_count: usize,
    pub steps: Vec<BuildStep>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumed_from: Option<u8>,
    pub artifacts_dir: PathBuf,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl BuildResult {
    pub fn failed_step(&self) -> Option<&BuildStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    pub fn step_status(&self, number: u8) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|s| s.number == number)
            .map(|s| s.status)
    }

    pub fn count_with_status(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::step::StepId;

    fn sample() -> BuildResult {
        let mut steps: Vec<BuildStep> = StepId::ALL.iter().map(|id| BuildStep::pending(*id)).collect();
        steps[0].status = StepStatus::Completed;
        steps[1].status = StepStatus::Failed;
        steps[1].error = Some("bad".to_string());
        BuildResult {
            success: false,
            tool_count: 2,
            connector_count: 1,
            steps,
            errors: vec!["bad".to_string()],
            warnings: vec![],
            duration: Duration::from_millis(1500),
            image_id: None,
            tags: vec![],
            resumed_from: None,
            artifacts_dir: PathBuf::from("/work/.mcp-forge"),
        }
    }

    #[test]
    fn test_queries() {
        let result = sample();
        assert_eq!(result.failed_step().map(|s| s.number), Some(2));
        assert_eq!(result.step_status(1), Some(StepStatus::Completed));
        assert_eq!(result.step_status(9), None);
        assert_eq!(result.count_with_status(StepStatus::Pending), 6);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["toolCount"], 2);
        assert_eq!(json["connectorCount"], 1);
        assert_eq!(json["durationMs"], 1500);
        assert_eq!(json["steps"].as_array().unwrap().len(), 8);
        assert!(json.get("imageId").is_none());
        assert!(json.get("tags").is_none());
    }
}
