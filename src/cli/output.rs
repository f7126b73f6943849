//! Output formatting for build results, resume status and rollbacks
//!
//! ```ignore
//! use mcp_forge::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_build(&result)?);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::pipeline::{BuildResult, ResumeCheck, RollbackOutcome, StepStatus};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport<'a> {
    workspace: &'a Path,
    #[serde(flatten)]
    check: &'a ResumeCheck,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_build(&self, result: &BuildResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(result, "build result"),
            OutputFormat::Yaml => to_yaml(result, "build result"),
            OutputFormat::Human => Ok(self.format_build_human(result)),
        }
    }

    pub fn format_status(&self, workspace: &Path, check: &ResumeCheck) -> Result<String> {
        let report = StatusReport { workspace, check };
        match self.format {
            OutputFormat::Json => to_json(&report, "resume status"),
            OutputFormat::Yaml => to_yaml(&report, "resume status"),
            OutputFormat::Human => Ok(self.format_status_human(workspace, check)),
        }
    }

    pub fn format_rollback(&self, outcome: &RollbackOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(outcome, "rollback outcome"),
            OutputFormat::Yaml => to_yaml(outcome, "rollback outcome"),
            OutputFormat::Human => Ok(self.format_rollback_human(outcome)),
        }
    }

    fn format_build_human(&self, result: &BuildResult) -> String {
        let mut output = String::new();

        if result.success {
            output.push_str("\u{2713} Build Succeeded\n");
        } else {
            output.push_str("\u{2717} Build Failed\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Tools:       {}\n", result.tool_count));
        output.push_str(&format!("Connectors:  {}\n", result.connector_count));
        output.push_str(&format!(
            "Artifacts:   {}\n",
            result.artifacts_dir.display()
        ));
        if let Some(step) = result.resumed_from {
            output.push_str(&format!("Resumed:     after step {}\n", step));
        }
        output.push('\n');

        output.push_str("Steps:\n");
        for (i, step) in result.steps.iter().enumerate() {
            let branch = if i == result.steps.len() - 1 {
                "\u{2514}"
            } else {
                "\u{251C}"
            };
            let timing = step
                .duration_ms
                .filter(|_| step.status == StepStatus::Completed)
                .map(|ms| format!(" ({}ms)", ms))
                .unwrap_or_default();
            output.push_str(&format!(
                "{}\u{2500} {} {}. {}{}\n",
                branch,
                status_marker(step.status),
                step.number,
                step.name,
                timing
            ));
            if let Some(error) = &step.error {
                output.push_str(&format!("      {}\n", error));
            }
        }

        if let Some(image) = &result.image_id {
            output.push_str(&format!("\nImage: {}\n", image));
        }
        if !result.tags.is_empty() {
            output.push_str("Tags:\n");
            for tag in &result.tags {
                output.push_str(&format!("  - {}\n", tag));
            }
        }

        if !result.errors.is_empty() {
            output.push_str("\n\u{2717} Errors:\n");
            for error in &result.errors {
                output.push_str(&format!("  - {}\n", error));
            }
        }

        if !result.warnings.is_empty() {
            output.push_str("\n\u{26A0} Warnings:\n");
            for warning in &result.warnings {
                output.push_str(&format!("  - {}\n", warning));
            }
        }

        output.push_str(&format!("\nCompleted in {}ms\n", result.duration.as_millis()));
        output
    }

    fn format_status_human(&self, workspace: &Path, check: &ResumeCheck) -> String {
        let mut output = format!("Workspace: {}\n", workspace.display());

        match &check.checkpoint {
            Some(cp) => {
                output.push_str(&format!(
                    "Checkpoint: step {} ({}) at {}\n",
                    cp.step,
                    cp.step_name,
                    cp.timestamp.to_rfc3339()
                ));
                output.push_str(&format!("Modules: {}\n", cp.module_names.len()));
                if let Some(image) = &cp.image_id {
                    output.push_str(&format!("Image: {}\n", image));
                }
            }
            None => output.push_str("Checkpoint: none\n"),
        }

        let marker = if check.can_resume { "\u{2713}" } else { "\u{2717}" };
        output.push_str(&format!(
            "{} {}\n",
            marker,
            check.message.as_deref().unwrap_or(if check.can_resume {
                "Build can be resumed"
            } else {
                "Build cannot be resumed"
            })
        ));
        output
    }

    fn format_rollback_human(&self, outcome: &RollbackOutcome) -> String {
        let mut output = String::new();
        match &outcome.removed_image {
            Some(image) => output.push_str(&format!("\u{2713} Removed image {}\n", image)),
            None => output.push_str("No image to remove\n"),
        }
        if outcome.checkpoint_cleared {
            output.push_str("\u{2713} Checkpoint cleared\n");
        } else {
            output.push_str("No checkpoint to clear\n");
        }
        for warning in &outcome.warnings {
            output.push_str(&format!("\u{26A0} {}\n", warning));
        }
        output
    }
}

fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "\u{2713}",
        StepStatus::Skipped => "\u{2192}",
        StepStatus::Failed => "\u{2717}",
        StepStatus::Running => "\u{25B6}",
        StepStatus::Pending => "\u{00B7}",
    }
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}
