//! Resolving credential values from the environment or an interactive prompt

use super::discovery::CredentialRequirement;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Asks the operator for a credential value
#[async_trait]
pub trait CredentialPrompter: Send + Sync {
    /// `Ok(None)` means the operator declined or no terminal is attached
    async fn prompt(&self, requirement: &CredentialRequirement) -> Result<Option<String>>;
}

/// Prompts on the controlling terminal and reads the answer with echo
/// disabled. Never prompts when stdin is not a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

#[async_trait]
impl CredentialPrompter for TerminalPrompter {
    async fn prompt(&self, requirement: &CredentialRequirement) -> Result<Option<String>> {
        if !atty::is(atty::Stream::Stdin) {
            debug!(credential = %requirement.name, "stdin is not a terminal, not prompting");
            return Ok(None);
        }

        let prompt = prompt_text(requirement);
        tokio::task::spawn_blocking(move || -> Result<Option<String>> {
            let answer =
                rpassword::prompt_password(prompt).context("Failed to read credential")?;
            Ok(normalize_answer(&answer))
        })
        .await
        .context("Credential prompt task panicked")?
    }
}

fn prompt_text(requirement: &CredentialRequirement) -> String {
    let label = if requirement.description.is_empty() {
        requirement.name.clone()
    } else {
        format!("{} ({})", requirement.name, requirement.description)
    };
    let optional = if requirement.required { "" } else { " [optional]" };
    format!("Enter value for {}{}: ", label, optional)
}

/// Blank answers mean "declined"
fn normalize_answer(answer: &str) -> Option<String> {
    let value = answer.trim_end_matches(['\r', '\n']);
    (!value.is_empty()).then(|| value.to_string())
}

/// A required credential that could not be resolved. Never fails the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialWarning {
    pub name: String,
    pub modules: Vec<String>,
}

impl fmt::Display for CredentialWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Required credential {} is not set (used by: {})",
            self.name,
            self.modules.join(", ")
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedCredentials {
    pub values: BTreeMap<String, String>,
    pub warnings: Vec<CredentialWarning>,
}

/// Resolves every requirement: environment first, then the prompter unless
/// `skip_prompts` is set. Missing required values become warnings.
pub async fn resolve_credentials<F>(
    requirements: &[CredentialRequirement],
    skip_prompts: bool,
    prompter: &dyn CredentialPrompter,
    env_lookup: F,
) -> Result<ResolvedCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    let mut resolved = ResolvedCredentials::default();

    for requirement in requirements {
        if let Some(value) = env_lookup(&requirement.name).filter(|v| !v.is_empty()) {
            debug!(credential = %requirement.name, "Credential found in environment");
            resolved.values.insert(requirement.name.clone(), value);
            continue;
        }

        if !skip_prompts {
            if let Some(value) = prompter
                .prompt(requirement)
                .await
                .with_context(|| format!("Failed to prompt for {}", requirement.name))?
            {
                resolved.values.insert(requirement.name.clone(), value);
                continue;
            }
        }

        if requirement.required {
            resolved.warnings.push(CredentialWarning {
                name: requirement.name.clone(),
                modules: requirement.modules.clone(),
            });
        } else {
            debug!(credential = %requirement.name, "Optional credential left unset");
        }
    }

    Ok(resolved)
}

/// Writes resolved values as a dotenv file readable only by the owner
pub fn write_env_file(path: &Path, values: &BTreeMap<String, String>) -> Result<()> {
    let mut content = String::from("# Generated by mcp-forge. Do not commit.\n");
    for (name, value) in values {
        content.push_str(&format!("{}={}\n", name, quote_env_value(value)));
    }

    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
    }

    info!(path = %path.display(), count = values.len(), "Wrote credential file");
    Ok(())
}

fn quote_env_value(value: &str) -> String {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:@".contains(c))
    {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
