//! Configuration management for mcp-forge
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Command-line flags override them.
//!
//! # Environment Variables
//!
//! - `MCP_FORGE_ENVIRONMENT`: Target environment label - default: "production"
//! - `MCP_FORGE_RESUME_WINDOW_SECS`: Maximum checkpoint age for resume - default: "3600"
//! - `MCP_FORGE_OUTPUT_DIR`: Artifacts directory under the workspace - default: ".mcp-forge"
//! - `MCP_FORGE_REGISTRY`: Registry to push images to - default: none (tag only)
//! - `MCP_FORGE_REGISTRY_USERNAME` / `MCP_FORGE_REGISTRY_PASSWORD`: Registry credentials
//! - `MCP_FORGE_SERVER_PORT`: Port the generated server listens on - default: "3000"
//! - `MCP_FORGE_BASE_IMAGE`: Override the Dockerfile base image
//! - `MCP_FORGE_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use mcp_forge::ForgeConfig;
//!
//! let config = ForgeConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::docker::RegistryAuth;
use crate::pipeline::GeneratorOptions;
use crate::util::LoggingConfig;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_ENVIRONMENT: &str = "production";
const DEFAULT_RESUME_WINDOW_SECS: u64 = 60 * 60;
const DEFAULT_OUTPUT_DIR: &str = ".mcp-forge";
const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForgeConfig {
    pub environment: String,
    pub resume_window_secs: u64,
    pub output_dir: String,
    pub registry: Option<String>,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    pub server_port: u16,
    pub base_image: Option<String>,
    pub log_level: String,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for ForgeConfig {
    /// Reads `MCP_FORGE_*` variables, falling back to defaults for anything
    /// missing or unparseable
    fn default() -> Self {
        let environment =
            non_empty_var("MCP_FORGE_ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.into());

        let resume_window_secs = non_empty_var("MCP_FORGE_RESUME_WINDOW_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RESUME_WINDOW_SECS);

        let output_dir =
            non_empty_var("MCP_FORGE_OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.into());

        let server_port = non_empty_var("MCP_FORGE_SERVER_PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_SERVER_PORT);

        let log_level = non_empty_var("MCP_FORGE_LOG_LEVEL")
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.into())
            .to_lowercase();

        Self {
            environment,
            resume_window_secs,
            output_dir,
            registry: non_empty_var("MCP_FORGE_REGISTRY"),
            registry_username: non_empty_var("MCP_FORGE_REGISTRY_USERNAME"),
            registry_password: non_empty_var("MCP_FORGE_REGISTRY_PASSWORD"),
            server_port,
            base_image: non_empty_var("MCP_FORGE_BASE_IMAGE"),
            log_level,
        }
    }
}

impl ForgeConfig {
    /// Checks value ranges and that paired settings are complete
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Environment must not be empty".to_string(),
            ));
        }

        if self.resume_window_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Resume window must be at least 1 second".to_string(),
            ));
        }

        if self.server_port == 0 {
            return Err(ConfigError::ValidationFailed(
                "Server port must be between 1 and 65535".to_string(),
            ));
        }

        let output = PathBuf::from(&self.output_dir);
        if self.output_dir.is_empty() || output.is_absolute() || self.output_dir.contains("..") {
            return Err(ConfigError::ValidationFailed(format!(
                "Output directory must be a relative path inside the workspace: {}",
                self.output_dir
            )));
        }

        if self.registry_username.is_some() != self.registry_password.is_some() {
            return Err(ConfigError::ValidationFailed(
                "MCP_FORGE_REGISTRY_USERNAME and MCP_FORGE_REGISTRY_PASSWORD must be set together"
                    .to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn resume_window(&self) -> Duration {
        Duration::from_secs(self.resume_window_secs)
    }

    pub fn registry_auth(&self) -> Option<RegistryAuth> {
        match (&self.registry_username, &self.registry_password) {
            (Some(username), Some(password)) => Some(RegistryAuth {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// Logging settings for the CLI. `--log-level`, `-v` and `-q` override
    /// the configured level.
    pub fn logging_config(
        &self,
        cli_level: Option<&str>,
        verbose: bool,
        quiet: bool,
    ) -> LoggingConfig {
        let level = match cli_level {
            Some(level) => Some(level),
            None if verbose || quiet => None,
            None => Some(self.log_level.as_str()),
        };
        LoggingConfig::from_cli(level, verbose, quiet)
    }

    /// Build options for `base_path` seeded from this configuration
    pub fn generator_options(&self, base_path: impl Into<PathBuf>) -> GeneratorOptions {
        let mut options = GeneratorOptions::new(base_path)
            .with_environment(self.environment.clone())
            .with_resume_window(self.resume_window())
            .with_output_dir(self.output_dir.clone());
        if let Some(registry) = &self.registry {
            options = options.with_registry(registry.clone());
        }
        if let Some(auth) = self.registry_auth() {
            options = options.with_registry_auth(auth);
        }
        options
    }
}

/// Parses a duration in whole seconds, as accepted by `--resume-window`
pub fn parse_window_secs(value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::ParseError {
            field: "resume window".to_string(),
            error: e.to_string(),
        })
}

impl fmt::Display for ForgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mcp-forge Configuration:")?;
        writeln!(f, "  Environment: {}", self.environment)?;
        writeln!(f, "  Resume Window: {}s", self.resume_window_secs)?;
        writeln!(f, "  Output Dir: {}", self.output_dir)?;
        writeln!(
            f,
            "  Registry: {}",
            self.registry.as_deref().unwrap_or("(none)")
        )?;
        if let Some(user) = &self.registry_username {
            writeln!(f, "  Registry User: {}", user)?;
        }
        writeln!(f, "  Server Port: {}", self.server_port)?;
        if let Some(image) = &self.base_image {
            writeln!(f, "  Base Image: {}", image)?;
        }
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
