//! mcp-forge - build orchestration for MCP server images
//!
//! This library turns a workspace of tool and connector modules into a
//! container image. A build runs eight steps in order: load modules, validate
//! them, collect credentials, generate a manifest, generate the server config,
//! generate a Dockerfile, build the image and finally tag and push it.
//!
//! # Core Concepts
//!
//! - **Collaborators**: Each step delegates to a trait object (module loader,
//!   validator, generators, image builder, registry) so the pipeline can be
//!   driven against Docker or against test doubles
//! - **Step tracking**: Every step moves forward through
//!   `pending → running → completed | skipped | failed` and is reported to an
//!   optional progress handler
//! - **Checkpoints**: Progress is persisted after each step so an interrupted
//!   build can resume instead of rebuilding the image
//!
//! # Example Usage
//!
//! ```no_run
//! use mcp_forge::{BuildOrchestrator, Collaborators, ForgeConfig, GeneratorOptions};
//!
//! # async fn example() {
//! let config = ForgeConfig::default();
//! let options = GeneratorOptions::new("./my-server").with_dry_run(true);
//! let collaborators = Collaborators::docker(&options, &config);
//!
//! let result = BuildOrchestrator::new(options, collaborators).run().await;
//! println!("{} tools, success = {}", result.tool_count, result.success);
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`modules`]: Module discovery, parsing and validation
//! - [`credentials`]: Credential discovery and resolution
//! - [`generate`]: Manifest, server config and Dockerfile generation
//! - [`docker`]: Image builds, tagging and pushes through the Docker daemon
//! - [`pipeline`]: Step tracker, checkpoints and the orchestrator
//! - [`progress`]: Progress events and handlers

pub mod cli;
pub mod config;
pub mod credentials;
pub mod docker;
pub mod generate;
pub mod modules;
pub mod pipeline;
pub mod progress;
pub mod util;

pub use config::{ConfigError, ForgeConfig};
pub use pipeline::{
    BuildError, BuildOrchestrator, BuildResult, BuildStep, CheckpointManager, Collaborators,
    GeneratorOptions, ResumeCheck, StepStatus,
};
pub use progress::{LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
