use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Builds deployable MCP server images from a workspace of tools and connectors
#[derive(Parser, Debug)]
#[command(
    name = "mcp-forge",
    about = "Build MCP server images from tool and connector modules",
    version,
    author,
    long_about = "mcp-forge loads the tool and connector modules of a workspace, validates them, \
                  resolves their credentials, generates a manifest, server config and Dockerfile, \
                  then builds, tags and pushes a container image. Interrupted builds can be resumed \
                  from a checkpoint."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the build pipeline for a workspace",
        long_about = "Runs the eight build steps: load, validate, credentials, manifest, config, \
                      Dockerfile, image build and tag/push.\n\n\
                      Examples:\n  \
                      mcp-forge build\n  \
                      mcp-forge build ./my-server --dry-run\n  \
                      mcp-forge build --env staging --registry ghcr.io/acme\n  \
                      mcp-forge build --resume --format json"
    )]
    Build(BuildArgs),

    #[command(
        about = "Report whether an interrupted build can be resumed",
        long_about = "Inspects the workspace checkpoint.\n\n\
                      Examples:\n  \
                      mcp-forge status\n  \
                      mcp-forge status ./my-server --format json"
    )]
    Status(StatusArgs),

    #[command(
        about = "Remove the image and checkpoint of an interrupted build",
        long_about = "Removes the image recorded in the workspace checkpoint, if any, and \
                      deletes the checkpoint.\n\n\
                      Examples:\n  \
                      mcp-forge rollback\n  \
                      mcp-forge rollback ./my-server"
    )]
    Rollback(RollbackArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the workspace (defaults to current directory)"
    )]
    pub path: Option<PathBuf>,

    #[arg(long, help = "Generate artifacts without building or pushing an image")]
    pub dry_run: bool,

    #[arg(
        short = 'e',
        long = "env",
        value_name = "ENV",
        help = "Target environment (defaults to MCP_FORGE_ENVIRONMENT or production)"
    )]
    pub environment: Option<String>,

    #[arg(long, help = "Never prompt for missing credentials")]
    pub skip_prompts: bool,

    #[arg(long, help = "Resume from the checkpoint of an interrupted build")]
    pub resume: bool,

    #[arg(
        long,
        value_name = "SECONDS",
        value_parser = parse_window,
        help = "Maximum checkpoint age accepted by --resume"
    )]
    pub resume_window: Option<u64>,

    #[arg(long = "image", value_name = "NAME", help = "Image repository name")]
    pub image: Option<String>,

    #[arg(
        long,
        value_name = "HOST",
        help = "Registry to push to (defaults to MCP_FORGE_REGISTRY)"
    )]
    pub registry: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    #[arg(value_name = "PATH", help = "Path to the workspace")]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct RollbackArgs {
    #[arg(value_name = "PATH", help = "Path to the workspace")]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_window(s: &str) -> Result<u64, String> {
    match crate::config::parse_window_secs(s) {
        Ok(0) => Err("Resume window must be at least 1 second".to_string()),
        Ok(secs) => Ok(secs),
        Err(e) => Err(e.to_string()),
    }
}
