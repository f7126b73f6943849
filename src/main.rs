use mcp_forge::cli::commands::{CliArgs, Commands};
use mcp_forge::cli::handlers::{handle_build, handle_rollback, handle_status};
use mcp_forge::util::init_logging;
use mcp_forge::{ForgeConfig, VERSION};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(ForgeConfig::default().logging_config(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("mcp-forge v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling build");
            on_interrupt.cancel();
        }
    });

    let exit_code = match &args.command {
        Commands::Build(build_args) => handle_build(build_args, args.quiet, cancel).await,
        Commands::Status(status_args) => handle_status(status_args).await,
        Commands::Rollback(rollback_args) => handle_rollback(rollback_args).await,
    };

    std::process::exit(exit_code);
}
