//! Partition Gateway binary.
//!
//! Loads the TOML configuration, initializes logging, and serves until
//! SIGINT/SIGTERM. `--check` validates the configuration and exits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use partition_gateway::config::load_config;
use partition_gateway::lifecycle;
use partition_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "partition-gateway")]
#[command(about = "HTTP gateway for partitioned backend services", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        println!(
            "{}: ok ({} routes, {} services)",
            cli.config.display(),
            config.routes.len(),
            config.services.len()
        );
        return ExitCode::SUCCESS;
    }

    init_logging(&config.observability);

    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "partition-gateway v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}
