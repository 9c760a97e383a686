//! Signbatch CLI
//!
//! Batch code signing of Windows binaries through `signtool.exe`: sign a set
//! of files with a PFX certificate, detect the Windows SDK, or drive an SDK
//! install via winget/Chocolatey.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;

use signbatch_cli::{sdk_cmd, sign_cmd};

#[derive(Parser, Debug)]
#[command(name = "signbatch")]
#[command(version, about = "Batch code signing via signtool.exe", long_about = None)]
struct Cli {
    /// Project directory for config resolution (.signbatch/settings.json)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation)
    #[arg(long, global = true, env = "SIGNBATCH_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign files with a PFX certificate
    Sign(sign_cmd::SignArgs),
    /// Detect signtool.exe across Windows SDK install locations
    Detect,
    /// Install the Windows SDK via winget or Chocolatey
    InstallSdk {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = signbatch_core::config::load_config(cli.project_dir.as_deref())?;
    let log_filter = format!("signbatch={}", config.signing.log_level);
    signbatch_core::tracing_init::init_tracing(&log_filter, cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting signbatch");

    let ok = match cli.command {
        Commands::Sign(args) => sign_cmd::run(args, &config).await?,
        Commands::Detect => sdk_cmd::detect(&config)?,
        Commands::InstallSdk { yes } => sdk_cmd::install(yes).await?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
