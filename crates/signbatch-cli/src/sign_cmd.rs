//! The `sign` subcommand.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use signbatch_core::batch::SigningRequest;
use signbatch_core::config::Config;
use signbatch_core::{scan, PfxPassword};
use signbatch_engine::discovery::SigntoolLocator;
use signbatch_engine::dispatch::BatchEvent;
use signbatch_engine::session::SigningSession;

use crate::render;

#[derive(Debug, Args)]
pub struct SignArgs {
    /// PFX certificate file
    #[arg(short = 'c', long = "cert", value_name = "PFX")]
    pub certificate: PathBuf,

    /// Certificate password (prompts when omitted)
    #[arg(long, env = "SIGNBATCH_PFX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Files to sign (.exe .dll .msi .cab .ocx .sys)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Recursively add signable files from this directory
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// RFC 3161 timestamp server URL (overrides config)
    #[arg(long)]
    pub timestamp_url: Option<String>,

    /// Explicit signtool.exe path (skips discovery)
    #[arg(long, env = "SIGNBATCH_SIGNTOOL")]
    pub signtool: Option<PathBuf>,
}

/// Run one signing batch. Returns `true` when every file signed.
pub async fn run(args: SignArgs, config: &Config) -> Result<bool> {
    let mut targets = args.files;
    if let Some(dir) = &args.dir {
        let scanned = scan::collect_signable(dir)
            .with_context(|| format!("failed to scan {}", dir.display()))?;
        info!(dir = %dir.display(), count = scanned.len(), "Added files from folder");
        targets.extend(scanned);
    }
    if targets.is_empty() {
        bail!("no files to sign; pass FILE arguments or --dir");
    }

    let password = resolve_password(args.password)?;
    if password.is_empty() {
        warn!("No password provided; continuing anyway");
    }

    let mut request = SigningRequest::new(args.certificate, password, targets);
    request.timestamp_url = args
        .timestamp_url
        .unwrap_or_else(|| config.signing.timestamp_url.clone());
    request.per_file_timeout = Duration::from_secs(config.signing.per_file_timeout_secs);

    let mut locator = SigntoolLocator::from_config(&config.sdk);
    if args.signtool.is_some() {
        locator = locator.with_override(args.signtool);
    }

    let mut session = SigningSession::new(locator);
    if let Some(toolchain) = session.toolchain() {
        info!(path = %toolchain.signtool.display(), "Found signtool.exe");
    }

    let mut handle = session
        .start_batch(request)
        .context("cannot start signing batch")?;

    while let Some(event) = handle.next_event().await {
        match event {
            BatchEvent::Started { total, .. } => {
                println!("Signing {total} file(s)");
            }
            BatchEvent::TargetStarted { target, .. } => {
                println!("\nSigning: {}", target.display());
            }
            BatchEvent::TargetFinished { outcome, .. } => {
                println!("{}", render::outcome_line(&outcome));
            }
            BatchEvent::Finished(summary) => {
                println!("\n{}", render::summary_line(&summary));
            }
        }
    }

    let summary = handle.wait().await.context("signing worker failed")?;
    Ok(summary.all_succeeded())
}

/// Password from flag/env, or a hidden interactive prompt. An empty password
/// is accepted; some certificates ship without one.
fn resolve_password(flag: Option<String>) -> Result<PfxPassword> {
    if let Some(password) = flag {
        return Ok(PfxPassword::new(password));
    }
    let password = dialoguer::Password::new()
        .with_prompt("PFX password")
        .allow_empty_password(true)
        .interact()
        .context("failed to read password")?;
    Ok(PfxPassword::new(password))
}
