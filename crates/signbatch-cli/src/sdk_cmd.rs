//! SDK status and installation subcommands.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use signbatch_core::config::Config;
use signbatch_engine::discovery::SigntoolLocator;
use signbatch_engine::installer::{InstallError, SdkInstaller, SDK_DOWNLOAD_URL};

/// Run discovery and report the result. Returns `true` when signtool was
/// found.
pub fn detect(config: &Config) -> Result<bool> {
    let locator = SigntoolLocator::from_config(&config.sdk);
    match locator.discover() {
        Ok(toolchain) => {
            println!(
                "\u{2713} Windows SDK found: {}",
                toolchain.signtool.display()
            );
            if let Some(version) = &toolchain.sdk_version {
                println!("  SDK version: {version}");
            }
            Ok(true)
        }
        Err(e) => {
            println!("\u{2717} {e}");
            println!("Run `signbatch install-sdk`, or download manually:");
            println!("  {SDK_DOWNLOAD_URL}");
            Ok(false)
        }
    }
}

/// Attempt an unattended Windows SDK install. Returns `true` on success and
/// on user abort; `false` when the install itself failed.
pub async fn install(yes: bool) -> Result<bool> {
    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(
                "Install the Windows SDK using winget or Chocolatey? \
                 Administrator privileges may be required",
            )
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !confirmed {
            info!("SDK installation aborted by user");
            return Ok(true);
        }
    }

    let installer = SdkInstaller::new();
    let (output_tx, mut output_rx) = mpsc::channel(64);
    let install = tokio::spawn(async move { installer.install(output_tx).await });

    // Stream installer output as it arrives; the channel closes when the
    // install task drops its sender.
    while let Some(line) = output_rx.recv().await {
        println!("{line}");
    }

    match install.await.context("installer task failed")? {
        Ok(manager) => {
            println!(
                "\n\u{2713} Windows SDK installation completed ({}).",
                manager.program()
            );
            println!("Run `signbatch detect` to verify signtool.exe is now visible.");
            Ok(true)
        }
        Err(InstallError::NoPackageManager) => {
            println!("\n\u{2717} No package manager (winget/choco) found.");
            println!("Download and install the Windows SDK manually:");
            println!("  {SDK_DOWNLOAD_URL}");
            println!("Select the 'Signing Tools for Windows' component.");
            Ok(false)
        }
        Err(e) => {
            println!("\n\u{2717} Installation failed: {e}");
            Ok(false)
        }
    }
}
