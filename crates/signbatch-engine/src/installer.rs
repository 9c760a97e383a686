//! Windows SDK installer collaborator.
//!
//! Optional glue around `winget`/Chocolatey: probe which manager exists, run
//! its SDK install command, and stream the installer's output line-by-line
//! over a channel. Winget is probed first. Entirely separate from the
//! dispatcher; signing never depends on this module succeeding.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Manual download page, offered when no package manager is available.
pub const SDK_DOWNLOAD_URL: &str =
    "https://developer.microsoft.com/en-us/windows/downloads/windows-sdk/";

/// Package managers capable of installing the Windows SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Winget,
    Chocolatey,
}

impl PackageManager {
    pub const fn program(self) -> &'static str {
        match self {
            Self::Winget => "winget",
            Self::Chocolatey => "choco",
        }
    }

    /// Arguments for an unattended Windows SDK install.
    pub const fn install_args(self) -> &'static [&'static str] {
        match self {
            Self::Winget => &[
                "install",
                "--id",
                "Microsoft.WindowsSDK.10",
                "--accept-package-agreements",
                "--accept-source-agreements",
                "--silent",
            ],
            Self::Chocolatey => &["install", "windows-sdk-10.1", "-y", "--no-progress"],
        }
    }
}

/// Installer failures.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("No package manager (winget or Chocolatey) is available")]
    NoPackageManager,

    #[error("Failed to start installer: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("SDK installation failed (exit code {code:?})")]
    Failed { code: Option<i32> },
}

/// Drives an unattended Windows SDK installation.
#[derive(Debug, Clone)]
pub struct SdkInstaller {
    probe_timeout: Duration,
}

impl SdkInstaller {
    pub const fn new() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
        }
    }

    /// First available package manager, winget before Chocolatey.
    pub async fn detect_manager(&self) -> Option<PackageManager> {
        for manager in [PackageManager::Winget, PackageManager::Chocolatey] {
            if self.probe(manager).await {
                return Some(manager);
            }
        }
        None
    }

    async fn probe(&self, manager: PackageManager) -> bool {
        let mut cmd = Command::new(manager.program());
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match tokio::time::timeout(self.probe_timeout, cmd.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(_)) | Err(_) => false,
        }
    }

    /// Run the SDK install, streaming installer output lines over
    /// `output_tx`. Returns the manager that performed the install.
    pub async fn install(
        &self,
        output_tx: mpsc::Sender<String>,
    ) -> Result<PackageManager, InstallError> {
        let manager = self
            .detect_manager()
            .await
            .ok_or(InstallError::NoPackageManager)?;

        info!(
            manager = manager.program(),
            "Installing Windows SDK; this may take several minutes"
        );
        let code = stream_command(manager.program(), manager.install_args(), output_tx).await?;
        match code {
            Some(0) => Ok(manager),
            code => {
                warn!(?code, "SDK installation exited with an error");
                Err(InstallError::Failed { code })
            }
        }
    }
}

impl Default for SdkInstaller {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a command and forward its stdout and stderr line-by-line over the
/// channel. Returns the process exit code.
pub(crate) async fn stream_command(
    program: &str,
    args: &[&str],
    output_tx: mpsc::Sender<String>,
) -> Result<Option<i32>, InstallError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let tx = output_tx.clone();
        readers.push(tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx.send(line).await;
            }
        }));
    }
    if let Some(stderr) = child.stderr.take() {
        let tx = output_tx;
        readers.push(tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx.send(line).await;
            }
        }));
    }

    for reader in readers {
        let _ = reader.await;
    }
    let status = child.wait().await?;
    Ok(status.code())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn stream_command_forwards_both_streams() {
        let (tx, mut rx) = mpsc::channel(16);
        let code = stream_command("sh", &["-c", "echo out; echo err >&2"], tx)
            .await
            .unwrap();
        assert_eq!(code, Some(0));

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        assert!(lines.contains(&"out".to_string()));
        assert!(lines.contains(&"err".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stream_command_reports_nonzero_exit() {
        let (tx, _rx) = mpsc::channel(16);
        let code = stream_command("sh", &["-c", "exit 3"], tx).await.unwrap();
        assert_eq!(code, Some(3));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let (tx, _rx) = mpsc::channel(16);
        let result = stream_command("definitely-not-a-real-binary", &[], tx).await;
        assert!(matches!(result, Err(InstallError::Spawn(_))));
    }
}
