//! Batch signing data model.
//!
//! A [`SigningRequest`] is the immutable description of one batch: the PFX
//! credential plus an ordered, frozen list of target files. Dispatch produces
//! one [`SigningOutcome`] per attempted target and a final [`BatchSummary`].
//! Nothing in this module is ever persisted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::secret::PfxPassword;

/// File extensions accepted as signing targets.
pub const SIGNABLE_EXTENSIONS: &[&str] = &["exe", "dll", "msi", "cab", "ocx", "sys"];

/// The only supported certificate container extension.
pub const PFX_EXTENSION: &str = "pfx";

/// Default RFC 3161 timestamp authority.
pub const DEFAULT_TIMESTAMP_URL: &str = "http://timestamp.digicert.com";

/// Default wall-clock budget for a single signtool invocation.
pub const DEFAULT_PER_FILE_TIMEOUT: Duration = Duration::from_secs(300);

/// Digest algorithm passed to the signing tool.
///
/// Fixed to SHA-256; SHA-1 signatures are rejected by modern Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
}

impl DigestAlgorithm {
    /// The value signtool expects for `/fd` and `/td`.
    pub const fn as_signtool_arg(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
        }
    }
}

/// Returns true when the path carries one of the signable extensions.
///
/// Comparison is case-insensitive since Windows filesystems are.
pub fn is_signable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SIGNABLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Returns true when the path looks like a PFX certificate container.
pub fn is_pfx(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PFX_EXTENSION))
}

/// One batch-signing job.
///
/// The target list is a frozen snapshot taken when the request is built; the
/// dispatcher never mutates it. Duplicate paths are collapsed at
/// construction, keeping the first occurrence, so no file is ever signed
/// twice in one batch.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    /// Path to the PFX certificate container.
    pub certificate: PathBuf,
    /// Certificate password (redacted from all output).
    pub password: PfxPassword,
    /// Ordered, deduplicated target files; each produces exactly one outcome.
    pub targets: Vec<PathBuf>,
    /// Digest algorithm for `/fd` and `/td`.
    pub digest: DigestAlgorithm,
    /// RFC 3161 timestamp authority URL.
    pub timestamp_url: String,
    /// Budget for a single signtool invocation.
    pub per_file_timeout: Duration,
}

impl SigningRequest {
    pub fn new(
        certificate: impl Into<PathBuf>,
        password: PfxPassword,
        mut targets: Vec<PathBuf>,
    ) -> Self {
        let mut seen = std::collections::HashSet::new();
        targets.retain(|target| seen.insert(target.clone()));
        Self {
            certificate: certificate.into(),
            password,
            targets,
            digest: DigestAlgorithm::default(),
            timestamp_url: DEFAULT_TIMESTAMP_URL.to_string(),
            per_file_timeout: DEFAULT_PER_FILE_TIMEOUT,
        }
    }

    /// Fail-fast input validation.
    ///
    /// Runs before any subprocess is spawned; a validation failure means no
    /// side effects have occurred and no file has been touched. An empty
    /// password is deliberately not an error here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.certificate.is_file() {
            return Err(ValidationError::CertificateMissing {
                path: self.certificate.clone(),
            });
        }
        if !is_pfx(&self.certificate) {
            return Err(ValidationError::CertificateNotPfx {
                path: self.certificate.clone(),
            });
        }
        if self.targets.is_empty() {
            return Err(ValidationError::EmptyTargetList);
        }
        for target in &self.targets {
            let Ok(metadata) = std::fs::metadata(target) else {
                return Err(ValidationError::TargetMissing {
                    path: target.clone(),
                });
            };
            if !metadata.is_file() {
                return Err(ValidationError::TargetMissing {
                    path: target.clone(),
                });
            }
            if !is_signable(target) {
                return Err(ValidationError::UnsupportedTarget {
                    path: target.clone(),
                });
            }
            // Signing rewrites the file in place, so it must be writable.
            if metadata.permissions().readonly() {
                return Err(ValidationError::TargetNotWritable {
                    path: target.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Rejected batch input. Raised before dispatch starts; no partial batch runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Certificate file not found: {}", .path.display())]
    CertificateMissing { path: PathBuf },

    #[error("Certificate is not a .pfx container: {}", .path.display())]
    CertificateNotPfx { path: PathBuf },

    #[error("No target files to sign")]
    EmptyTargetList,

    #[error("Target file not found: {}", .path.display())]
    TargetMissing { path: PathBuf },

    #[error("Target file is not writable: {}", .path.display())]
    TargetNotWritable { path: PathBuf },

    #[error(
        "Unsupported target type: {} (expected one of .exe .dll .msi .cab .ocx .sys)",
        .path.display()
    )]
    UnsupportedTarget { path: PathBuf },
}

/// Result of signing one file.
#[derive(Debug, Clone)]
pub struct SigningOutcome {
    /// The target this outcome belongs to.
    pub target: PathBuf,
    /// Whether signtool exited with status 0.
    pub success: bool,
    /// Exit code; `None` when the invocation timed out or was killed.
    pub exit_code: Option<i32>,
    /// Captured stdout/stderr text from the invocation.
    pub output: String,
}

impl SigningOutcome {
    pub fn succeeded(target: PathBuf, output: String) -> Self {
        Self {
            target,
            success: true,
            exit_code: Some(0),
            output,
        }
    }

    pub fn failed(target: PathBuf, exit_code: Option<i32>, output: String) -> Self {
        Self {
            target,
            success: false,
            exit_code,
            output,
        }
    }
}

/// Aggregate counts for one completed (or cancelled) batch.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Identifier assigned when the batch started.
    pub batch_id: Uuid,
    /// Number of targets in the request.
    pub total: usize,
    /// Targets signtool reported success for.
    pub succeeded: usize,
    /// Targets attempted and failed.
    pub failed: usize,
    /// Targets never attempted because the batch was cancelled between files.
    pub skipped: usize,
}

impl BatchSummary {
    pub fn new(batch_id: Uuid, total: usize) -> Self {
        Self {
            batch_id,
            total,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        }
    }

    /// Fold one outcome into the counts.
    pub fn record(&mut self, outcome: &SigningOutcome) {
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Number of targets attempted so far.
    pub const fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    pub const fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} signed successfully", self.succeeded, self.total)?;
        if self.skipped > 0 {
            write!(f, " ({} skipped)", self.skipped)?;
        }
        Ok(())
    }
}
