//! The batch sign dispatcher.
//!
//! One background worker processes the frozen target list strictly
//! sequentially, emitting one event per completed file plus a terminal event
//! for the batch. A failing file never aborts the remaining files; validation
//! and tool-availability problems abort the whole batch before any file is
//! touched. Cancellation is honored only between files so no target is left
//! in an ambiguous signing state.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use signbatch_core::batch::{BatchSummary, SigningOutcome, SigningRequest, ValidationError};

use crate::command;
use crate::discovery::{DiscoveryError, Toolchain};

/// Capacity of the per-batch event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the dispatcher, in order: one `Started`, then a
/// `TargetStarted`/`TargetFinished` pair per attempted file, then exactly one
/// `Finished`.
#[derive(Debug)]
pub enum BatchEvent {
    Started {
        batch_id: Uuid,
        total: usize,
    },
    TargetStarted {
        index: usize,
        target: PathBuf,
    },
    TargetFinished {
        index: usize,
        outcome: SigningOutcome,
    },
    Finished(BatchSummary),
}

/// Hard failures of a `start_batch` call. Per-file signing failures are not
/// errors; they are recorded in the file's [`SigningOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ToolUnavailable(#[from] DiscoveryError),

    #[error("A signing batch is already in flight")]
    BatchInProgress,
}

/// Worker loop for one batch. Runs inside a spawned task; the caller holds
/// the event receiver. Event sends are best-effort: a disconnected consumer
/// must not stop files from being signed.
pub(crate) async fn run_batch(
    batch_id: Uuid,
    toolchain: Toolchain,
    request: SigningRequest,
    events: mpsc::Sender<BatchEvent>,
    cancel: CancellationToken,
) -> BatchSummary {
    let total = request.targets.len();
    let mut summary = BatchSummary::new(batch_id, total);
    info!(%batch_id, total, signtool = %toolchain.signtool.display(), "Starting signing batch");
    let _ = events.send(BatchEvent::Started { batch_id, total }).await;

    for (index, target) in request.targets.iter().enumerate() {
        if cancel.is_cancelled() {
            summary.skipped = total - summary.attempted();
            info!(%batch_id, skipped = summary.skipped, "Batch cancelled between files");
            break;
        }

        let _ = events
            .send(BatchEvent::TargetStarted {
                index,
                target: target.clone(),
            })
            .await;

        let outcome = sign_one(&toolchain, &request, target).await;
        if outcome.success {
            info!(%batch_id, target = %target.display(), "Signed");
        } else {
            warn!(
                %batch_id,
                target = %target.display(),
                exit_code = ?outcome.exit_code,
                "Signing failed"
            );
        }
        summary.record(&outcome);
        let _ = events.send(BatchEvent::TargetFinished { index, outcome }).await;
    }

    info!(%batch_id, succeeded = summary.succeeded, failed = summary.failed, "Batch finished");
    let _ = events.send(BatchEvent::Finished(summary.clone())).await;
    summary
}

/// Run one signtool invocation to completion and fold the result into a
/// [`SigningOutcome`]. Never returns an error: spawn failures and timeouts
/// are failed outcomes for this target only.
async fn sign_one(toolchain: &Toolchain, request: &SigningRequest, target: &Path) -> SigningOutcome {
    let args = command::sign_args(request, target);
    debug!(cmd = %command::describe_args(&args), "Invoking signtool");

    let mut cmd = command::sign_command(toolchain, request, target);
    match tokio::time::timeout(request.per_file_timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            let text = merge_output(&output.stdout, &output.stderr);
            if output.status.success() {
                SigningOutcome::succeeded(target.to_path_buf(), text)
            } else {
                SigningOutcome::failed(target.to_path_buf(), output.status.code(), text)
            }
        }
        Ok(Err(e)) => SigningOutcome::failed(
            target.to_path_buf(),
            None,
            format!("failed to invoke signtool: {e}"),
        ),
        Err(_) => SigningOutcome::failed(
            target.to_path_buf(),
            None,
            format!(
                "signtool timed out after {}s",
                request.per_file_timeout.as_secs()
            ),
        ),
    }
}

/// Combine captured stdout and stderr into the outcome's log text.
fn merge_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = stdout.trim_end();
    let stderr = stderr.trim_end();
    match (stdout.is_empty(), stderr.is_empty()) {
        (_, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) => format!("{stdout}\n{stderr}"),
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn merge_output_prefers_both_streams_in_order() {
        assert_eq!(merge_output(b"out\n", b""), "out");
        assert_eq!(merge_output(b"", b"err\n"), "err");
        assert_eq!(merge_output(b"out", b"err"), "out\nerr");
        assert_eq!(merge_output(b"", b""), "");
    }
}
