//! Signing session: the context object owned by the presentation layer.
//!
//! Holds the detected toolchain (updated on "refresh") and the
//! single-batch-in-flight guard. Created at startup, it replaces any global
//! "currently detected tool path" state: the front-end owns one session and
//! passes it to every dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use signbatch_core::batch::{BatchSummary, SigningRequest};

use crate::discovery::{DiscoveryError, SigntoolLocator, Toolchain};
use crate::dispatch::{self, BatchEvent, DispatchError, EVENT_CHANNEL_CAPACITY};

/// Long-lived signing context.
pub struct SigningSession {
    locator: SigntoolLocator,
    toolchain: Option<Toolchain>,
    in_flight: Arc<AtomicBool>,
}

impl SigningSession {
    /// Create a session, attempting tool discovery immediately. A missing
    /// tool is not an error at construction time; it becomes one when a
    /// batch is started.
    pub fn new(locator: SigntoolLocator) -> Self {
        let toolchain = locator.discover().ok();
        Self {
            locator,
            toolchain,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The currently detected toolchain, if any.
    pub const fn toolchain(&self) -> Option<&Toolchain> {
        self.toolchain.as_ref()
    }

    /// Re-run discovery, e.g. after an SDK install.
    pub fn refresh(&mut self) -> Result<Toolchain, DiscoveryError> {
        let toolchain = self.locator.discover()?;
        self.toolchain = Some(toolchain.clone());
        Ok(toolchain)
    }

    /// Whether a batch worker is currently running.
    pub fn is_batch_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start a batch worker for `request`.
    ///
    /// Fails fast, in order: tool availability (nothing can be processed
    /// without it, whatever the target list), then input validation, then
    /// the single-batch guard. On success the request snapshot moves into a
    /// spawned worker and the caller receives a [`BatchHandle`] for events,
    /// cancellation, and the final summary. No side effects occur on any
    /// error path.
    pub fn start_batch(&mut self, request: SigningRequest) -> Result<BatchHandle, DispatchError> {
        let toolchain = match &self.toolchain {
            Some(toolchain) => toolchain.clone(),
            None => self.refresh()?,
        };
        request.validate()?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DispatchError::BatchInProgress);
        }

        let batch_id = Uuid::new_v4();
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let in_flight = Arc::clone(&self.in_flight);

        let join = tokio::spawn(async move {
            let summary =
                dispatch::run_batch(batch_id, toolchain, request, events_tx, worker_cancel).await;
            in_flight.store(false, Ordering::SeqCst);
            summary
        });

        Ok(BatchHandle {
            batch_id,
            events: events_rx,
            join,
            cancel,
        })
    }
}

/// Handle to one running batch.
pub struct BatchHandle {
    /// Identifier assigned to this batch.
    pub batch_id: Uuid,
    events: mpsc::Receiver<BatchEvent>,
    join: JoinHandle<BatchSummary>,
    cancel: CancellationToken,
}

impl BatchHandle {
    /// Receive the next event; `None` once the worker has shut down.
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Request cancellation. Takes effect at the next file boundary; the
    /// in-flight invocation runs to completion.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker and return the final summary.
    pub async fn wait(self) -> Result<BatchSummary, JoinError> {
        self.join.await
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use signbatch_core::PfxPassword;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_tool_fails_before_validation() {
        let dir = TempDir::new().unwrap();
        let mut session =
            SigningSession::new(SigntoolLocator::with_search_dirs(vec![dir.path().into()]));
        assert!(session.toolchain().is_none());

        // Target list is nonsense on purpose: tool availability is checked first.
        let request = SigningRequest::new(
            PathBuf::from("missing.pfx"),
            PfxPassword::new(""),
            Vec::new(),
        );
        assert!(matches!(
            session.start_batch(request),
            Err(DispatchError::ToolUnavailable(_))
        ));
        assert!(!session.is_batch_in_flight());
    }

    #[tokio::test]
    async fn invalid_request_fails_before_any_spawn() {
        let dir = TempDir::new().unwrap();
        let tool = dir.path().join("signtool.exe");
        std::fs::write(&tool, b"stub").unwrap();

        let mut session =
            SigningSession::new(SigntoolLocator::with_search_dirs(vec![dir.path().into()]));
        assert!(session.toolchain().is_some());

        let request = SigningRequest::new(
            dir.path().join("absent.pfx"),
            PfxPassword::new("pw"),
            vec![dir.path().join("absent.exe")],
        );
        assert!(matches!(
            session.start_batch(request),
            Err(DispatchError::Validation(_))
        ));
        assert!(!session.is_batch_in_flight());
    }
}
