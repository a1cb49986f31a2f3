//! Shutdown coordination shared by every call on one service instance.
//!
//! [`Lifecycle`] tracks whether the service still accepts calls and how many
//! file streams are in flight, and owns the [`CancellationToken`] that stops
//! the streams still running once the drain period is over.

use crate::server::telemetry::{decrement_streams_inflight, increment_streams_inflight};
use core::time::Duration;
use dataservice_core::{Error, Result};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// How long cancelled streams get to release their files after the drain
/// period has run out.
const CANCEL_GRACE: Duration = Duration::from_secs(3);

pub struct Lifecycle {
    shutting_down: AtomicBool,
    streams_inflight: AtomicUsize,
    shutdown_token: CancellationToken,
    drain_timeout: Duration,
}

impl Lifecycle {
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            shutting_down: AtomicBool::new(false),
            streams_inflight: AtomicUsize::new(0),
            shutdown_token: CancellationToken::new(),
            drain_timeout,
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once [`Lifecycle::shutdown`] has
    /// started.
    pub fn ensure_accepting(&self) -> Result<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(Error::ServiceShutdown);
        }
        Ok(())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    pub fn streams_inflight(&self) -> usize {
        self.streams_inflight.load(Ordering::Acquire)
    }

    /// Token for one stream; cancelled when shutdown gives up draining.
    pub fn stream_token(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    /// Registers an in-flight stream until the returned guard is dropped.
    pub fn track_stream(self: &Arc<Self>) -> StreamGuard {
        self.streams_inflight.fetch_add(1, Ordering::AcqRel);
        increment_streams_inflight();
        StreamGuard {
            lifecycle: Arc::clone(self),
        }
    }

    /// Gracefully shuts down the service.
    ///
    /// - Refuses new calls with [`Error::ServiceShutdown`].
    /// - Waits up to the drain timeout for in-flight streams to finish.
    /// - Cancels the remaining streams and waits briefly for them to release
    ///   their files.
    pub async fn shutdown(&self) {
        // === Phase 0: Stop accepting new requests ===
        tracing::info!("Refusing new requests");
        self.shutting_down.store(true, Ordering::Release);

        // === Phase 1: Wait for in-flight streams to drain ===
        tracing::info!(
            "Draining in-flight streams ({} active)",
            self.streams_inflight()
        );
        match timeout(self.drain_timeout, self.wait_for_streams()).await {
            Ok(()) => {
                tracing::debug!("All in-flight streams drained successfully");
            }
            Err(_) => {
                tracing::warn!(
                    "Graceful drain timed out ({} streams still active)",
                    self.streams_inflight()
                );
            }
        }

        // === Phase 2: Cancel any remaining streams ===
        tracing::debug!("Cancelling remaining streams via shutdown token");
        self.shutdown_token.cancel();

        if timeout(CANCEL_GRACE, self.wait_for_streams()).await.is_err() {
            tracing::error!(
                "{} streams did not stop after cancellation",
                self.streams_inflight()
            );
        }

        tracing::info!("Service shutdown complete");
    }

    async fn wait_for_streams(&self) {
        while self.streams_inflight() > 0 {
            sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Keeps a stream counted as in flight; see [`Lifecycle::track_stream`].
pub struct StreamGuard {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.lifecycle
            .streams_inflight
            .fetch_sub(1, Ordering::AcqRel);
        decrement_streams_inflight();
    }
}
