//! Order submission with offline fallback
//!
//! [`OrderSubmitter`] is the single path an order takes to the server.
//! Online, it POSTs through the transport; offline or on a retryable
//! failure it parks the order in the durable queue. A background task
//! watches connectivity and drains the queue oldest-first whenever the
//! terminal comes back online.
//!
//! Draining keeps strict FIFO with one submission in flight: an entry is
//! removed only after the server acknowledges it by echoing the same order
//! id. A retryable failure is recorded on the entry and halts the pass so
//! newer orders never overtake a stuck one. Only a permanent rejection
//! drops an entry.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use shared::models::Order;

use crate::error::ClientResult;
use crate::queue::SubmissionQueue;

/// Entries that failed at least this many times get flagged in the log;
/// there is no retry cap, the order stays queued until the server takes it
const ATTEMPT_WARN_THRESHOLD: u32 = 5;

/// Submission transport, implemented by [`crate::HttpClient`].
///
/// A successful submit returns the server's stored record, which echoes
/// the submitted order id.
#[async_trait]
pub trait SubmitTransport: Send + Sync {
    async fn submit(&self, order: &Order) -> ClientResult<Order>;
}

/// What happened to a submitted order
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The server acknowledged the order; this is its stored record
    Submitted(Order),
    /// The order is parked in the offline queue
    SavedOffline {
        /// Queue depth after the save
        pending: u64,
    },
}

/// Result of one drain pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    pub submitted: u32,
    /// Entries removed after a permanent rejection
    pub dropped: u32,
    /// Why the pass stopped early, if it did
    pub halted: Option<String>,
}

/// Connectivity-aware submission pipeline
pub struct OrderSubmitter {
    transport: Arc<dyn SubmitTransport>,
    queue: SubmissionQueue,
    online: watch::Receiver<bool>,
    pending: watch::Sender<u64>,
    shutdown: CancellationToken,
}

impl OrderSubmitter {
    pub fn new(
        transport: Arc<dyn SubmitTransport>,
        queue: SubmissionQueue,
        online: watch::Receiver<bool>,
        shutdown: CancellationToken,
    ) -> ClientResult<Self> {
        // Seed the gauge with whatever survived the last run
        let (pending, _) = watch::channel(queue.len()?);
        Ok(Self {
            transport,
            queue,
            online,
            pending,
            shutdown,
        })
    }

    /// Live queue-depth gauge for status displays
    pub fn pending_orders(&self) -> watch::Receiver<u64> {
        self.pending.subscribe()
    }

    /// Submit an order, falling back to the offline queue when the server
    /// is unreachable.
    ///
    /// Permanent rejections (validation failures, conflicting resubmission)
    /// surface as errors; queueing them would only replay the rejection.
    pub async fn submit(&self, order: Order) -> ClientResult<SubmitOutcome> {
        if !*self.online.borrow() {
            return self.save_offline(order);
        }

        match self.transport.submit(&order).await {
            Ok(stored) => {
                tracing::info!(order = %stored.id, "Order submitted");
                Ok(SubmitOutcome::Submitted(stored))
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(order = %order.id, error = %e, "Submission failed, saving offline");
                self.save_offline(order)
            }
            Err(e) => Err(e),
        }
    }

    fn save_offline(&self, order: Order) -> ClientResult<SubmitOutcome> {
        let order_id = order.id.clone();
        self.queue.enqueue(&order)?;
        let pending = self.queue.len()?;
        self.pending.send_replace(pending);
        tracing::info!(order = %order_id, pending, "Order saved to offline queue");
        Ok(SubmitOutcome::SavedOffline { pending })
    }

    /// Drain the offline queue, oldest first, one submission in flight.
    ///
    /// Stops at the first retryable failure to preserve submission order;
    /// the failed entry keeps its place at the front for the next pass.
    pub async fn drain(&self) -> ClientResult<DrainReport> {
        let mut report = DrainReport::default();

        while let Some(entry) = self.queue.front()? {
            if self.shutdown.is_cancelled() {
                report.halted = Some("Shutdown requested".to_string());
                break;
            }
            if entry.attempts >= ATTEMPT_WARN_THRESHOLD {
                tracing::warn!(
                    order = %entry.order.id,
                    attempts = entry.attempts,
                    last_error = entry.last_error.as_deref().unwrap_or("none"),
                    "Queued order keeps failing"
                );
            }

            match self.transport.submit(&entry.order).await {
                Ok(stored) if stored.id == entry.order.id => {
                    self.queue.remove(entry.seq)?;
                    self.pending.send_replace(self.queue.len()?);
                    report.submitted += 1;
                    tracing::info!(order = %stored.id, "Queued order submitted");
                }
                Ok(stored) => {
                    // Never remove an entry without its own acknowledgment
                    let message = format!(
                        "Server acknowledged '{}' for submitted order '{}'",
                        stored.id, entry.order.id
                    );
                    self.queue.record_failure(entry.seq, &message)?;
                    tracing::error!(order = %entry.order.id, "{message}");
                    report.halted = Some(message);
                    break;
                }
                Err(e) if e.is_retryable() => {
                    let message = e.to_string();
                    self.queue.record_failure(entry.seq, &message)?;
                    tracing::warn!(
                        order = %entry.order.id,
                        attempts = entry.attempts + 1,
                        error = %message,
                        "Drain halted on retryable failure"
                    );
                    report.halted = Some(message);
                    break;
                }
                Err(e) => {
                    self.queue.remove(entry.seq)?;
                    self.pending.send_replace(self.queue.len()?);
                    report.dropped += 1;
                    tracing::warn!(
                        order = %entry.order.id,
                        error = %e,
                        "Queued order permanently rejected, dropped"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Background connectivity watcher: drains on every offline-to-online
    /// transition until shutdown.
    pub async fn run(self: Arc<Self>) {
        let mut online = self.online.clone();

        // Drain anything left over from a previous run
        if *online.borrow_and_update() {
            self.drain_and_log().await;
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Order submitter shutting down");
                    break;
                }
                changed = online.changed() => {
                    if changed.is_err() {
                        // Connectivity source dropped
                        break;
                    }
                    if *online.borrow_and_update() {
                        tracing::info!("Back online, draining offline queue");
                        self.drain_and_log().await;
                    }
                }
            }
        }
    }

    async fn drain_and_log(&self) {
        match self.drain().await {
            Ok(report) => {
                if report.submitted > 0 || report.dropped > 0 || report.halted.is_some() {
                    tracing::info!(
                        submitted = report.submitted,
                        dropped = report.dropped,
                        halted = report.halted.as_deref().unwrap_or("no"),
                        "Offline queue drain finished"
                    );
                }
            }
            Err(e) => {
                tracing::error!("Offline queue drain failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for OrderSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSubmitter")
            .field("online", &*self.online.borrow())
            .finish_non_exhaustive()
    }
}
