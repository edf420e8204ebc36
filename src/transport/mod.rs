//! Client log transport: buffers entries, batches them, and delivers them
//! to the collector with retry and unload-safe flushing.

pub mod buffer;
pub mod config;
pub mod delivery;
pub mod lifecycle;
pub mod retry;
pub mod shared;
pub mod stats;

pub use buffer::TransportBuffer;
pub use config::{BatchingMode, TransportConfig, TransportProfile};
pub use delivery::{DeliveryError, HttpDelivery, LogDelivery};
pub use lifecycle::{HookId, PageLifecycle, UnloadHook, listen_for_shutdown_signals};
pub use retry::RetryPolicy;
pub use shared::shared_transport;
pub use stats::TransportStats;

use crate::domain::LogEntry;
use parking_lot::Mutex;
use stats::TransportCounters;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Holds the "flush in flight" flag for as long as it lives.
struct FlushGuard<'a> {
    flag: &'a AtomicBool,
    done: &'a Notify,
}

impl<'a> FlushGuard<'a> {
    fn acquire(flag: &'a AtomicBool, done: &'a Notify) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, done })
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.done.notify_waiters();
    }
}

struct LifecycleRegistration {
    lifecycle: Arc<PageLifecycle>,
    hook: HookId,
}

pub struct Transport<D: LogDelivery> {
    config: TransportConfig,
    delivery: Arc<D>,
    buffer: TransportBuffer,
    counters: Arc<TransportCounters>,
    flushing: AtomicBool,
    flush_done: Notify,
    destroyed: AtomicBool,
    shutdown: CancellationToken,
    timer: Mutex<Option<JoinHandle<()>>>,
    registration: Mutex<Option<LifecycleRegistration>>,
}

impl<D: LogDelivery> Transport<D> {
    /// Builds a transport. In time mode the flush timer is started on the
    /// ambient Tokio runtime.
    pub fn new(config: TransportConfig, delivery: D) -> Arc<Self> {
        let transport = Arc::new(Self {
            config,
            delivery: Arc::new(delivery),
            buffer: TransportBuffer::new(),
            counters: Arc::new(TransportCounters::default()),
            flushing: AtomicBool::new(false),
            flush_done: Notify::new(),
            destroyed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            timer: Mutex::new(None),
            registration: Mutex::new(None),
        });

        if let BatchingMode::Time { interval } = transport.config.batching {
            transport.start_timer(interval);
        }

        info!(
            endpoint = %transport.config.endpoint,
            profile = %transport.config.profile,
            batching = transport.config.batching.name(),
            retry = transport.config.retry.enabled,
            "Transport created"
        );
        transport
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot(self.buffer.len())
    }

    /// Enqueues `entry` and, if the batching trigger is met, flushes before
    /// returning. Delivery failures are never surfaced here.
    pub async fn send(&self, entry: LogEntry) {
        let Some(len) = self.push(entry) else {
            return;
        };
        if self.config.batching.is_triggered(len) {
            self.flush().await;
        }
    }

    /// Synchronous variant of [`send`](Self::send). A triggered flush is
    /// spawned onto the ambient runtime; without one the entry stays
    /// buffered for the next flush.
    pub fn enqueue(self: &Arc<Self>, entry: LogEntry) {
        let Some(len) = self.push(entry) else {
            return;
        };
        if !self.config.batching.is_triggered(len) {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let transport = Arc::clone(self);
                handle.spawn(async move { transport.flush().await });
            }
            Err(_) => debug!(pending = len, "No runtime available, flush deferred"),
        }
    }

    fn push(&self, entry: LogEntry) -> Option<usize> {
        if self.is_destroyed() {
            warn!(id = entry.id(), "Transport destroyed, dropping log entry");
            return None;
        }
        Some(self.buffer.push(entry))
    }

    /// Drains the buffer now. A no-op when empty or when another flush is
    /// already in flight.
    pub async fn flush(&self) {
        loop {
            {
                let Some(_guard) = FlushGuard::acquire(&self.flushing, &self.flush_done) else {
                    return;
                };
                let batch = self.buffer.take_all();
                if batch.is_empty() {
                    return;
                }
                self.deliver_with_retry(batch).await;
            }

            // Entries that arrived during the round trip.
            if self.is_destroyed() || !self.config.batching.is_triggered(self.buffer.len()) {
                return;
            }
        }
    }

    async fn deliver_with_retry(&self, batch: Vec<LogEntry>) {
        let retry = &self.config.retry;
        let max_attempts = retry.max_attempts();
        let mut attempt = 1;

        loop {
            let error = match self.delivery.deliver(&batch).await {
                Ok(()) => {
                    self.counters.record_delivered(batch.len());
                    debug!(entries = batch.len(), attempt, "Batch delivered");
                    return;
                }
                Err(e) => e,
            };
            self.counters.record_failed_attempt();

            if !retry.enabled {
                warn!(
                    entries = batch.len(),
                    error = %error,
                    "Batch delivery failed and retry is disabled, dropping batch"
                );
                self.counters.record_dropped(batch.len());
                return;
            }

            if attempt >= max_attempts {
                error!(
                    entries = batch.len(),
                    bytes = batch_size_bytes(&batch),
                    attempts = attempt,
                    error = %error,
                    "Dropping batch after exhausting retries"
                );
                self.counters.record_dropped(batch.len());
                return;
            }

            let delay = retry.delay_for(attempt);
            warn!(
                entries = batch.len(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Batch delivery failed, retrying"
            );

            tokio::select! {
                () = self.shutdown.cancelled() => {
                    debug!(entries = batch.len(), "Retry cancelled by shutdown, requeueing batch");
                    self.buffer.requeue_front(batch);
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            self.counters.record_retry();
            attempt += 1;
        }
    }

    fn start_timer(self: &Arc<Self>, interval: std::time::Duration) {
        let Ok(handle) = Handle::try_current() else {
            warn!("No runtime available, time-based flushing disabled");
            return;
        };

        let weak: Weak<Self> = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();
        let task = handle.spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
                let Some(transport) = weak.upgrade() else {
                    break;
                };
                transport.flush().await;
            }
        });
        *self.timer.lock() = Some(task);
    }

    /// Registers an unload hook that fires one best-effort delivery of
    /// whatever is buffered. Replaces any earlier registration.
    pub fn attach_lifecycle(self: &Arc<Self>, lifecycle: &Arc<PageLifecycle>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let hook = lifecycle.register(Arc::new(move || {
            if let Some(transport) = weak.upgrade() {
                transport.flush_on_unload();
            }
        }));

        let previous = self.registration.lock().replace(LifecycleRegistration {
            lifecycle: Arc::clone(lifecycle),
            hook,
        });
        if let Some(previous) = previous {
            previous.lifecycle.unregister(previous.hook);
        }
    }

    fn detach_lifecycle(&self) {
        if let Some(registration) = self.registration.lock().take() {
            registration.lifecycle.unregister(registration.hook);
        }
    }

    /// Swaps the buffer out and spawns exactly one delivery attempt for it.
    pub fn flush_on_unload(&self) {
        let batch = self.buffer.take_all();
        if batch.is_empty() {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!(entries = batch.len(), "No runtime available for unload flush");
            self.buffer.requeue_front(batch);
            return;
        };

        self.counters.record_unload_flush();
        let delivery = Arc::clone(&self.delivery);
        let counters = Arc::clone(&self.counters);
        handle.spawn(async move {
            match delivery.deliver(&batch).await {
                Ok(()) => counters.record_delivered(batch.len()),
                Err(e) => {
                    counters.record_failed_attempt();
                    counters.record_dropped(batch.len());
                    warn!(entries = batch.len(), error = %e, "Unload flush failed, batch dropped");
                }
            }
        });
    }

    /// Stops timers and retry waits, removes the unload hook, waits for an
    /// in-flight flush to settle, then makes one final delivery attempt.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.shutdown.cancel();
        self.detach_lifecycle();
        // The timer exits on cancellation; a flush it already started is
        // allowed to finish.
        drop(self.timer.lock().take());

        let _guard = loop {
            let settled = self.flush_done.notified();
            if let Some(guard) = FlushGuard::acquire(&self.flushing, &self.flush_done) {
                break guard;
            }
            settled.await;
        };

        let batch = self.buffer.take_all();
        if batch.is_empty() {
            info!("Transport destroyed");
            return;
        }

        match self.delivery.deliver(&batch).await {
            Ok(()) => self.counters.record_delivered(batch.len()),
            Err(e) => {
                self.counters.record_failed_attempt();
                self.counters.record_dropped(batch.len());
                warn!(entries = batch.len(), error = %e, "Final flush failed, batch dropped");
            }
        }
        info!(stats = ?self.stats(), "Transport destroyed");
    }
}

impl<D: LogDelivery> Drop for Transport<D> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.detach_lifecycle();
    }
}

fn batch_size_bytes(batch: &[LogEntry]) -> usize {
    batch.iter().map(LogEntry::estimated_size).sum()
}
