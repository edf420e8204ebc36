use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub type UnloadHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Host-side "page is going away" notifications.
///
/// Hooks run synchronously inside [`dispatch_unload`](Self::dispatch_unload)
/// and cannot await; anything asynchronous they start is fire-and-forget.
#[derive(Default)]
pub struct PageLifecycle {
    hooks: Mutex<Vec<(HookId, UnloadHook)>>,
    next_id: AtomicU64,
}

impl fmt::Debug for PageLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageLifecycle")
            .field("hooks", &self.hook_count())
            .finish()
    }
}

impl PageLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, hook: UnloadHook) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.hooks.lock().push((id, hook));
        id
    }

    /// Returns `false` if the hook was not registered.
    pub fn unregister(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.lock();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        hooks.len() != before
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Fires every registered hook and returns how many ran.
    pub fn dispatch_unload(&self) -> usize {
        // Hooks may re-enter register/unregister, so run them unlocked.
        let hooks: Vec<UnloadHook> = self
            .hooks
            .lock()
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect();

        debug!(hooks = hooks.len(), "Dispatching unload");
        for hook in &hooks {
            hook();
        }
        hooks.len()
    }
}

/// Dispatches unload on the lifecycle when the process receives SIGINT or
/// SIGTERM. The server-profile counterpart of a page unload.
pub fn listen_for_shutdown_signals(lifecycle: Arc<PageLifecycle>) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match unix_signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    error!("Failed to create SIGTERM handler: {}", e);
                    return;
                }
            };

            tokio::select! {
                result = signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("Failed to listen for SIGINT: {}", e);
                        return;
                    }
                    info!("Received SIGINT (Ctrl+C), flushing telemetry");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, flushing telemetry");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for SIGINT: {}", e);
                return;
            }
            info!("Received SIGINT (Ctrl+C), flushing telemetry");
        }

        lifecycle.dispatch_unload();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_register_dispatch_unregister() {
        let lifecycle = PageLifecycle::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let id = lifecycle.register(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(lifecycle.dispatch_unload(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(lifecycle.unregister(id));
        assert!(!lifecycle.unregister(id));
        assert_eq!(lifecycle.dispatch_unload(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_may_unregister_itself() {
        let lifecycle = Arc::new(PageLifecycle::new());
        let slot: Arc<Mutex<Option<HookId>>> = Arc::new(Mutex::new(None));

        let lc = Arc::clone(&lifecycle);
        let own_id = Arc::clone(&slot);
        let id = lifecycle.register(Arc::new(move || {
            if let Some(id) = *own_id.lock() {
                lc.unregister(id);
            }
        }));
        *slot.lock() = Some(id);

        lifecycle.dispatch_unload();
        assert_eq!(lifecycle.hook_count(), 0);
    }
}
