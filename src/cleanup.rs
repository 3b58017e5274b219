//! Process-wide cleanup registry.
//!
//! Scratch directories (and anything else that must not outlive the process)
//! register a callback here. The registry is drained on normal exit, on
//! Ctrl-C, and on panic, so cleanup does not depend on destructors running.

use ahash::AHashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

type Callback = Box<dyn FnOnce() + Send>;

/// Handle for a registered cleanup callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CleanupToken(u64);

pub struct ResourceRegistry {
    callbacks: Mutex<AHashMap<u64, Callback>>,
    next_token: AtomicU64,
}

static REGISTRY: OnceLock<ResourceRegistry> = OnceLock::new();
static HOOKS_INSTALLED: AtomicBool = AtomicBool::new(false);

impl ResourceRegistry {
    pub fn new() -> Self {
        ResourceRegistry {
            callbacks: Mutex::new(AHashMap::new()),
            next_token: AtomicU64::new(0),
        }
    }

    /// The process-wide registry used by scratch directories and the binary's
    /// exit paths.
    pub fn global() -> &'static ResourceRegistry {
        REGISTRY.get_or_init(ResourceRegistry::new)
    }

    pub fn register(&self, callback: impl FnOnce() + Send + 'static) -> CleanupToken {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let mut callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        callbacks.insert(token, Box::new(callback));
        CleanupToken(token)
    }

    /// Drop a callback without running it. Unknown tokens (already run or
    /// already unregistered) are ignored.
    pub fn unregister(&self, token: CleanupToken) {
        let mut callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        callbacks.remove(&token.0);
    }

    /// Run every registered callback exactly once. Callbacks are drained
    /// before running, so re-entrant or repeated calls are no-ops for
    /// anything already handled.
    pub fn run_all(&self) {
        let drained: Vec<(u64, Callback)> = {
            let mut callbacks = self
                .callbacks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            callbacks.drain().collect()
        };
        for (_, callback) in drained {
            callback();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        ResourceRegistry::new()
    }
}

/// Wire the global registry into the signal handler and the panic hook.
/// Normal-exit draining stays the responsibility of `main`. Installing more
/// than once is a no-op.
pub fn install_process_hooks() {
    if HOOKS_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let default_panic_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ResourceRegistry::global().run_all();
        default_panic_hook(info);
    }));

    if let Err(e) = ctrlc::set_handler(|| {
        ResourceRegistry::global().run_all();
        // 128 + SIGINT
        std::process::exit(130);
    }) {
        log::warn!("Could not install the Ctrl-C handler: {e}");
    }
}
