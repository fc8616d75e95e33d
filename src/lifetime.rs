use std::{sync::Arc, time::Duration};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

struct LifetimeInner {
    name: String,
    cancelled: Mutex<bool>,
    cond: Condvar,
}

/// Cancellable lifetime of a started service.
///
/// Every clone observes the same cancellation. A service keeps a clone to learn when it should wind down.
#[derive(Clone)]
pub struct Lifetime {
    inner: Arc<LifetimeInner>,
}

impl Lifetime {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LifetimeInner {
                name: name.into(),
                cancelled: Mutex::new(false),
                cond: Condvar::new(),
            }),
        }
    }

    /// Name of the service owning this lifetime
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            debug!(service = %self.inner.name, "Lifetime cancelled");
        }
        self.inner.cond.notify_all();
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Blocks until the lifetime is cancelled.
    pub fn wait(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            self.inner.cond.wait(&mut cancelled);
        }
    }

    /// Blocks until the lifetime is cancelled or `timeout` elapses.
    /// Returns `true` if the lifetime was cancelled.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            let _ = self.inner.cond.wait_for(&mut cancelled, timeout);
        }
        *cancelled
    }
}

impl core::fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Lifetime")
            .field("name", &self.inner.name)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
