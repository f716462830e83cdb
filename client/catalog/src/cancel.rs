use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Flag {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared cancel flag for one request. Clones observe the same flag, and
/// cancelling is permanent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<Flag>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.cancelled.store(true, Ordering::Release);
        self.flag.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let notified = self.flag.notify.notified();
        tokio::pin!(notified);

        // registered before the check so a concurrent cancel still wakes us
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }

        notified.await;
    }
}
