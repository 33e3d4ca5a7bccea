//! Transient celebration signal raised after a completion.
//!
//! The signal is a `watch` flag plus a one-shot timer task that clears it.
//! Re-triggering aborts the pending timer and starts a new window; dropping
//! the [`Celebration`] aborts whatever timer is still pending.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default window before the signal clears itself
pub const CELEBRATION_WINDOW: Duration = Duration::from_millis(3000);

pub struct Celebration {
    window: Duration,
    flag: Arc<watch::Sender<bool>>,
    generation: Arc<AtomicU64>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Celebration {
    pub fn new(window: Duration) -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            window,
            flag: Arc::new(flag),
            generation: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_active(&self) -> bool {
        *self.flag.borrow()
    }

    /// Observe the flag (e.g. to start/stop a confetti animation)
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }

    /// Raise the signal and (re)start the clear timer.
    ///
    /// Must be called from within a tokio runtime; otherwise the signal is
    /// not raised at all, since nothing could clear it.
    pub fn trigger(&self) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Celebration skipped, no async runtime: {}", e);
                return;
            }
        };

        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pending) = timer.take() {
            debug!("Celebration re-triggered, restarting timer");
            pending.abort();
        }

        // A timer that already fired but lost the race to abort() must not
        // clear the new window
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.flag.send_replace(true);

        let flag = Arc::clone(&self.flag);
        let current = Arc::clone(&self.generation);
        let window = self.window;
        *timer = Some(runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if current.load(Ordering::SeqCst) == generation {
                flag.send_replace(false);
                debug!("Celebration cleared");
            }
        }));
    }

    /// Clear the signal now and drop the pending timer
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take() {
            pending.abort();
        }
        self.flag.send_replace(false);
    }
}

impl Default for Celebration {
    fn default() -> Self {
        Self::new(CELEBRATION_WINDOW)
    }
}

impl Drop for Celebration {
    fn drop(&mut self) {
        if let Some(pending) = self.timer.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            pending.abort();
        }
    }
}
