//! Acquisition thread handle shared by the mock devices.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{ContractError, SourceId};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub(crate) struct Worker {
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawn `body` on a thread named `acq-{device_id}`.
    ///
    /// Returns `false` without spawning when a thread is already running.
    /// The running flag drops as soon as `body` returns, including when a
    /// device loop gives up on its own.
    pub fn spawn(
        &self,
        device_id: &SourceId,
        body: impl FnOnce(Arc<AtomicBool>) + Send + 'static,
    ) -> Result<bool, ContractError> {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_running() {
            return Ok(false);
        }
        // the previous thread has cleared the flag; join it before reusing it
        if let Some(finished) = handle.take() {
            if finished.join().is_err() {
                warn!(device_id = %device_id, "Acquisition thread panicked");
            }
        }
        self.running.store(true, Ordering::Release);

        let running = self.running.clone();
        let spawned = thread::Builder::new()
            .name(format!("acq-{device_id}"))
            .spawn(move || {
                let _exit = ClearOnExit(running.clone());
                body(running)
            });
        match spawned {
            Ok(h) => {
                *handle = Some(h);
                Ok(true)
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(ContractError::device(
                    device_id.as_str(),
                    format!("failed to spawn acquisition thread: {e}"),
                ))
            }
        }
    }

    /// Signal the thread and join it.
    pub fn stop(&self, device_id: &SourceId) {
        self.running.store(false, Ordering::Release);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(device_id = %device_id, "Acquisition thread panicked");
            } else {
                debug!(device_id = %device_id, "Acquisition thread joined");
            }
        }
    }
}

/// Clears the running flag when the acquisition thread leaves its body,
/// whether it returned or panicked.
struct ClearOnExit(Arc<AtomicBool>);

impl Drop for ClearOnExit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fixed-rate tick schedule that does not accumulate sleep error.
pub(crate) struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(rate_hz: f64) -> Self {
        let period = Duration::from_secs_f64(1.0 / rate_hz.max(f64::MIN_POSITIVE));
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    /// Sleep until the next tick; returns early when `running` drops.
    pub fn wait(&mut self, running: &AtomicBool) -> bool {
        const SLICE: Duration = Duration::from_millis(20);
        loop {
            if !running.load(Ordering::Acquire) {
                return false;
            }
            let now = Instant::now();
            if now >= self.next {
                break;
            }
            thread::sleep((self.next - now).min(SLICE));
        }
        self.next += self.period;
        // fell behind by more than a period: resynchronize instead of bursting
        let now = Instant::now();
        if self.next < now {
            self.next = now + self.period;
        }
        true
    }
}
