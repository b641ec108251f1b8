//! Low-overhead millisecond clock
//!
//! Reading the OS clock on every deadline check is wasteful when callers only
//! need millisecond resolution and poll thousands of times per second. A
//! [`Clock`] keeps an approximation of wall time in an atomic counter that a
//! single background task advances once per millisecond. Readers may see a
//! value up to ~1 ms stale.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const TICK: Duration = Duration::from_millis(1);

/// Shared millisecond time source
#[derive(Debug)]
pub struct Clock {
    millis: AtomicU64,
    ticker: Mutex<Option<CancellationToken>>,
}

impl Clock {
    /// Create a clock seeded with the current wall time and start ticking.
    ///
    /// Must be called from within a Tokio runtime. Ticking stops on
    /// [`Clock::stop`] or when the last reference is dropped.
    pub fn start() -> Arc<Self> {
        let token = CancellationToken::new();
        let clock = Arc::new(Self {
            millis: AtomicU64::new(unix_millis()),
            ticker: Mutex::new(Some(token.clone())),
        });

        let weak = Arc::downgrade(&clock);
        tokio::spawn(run_ticker(weak, token));
        debug!("Clock started at {} ms", clock.now());

        clock
    }

    /// Create a clock that only moves through [`Clock::advance`]
    pub fn manual(start_millis: u64) -> Arc<Self> {
        Arc::new(Self {
            millis: AtomicU64::new(start_millis),
            ticker: Mutex::new(None),
        })
    }

    /// Current time in milliseconds since the Unix epoch (approximate)
    #[inline]
    pub fn now(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }

    /// Milliseconds elapsed since an earlier reading of [`Clock::now`]
    #[inline]
    pub fn elapsed(&self, since: u64) -> u64 {
        self.now().saturating_sub(since)
    }

    /// Move the clock forward; intended for clocks built with [`Clock::manual`]
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::Relaxed);
    }

    /// Whether a background task is still advancing this clock
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Stop the background ticker; the clock keeps its last value
    pub fn stop(&self) {
        if let Some(token) = self.ticker.lock().take() {
            token.cancel();
            debug!("Clock stopped at {} ms", self.now());
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if let Some(token) = self.ticker.get_mut().take() {
            token.cancel();
        }
    }
}

async fn run_ticker(clock: Weak<Clock>, token: CancellationToken) {
    let mut ticks = interval(TICK);
    // late ticks are replayed so the counter keeps pace with wall time
    ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);
    ticks.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticks.tick() => {
                match clock.upgrade() {
                    Some(clock) => {
                        clock.millis.fetch_add(1, Ordering::Relaxed);
                    }
                    None => break,
                }
            }
        }
    }
}

fn unix_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
