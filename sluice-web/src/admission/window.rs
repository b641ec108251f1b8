//! Rolling-window acceptance counter

use parking_lot::Mutex;
use sluice_core::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Sliding-window rate limiter over the shared [`Clock`].
///
/// Time is cut into fixed windows. The rate estimate is the current window's
/// count plus the previous window's count weighted by how much of the
/// previous window still overlaps the last `window` milliseconds. Only
/// accepted requests are counted.
#[derive(Debug)]
pub struct RateWindow {
    clock: Arc<Clock>,
    limit: u64,
    window_ms: u64,
    state: Mutex<WindowState>,
}

#[derive(Debug, Default)]
struct WindowState {
    window_start: u64,
    current: u64,
    previous: u64,
}

impl RateWindow {
    /// A `limit` of 0 disables the gate
    pub fn new(clock: Arc<Clock>, limit: u64, window: Duration) -> Self {
        Self {
            clock,
            limit,
            window_ms: (window.as_millis() as u64).max(1),
            state: Mutex::new(WindowState::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Count one acceptance, or refuse if the window is already full
    pub fn try_acquire(&self) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let mut state = self.state.lock();
        let now = self.now_locked(&state);
        self.roll(&mut state, now);

        if self.estimate(&state, now) >= self.limit as f64 {
            false
        } else {
            state.current += 1;
            true
        }
    }

    /// Current rate estimate
    pub fn current_rate(&self) -> f64 {
        let mut state = self.state.lock();
        let now = self.now_locked(&state);
        self.roll(&mut state, now);
        self.estimate(&state, now)
    }

    /// Read the clock under the state lock, never earlier than the window
    /// another caller may already have rolled to
    fn now_locked(&self, state: &WindowState) -> u64 {
        self.clock.now().max(state.window_start)
    }

    fn roll(&self, state: &mut WindowState, now: u64) {
        let current_start = now - now % self.window_ms;
        if current_start <= state.window_start {
            return;
        }
        // counts older than one window no longer overlap
        state.previous = if current_start.saturating_sub(state.window_start) == self.window_ms {
            state.current
        } else {
            0
        };
        state.current = 0;
        state.window_start = current_start;
    }

    fn estimate(&self, state: &WindowState, now: u64) -> f64 {
        let into_window = now.saturating_sub(state.window_start).min(self.window_ms);
        let overlap = (self.window_ms - into_window) as f64 / self.window_ms as f64;
        state.previous as f64 * overlap + state.current as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(clock: &Arc<Clock>, limit: u64) -> RateWindow {
        RateWindow::new(clock.clone(), limit, Duration::from_secs(1))
    }

    #[test]
    fn test_limit_within_one_window() {
        let clock = Clock::manual(10_000);
        let gate = window(&clock, 3);

        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        assert_eq!(gate.current_rate(), 3.0);
    }

    #[test]
    fn test_previous_window_is_weighted() {
        let clock = Clock::manual(10_000);
        let gate = window(&clock, 4);
        for _ in 0..4 {
            assert!(gate.try_acquire());
        }

        // Halfway into the next window the previous four count as two
        clock.advance(1_500);
        assert_eq!(gate.current_rate(), 2.0);
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
    }

    #[test]
    fn test_old_windows_are_forgotten() {
        let clock = Clock::manual(10_000);
        let gate = window(&clock, 2);
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());

        clock.advance(2_000);
        assert_eq!(gate.current_rate(), 0.0);
        assert!(gate.try_acquire());
    }

    #[test]
    fn test_zero_limit_disables_gate() {
        let clock = Clock::manual(0);
        let gate = window(&clock, 0);
        assert!(!gate.is_enabled());
        for _ in 0..1_000 {
            assert!(gate.try_acquire());
        }
    }

    #[test]
    fn test_stale_time_does_not_rewind_window() {
        let clock = Clock::manual(1_999);
        let gate = window(&clock, 2);
        let stale = clock.now();

        clock.advance(1);
        assert!(gate.try_acquire());

        // a reading taken before another caller rolled the window
        let mut state = gate.state.lock();
        gate.roll(&mut state, stale);
        assert_eq!(state.window_start, 2_000);
        assert_eq!(state.current, 1);
        assert_eq!(gate.estimate(&state, stale), 1.0);
        drop(state);

        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
    }

    #[test]
    fn test_concurrent_acquisition_across_boundaries() {
        let clock = Clock::manual(0);
        let gate = Arc::new(RateWindow::new(clock.clone(), 1_000, Duration::from_millis(1)));

        let ticker = {
            let clock = clock.clone();
            std::thread::spawn(move || {
                for _ in 0..2_000 {
                    clock.advance(1);
                    std::thread::yield_now();
                }
            })
        };
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        gate.try_acquire();
                    }
                })
            })
            .collect();

        ticker.join().unwrap();
        for worker in workers {
            worker.join().unwrap();
        }

        let state = gate.state.lock();
        assert!(state.window_start <= clock.now());
        assert!(state.current <= 1_000);
    }
}
