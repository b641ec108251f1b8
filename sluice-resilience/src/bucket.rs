//! Token bucket gating adaptive retries

use parking_lot::Mutex;
use std::time::Instant;

/// Token bucket shared by every forwarding call.
///
/// Starts full. Tokens refill continuously at `refill_rate` per second up to
/// `capacity`.
#[derive(Debug)]
pub struct RetryBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_rate: f64,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RetryBucket {
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
            capacity: capacity as f64,
            refill_rate: refill_rate.max(0.0),
        }
    }

    pub fn from_config(config: &sluice_config::RetryConfig) -> Self {
        Self::new(config.bucket_capacity, config.bucket_refill_per_second)
    }

    /// Take one token if available
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, including partial ones
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_bucket_starts_full_and_drains() {
        let bucket = RetryBucket::new(20, 1.0);
        for _ in 0..20 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
        assert!(bucket.available() < 1.0);
    }

    #[test]
    fn test_bucket_refill() {
        let bucket = RetryBucket::new(5, 20.0);
        for _ in 0..5 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());

        // 20 tokens per second: one token every 50 ms
        std::thread::sleep(Duration::from_millis(120));
        assert!(bucket.try_acquire());
        assert!(bucket.available() <= 5.0);
    }

    #[test]
    fn test_empty_bucket_without_refill() {
        let bucket = RetryBucket::new(0, 0.0);
        assert!(!bucket.try_acquire());
        assert_eq!(bucket.available(), 0.0);
    }

    #[test]
    fn test_concurrent_acquisition_never_oversubscribes() {
        let bucket = Arc::new(RetryBucket::new(20, 0.0));
        let granted = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bucket = bucket.clone();
                let granted = granted.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        if bucket.try_acquire() {
                            granted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(granted.load(Ordering::Relaxed), 20);
    }
}
