//! Bounded concurrency throttle with backlog and timeout

use crate::admission::window::RateWindow;
use crate::errors::{AdmissionRejection, RejectionKind};
use sluice_config::{AdmissionConfig, RetryAfterConfig};
use sluice_core::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Admits requests to the worker.
///
/// Two semaphores bound the request population: `backlog` holds one slot per
/// request that is running or waiting (`thread_count + queue_length`) and
/// `tokens` holds one per running request (`thread_count`). A backlog slot is
/// always taken before waiting on a token.
#[derive(Debug)]
pub struct AdmissionController {
    rate: RateWindow,
    tokens: Arc<Semaphore>,
    backlog: Arc<Semaphore>,
    thread_count: usize,
    backlog_capacity: usize,
    backlog_timeout: Duration,
    retry_after: Option<RetryAfterConfig>,
}

/// Permission to run the worker for one request.
///
/// Returns its execution token and backlog slot when released or dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    _token: OwnedSemaphorePermit,
    _slot: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    pub fn release(self) {}
}

impl AdmissionController {
    pub fn new(config: &AdmissionConfig, clock: Arc<Clock>) -> Self {
        let thread_count = config.thread_count;
        let backlog_capacity = config.backlog_capacity();

        Self {
            rate: RateWindow::new(clock, config.load_shed_threshold, config.rate_window),
            tokens: Arc::new(Semaphore::new(thread_count)),
            backlog: Arc::new(Semaphore::new(backlog_capacity)),
            thread_count,
            backlog_capacity,
            backlog_timeout: config.backlog_timeout,
            retry_after: config.retry_after.clone(),
        }
    }

    /// Decide whether a request may run.
    ///
    /// `cancel` is consulted once, before a backlog slot is taken. Once a
    /// request is in the backlog it waits for a token until `backlog_timeout`
    /// even if the caller has gone away.
    pub async fn admit(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AdmissionPermit, AdmissionRejection> {
        if !self.rate.try_acquire() {
            debug!(
                limit = self.rate.limit(),
                rate = self.rate.current_rate(),
                "Request shed by rate gate"
            );
            return Err(self.reject(RejectionKind::CapacityExceeded));
        }

        if cancel.is_cancelled() {
            debug!("Caller went away before admission");
            return Err(self.reject(RejectionKind::Canceled));
        }

        let slot = match self.backlog.clone().try_acquire_owned() {
            Ok(slot) => slot,
            Err(_) => {
                debug!(
                    backlog_capacity = self.backlog_capacity,
                    "Backlog full, rejecting request"
                );
                return Err(self.reject(RejectionKind::CapacityExceeded));
            }
        };

        match timeout(self.backlog_timeout, self.tokens.clone().acquire_owned()).await {
            Ok(Ok(token)) => Ok(AdmissionPermit {
                _token: token,
                _slot: slot,
            }),
            // the token semaphore is never closed
            Ok(Err(_)) => Err(self.reject(RejectionKind::CapacityExceeded)),
            Err(_) => {
                drop(slot);
                debug!(
                    timeout_ms = self.backlog_timeout.as_millis() as u64,
                    "Timed out waiting for an execution token"
                );
                Err(self.reject(RejectionKind::BacklogTimeout))
            }
        }
    }

    fn reject(&self, kind: RejectionKind) -> AdmissionRejection {
        let hint = self.retry_after.as_ref().map(|hints| match kind {
            RejectionKind::Canceled => hints.canceled,
            RejectionKind::CapacityExceeded | RejectionKind::BacklogTimeout => hints.busy,
        });
        AdmissionRejection::new(kind, hint)
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn backlog_capacity(&self) -> usize {
        self.backlog_capacity
    }

    /// Requests currently holding an execution token
    pub fn running(&self) -> usize {
        self.thread_count - self.tokens.available_permits()
    }

    /// Requests currently holding a backlog slot, running or waiting
    pub fn in_backlog(&self) -> usize {
        self.backlog_capacity - self.backlog.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(thread_count: usize, queue_length: usize, backlog_timeout: Duration) -> AdmissionConfig {
        AdmissionConfig {
            load_shed_threshold: 0,
            thread_count,
            queue_length,
            backlog_timeout,
            ..AdmissionConfig::default()
        }
    }

    fn controller(config: &AdmissionConfig) -> Arc<AdmissionController> {
        Arc::new(AdmissionController::new(config, Clock::manual(0)))
    }

    #[tokio::test]
    async fn test_single_slot_sheds_second_request() {
        let admission = controller(&config(1, 0, Duration::from_secs(600)));
        let cancel = CancellationToken::new();

        let first = admission.admit(&cancel).await.unwrap();
        let second = admission.admit(&cancel).await.unwrap_err();

        assert_eq!(second.kind(), RejectionKind::CapacityExceeded);
        assert_eq!(admission.running(), 1);

        first.release();
        assert_eq!(admission.running(), 0);
        assert_eq!(admission.in_backlog(), 0);
        assert!(admission.admit(&cancel).await.is_ok());
    }

    #[tokio::test]
    async fn test_canceled_caller_consumes_nothing() {
        let admission = controller(&config(1, 1, Duration::from_secs(1)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let rejection = admission.admit(&cancel).await.unwrap_err();

        assert_eq!(rejection.kind(), RejectionKind::Canceled);
        assert_eq!(admission.in_backlog(), 0);
        assert_eq!(admission.running(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlog_timeout_releases_slot() {
        let admission = controller(&config(1, 1, Duration::from_millis(100)));
        let cancel = CancellationToken::new();

        let _running = admission.admit(&cancel).await.unwrap();
        let rejection = admission.admit(&cancel).await.unwrap_err();

        assert_eq!(rejection.kind(), RejectionKind::BacklogTimeout);
        assert_eq!(admission.in_backlog(), 1);
    }

    #[tokio::test]
    async fn test_queued_request_proceeds_when_token_frees() {
        let admission = controller(&config(1, 1, Duration::from_secs(5)));
        let cancel = CancellationToken::new();

        let running = admission.admit(&cancel).await.unwrap();

        let waiter = {
            let admission = admission.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { admission.admit(&cancel).await.map(|permit| permit.release()) })
        };

        // Cancelling after the slot is held must not interrupt the wait
        while admission.in_backlog() < 2 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        running.release();

        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_rate_gate_runs_first() {
        let clock = Clock::manual(5_000);
        let mut cfg = config(4, 4, Duration::from_secs(1));
        cfg.load_shed_threshold = 2;
        let admission = AdmissionController::new(&cfg, clock.clone());
        let cancel = CancellationToken::new();

        let _a = admission.admit(&cancel).await.unwrap();
        let _b = admission.admit(&cancel).await.unwrap();
        let shed = admission.admit(&cancel).await.unwrap_err();
        assert_eq!(shed.kind(), RejectionKind::CapacityExceeded);
        assert_eq!(admission.in_backlog(), 2);

        clock.advance(2_000);
        assert!(admission.admit(&cancel).await.is_ok());
    }

    #[tokio::test]
    async fn test_retry_after_hints() {
        let mut cfg = config(1, 0, Duration::from_secs(1));
        cfg.retry_after = Some(RetryAfterConfig {
            busy: Duration::from_secs(3),
            canceled: Duration::from_secs(1),
        });
        let admission = controller(&cfg);

        let cancel = CancellationToken::new();
        let _held = admission.admit(&cancel).await.unwrap();
        let busy = admission.admit(&cancel).await.unwrap_err();
        assert_eq!(busy.retry_after(), Some(Duration::from_secs(3)));

        let gone = CancellationToken::new();
        gone.cancel();
        let canceled = admission.admit(&gone).await.unwrap_err();
        assert_eq!(canceled.retry_after(), Some(Duration::from_secs(1)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bounds_hold_under_load() {
        let admission = controller(&config(3, 5, Duration::from_secs(10)));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..40).map(|_| {
            let admission = admission.clone();
            let running = running.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                match admission.admit(&cancel).await {
                    Ok(permit) => {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        assert!(admission.in_backlog() <= 8);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        permit.release();
                        true
                    }
                    Err(rejection) => {
                        assert_eq!(rejection.kind(), RejectionKind::CapacityExceeded);
                        false
                    }
                }
            })
        });

        let admitted = join_all(tasks)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(admitted >= 3);
        assert_eq!(admission.running(), 0);
        assert_eq!(admission.in_backlog(), 0);
    }
}
