//! Compute strategy: deadline-bounded synthetic CPU work
//!
//! One unit of reference work builds and checks balanced binary trees in
//! three independent sub-tasks. Sub-tasks run on the blocking pool and are
//! joined before the clock is consulted again, so the deadline is soft: a
//! call can overrun it by at most one unit.

use futures::future::join_all;
use sluice_config::ComputeConfig;
use sluice_core::{Clock, RequestOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{trace, warn};

/// Work units produced by one reference unit
pub const WORK_PER_UNIT: u64 = 4_271;

const LONG_LIVED_DEPTH: u32 = 7;
const SHALLOW_DEPTH: u32 = 4;
const SHALLOW_ITERATIONS: u32 = 64;
const DEEP_DEPTH: u32 = 6;
const DEEP_ITERATIONS: u32 = 16;

/// Performs synthetic work until the quota is met or the deadline passes
#[derive(Debug, Clone)]
pub struct ComputeWorker {
    clock: Arc<Clock>,
    deadline_cutoff: u64,
    min_run: u64,
    work_quota: u64,
}

impl ComputeWorker {
    pub fn new(clock: Arc<Clock>, deadline_cutoff: Duration, min_run: Duration, work_quota: u64) -> Self {
        Self {
            clock,
            deadline_cutoff: deadline_cutoff.as_millis() as u64,
            min_run: min_run.as_millis() as u64,
            work_quota,
        }
    }

    pub fn from_config(clock: Arc<Clock>, config: &ComputeConfig) -> Self {
        Self::new(clock, config.deadline_cutoff, config.min_run, config.work_quota)
    }

    pub fn work_quota(&self) -> u64 {
        self.work_quota
    }

    pub async fn process(&self) -> RequestOutcome {
        let start = self.clock.now();
        let mut work_done: u64 = 0;

        loop {
            let elapsed = self.clock.elapsed(start);
            if !self.keep_working(elapsed, work_done) {
                break;
            }
            work_done += run_reference_unit().await;
        }

        trace!(
            work_done,
            elapsed_ms = self.clock.elapsed(start),
            "Compute request finished"
        );
        RequestOutcome::success("Rooted", self.quality(work_done))
    }

    /// Loop condition; a cutoff of 0 means no deadline
    fn keep_working(&self, elapsed: u64, work_done: u64) -> bool {
        let within_deadline = self.deadline_cutoff == 0 || elapsed < self.deadline_cutoff;
        let unfinished = work_done < self.work_quota || elapsed < self.min_run;
        within_deadline && unfinished
    }

    fn quality(&self, work_done: u64) -> f64 {
        if self.work_quota == 0 {
            return 1.0;
        }
        (work_done as f64 / self.work_quota as f64).min(1.0)
    }
}

/// Run the three sub-tasks of one unit in parallel and sum their work
async fn run_reference_unit() -> u64 {
    let tasks = vec![
        spawn_blocking(|| check_tree(&create_tree(LONG_LIVED_DEPTH))),
        spawn_blocking(|| repeated_checks(SHALLOW_DEPTH, SHALLOW_ITERATIONS)),
        spawn_blocking(|| repeated_checks(DEEP_DEPTH, DEEP_ITERATIONS)),
    ];

    join_all(tasks)
        .await
        .into_iter()
        .map(|result| match result {
            Ok(work) => work,
            Err(e) => {
                warn!(error = %e, "Compute sub-task failed");
                0
            }
        })
        .sum()
}

#[derive(Debug)]
struct Node {
    next: Option<Box<Children>>,
}

#[derive(Debug)]
struct Children {
    left: Node,
    right: Node,
}

fn create_tree(depth: u32) -> Node {
    if depth == 0 {
        return Node { next: None };
    }
    Node {
        next: Some(Box::new(Children {
            left: create_tree(depth - 1),
            right: create_tree(depth - 1),
        })),
    }
}

/// Count the nodes of a tree
fn check_tree(node: &Node) -> u64 {
    match &node.next {
        None => 1,
        Some(children) => check_tree(&children.left) + check_tree(&children.right) + 1,
    }
}

fn repeated_checks(depth: u32, iterations: u32) -> u64 {
    (0..iterations).map(|_| check_tree(&create_tree(depth))).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(clock: Arc<Clock>, cutoff_ms: u64, min_run_ms: u64, quota: u64) -> ComputeWorker {
        ComputeWorker::new(
            clock,
            Duration::from_millis(cutoff_ms),
            Duration::from_millis(min_run_ms),
            quota,
        )
    }

    #[test]
    fn test_tree_sizes() {
        assert_eq!(check_tree(&create_tree(0)), 1);
        assert_eq!(check_tree(&create_tree(4)), 31);
        assert_eq!(check_tree(&create_tree(7)), 255);
    }

    #[tokio::test]
    async fn test_reference_unit_work() {
        assert_eq!(run_reference_unit().await, WORK_PER_UNIT);
        assert_eq!(205_008 / WORK_PER_UNIT, 48);
    }

    #[test]
    fn test_loop_condition() {
        let w = worker(Clock::manual(0), 100, 15, 1_000);

        assert!(w.keep_working(0, 0));
        // quota met but still under the run floor
        assert!(w.keep_working(10, 5_000));
        assert!(!w.keep_working(20, 5_000));
        // deadline reached with work outstanding
        assert!(!w.keep_working(100, 0));

        let no_deadline = worker(Clock::manual(0), 0, 15, 1_000);
        assert!(no_deadline.keep_working(1_000_000, 0));
        assert!(!no_deadline.keep_working(1_000_000, 1_000));
    }

    #[tokio::test]
    async fn test_stops_at_quota() {
        // A frozen clock leaves the quota as the only exit
        let w = worker(Clock::manual(0), 1_000, 0, WORK_PER_UNIT * 2);
        let outcome = w.process().await;

        assert_eq!(outcome.message(), "Rooted");
        assert_eq!(outcome.qos(), 1.0);
        assert!(!outcome.is_error());
    }

    #[tokio::test]
    async fn test_zero_quota_is_complete() {
        let outcome = worker(Clock::manual(0), 1_000, 0, 0).process().await;
        assert_eq!(outcome.qos(), 1.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deadline_bounds_partial_work() {
        let clock = Clock::start();
        let w = worker(clock.clone(), 20, 0, u64::MAX / 2);

        let outcome = w.process().await;
        clock.stop();

        assert!(outcome.has_qos());
        assert!(outcome.qos() < 1.0);
        assert!(!outcome.is_error());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_zero_cutoff_runs_at_least_the_floor() {
        let clock = Clock::start();
        let w = worker(clock.clone(), 0, 15, WORK_PER_UNIT);

        let start = clock.now();
        let outcome = w.process().await;
        let elapsed = clock.elapsed(start);
        clock.stop();

        assert!(elapsed >= 15, "returned after {} ms", elapsed);
        assert!(outcome.qos() <= 1.0);
        assert_eq!(outcome.qos(), 1.0);
    }
}
