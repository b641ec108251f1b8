//! Request statistics aggregation
//!
//! Request handlers record events into a shared [`StatsWindow`]; a reporter
//! periodically swaps the window out for an empty one and reduces it into a
//! [`StatsReport`]. The swap happens under the same lock as every mutation, so
//! no event is lost or double counted. Events racing the swap simply land in
//! the next window.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::cpu::CpuSensor;

/// Accumulated events for one reporting interval
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsWindow {
    pub conn_accepted: u64,
    pub conn_processed: u64,
    pub conn_closed: u64,
    pub rqst_received: u64,
    pub rqst_processed: u64,
    /// Latency samples in milliseconds, in recording order
    pub latencies: Vec<u64>,
    /// QoS samples, in recording order
    pub qos_values: Vec<f64>,
}

impl StatsWindow {
    pub fn is_empty(&self) -> bool {
        *self == StatsWindow::default()
    }
}

/// Thread-safe accumulator shared by all request handlers
#[derive(Debug, Default)]
pub struct StatsAggregator {
    window: Mutex<StatsWindow>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection was accepted by a worker slot
    pub fn record_accepted(&self) {
        self.window.lock().conn_accepted += 1;
    }

    /// A request was received and work is about to begin
    pub fn record_received(&self) {
        self.window.lock().rqst_received += 1;
    }

    /// A worker finished a request without error
    pub fn record_processed_request(&self) {
        self.window.lock().rqst_processed += 1;
    }

    /// A response was written to a caller that was still waiting
    pub fn record_processed_conn(&self) {
        self.window.lock().conn_processed += 1;
    }

    /// Handling of a connection is complete
    pub fn record_closed_conn(&self) {
        self.window.lock().conn_closed += 1;
    }

    pub fn record_latency(&self, millis: u64) {
        self.window.lock().latencies.push(millis);
    }

    pub fn record_qos(&self, qos: f64) {
        self.window.lock().qos_values.push(qos);
    }

    /// Copy of the current window without resetting it
    pub fn snapshot(&self) -> StatsWindow {
        self.window.lock().clone()
    }

    /// Detach the current window and leave an empty one in its place
    pub fn take_window(&self) -> StatsWindow {
        std::mem::take(&mut *self.window.lock())
    }

    /// Reduce the current window into a report and reset the accumulators
    pub fn report(&self, interval: Duration, cpu: &dyn CpuSensor) -> StatsReport {
        let window = self.take_window();
        StatsReport::from_window(window, interval, cpu.utilization())
    }
}

/// Reduced statistics for one reporting interval
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub timestamp: DateTime<Utc>,
    pub interval_ms: u64,
    /// Accepted connections per second
    pub connections: u64,
    /// Closed connections per second
    pub throughput: f64,
    pub latency_mean_ms: f64,
    pub latency_p50_ms: u64,
    pub latency_p90_ms: u64,
    pub latency_p100_ms: u64,
    /// Share of received requests processed without error
    pub service_ratio: f64,
    /// Share of closed connections that received a response
    pub client_ratio: f64,
    pub qos_mean: f64,
    pub cpu_percent: u32,
    pub requests_received: u64,
    pub connections_closed: u64,
}

impl StatsReport {
    /// Reduce a detached window into a report
    pub fn from_window(mut window: StatsWindow, interval: Duration, cpu_percent: u32) -> Self {
        window.latencies.sort_unstable();
        let latencies = &window.latencies;

        let seconds = interval.as_secs_f64();
        let per_second = |count: u64| {
            if seconds > 0.0 {
                count as f64 / seconds
            } else {
                0.0
            }
        };

        Self {
            timestamp: Utc::now(),
            interval_ms: interval.as_millis() as u64,
            connections: per_second(window.conn_accepted) as u64,
            throughput: per_second(window.conn_closed),
            latency_mean_ms: mean_latency(latencies),
            latency_p50_ms: empirical_quantile(latencies, 0.5),
            latency_p90_ms: empirical_quantile(latencies, 0.9),
            latency_p100_ms: empirical_quantile(latencies, 1.0),
            service_ratio: completion_ratio(
                window.rqst_processed,
                window.rqst_received,
                window.conn_closed,
            ),
            client_ratio: completion_ratio(
                window.conn_processed,
                window.conn_closed,
                window.conn_closed,
            ),
            qos_mean: mean_qos(&window.qos_values),
            cpu_percent,
            requests_received: window.rqst_received,
            connections_closed: window.conn_closed,
        }
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.timestamp.format("%a %b %e %H:%M:%S UTC %Y"))?;
        writeln!(f, "Connections: {}", self.connections)?;
        writeln!(f, "Throughput: {:.3} TPS", self.throughput)?;
        writeln!(f, "Latency mean: {} ms", self.latency_mean_ms as u64)?;
        writeln!(
            f,
            "Latency P50/P90/P100: {} / {} / {} ms",
            self.latency_p50_ms, self.latency_p90_ms, self.latency_p100_ms
        )?;
        writeln!(f, "Service: {:.3}", self.service_ratio)?;
        writeln!(f, "Client: {:.3}", self.client_ratio)?;
        writeln!(f, "QoS: {:.3}", self.qos_mean)?;
        write!(f, "CPU: {} %", self.cpu_percent)
    }
}

/// Smallest sample whose empirical CDF reaches `p`; 0 without samples.
///
/// `sorted` must be in ascending order.
pub fn empirical_quantile(sorted: &[u64], p: f64) -> u64 {
    let target = p * sorted.len() as f64;
    let mut cumulative = 0.0;
    for &sample in sorted {
        cumulative += 1.0;
        if cumulative >= target {
            return sample;
        }
    }
    sorted.last().copied().unwrap_or(0)
}

fn mean_latency(latencies: &[u64]) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }
    latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
}

fn mean_qos(values: &[f64]) -> f64 {
    // an interval without measurements counts as a single perfect sample
    if values.is_empty() {
        return 1.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// `numerator / denominator` clamped to 1.0; 1.0 until a connection closed
/// in the window or when the denominator is zero.
fn completion_ratio(numerator: u64, denominator: u64, conn_closed: u64) -> f64 {
    if conn_closed == 0 || denominator == 0 {
        return 1.0;
    }
    (numerator as f64 / denominator as f64).min(1.0)
}
