//! Periodic statistics reporter

use sluice_core::{CpuSensor, StatsAggregator, StatsReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Reduces and resets the stats window once per interval
pub struct StatsReporter {
    stats: Arc<StatsAggregator>,
    sensor: Arc<dyn CpuSensor>,
    interval: Duration,
}

impl StatsReporter {
    pub fn new(stats: Arc<StatsAggregator>, sensor: Arc<dyn CpuSensor>, interval: Duration) -> Self {
        Self {
            stats,
            sensor,
            interval,
        }
    }

    /// Run the reporter until `shutdown` fires
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, shutdown: CancellationToken) {
        info!(
            "Starting stats reporter with interval: {:?}",
            self.interval
        );

        let mut interval_timer = interval(self.interval);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately
        interval_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval_timer.tick() => {
                    self.report_once();
                }
            }
        }

        debug!("Stats reporter stopped");
    }

    /// Produce one report, log it and reset the window
    pub fn report_once(&self) -> StatsReport {
        let report = self.stats.report(self.interval, self.sensor.as_ref());

        info!(
            connections = report.connections,
            throughput = report.throughput,
            latency_mean_ms = report.latency_mean_ms,
            latency_p50_ms = report.latency_p50_ms,
            latency_p90_ms = report.latency_p90_ms,
            latency_p100_ms = report.latency_p100_ms,
            service_ratio = report.service_ratio,
            client_ratio = report.client_ratio,
            qos_mean = report.qos_mean,
            cpu_percent = report.cpu_percent,
            "Stats report"
        );
        for line in report.to_string().lines() {
            info!("{}", line);
        }

        report
    }
}
