//! Server startup and shutdown logic

use anyhow::{Context, Result};
use axum::Router;
use sluice_config::SluiceConfig;
use sluice_core::{Clock, CpuSensor, FixedCpuSensor, StatsAggregator, SystemCpuSensor};
use sluice_execution::Worker;
use sluice_web::AdmissionController;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::dispatcher::Dispatcher;
use crate::handler::{router, AppState};
use crate::reporter::StatsReporter;

/// Server application struct
pub struct Server {
    config: SluiceConfig,
    clock: Arc<Clock>,
    stats: Arc<StatsAggregator>,
    admission: Arc<AdmissionController>,
    dispatcher: Arc<Dispatcher>,
    agent_id: Uuid,
}

impl Server {
    /// Create a new server instance. Starts the clock, so it must run inside
    /// a Tokio runtime.
    pub async fn new(config: SluiceConfig) -> Result<Self> {
        config
            .validate_all()
            .context("Invalid configuration")?;

        let clock = Clock::start();
        let stats = Arc::new(StatsAggregator::new());
        let agent_id = Uuid::new_v4();

        let admission = Arc::new(AdmissionController::new(&config.admission, clock.clone()));
        let worker = Worker::from_config(&config.worker, clock.clone())
            .context("Failed to create worker")?;
        let dispatcher = Arc::new(Dispatcher::new(
            worker,
            stats.clone(),
            clock.clone(),
            agent_id,
            config.server.agent_version.clone(),
        ));

        Ok(Self {
            config,
            clock,
            stats,
            admission,
            dispatcher,
            agent_id,
        })
    }

    pub fn agent_id(&self) -> Uuid {
        self.agent_id
    }

    pub fn stats(&self) -> Arc<StatsAggregator> {
        self.stats.clone()
    }

    /// Build the complete application router
    pub fn build_app(&self) -> Router {
        router(AppState {
            admission: self.admission.clone(),
            dispatcher: self.dispatcher.clone(),
        })
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM
    pub async fn start(self) -> Result<()> {
        let addr = self.config.server.listen_address();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr: SocketAddr = listener.local_addr()?;

        tracing::info!("Agent {} starting up", self.agent_id);
        self.log_config_summary(local_addr);

        let reporter_shutdown = CancellationToken::new();
        let reporter = StatsReporter::new(
            self.stats.clone(),
            self.cpu_sensor(),
            self.config.stats.report_interval,
        )
        .spawn(reporter_shutdown.clone());

        let app = self.build_app();
        tracing::info!("Server listening on {}", local_addr);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        reporter_shutdown.cancel();
        if let Err(e) = reporter.await {
            tracing::warn!("Stats reporter ended abnormally: {}", e);
        }
        self.clock.stop();

        served.context("HTTP server failed")?;
        tracing::info!("Server shutdown complete");
        Ok(())
    }

    fn cpu_sensor(&self) -> Arc<dyn CpuSensor> {
        if self.config.stats.cpu_sampling {
            Arc::new(SystemCpuSensor::new())
        } else {
            Arc::new(FixedCpuSensor(0))
        }
    }

    /// Log configuration summary
    fn log_config_summary(&self, local_addr: SocketAddr) {
        let admission = &self.config.admission;
        let worker = &self.config.worker;

        tracing::info!("=== Sluice Configuration ===");
        tracing::info!("Listening on: {}", local_addr);
        tracing::info!("Agent version: {}", self.config.server.agent_version);
        tracing::info!("Worker: {}", self.dispatcher.worker().name());
        if worker.is_forwarding() {
            tracing::info!("Forwarding URL: {}", worker.forwarding.url);
            tracing::info!("Adaptive retries: {}", worker.forwarding.adaptive_retries);
            tracing::info!(
                "Client timeout: {} ms",
                worker.forwarding.client_timeout.as_millis()
            );
        } else {
            tracing::info!(
                "Client deadline cutoff: {} ms",
                worker.compute.deadline_cutoff.as_millis()
            );
            tracing::info!("Work quota: {}", worker.compute.work_quota);
        }
        if admission.load_shed_threshold > 0 {
            tracing::info!("Load shed threshold: {}", admission.load_shed_threshold);
        } else {
            tracing::info!("Load shed threshold: disabled");
        }
        tracing::info!("Thread count: {}", admission.thread_count);
        tracing::info!("Queue length: {}", admission.queue_length);
        tracing::info!(
            "Backlog timeout: {} ms",
            admission.backlog_timeout.as_millis()
        );
        tracing::info!(
            "Report interval: {} ms",
            self.config.stats.report_interval.as_millis()
        );
        tracing::info!("============================");
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = SluiceConfig::default();
        config.admission.thread_count = 0;
        assert!(Server::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_server_shuts_down_on_signal() {
        let mut config = SluiceConfig::default();
        config.stats.cpu_sampling = false;
        let server = Server::new(config).await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();

        let handle = tokio::spawn(server.serve(listener, async move {
            trigger.cancelled().await;
        }));

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }
}
