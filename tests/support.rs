//! Shared helpers for the integration tests

use sluice_config::SluiceConfig;
use sluice_core::StatsAggregator;
use sluice_server::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A server running on an ephemeral local port
pub struct RunningServer {
    pub addr: SocketAddr,
    pub stats: Arc<StatsAggregator>,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl RunningServer {
    pub async fn start(mut config: SluiceConfig) -> anyhow::Result<Self> {
        config.stats.cpu_sampling = false;
        // keep the reporter from draining the window mid-test
        config.stats.report_interval = std::time::Duration::from_secs(3600);

        let server = Server::new(config).await?;
        let stats = server.stats();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        let handle = tokio::spawn(server.serve(listener, async move {
            trigger.cancelled().await;
        }));

        Ok(Self {
            addr,
            stats,
            shutdown,
            handle,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub async fn stop(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        self.handle.await?
    }
}
