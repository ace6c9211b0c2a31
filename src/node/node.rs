//! Node orchestration: build the visualizer, pick an event source, spawn the
//! event loop and the optional query server.

use crate::events::{EventSource, ExternalFeed, SyntheticGenerator};
use crate::node::config::VisConfig;
use crate::node::runner::EventLoop;
use crate::node::service_handle::ServiceHandle;
use crate::rpc::RpcServer;
use crate::visualizer::{SharedVisualizer, Visualizer};
use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Where events come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Synthetic,
    Tcp(String),
    File(PathBuf),
    Stdin,
}

/// A started node: its tasks, its state, and where queries are served.
pub struct RunningNode {
    pub handle: ServiceHandle,
    pub visualizer: SharedVisualizer,
    pub rpc_addr: Option<SocketAddr>,
}

impl RunningNode {
    pub async fn shutdown(self) -> Result<()> {
        info!("shutting down");
        self.handle.shutdown().await
    }
}

pub struct Node {
    cfg: VisConfig,
}

impl Node {
    pub fn new(cfg: VisConfig) -> Self {
        Self { cfg }
    }

    pub async fn start(self, source: SourceKind) -> Result<RunningNode> {
        self.cfg.validate()?;
        let (mut svc_handle, shutdown_rx) = ServiceHandle::new();
        let visualizer = Visualizer::new(self.cfg.visualizer_params()).shared();
        let tick = Duration::from_millis(self.cfg.node.tick_ms);
        let max_frame = self.cfg.feed.max_frame_len;

        let h = match &source {
            SourceKind::Synthetic => {
                let gen = SyntheticGenerator::new(self.cfg.synthetic.clone(), self.cfg.chains.voter_chains);
                spawn_loop(gen, visualizer.clone(), tick, shutdown_rx.clone())
            }
            SourceKind::Tcp(addr) => {
                let feed = ExternalFeed::connect(addr, max_frame).await?;
                spawn_loop(feed, visualizer.clone(), tick, shutdown_rx.clone())
            }
            SourceKind::File(path) => {
                let feed = ExternalFeed::open(path, max_frame).await?;
                spawn_loop(feed, visualizer.clone(), tick, shutdown_rx.clone())
            }
            SourceKind::Stdin => {
                let feed = ExternalFeed::new(tokio::io::stdin(), max_frame, "feed-stdin");
                spawn_loop(feed, visualizer.clone(), tick, shutdown_rx.clone())
            }
        };
        svc_handle.attach("event-loop", h);

        let mut rpc_addr = None;
        if let Some(addr) = &self.cfg.node.rpc_addr {
            let (local, server) = RpcServer::new(addr.clone(), visualizer.clone()).start().await?;
            rpc_addr = Some(local);
            let mut rx = shutdown_rx.clone();
            let h: JoinHandle<Result<()>> = tokio::spawn(async move {
                // a closed channel means the handle is gone; stop either way
                let _ = rx.changed().await;
                let _ = server.stop();
                server.stopped().await;
                info!("RPC server stopped");
                Ok(())
            });
            svc_handle.attach("rpc", h);
        }

        info!(
            ?source,
            voter_chains = self.cfg.chains.voter_chains,
            rpc = ?rpc_addr,
            "node started"
        );
        Ok(RunningNode { handle: svc_handle, visualizer, rpc_addr })
    }
}

fn spawn_loop<S: EventSource + 'static>(
    source: S,
    vis: SharedVisualizer,
    tick: Duration,
    shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<Result<()>> {
    tokio::spawn(EventLoop::new(source, vis, tick, shutdown_rx).run())
}
