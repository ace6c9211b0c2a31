use crate::rpc::handlers::{rpc_module, QueryHandler};
use crate::visualizer::SharedVisualizer;
use anyhow::Result;
use jsonrpsee::server::{Server, ServerHandle};
use std::net::SocketAddr;
use tracing::info;

/// JSON-RPC server over HTTP and WebSocket, read-only.
pub struct RpcServer {
    addr: String,
    vis: SharedVisualizer,
}

impl RpcServer {
    pub fn new(addr: String, vis: SharedVisualizer) -> Self {
        Self { addr, vis }
    }

    /// Bind and start serving. The returned handle stops the server.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle)> {
        let server = Server::builder().build(self.addr.as_str()).await?;
        let local = server.local_addr()?;
        let module = rpc_module(QueryHandler::new(self.vis))?;
        let handle = server.start(module);
        info!("RPC listening on {}", local);
        Ok((local, handle))
    }
}
