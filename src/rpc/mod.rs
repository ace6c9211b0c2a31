//! Read-only JSON-RPC query surface
//!
//! Methods: `vis_status`, `vis_deepestBlock`, `vis_activeWindow`,
//! `vis_ledger`, `vis_pendingVotes`, `vis_finalizationWeight`,
//! `vis_transactionPool`. Chains are addressed as `"proposer"` or
//! `{"voter": i}`.

pub mod handlers;
pub mod server;

pub use handlers::{rpc_module, QueryHandler};
pub use server::RpcServer;
