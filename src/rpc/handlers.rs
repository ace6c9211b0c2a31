use crate::blockstore::types::{Block, ChainRef};
use crate::consensus::types::Vote;
use crate::ledger::index::LedgerEntry;
use crate::txpool::TxBlock;
use crate::utils::errors::VisError;
use crate::visualizer::query::{VisStatus, WeightView};
use crate::visualizer::SharedVisualizer;
use jsonrpsee::types::{ErrorObject, ErrorObjectOwned};
use jsonrpsee::RpcModule;

/// Default page size for `vis_ledger` when no limit is given.
pub const DEFAULT_LEDGER_PAGE: usize = 256;

const NOT_FOUND: i32 = -32001;
const INTERNAL: i32 = -32000;

pub fn to_rpc_error(e: VisError) -> ErrorObjectOwned {
    let code = match e {
        VisError::UnknownTarget(_) | VisError::UnknownChain(_) => NOT_FOUND,
        _ => INTERNAL,
    };
    ErrorObject::owned(code, e.to_string(), None::<()>)
}

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// Read-only view over the shared visualizer. Every call takes the read lock
/// once and releases it before the response is serialized.
#[derive(Clone)]
pub struct QueryHandler {
    vis: SharedVisualizer,
}

impl QueryHandler {
    pub fn new(vis: SharedVisualizer) -> Self {
        Self { vis }
    }

    pub fn status(&self) -> RpcResult<VisStatus> {
        self.vis.read().status().map_err(to_rpc_error)
    }

    pub fn deepest_block(&self, chain: ChainRef) -> RpcResult<Block> {
        self.vis.read().deepest_block(chain).map_err(to_rpc_error)
    }

    pub fn active_window(&self, chain: ChainRef) -> RpcResult<Vec<Block>> {
        self.vis.read().active_window(chain).map_err(to_rpc_error)
    }

    pub fn ledger(&self, from: u64, limit: Option<usize>) -> Vec<LedgerEntry> {
        self.vis.read().ledger(from, limit.unwrap_or(DEFAULT_LEDGER_PAGE))
    }

    pub fn pending_votes(&self) -> Vec<Vote> {
        self.vis.read().pending_votes()
    }

    pub fn finalization_weight(&self, id: &str) -> RpcResult<WeightView> {
        self.vis.read().finalization_weight(id).map_err(to_rpc_error)
    }

    pub fn transaction_pool(&self) -> Vec<TxBlock> {
        self.vis.read().transaction_pool()
    }
}

/// JSON-RPC method table.
pub fn rpc_module(handler: QueryHandler) -> anyhow::Result<RpcModule<QueryHandler>> {
    let mut module = RpcModule::new(handler);

    module.register_method("vis_status", |_, h, _| h.status())?;
    module.register_method("vis_deepestBlock", |params, h, _| -> RpcResult<Block> {
        let chain: ChainRef = params.one()?;
        h.deepest_block(chain)
    })?;
    module.register_method("vis_activeWindow", |params, h, _| -> RpcResult<Vec<Block>> {
        let chain: ChainRef = params.one()?;
        h.active_window(chain)
    })?;
    module.register_method("vis_ledger", |params, h, _| -> RpcResult<Vec<LedgerEntry>> {
        let mut seq = params.sequence();
        let from: u64 = seq.next()?;
        let limit: Option<usize> = seq.optional_next()?;
        Ok(h.ledger(from, limit))
    })?;
    module.register_method("vis_pendingVotes", |_, h, _| h.pending_votes())?;
    module.register_method("vis_finalizationWeight", |params, h, _| -> RpcResult<WeightView> {
        let id: String = params.one()?;
        h.finalization_weight(&id)
    })?;
    module.register_method("vis_transactionPool", |_, h, _| h.transaction_pool())?;

    Ok(module)
}
