pub mod pool;

pub use pool::{TransactionPool, TxBlock, TxPoolError};
