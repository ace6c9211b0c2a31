pub mod cli;
pub mod config;
pub mod node;
pub mod runner;
pub mod service_handle;

pub use cli::run_cli;
pub use config::VisConfig;
pub use node::{Node, RunningNode, SourceKind};
pub use service_handle::ServiceHandle;
