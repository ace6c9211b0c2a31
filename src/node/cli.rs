use crate::node::config::VisConfig;
use crate::node::node::{Node, SourceKind};
use crate::utils::logging::init_logging;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// CLI for the visualizer core.
#[derive(Parser)]
#[clap(name = "prismvis", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Write a configuration file with every default filled in
    InitConfig {
        path: PathBuf,
    },
    /// Run the core against an event source
    Run {
        /// TOML config file
        #[clap(long)]
        config: Option<PathBuf>,

        /// serve read-only JSON-RPC queries on host:port
        #[clap(long)]
        rpc: Option<String>,

        #[clap(subcommand)]
        source: SourceCmd,
    },
}

#[derive(Subcommand)]
pub enum SourceCmd {
    /// Generate blocks with the synthetic network
    Synthetic {
        #[clap(long)]
        seed: Option<u64>,
    },
    /// Read protocol events from a relay socket or a dump file ("-" for stdin)
    Feed {
        #[clap(long, conflicts_with = "file")]
        connect: Option<String>,

        #[clap(long)]
        file: Option<PathBuf>,
    },
}

fn source_kind(cmd: SourceCmd, cfg: &mut VisConfig) -> Result<SourceKind> {
    Ok(match cmd {
        SourceCmd::Synthetic { seed } => {
            if seed.is_some() {
                cfg.synthetic.seed = seed;
            }
            SourceKind::Synthetic
        }
        SourceCmd::Feed { connect: Some(addr), .. } => SourceKind::Tcp(addr),
        SourceCmd::Feed { file: Some(path), .. } if path.as_path() == Path::new("-") => SourceKind::Stdin,
        SourceCmd::Feed { file: Some(path), .. } => SourceKind::File(path),
        SourceCmd::Feed { .. } => bail!("feed needs --connect or --file"),
    })
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::InitConfig { path } => {
            std::fs::write(&path, VisConfig::default().to_toml()?)?;
            println!("wrote default config to {}", path.display());
            Ok(())
        }
        Cmd::Run { config, rpc, source } => {
            let mut cfg = match config {
                Some(path) => VisConfig::load(path)?,
                None => VisConfig::default(),
            };
            if rpc.is_some() {
                cfg.node.rpc_addr = rpc;
            }
            init_logging(&cfg.node.log_level);
            let kind = source_kind(source, &mut cfg)?;

            let running = Node::new(cfg).start(kind).await?;
            // Wait for Ctrl+C
            tokio::signal::ctrl_c().await?;
            running.shutdown().await
        }
    }
}
