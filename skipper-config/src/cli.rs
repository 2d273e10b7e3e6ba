//! Configuration sourced from the CLI.
//!
//! Grounded on `motya_config::cli::Cli`: a small set of process-shape flags
//! that overlay whatever the config file set, never the other way around.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "skipper", about = "A programmable HTTP reverse proxy")]
pub struct Cli {
    /// Path to the TOML process configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate_configs: bool,

    /// Address to bind the client-facing listener to.
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Address to bind the admin/observability listener to.
    #[arg(long)]
    pub admin_listen_addr: Option<String>,

    /// Number of worker threads used per service.
    #[arg(long)]
    pub threads_per_service: Option<usize>,

    /// Override `MaxLoopbacks`.
    #[arg(long)]
    pub max_loopbacks: Option<u32>,
}
