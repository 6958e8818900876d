use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;

use larder::config;
use larder::logging;
use larder::server;

#[derive(Parser, Debug)]
#[command(name = "larder", about = "Caching forward HTTP proxy", version)]
struct Cli {
    /// Config file path
    #[arg(short = 'c')]
    config: Option<PathBuf>,

    /// Listen address override, host:port
    #[arg(short = 'l', long = "listen")]
    listen: Option<String>,

    /// Cache directory override
    #[arg(long = "cache-root")]
    cache_root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut cfg, ignored) = match &cli.config {
        Some(path) => config::load(path)?,
        None => (config::Config::default(), Vec::new()),
    };

    if let Some(listen) = cli.listen {
        cfg.server.addr = listen;
    }
    if let Some(root) = cli.cache_root {
        cfg.cache.root = root;
    }

    logging::init(&cfg.logger, cli.verbose)?;

    if cfg.strict && !ignored.is_empty() {
        return Err(anyhow!("unknown config fields: {}", ignored.join(", ")));
    }
    if !ignored.is_empty() {
        log::warn!("ignoring unknown config fields: {}", ignored.join(", "));
    }

    cfg.validate()?;

    log::info!("larder starting, cache root {}", cfg.cache.root.display());
    server::run(Arc::new(cfg)).await
}
