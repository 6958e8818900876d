use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::Config;
use crate::fetch::OriginFetcher;
use crate::pipeline::Pipeline;
use crate::prefetch::Prefetcher;
use crate::store::DiskStore;

pub async fn run(cfg: Arc<Config>) -> Result<()> {
    let listener = bind(&cfg.server.addr)?;
    log::info!("larder listening on {}", cfg.server.addr);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handlers(shutdown_tx);
    serve(listener, shutdown_rx, cfg).await
}

pub fn bind(addr: &str) -> Result<TcpListener> {
    let bind_addr = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    let socket_addr: SocketAddr = bind_addr.parse().context("parse server.addr")?;
    let listener = std::net::TcpListener::bind(socket_addr).context("bind tcp")?;
    listener.set_nonblocking(true)?;
    Ok(TcpListener::from_std(listener)?)
}

// Each connection is resolved by its own task, so one slow origin delays
// only its own client.
pub async fn serve(
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
    cfg: Arc<Config>,
) -> Result<()> {
    let store = Arc::new(DiskStore::new(cfg.cache.root.clone()));
    let fetcher = OriginFetcher::new(cfg.origin.connect_timeout, cfg.origin.read_timeout);
    let prefetcher = Arc::new(Prefetcher::new(
        Arc::clone(&store),
        fetcher,
        cfg.prefetch.workers,
    ));
    let pipeline = Arc::new(Pipeline::new(
        store,
        fetcher,
        prefetcher,
        cfg.prefetch.enabled,
    ));

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            res = listener.accept() => {
                let (stream, addr) = res.context("accept tcp")?;
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    pipeline.handle(stream, addr.to_string()).await;
                });
            }
        }
    }
    Ok(())
}

fn spawn_signal_handlers(shutdown: watch::Sender<bool>) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();
        loop {
            tokio::select! {
                _ = async {
                    if let Some(sig) = sigterm.as_mut() {
                        let _ = sig.recv().await;
                    }
                } => {
                    let _ = shutdown.send(true);
                    break;
                }
                _ = async {
                    if let Some(sig) = sigint.as_mut() {
                        let _ = sig.recv().await;
                    }
                } => {
                    let _ = shutdown.send(true);
                    break;
                }
            }
        }
    });
}
