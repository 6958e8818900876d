#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};

use larder::config::Config;
use larder::server;

pub async fn start_proxy(cache_root: &Path) -> SocketAddr {
    let mut cfg = Config::default();
    cfg.server.addr = "127.0.0.1:0".to_string();
    cfg.cache.root = cache_root.to_path_buf();
    cfg.origin.connect_timeout = Duration::from_secs(2);
    cfg.origin.read_timeout = Duration::from_secs(2);

    let listener = server::bind(&cfg.server.addr).expect("bind proxy");
    let addr = listener.local_addr().expect("proxy addr");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    std::mem::forget(shutdown_tx);
    tokio::spawn(async move {
        let _ = server::serve(listener, shutdown_rx, Arc::new(cfg)).await;
    });
    addr
}

// Raw-TCP origin server: reads one request head, replies with whatever
// the handler returns, closes the connection. Counts requests served.
pub struct MockOrigin {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockOrigin {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> Vec<u8> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock origin");
        let addr = listener.local_addr().expect("mock origin addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let (shutdown, mut rx) = oneshot::channel();
        let handler = Arc::new(handler);
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    res = listener.accept() => {
                        let (mut stream, _) = match res { Ok(v) => v, Err(_) => break };
                        let handler = Arc::clone(&handler);
                        let counter = Arc::clone(&counter);
                        tokio::spawn(async move {
                            let head = read_head(&mut stream).await;
                            counter.fetch_add(1, Ordering::SeqCst);
                            let reply = handler(&String::from_utf8_lossy(&head));
                            let _ = stream.write_all(&reply).await;
                            let _ = stream.shutdown().await;
                        });
                    }
                }
            }
        });

        Self {
            addr,
            hits,
            shutdown: Some(shutdown),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockOrigin {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn read_head(stream: &mut TcpStream) -> Vec<u8> {
    let mut head = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(n) => n,
            Err(_) => break,
        };
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    head
}

pub async fn proxy_request(proxy: SocketAddr, raw: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.expect("connect proxy");
    stream.write_all(raw.as_bytes()).await.expect("send request");
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.expect("read reply");
    reply
}

pub fn http_response(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(status_line.as_bytes());
    out.extend_from_slice(b"\r\n");
    for (name, value) in headers {
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
    out.extend_from_slice(body);
    out
}

pub async fn wait_for<F>(cond: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    cond()
}
