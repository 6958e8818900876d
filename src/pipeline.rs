use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::classify;
use crate::error::FetchError;
use crate::fetch::OriginFetcher;
use crate::freshness::{self, Verdict};
use crate::head;
use crate::prefetch::Prefetcher;
use crate::store::DiskStore;
use crate::target::RequestTarget;

const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Per-connection request handling: parse the request line, consult the
/// cache, serve or fetch, store, maybe prefetch.
pub struct Pipeline {
    store: Arc<DiskStore>,
    fetcher: OriginFetcher,
    prefetcher: Arc<Prefetcher>,
    prefetch_enabled: bool,
}

impl Pipeline {
    pub fn new(
        store: Arc<DiskStore>,
        fetcher: OriginFetcher,
        prefetcher: Arc<Prefetcher>,
        prefetch_enabled: bool,
    ) -> Self {
        Self {
            store,
            fetcher,
            prefetcher,
            prefetch_enabled,
        }
    }

    /// One client connection, exactly one terminal reply: cached bytes,
    /// relayed origin bytes, or a synthesized error page.
    pub async fn handle(&self, mut stream: TcpStream, peer: String) {
        let head = match read_request_head(&mut stream).await {
            Ok(head) if !head.is_empty() => head,
            // client connected and went away without sending anything
            Ok(_) => return,
            Err(err) => {
                log::warn!("read request from {peer}: {err}");
                return;
            }
        };
        let text = String::from_utf8_lossy(&head);
        let line = text.split("\r\n").next().unwrap_or("");
        let target = match RequestTarget::from_request_line(line) {
            Ok(target) => target,
            Err(err) => {
                log::warn!("{peer}: {err}");
                let page = error_page(400, "Bad Request", &err.to_string());
                let _ = stream.write_all(&page).await;
                return;
            }
        };
        log::info!(
            "{peer}: {} {}:{}{}",
            target.method,
            target.host,
            target.port,
            target.path
        );

        let key = self.store.key(&target.host, target.port, &target.path);
        if let Some(cached) = self.cached_entry(&key) {
            log::info!("{peer}: cache hit, {} bytes from {}", cached.len(), key.display());
            if let Err(err) = stream.write_all(&cached).await {
                log::debug!("{peer}: write cached reply: {err}");
            }
            return;
        }

        if let Err(err) = self.fetch_and_reply(&mut stream, &target, &key).await {
            log::error!("{peer}: origin exchange failed: {err:#}");
            let page = error_page(
                500,
                "Internal Server Error",
                "Unexpected failure while communicating with the origin server",
            );
            let _ = stream.write_all(&page).await;
        }
    }

    // Read failures count as a miss so the request falls back to the
    // origin instead of failing.
    fn cached_entry(&self, key: &Path) -> Option<Bytes> {
        if !self.store.exists(key) {
            return None;
        }
        let prefix = match self.store.read_prefix(key, freshness::HEADER_PROBE) {
            Ok(prefix) => prefix,
            Err(err) => {
                log::warn!("cache probe for {} failed: {err}", key.display());
                return None;
            }
        };
        let modified = match self.store.last_modified(key) {
            Ok(modified) => modified,
            Err(err) => {
                log::warn!("cache mtime for {} failed: {err}", key.display());
                return None;
            }
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        match freshness::evaluate(&prefix, age) {
            Verdict::Fresh => {}
            verdict => {
                log::debug!("cache entry {} is {verdict:?}, refetching", key.display());
                return None;
            }
        }
        match self.store.read(key) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!(
                    "cache read for {} failed, falling back to origin: {err}",
                    key.display()
                );
                None
            }
        }
    }

    async fn fetch_and_reply(
        &self,
        stream: &mut TcpStream,
        target: &RequestTarget,
        key: &Path,
    ) -> Result<()> {
        let bytes = match self
            .fetcher
            .fetch(&target.host, target.port, &target.method, &target.path)
            .await
        {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("origin fetch failed: {err}");
                let detail = match &err {
                    FetchError::Connect { .. } => "Error connecting to origin server",
                    FetchError::Send { .. } => "Failed to send request to origin server",
                };
                let page = error_page(502, "Bad Gateway", detail);
                stream.write_all(&page).await.context("write 502 reply")?;
                return Ok(());
            }
        };
        if bytes.is_empty() {
            let page = error_page(502, "Bad Gateway", "No response from origin server");
            stream.write_all(&page).await.context("write 502 reply")?;
            return Ok(());
        }

        // reply to the waiting client before any cache bookkeeping
        stream
            .write_all(&bytes)
            .await
            .context("relay origin response")?;
        self.finish_response(target, key, &bytes);
        Ok(())
    }

    fn finish_response(&self, target: &RequestTarget, key: &Path, bytes: &Bytes) {
        let class = classify::classify(bytes);
        if !class.is_cacheable {
            if class.is_redirect {
                log::debug!("redirect response for {} not cached", key.display());
            }
            return;
        }
        if let Err(err) = self.store.write(key, bytes) {
            log::warn!("cache write for {} failed: {err:#}", key.display());
            return;
        }
        log::debug!("cached {} bytes at {}", bytes.len(), key.display());
        if self.prefetch_enabled && class.is_html() {
            if let Some(offset) = head::body_offset(bytes) {
                self.prefetcher.schedule(&bytes[offset..], &target.base_url());
            }
        }
    }
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if request.len() > MAX_HEAD_BYTES {
            break;
        }
    }
    Ok(request)
}

pub fn error_page(status: u16, reason: &str, detail: &str) -> Vec<u8> {
    let body = format!("<html><body><h1>{status} {reason}</h1><p>{detail}</p></body></html>");
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}
