use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::SystemTime;

use regex::Regex;
use tokio::sync::Semaphore;
use url::Url;

use crate::classify;
use crate::fetch::OriginFetcher;
use crate::freshness::{self, Verdict};
use crate::store::DiskStore;

/// Warms the cache with resources referenced by an HTML page. Fetches run
/// in background tasks capped by a semaphore; the in-flight set keyed by
/// cache path fetches a given resource at most once at a time.
pub struct Prefetcher {
    store: Arc<DiskStore>,
    fetcher: OriginFetcher,
    permits: Arc<Semaphore>,
    inflight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl Prefetcher {
    pub fn new(store: Arc<DiskStore>, fetcher: OriginFetcher, workers: usize) -> Self {
        Self {
            store,
            fetcher,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            inflight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Fire-and-forget: spawns a fetch for each linked resource not
    /// already cached. Never blocks the reply that triggered it.
    pub fn schedule(&self, html: &[u8], base: &str) {
        let text = String::from_utf8_lossy(html);
        let links = extract_links(&text);
        if links.is_empty() {
            return;
        }
        let base = base.strip_suffix('/').unwrap_or(base);
        let base = match Url::parse(base) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("prefetch base url {base:?} rejected: {err}");
                return;
            }
        };
        log::info!("prefetch: {} candidate links under {base}", links.len());
        for link in links {
            if let Some(url) = resolve_link(&base, &link) {
                self.spawn_fetch(url);
            }
        }
    }

    fn spawn_fetch(&self, url: Url) {
        let Some(host) = url.host_str().map(|h| h.to_string()) else {
            return;
        };
        let port = url.port().unwrap_or(80);
        let resource = resource_path(&url);
        let key = self.store.key(&host, port, &resource);

        if self.fresh_in_cache(&key) {
            log::debug!("prefetch skip, already cached: {url}");
            return;
        }
        {
            let mut inflight = self.inflight.lock().expect("inflight");
            if !inflight.insert(key.clone()) {
                // another task is already fetching this key
                return;
            }
        }

        let store = Arc::clone(&self.store);
        let fetcher = self.fetcher;
        let permits = Arc::clone(&self.permits);
        let inflight = Arc::clone(&self.inflight);
        tokio::spawn(async move {
            if let Ok(_permit) = permits.acquire().await {
                fetch_one(&store, &fetcher, &url, &host, port, &resource, &key).await;
            }
            inflight.lock().expect("inflight").remove(&key);
        });
    }

    fn fresh_in_cache(&self, key: &Path) -> bool {
        if !self.store.exists(key) {
            return false;
        }
        let Ok(prefix) = self.store.read_prefix(key, freshness::HEADER_PROBE) else {
            return false;
        };
        let Ok(modified) = self.store.last_modified(key) else {
            return false;
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        freshness::evaluate(&prefix, age) == Verdict::Fresh
    }
}

async fn fetch_one(
    store: &DiskStore,
    fetcher: &OriginFetcher,
    url: &Url,
    host: &str,
    port: u16,
    resource: &str,
    key: &Path,
) {
    let bytes = match fetcher.fetch(host, port, "GET", resource).await {
        Ok(bytes) => bytes,
        Err(err) => {
            log::debug!("prefetch {url} failed: {err}");
            return;
        }
    };
    if bytes.is_empty() {
        log::debug!("prefetch {url}: empty response");
        return;
    }
    if !classify::classify(&bytes).is_cacheable {
        log::debug!("prefetch {url}: response not cacheable");
        return;
    }
    match store.write(key, &bytes) {
        Ok(()) => log::info!("prefetched {url} ({} bytes)", bytes.len()),
        Err(err) => log::warn!("prefetch cache write for {url} failed: {err:#}"),
    }
}

// attribute scan, not an HTML parser
pub fn extract_links(html: &str) -> Vec<String> {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    let attr = ATTR.get_or_init(|| Regex::new(r#"(?:href|src)=['"]?([^'" >]+)"#).expect("link regex"));
    attr.captures_iter(html).map(|cap| cap[1].to_string()).collect()
}

pub fn resolve_link(base: &Url, link: &str) -> Option<Url> {
    if link.starts_with("javascript:") || link.starts_with("mailto:") || link.starts_with('#') {
        return None;
    }
    let url = base.join(link).ok()?;
    if url.scheme() != "http" {
        return None;
    }
    url.host_str()?;
    Some(url)
}

// path-plus-query form, used both on the wire and as the cache path
pub fn resource_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
