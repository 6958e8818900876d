use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use tempfile::NamedTempFile;

/// Filesystem-backed response cache: one file per key holding the verbatim
/// bytes of a previously received response. The file mtime is the time the
/// entry was cached. Entries are only ever overwritten, never evicted.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage path for `(host, port, path)`: a non-default port is folded
    /// into the host directory, a trailing-slash path maps to a literal
    /// `default` leaf.
    pub fn key(&self, host: &str, port: u16, path: &str) -> PathBuf {
        let mut rel = String::with_capacity(host.len() + path.len() + 8);
        rel.push_str(host);
        if port != 80 {
            rel.push('_');
            rel.push_str(&port.to_string());
        }
        rel.push_str(path);
        if rel.ends_with('/') {
            rel.push_str("default");
        }
        self.root.join(rel.trim_start_matches('/'))
    }

    pub fn exists(&self, key: &Path) -> bool {
        key.is_file()
    }

    pub fn read(&self, key: &Path) -> io::Result<Bytes> {
        Ok(Bytes::from(fs::read(key)?))
    }

    pub fn read_prefix(&self, key: &Path, limit: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(limit);
        fs::File::open(key)?
            .take(limit as u64)
            .read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn last_modified(&self, key: &Path) -> io::Result<SystemTime> {
        fs::metadata(key)?.modified()
    }

    /// Writes through a temp file renamed into place: concurrent readers
    /// see either the old or the new entry, and the last rename wins.
    pub fn write(&self, key: &Path, bytes: &[u8]) -> Result<()> {
        let dir = key
            .parent()
            .ok_or_else(|| anyhow!("cache path {} has no parent", key.display()))?;
        fs::create_dir_all(dir).with_context(|| format!("create cache dir {}", dir.display()))?;
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(bytes).context("write cache temp file")?;
        tmp.persist(key)
            .with_context(|| format!("publish cache entry {}", key.display()))?;
        Ok(())
    }
}
