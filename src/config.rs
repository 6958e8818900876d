use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub logger: Logger,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default)]
    pub cache: Cache,
    #[serde(default)]
    pub prefetch: Prefetch,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.server.addr.trim().is_empty() {
            return Err(anyhow!("server.addr is required"));
        }
        if self.prefetch.workers == 0 {
            return Err(anyhow!("prefetch.workers must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Logger {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub max_size: u64,
    #[serde(default)]
    pub max_backups: u64,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Origin {
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Cache {
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Prefetch {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for Prefetch {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            workers: default_workers(),
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_cache_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_enabled() -> bool {
    true
}

fn default_workers() -> usize {
    4
}

pub fn load(path: &Path) -> Result<(Config, Vec<String>)> {
    let raw = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let mut ignored = Vec::new();
    let de = serde_yaml::Deserializer::from_str(&raw);
    let cfg: Config = serde_ignored::deserialize(de, |path| {
        ignored.push(path.to_string());
    })
    .with_context(|| format!("parse config {}", path.display()))?;

    Ok((cfg, ignored))
}
