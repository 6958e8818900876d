use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("malformed request target: {0:?}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },
    #[error("send request to {host}:{port}: {source}")]
    Send {
        host: String,
        port: u16,
        source: std::io::Error,
    },
}
