use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::FetchError;

const READ_CHUNK: usize = 64 * 1024;

/// One-shot origin client: connect, send a minimal request, drain the
/// response. No connection reuse, no TLS.
#[derive(Debug, Clone, Copy)]
pub struct OriginFetcher {
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl OriginFetcher {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            read_timeout,
        }
    }

    pub async fn fetch(
        &self,
        host: &str,
        port: u16,
        method: &str,
        path: &str,
    ) -> Result<Bytes, FetchError> {
        let mut stream = self.connect(host, port).await?;
        let request = format!("{method} {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|source| FetchError::Send {
                host: host.to_string(),
                port,
                source,
            })?;
        Ok(self.read_response(&mut stream, host, port).await)
    }

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream, FetchError> {
        match timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(FetchError::Connect {
                host: host.to_string(),
                port,
                source,
            }),
            Err(_) => Err(FetchError::Connect {
                host: host.to_string(),
                port,
                source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
            }),
        }
    }

    // A read-idle timeout means the origin is done sending, not that the
    // fetch failed; whatever arrived so far is the response.
    async fn read_response(&self, stream: &mut TcpStream, host: &str, port: u16) -> Bytes {
        let mut response = BytesMut::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            match timeout(self.read_timeout, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => response.extend_from_slice(&chunk[..n]),
                Ok(Err(err)) => {
                    log::debug!("read from {host}:{port} ended early: {err}");
                    break;
                }
                Err(_) => {
                    log::debug!("read from {host}:{port} idle, treating response as complete");
                    break;
                }
            }
        }
        response.freeze()
    }
}
