use crate::error::TargetError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub method: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub version: String,
}

impl RequestTarget {
    pub fn from_request_line(line: &str) -> Result<Self, TargetError> {
        let mut parts = line.split_whitespace();
        let (Some(method), Some(target), Some(version)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(TargetError::Malformed(line.to_string()));
        };
        let (host, port, path) = resolve_target(target)?;
        Ok(Self {
            method: method.to_string(),
            host,
            port,
            path,
            version: version.to_string(),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }
}

/// Decomposes a request target into `(host, port, path)`. The scheme is
/// stripped but never interpreted; a target with no path yields `/`.
pub fn resolve_target(raw: &str) -> Result<(String, u16, String), TargetError> {
    let rest = raw.strip_prefix('/').unwrap_or(raw);
    let rest = rest
        .strip_prefix("http://")
        .or_else(|| rest.strip_prefix("https://"))
        .unwrap_or(rest);

    // textual removal only; the derived cache path must not climb out of
    // the cache root
    let cleaned = rest.replace("/..", "");

    let (authority, path) = match cleaned.find('/') {
        Some(idx) => (&cleaned[..idx], cleaned[idx..].to_string()),
        None => (cleaned.as_str(), String::from("/")),
    };
    let (host, port) = split_port(authority)?;
    if host.is_empty() {
        return Err(TargetError::Malformed(raw.to_string()));
    }
    Ok((host, port, path))
}

fn split_port(authority: &str) -> Result<(String, u16), TargetError> {
    match authority.split_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| TargetError::Malformed(authority.to_string()))?;
            Ok((host.to_string(), port))
        }
        _ => Ok((authority.to_string(), 80)),
    }
}
