use serde::{Deserialize, Serialize};
use std::path::Path;

/// One egress endpoint from the proxy list file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProxyEndpoint {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// A `reqwest::Proxy` for this endpoint, with basic auth when the list
    /// file carried credentials.
    pub fn to_reqwest_proxy(&self) -> Result<reqwest::Proxy, String> {
        let mut proxy = reqwest::Proxy::all(self.url())
            .map_err(|e| format!("Invalid proxy URL {}: {}", self.url(), e))?;
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            proxy = proxy.basic_auth(user, pass);
        }
        Ok(proxy)
    }
}

/// Immutable list of egress endpoints with a deterministic identity→endpoint
/// map. The file is read once at startup (or on explicit [`ProxyPool::reload`]);
/// edits to the underlying file never change in-flight assignments.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
}

impl ProxyPool {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_endpoints(endpoints: Vec<ProxyEndpoint>) -> Self {
        Self { endpoints }
    }

    /// Parse a proxy list file: one `host:port` or `host:port:username:password`
    /// per line. Blank lines and `#` comments are skipped; a malformed line is
    /// an error rather than a silently shrunken pool.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed_to_read_proxy_list {}: {}", path.display(), e))?;

        let mut endpoints = Vec::new();
        for (line_no, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            endpoints.push(parse_proxy_line(line).map_err(|e| {
                format!("invalid proxy list entry at line {}: {}", line_no + 1, e)
            })?);
        }

        Ok(Self { endpoints })
    }

    /// Explicit re-read of the list file. Never called mid-cycle.
    pub fn reload(&mut self, path: &Path) -> Result<(), String> {
        *self = Self::load(path)?;
        Ok(())
    }

    /// Deterministic assignment: identity `index` maps to endpoint
    /// `index % len`. `None` on an empty pool; callers then use a direct path.
    pub fn assign(&self, identity_index: u64) -> Option<&ProxyEndpoint> {
        if self.endpoints.is_empty() {
            return None;
        }
        let slot = (identity_index % self.endpoints.len() as u64) as usize;
        Some(&self.endpoints[slot])
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn parse_proxy_line(line: &str) -> Result<ProxyEndpoint, String> {
    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() != 2 && parts.len() != 4 {
        return Err(format!(
            "expected host:port or host:port:username:password, got \"{}\"",
            line
        ));
    }

    let host = parts[0].trim();
    if host.is_empty() {
        return Err("empty host".to_string());
    }
    let port: u16 = parts[1]
        .trim()
        .parse()
        .map_err(|_| format!("invalid port \"{}\"", parts[1]))?;

    let (username, password) = if parts.len() == 4 {
        (Some(parts[2].to_string()), Some(parts[3].to_string()))
    } else {
        (None, None)
    };

    Ok(ProxyEndpoint {
        host: host.to_string(),
        port,
        username,
        password,
    })
}
