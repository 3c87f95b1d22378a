use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::server::DEFAULT_SYNC_BODY_LIMIT;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Per-attempt timeout for subdomain TXT lookups.
    pub dns_timeout: Duration,
    /// Largest accepted directory sync push, in bytes.
    pub sync_body_limit: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("onpoints.db")
    }

    #[must_use]
    pub fn admin_token_path(&self) -> PathBuf {
        self.data_dir.join(".admin_token")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_dir: PathBuf::from("./data"),
            dns_timeout: Duration::from_secs(5),
            sync_body_limit: DEFAULT_SYNC_BODY_LIMIT,
        }
    }
}
