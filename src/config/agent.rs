//! Configuration file for the directory sync agent.
//!
//! ```toml
//! sync_interval_secs = 3600
//!
//! [directory]
//! url = "ldaps://dc01.corp.example.com:636"
//! bind_dn = "CN=svc-onpoints,OU=Service Accounts,DC=corp,DC=example,DC=com"
//! bind_password = "..."
//! base_dn = "DC=corp,DC=example,DC=com"
//!
//! [platform]
//! url = "https://helpdesk.example.com"
//! tenant_id = "..."
//! api_key = "ad-sync-..."
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

fn default_directory_url() -> String {
    "ldap://localhost:389".to_string()
}

fn default_page_size() -> i32 {
    1000
}

fn default_platform_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_sync_interval() -> u64 {
    3600
}

fn default_request_timeout() -> u64 {
    30
}

fn default_status_timeout() -> u64 {
    10
}

#[derive(Clone, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_url")]
    pub url: String,
    #[serde(default)]
    pub bind_dn: String,
    #[serde(default)]
    pub bind_password: String,
    #[serde(default)]
    pub base_dn: String,
    /// Narrows the search below `base_dn`. Defaults to `base_dn` itself.
    #[serde(default)]
    pub user_search_base: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: i32,
}

impl DirectoryConfig {
    #[must_use]
    pub fn search_base(&self) -> &str {
        self.user_search_base
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(&self.base_dn)
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"[REDACTED]")
            .field("base_dn", &self.base_dn)
            .field("user_search_base", &self.user_search_base)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_platform_url")]
    pub url: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub api_key: String,
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("url", &self.url)
            .field("tenant_id", &self.tenant_id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub directory: DirectoryConfig,
    pub platform: PlatformConfig,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: u64,
}

impl AgentConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AgentConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Fails on the first missing required field, naming it.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("directory.bind_dn", &self.directory.bind_dn),
            ("directory.bind_password", &self.directory.bind_password),
            ("directory.base_dn", &self.directory.base_dn),
            ("platform.url", &self.platform.url),
            ("platform.tenant_id", &self.platform.tenant_id),
            ("platform.api_key", &self.platform.api_key),
        ];

        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(Error::Config(format!("{field} is required")));
        }

        if self.directory.page_size <= 0 {
            return Err(Error::Config("directory.page_size must be positive".into()));
        }
        if self.sync_interval_secs == 0 {
            return Err(Error::Config("sync_interval_secs must be positive".into()));
        }

        Ok(())
    }

    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}
