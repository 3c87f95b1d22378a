//! The directory sync agent: reads enabled accounts from the customer's
//! directory and pushes them to the platform's sync endpoint.

mod client;
mod directory;
mod ldap;
mod runner;

pub use client::SyncClient;
pub use directory::{
    DirectoryEntry, DirectorySource, USER_ATTRIBUTES, USER_FILTER, normalize_entries,
    normalize_entry,
};
pub use ldap::LdapDirectory;
pub use runner::SyncAgent;

use crate::config::AgentConfig;

/// Builds an agent reading from LDAP as described by `config`.
pub fn agent_from_config(config: &AgentConfig) -> anyhow::Result<SyncAgent> {
    let client = SyncClient::new(
        &config.platform.url,
        &config.platform.tenant_id,
        &config.platform.api_key,
        config.request_timeout(),
        config.status_timeout(),
    )?;
    let source = std::sync::Arc::new(LdapDirectory::new(config.directory.clone()));
    Ok(SyncAgent::new(source, client, config.sync_interval()))
}
