use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry};

use super::directory::{DirectoryEntry, DirectorySource, USER_ATTRIBUTES, USER_FILTER};
use crate::config::DirectoryConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Active Directory (or any LDAP server with the AD schema) as a
/// [`DirectorySource`]. Opens one connection per fetch.
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DirectorySource for LdapDirectory {
    async fn fetch_entries(&self) -> anyhow::Result<Vec<DirectoryEntry>> {
        let settings = LdapConnSettings::new().set_conn_timeout(CONNECT_TIMEOUT);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url)
            .await
            .with_context(|| format!("failed to connect to {}", self.config.url))?;
        ldap3::drive!(conn);

        ldap.simple_bind(&self.config.bind_dn, &self.config.bind_password)
            .await?
            .success()
            .context("directory bind failed")?;

        let base = self.config.search_base();
        tracing::info!("Searching {base} for enabled user accounts");

        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(self.config.page_size)),
        ];
        let mut search = ldap
            .streaming_search_with(
                adapters,
                base,
                Scope::Subtree,
                USER_FILTER,
                USER_ATTRIBUTES.to_vec(),
            )
            .await
            .context("directory search failed")?;

        let mut entries = Vec::new();
        while let Some(raw) = search.next().await? {
            let entry = SearchEntry::construct(raw);
            entries.push(DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            });
        }
        search.finish().await.success()?;

        if let Err(e) = ldap.unbind().await {
            tracing::warn!("Directory unbind failed: {e}");
        }

        tracing::info!("Found {} directory entries", entries.len());
        Ok(entries)
    }
}
