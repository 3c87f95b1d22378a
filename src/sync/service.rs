use std::sync::Arc;

use serde_json::Value;

use super::protocol::{
    RecordError, SyncResponse, SyncResults, SyncStatusResponse, SyncTenantInfo, validate_record,
};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Tenant, UpsertOutcome};

/// Server side of the sync protocol.
#[derive(Clone)]
pub struct DirectorySyncService {
    store: Arc<dyn Store>,
}

impl DirectorySyncService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Accepts the request only if `tenant_id` exists, has sync enabled, and
    /// its current key matches. Every mismatch is the same `Unauthorized`.
    pub fn authenticate(&self, tenant_id: &str, presented: Option<&str>) -> Result<Tenant> {
        let presented = presented
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(Error::Unauthorized)?;

        let tenant = self
            .store
            .get_tenant(tenant_id)?
            .ok_or(Error::Unauthorized)?;

        let key_matches = tenant
            .sync_key
            .as_ref()
            .is_some_and(|key| key.matches(presented));

        if !tenant.sync_enabled || !key_matches {
            return Err(Error::Unauthorized);
        }

        Ok(tenant)
    }

    /// Upserts each record independently. A record that fails validation or
    /// persistence lands in the error list; the rest of the batch continues.
    pub fn push(&self, tenant: &Tenant, users: &[Value]) -> SyncResponse {
        let mut results = SyncResults::default();

        for value in users {
            let record = match validate_record(value) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(
                        "Rejected sync record '{}' for tenant {}: {}",
                        e.email,
                        tenant.id,
                        e.error
                    );
                    results.errors.push(e);
                    continue;
                }
            };

            match self.store.upsert_directory_user(&tenant.id, &record) {
                Ok(UpsertOutcome::Created) => results.created += 1,
                Ok(UpsertOutcome::Updated) => results.updated += 1,
                Err(e) => {
                    tracing::error!(
                        "Failed to sync user {} for tenant {}: {e}",
                        record.email,
                        tenant.id
                    );
                    results.errors.push(RecordError {
                        email: record.email,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Synced users for tenant {}: {} created, {} updated, {} errors",
            tenant.id,
            results.created,
            results.updated,
            results.errors.len()
        );

        let message = format!(
            "Synced {} users: {} created, {} updated",
            users.len(),
            results.created,
            results.updated
        );

        SyncResponse {
            success: true,
            results,
            message,
        }
    }

    /// Connectivity check for agents: who the key belongs to and how many
    /// users the tenant currently has.
    pub fn status(&self, tenant: &Tenant) -> Result<SyncStatusResponse> {
        let user_count = self.store.count_tenant_users(&tenant.id)?;
        Ok(SyncStatusResponse {
            success: true,
            tenant: SyncTenantInfo {
                id: tenant.id.clone(),
                name: tenant.name.clone(),
                sync_enabled: tenant.sync_enabled,
            },
            user_count,
            message: "API key is valid".into(),
        })
    }
}
