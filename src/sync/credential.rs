use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{IssuedSyncKey, SyncCredentialStatus};

/// Issues, rotates, and revokes the per-tenant sync key.
#[derive(Clone)]
pub struct SyncCredentialManager {
    store: Arc<dyn Store>,
}

impl SyncCredentialManager {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Replaces any previous key and enables sync. The returned key is the
    /// only place its plaintext will ever be available.
    pub fn generate(&self, tenant_id: &str) -> Result<IssuedSyncKey> {
        let issued = IssuedSyncKey::generate();
        self.store
            .set_sync_key(tenant_id, Some(issued.stored()), true)?;
        tracing::info!("Generated new sync key for tenant {tenant_id}");
        Ok(issued)
    }

    pub fn revoke(&self, tenant_id: &str) -> Result<()> {
        self.store.set_sync_key(tenant_id, None, false)?;
        tracing::info!("Revoked sync key for tenant {tenant_id}");
        Ok(())
    }

    pub fn status(&self, tenant_id: &str) -> Result<SyncCredentialStatus> {
        let tenant = self.store.get_tenant(tenant_id)?.ok_or(Error::NotFound)?;
        Ok(SyncCredentialStatus {
            sync_enabled: tenant.sync_enabled,
            has_api_key: tenant.sync_key.is_some(),
            key_created_at: tenant.sync_key_created_at,
        })
    }
}
