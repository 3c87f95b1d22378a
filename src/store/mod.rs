mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Tenant operations
    fn create_tenant(&self, tenant: &Tenant) -> Result<()>;
    fn get_tenant(&self, id: &str) -> Result<Option<Tenant>>;
    fn get_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>>;
    fn list_tenants(&self) -> Result<Vec<Tenant>>;
    /// Tenant whose *verified* subdomain or *verified* custom domain equals `domain`.
    fn find_tenant_by_verified_domain(&self, domain: &str) -> Result<Option<Tenant>>;
    /// Every tenant holding `domain` as its subdomain or custom domain,
    /// verified or not.
    fn find_tenants_holding_domain(&self, domain: &str) -> Result<Vec<Tenant>>;
    fn set_custom_domain(&self, tenant_id: &str, domain: Option<&str>, verified: bool)
    -> Result<()>;

    // Subdomain claim operations
    fn set_subdomain_claim(&self, tenant_id: &str, claim: &SubdomainClaim) -> Result<()>;
    /// Flips the claim to verified only if `token` is still the current token.
    fn mark_subdomain_verified(&self, tenant_id: &str, token: &str) -> Result<bool>;

    // Sync credential operations
    fn set_sync_key(&self, tenant_id: &str, key: Option<&StoredSyncKey>, enabled: bool)
    -> Result<()>;

    // User operations
    fn create_user(&self, user: &PlatformUser) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<PlatformUser>>;
    fn get_user_by_email(&self, tenant_id: &str, email: &str) -> Result<Option<PlatformUser>>;
    fn list_tenant_users(&self, tenant_id: &str) -> Result<Vec<PlatformUser>>;
    fn count_tenant_users(&self, tenant_id: &str) -> Result<i64>;
    fn list_user_groups(&self, user_id: &str) -> Result<Vec<String>>;
    /// Atomic create-or-update keyed on `(tenant_id, email)`. Only name, active
    /// flag, and directory groups/attributes are written on update.
    fn upsert_directory_user(
        &self,
        tenant_id: &str,
        record: &DirectoryUserRecord,
    ) -> Result<UpsertOutcome>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;
}
