use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StoredSyncKey;

/// Privilege level of a platform user. Synced accounts always start as `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    TenantAdmin,
    #[default]
    User,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::TenantAdmin => "tenant_admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "tenant_admin" | "tenant-admin" => Ok(Role::TenantAdmin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    pub custom_domain_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    pub subdomain_verified: bool,
    #[serde(skip)]
    pub subdomain_verification_token: Option<String>,
    pub sync_enabled: bool,
    #[serde(skip)]
    pub sync_key: Option<StoredSyncKey>,
    #[serde(skip)]
    pub sync_key_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// A new tenant with no domains and sync disabled.
    #[must_use]
    pub fn new(id: String, name: String, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            slug,
            custom_domain: None,
            custom_domain_verified: false,
            subdomain: None,
            subdomain_verified: false,
            subdomain_verification_token: None,
            sync_enabled: false,
            sync_key: None,
            sync_key_created_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn subdomain_claim(&self) -> SubdomainClaim {
        SubdomainClaim {
            subdomain: self.subdomain.clone(),
            verified: self.subdomain_verified,
            verification_token: self.subdomain_verification_token.clone(),
        }
    }
}

/// The `{subdomain, verified, token}` triple stored on a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubdomainClaim {
    pub subdomain: Option<String>,
    pub verified: bool,
    pub verification_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    Unset,
    Pending,
    Verified,
}

impl SubdomainClaim {
    #[must_use]
    pub fn state(&self) -> ClaimState {
        match (&self.subdomain, self.verified) {
            (None, _) => ClaimState::Unset,
            (Some(_), false) => ClaimState::Pending,
            (Some(_), true) => ClaimState::Verified,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformUser {
    pub id: String,
    pub tenant_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub directory_attributes: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// What an operator may learn about a tenant's sync credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncCredentialStatus {
    pub sync_enabled: bool,
    pub has_api_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_created_at: Option<DateTime<Utc>>,
}

/// A directory user as carried on the wire by the sync protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryUserRecord {
    pub email: String,
    pub name: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}
