use serde::{Deserialize, Serialize};

use crate::domain::challenge_record_name;
use crate::types::{SubdomainClaim, Tenant};

#[derive(Debug, Serialize)]
pub struct TenantLookupResponse {
    pub id: String,
    pub slug: String,
    pub name: String,
}

impl From<Tenant> for TenantLookupResponse {
    fn from(t: Tenant) -> Self {
        Self {
            id: t.id,
            slug: t.slug,
            name: t.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncKeyIssuedResponse {
    pub api_key: String,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ClaimSubdomainRequest {
    pub subdomain: String,
}

/// Current subdomain state as shown to operators. The token is only
/// included while it is still needed for verification.
#[derive(Debug, Serialize)]
pub struct SubdomainResponse {
    pub subdomain: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_name: Option<String>,
}

impl From<SubdomainClaim> for SubdomainResponse {
    fn from(claim: SubdomainClaim) -> Self {
        let record_name = claim.subdomain.as_deref().and_then(challenge_record_name);
        Self {
            verification_token: claim.verification_token.filter(|_| !claim.verified),
            record_name,
            verified: claim.verified,
            subdomain: claim.subdomain,
        }
    }
}
