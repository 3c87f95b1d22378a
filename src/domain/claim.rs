use std::sync::Arc;

use rand::RngCore;
use serde::Serialize;

use super::dns::{DnsVerifier, TxtResolver, challenge_record_name};
use super::validation::normalize_subdomain;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{SubdomainClaim, Tenant};

const TOKEN_PREFIX: &str = "onpoints-verify=";
const TOKEN_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub subdomain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_name: Option<String>,
}

fn generate_verification_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{TOKEN_PREFIX}{}", hex::encode(bytes))
}

/// Drives a tenant's subdomain through `UNSET -> PENDING -> VERIFIED` and back.
#[derive(Clone)]
pub struct SubdomainClaimManager {
    store: Arc<dyn Store>,
    verifier: DnsVerifier,
}

impl SubdomainClaimManager {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, resolver: Arc<dyn TxtResolver>) -> Self {
        Self {
            store,
            verifier: DnsVerifier::new(resolver),
        }
    }

    fn tenant(&self, tenant_id: &str) -> Result<Tenant> {
        self.store.get_tenant(tenant_id)?.ok_or(Error::NotFound)
    }

    pub fn get(&self, tenant_id: &str) -> Result<SubdomainClaim> {
        Ok(self.tenant(tenant_id)?.subdomain_claim())
    }

    /// Issues a fresh token for `subdomain`, replacing any previous claim of
    /// this tenant. Fails with `Conflict` when another tenant holds the name
    /// as a subdomain or custom domain, verified or not.
    pub fn claim(&self, tenant_id: &str, subdomain: &str) -> Result<SubdomainClaim> {
        let subdomain = normalize_subdomain(subdomain)?;
        self.tenant(tenant_id)?;

        let holders = self.store.find_tenants_holding_domain(&subdomain)?;
        if holders.iter().any(|holder| holder.id != tenant_id) {
            return Err(Error::Conflict(
                "this subdomain is already in use by another organization".into(),
            ));
        }

        let claim = SubdomainClaim {
            subdomain: Some(subdomain),
            verified: false,
            verification_token: Some(generate_verification_token()),
        };
        self.store.set_subdomain_claim(tenant_id, &claim)?;

        tracing::info!(
            "Claimed subdomain {} for tenant {tenant_id} (unverified)",
            claim.subdomain.as_deref().unwrap_or_default()
        );

        Ok(claim)
    }

    /// Looks for the claim's token in DNS. A miss is a normal, retryable
    /// outcome and leaves the stored claim untouched.
    pub async fn verify(&self, tenant_id: &str) -> Result<VerificationResult> {
        let claim = self.get(tenant_id)?;
        let (Some(subdomain), Some(token)) = (claim.subdomain, claim.verification_token) else {
            return Err(Error::NoPendingClaim);
        };

        let record_name = challenge_record_name(&subdomain);
        let mut verified = self.verifier.verify(&subdomain, &token).await;

        if verified {
            // Compare-and-set on the token: a re-claim that raced this check
            // must not be marked verified with the old token.
            verified = self.store.mark_subdomain_verified(tenant_id, &token)?;
            if verified {
                tracing::info!("Verified subdomain {subdomain} for tenant {tenant_id}");
            } else {
                tracing::warn!(
                    "Claim for tenant {tenant_id} changed during verification of {subdomain}"
                );
            }
        }

        Ok(VerificationResult {
            verified,
            subdomain,
            record_name,
        })
    }

    pub fn release(&self, tenant_id: &str) -> Result<()> {
        self.tenant(tenant_id)?;
        self.store
            .set_subdomain_claim(tenant_id, &SubdomainClaim::default())?;
        tracing::info!("Released subdomain for tenant {tenant_id}");
        Ok(())
    }
}
