//! Tenant domain resolution and subdomain ownership verification.

mod claim;
mod dns;
mod resolver;
mod validation;

pub use claim::{SubdomainClaimManager, VerificationResult};
pub use dns::{
    CHALLENGE_LABEL, DnsLookupError, DnsVerifier, HickoryTxtResolver, TxtResolver,
    challenge_record_name,
};
pub use resolver::{DomainResolver, RequestSignals};
pub use validation::{normalize_subdomain, root_domain};
