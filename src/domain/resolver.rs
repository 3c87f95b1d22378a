use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::HOST;

use crate::error::Result;
use crate::store::Store;
use crate::types::Tenant;

/// Set by the reverse proxy for platform-reserved subdomains.
pub const TENANT_SLUG_HEADER: &str = "x-tenant";
/// Set by the reverse proxy when the request arrived on a custom domain.
pub const CUSTOM_DOMAIN_HEADER: &str = "x-custom-domain";
const FORWARDED_HOST_HEADER: &str = "x-forwarded-host";

/// The routing signals of one request, in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSignals {
    pub tenant_slug_hint: Option<String>,
    pub custom_domain_hint: Option<String>,
    pub host_header: Option<String>,
}

impl RequestSignals {
    /// Reads the proxy-injected headers, falling back to `X-Forwarded-Host`
    /// when `Host` is missing. Empty values count as absent.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            tenant_slug_hint: get(TENANT_SLUG_HEADER),
            custom_domain_hint: get(CUSTOM_DOMAIN_HEADER),
            host_header: get(HOST.as_str()).or_else(|| get(FORWARDED_HOST_HEADER)),
        }
    }
}

/// Strips an optional `:port` and lowercases. Bracketed IPv6 hosts keep
/// their brackets.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if host.starts_with('[') {
        host.split_once(']')
            .map_or(host, |(addr, _)| &host[..addr.len() + 1])
    } else {
        host.rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .map_or(host, |(name, _)| name)
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}

fn is_development_host(host: &str) -> bool {
    host == "localhost"
        || host.ends_with(".localhost")
        || host.starts_with("127.")
        || host == "[::1]"
        || host == "0.0.0.0"
}

/// Maps request signals to the tenant that owns the request.
#[derive(Clone)]
pub struct DomainResolver {
    store: Arc<dyn Store>,
}

impl DomainResolver {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Returns the owning tenant's slug, or `None` when nothing matches.
    /// Only verified subdomains and custom domains are ever matched.
    pub fn resolve(&self, signals: &RequestSignals) -> Result<Option<String>> {
        if let Some(slug) = &signals.tenant_slug_hint {
            return Ok(Some(slug.clone()));
        }

        if let Some(domain) = &signals.custom_domain_hint {
            let tenant = self
                .store
                .find_tenant_by_verified_domain(&normalize_host(domain))?;
            return Ok(tenant.map(|t| t.slug));
        }

        if let Some(host) = &signals.host_header {
            let host = normalize_host(host);
            if !is_development_host(&host) {
                let tenant = self.store.find_tenant_by_verified_domain(&host)?;
                return Ok(tenant.map(|t| t.slug));
            }
        }

        Ok(None)
    }

    /// Resolves all the way to the tenant record. A slug hint naming no
    /// tenant resolves to `None`.
    pub fn resolve_tenant(&self, signals: &RequestSignals) -> Result<Option<Tenant>> {
        match self.resolve(signals)? {
            Some(slug) => self.store.get_tenant_by_slug(&slug),
            None => Ok(None),
        }
    }
}
