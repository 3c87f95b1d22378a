use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use thiserror::Error;

use super::validation::root_domain;

/// Label prepended to the root domain to form the challenge record name.
pub const CHALLENGE_LABEL: &str = "_onpoints-verify";

#[derive(Debug, Error)]
pub enum DnsLookupError {
    #[error("DNS lookup for {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("DNS lookup for {name} failed: {message}")]
    Resolve { name: String, message: String },
}

/// Fetches TXT records. Each returned string is one record with its
/// character-strings concatenated.
#[async_trait]
pub trait TxtResolver: Send + Sync {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsLookupError>;
}

/// [`TxtResolver`] backed by the system's DNS configuration.
pub struct HickoryTxtResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl HickoryTxtResolver {
    /// Reads `/etc/resolv.conf` (or the platform equivalent), falling back to
    /// the resolver's public defaults when it cannot be read.
    #[must_use]
    pub fn from_system_conf(timeout: Duration) -> Self {
        let (config, mut opts) = hickory_resolver::system_conf::read_system_conf()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to read system DNS configuration, using defaults: {e}");
                (ResolverConfig::default(), ResolverOpts::default())
            });
        opts.timeout = timeout;
        opts.attempts = 2;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        }
    }
}

#[async_trait]
impl TxtResolver for HickoryTxtResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsLookupError> {
        let fqdn = format!("{}.", name.trim_end_matches('.'));

        // Bound the whole lookup, retries included.
        let lookup = tokio::time::timeout(self.timeout * 3, self.resolver.txt_lookup(fqdn))
            .await
            .map_err(|_| DnsLookupError::Timeout {
                name: name.to_string(),
                timeout: self.timeout * 3,
            })?
            .map_err(|e| DnsLookupError::Resolve {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk))
                    .collect::<String>()
            })
            .collect())
    }
}

/// `_onpoints-verify.<root domain>` for a claimed subdomain.
#[must_use]
pub fn challenge_record_name(subdomain: &str) -> Option<String> {
    root_domain(subdomain).map(|root| format!("{CHALLENGE_LABEL}.{root}"))
}

/// Checks that a subdomain's root domain publishes the expected token.
#[derive(Clone)]
pub struct DnsVerifier {
    resolver: Arc<dyn TxtResolver>,
}

impl DnsVerifier {
    #[must_use]
    pub fn new(resolver: Arc<dyn TxtResolver>) -> Self {
        Self { resolver }
    }

    /// True when any TXT record at the challenge name equals or contains
    /// `token`. Lookup failures count as "not verified" and are only logged.
    pub async fn verify(&self, subdomain: &str, token: &str) -> bool {
        let Some(record_name) = challenge_record_name(subdomain) else {
            tracing::warn!("Cannot derive root domain for subdomain '{subdomain}'");
            return false;
        };

        tracing::info!("Checking TXT records at {record_name} for {subdomain}");

        let records = match self.resolver.lookup_txt(&record_name).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("DNS verification for {subdomain} failed: {e}");
                return false;
            }
        };

        let found = records
            .iter()
            .any(|value| value == token || value.contains(token));

        if found {
            tracing::info!("DNS verification succeeded for {subdomain}");
        } else {
            tracing::warn!(
                "DNS verification for {subdomain} failed: {} TXT record(s) at {record_name}, none match",
                records.len()
            );
        }

        found
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory TXT records keyed by record name.
    #[derive(Default)]
    pub struct StaticTxtResolver {
        pub records: Mutex<HashMap<String, Vec<String>>>,
    }

    impl StaticTxtResolver {
        pub fn publish(&self, name: &str, value: &str) {
            self.records
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
    }

    #[async_trait]
    impl TxtResolver for StaticTxtResolver {
        async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsLookupError> {
            self.records
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| DnsLookupError::Resolve {
                    name: name.to_string(),
                    message: "no record found".into(),
                })
        }
    }

    struct SlowResolver;

    #[async_trait]
    impl TxtResolver for SlowResolver {
        async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsLookupError> {
            Err(DnsLookupError::Timeout {
                name: name.to_string(),
                timeout: Duration::from_secs(5),
            })
        }
    }

    #[test]
    fn test_challenge_record_name() {
        assert_eq!(
            challenge_record_name("help.example.com").as_deref(),
            Some("_onpoints-verify.example.com")
        );
        assert_eq!(challenge_record_name("com"), None);
    }

    #[tokio::test]
    async fn test_verify_matches_exact_and_contained_token() {
        let resolver = Arc::new(StaticTxtResolver::default());
        resolver.publish("_onpoints-verify.example.com", "unrelated");
        let verifier = DnsVerifier::new(resolver.clone());

        assert!(!verifier.verify("help.example.com", "onpoints-verify=abc").await);

        resolver.publish("_onpoints-verify.example.com", "onpoints-verify=abc");
        assert!(verifier.verify("help.example.com", "onpoints-verify=abc").await);

        let other = Arc::new(StaticTxtResolver::default());
        other.publish("_onpoints-verify.example.com", "v=1 onpoints-verify=abc");
        assert!(
            DnsVerifier::new(other)
                .verify("help.example.com", "onpoints-verify=abc")
                .await
        );
    }

    #[tokio::test]
    async fn test_missing_record_is_not_verified() {
        let verifier = DnsVerifier::new(Arc::new(StaticTxtResolver::default()));
        assert!(!verifier.verify("help.example.com", "onpoints-verify=abc").await);
    }

    #[tokio::test]
    async fn test_timeout_is_not_verified() {
        let verifier = DnsVerifier::new(Arc::new(SlowResolver));
        assert!(!verifier.verify("help.example.com", "onpoints-verify=abc").await);
    }
}
