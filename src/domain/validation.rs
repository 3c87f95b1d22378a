use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

const MIN_SUBDOMAIN_LEN: usize = 3;
const MAX_SUBDOMAIN_LEN: usize = 253;

// DNS labels of 1-63 alphanumerics/hyphens (no leading or trailing hyphen),
// ending in an alphabetic TLD of at least two characters.
static SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)*\.[a-z]{2,}$",
    )
    .unwrap()
});

/// Validates a subdomain and returns its canonical (trimmed, lowercase) form.
pub fn normalize_subdomain(input: &str) -> Result<String> {
    let subdomain = input.trim().to_ascii_lowercase();

    if subdomain.len() < MIN_SUBDOMAIN_LEN {
        return Err(Error::InvalidSubdomain(format!(
            "subdomain must be at least {MIN_SUBDOMAIN_LEN} characters"
        )));
    }
    if subdomain.len() > MAX_SUBDOMAIN_LEN {
        return Err(Error::InvalidSubdomain(format!(
            "subdomain cannot exceed {MAX_SUBDOMAIN_LEN} characters"
        )));
    }
    if !SUBDOMAIN_REGEX.is_match(&subdomain) {
        return Err(Error::InvalidSubdomain(
            "invalid subdomain format, expected something like help.example.com".into(),
        ));
    }

    Ok(subdomain)
}

/// The last two DNS labels of `domain`, or `None` when it has fewer than two.
#[must_use]
pub fn root_domain(domain: &str) -> Option<String> {
    let labels: Vec<&str> = domain.trim_end_matches('.').split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return None;
    }
    Some(labels[labels.len() - 2..].join("."))
}
