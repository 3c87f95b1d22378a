use anyhow::bail;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::normalize_subdomain;
use crate::error::Error;
use crate::store::Store;
use crate::types::Tenant;

use super::init_store;

const MAX_SLUG_LEN: usize = 63;

fn validate_slug(slug: &str) -> anyhow::Result<()> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        bail!("Slug must be 1 to {MAX_SLUG_LEN} characters");
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        bail!("Slug can only contain lowercase letters, digits, and hyphens");
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        bail!("Slug cannot start or end with a hyphen");
    }
    Ok(())
}

pub fn run_tenant_add(
    data_dir: &str,
    name: &str,
    slug: &str,
    custom_domain: Option<&str>,
    custom_domain_verified: bool,
) -> anyhow::Result<()> {
    let store = init_store(data_dir)?;

    let name = name.trim();
    if name.is_empty() {
        bail!("Tenant name cannot be empty");
    }
    validate_slug(slug)?;
    let custom_domain = custom_domain.map(normalize_subdomain).transpose()?;

    if store.get_tenant_by_slug(slug)?.is_some() {
        bail!("Tenant '{slug}' already exists");
    }

    let mut tenant = Tenant::new(Uuid::new_v4().to_string(), name.to_string(), slug.to_string());
    tenant.custom_domain_verified = custom_domain.is_some() && custom_domain_verified;
    tenant.custom_domain = custom_domain;

    if let Err(e) = store.create_tenant(&tenant) {
        if matches!(e, Error::AlreadyExists) {
            bail!("Tenant '{slug}' or its custom domain already exists");
        }
        return Err(e.into());
    }

    println!("Created tenant '{slug}' ({})", tenant.id);
    if let Some(domain) = &tenant.custom_domain {
        let state = if custom_domain_verified {
            "verified"
        } else {
            "unverified"
        };
        println!("  custom domain: {domain} ({state})");
    }
    Ok(())
}

#[derive(Serialize)]
struct TenantOutput {
    id: String,
    name: String,
    slug: String,
    custom_domain: Option<String>,
    custom_domain_verified: bool,
    subdomain: Option<String>,
    subdomain_verified: bool,
    sync_enabled: bool,
    users: i64,
}

pub fn run_tenant_list(data_dir: &str, json: bool) -> anyhow::Result<()> {
    let store = init_store(data_dir)?;

    let mut output = Vec::new();
    for tenant in store.list_tenants()? {
        output.push(TenantOutput {
            users: store.count_tenant_users(&tenant.id)?,
            id: tenant.id,
            name: tenant.name,
            slug: tenant.slug,
            custom_domain: tenant.custom_domain,
            custom_domain_verified: tenant.custom_domain_verified,
            subdomain: tenant.subdomain,
            subdomain_verified: tenant.subdomain_verified,
            sync_enabled: tenant.sync_enabled,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if output.is_empty() {
        println!("No tenants found.");
        return Ok(());
    }

    println!();
    for t in &output {
        let sync = if t.sync_enabled { "sync on" } else { "sync off" };
        println!("  {}  {}  {}  {} users  {sync}", t.slug, t.name, t.id, t.users);
    }
    println!();
    Ok(())
}
