use std::collections::BTreeMap;

use anyhow::{anyhow, bail};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::TokenGenerator;
use crate::store::Store;
use crate::types::{PlatformUser, Role};

use super::init_store;

pub fn run_user_add(
    data_dir: &str,
    tenant_slug: &str,
    email: &str,
    name: &str,
    role: &str,
    create_token: bool,
) -> anyhow::Result<()> {
    let store = init_store(data_dir)?;

    let role: Role = role.parse().map_err(|e: String| anyhow!(e))?;
    let tenant = store
        .get_tenant_by_slug(tenant_slug)?
        .ok_or_else(|| anyhow!("Tenant '{tenant_slug}' not found"))?;

    let email = email.trim();
    if !email.contains('@') {
        bail!("'{email}' is not an email address");
    }
    if store.get_user_by_email(&tenant.id, email)?.is_some() {
        bail!("User '{email}' already exists in tenant '{tenant_slug}'");
    }

    let now = Utc::now();
    let user = PlatformUser {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant.id.clone(),
        email: email.to_string(),
        name: name.trim().to_string(),
        role,
        password_hash: String::new(),
        is_active: true,
        directory_attributes: BTreeMap::new(),
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    println!("Created {role} '{email}' in tenant '{tenant_slug}' ({})", user.id);

    if create_token {
        let issued = TokenGenerator::new().issue(false, Some(user.id.clone()), None)?;
        store.create_token(&issued.token)?;

        println!();
        println!("========================================");
        println!("API token (save this, it won't be shown again):");
        println!();
        println!("  {}", issued.raw);
        println!();
        println!("========================================");
        println!();
    }

    Ok(())
}
