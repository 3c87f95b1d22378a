use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const TENANT_COLUMNS: &str = "id, name, slug, custom_domain, custom_domain_verified, subdomain,
     subdomain_verified, subdomain_verification_token, sync_enabled, sync_key_hash,
     sync_key_created_at, created_at, updated_at";

const USER_COLUMNS: &str = "id, tenant_id, email, name, role, password_hash, is_active,
     directory_attributes, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests and throwaway tooling.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_role(s: &str) -> Role {
    s.parse().unwrap_or_else(|e| {
        tracing::error!("Invalid role in database: {e}");
        Role::User
    })
}

fn parse_attributes(raw: Option<String>) -> BTreeMap<String, serde_json::Value> {
    raw.and_then(|s| match serde_json::from_str(&s) {
        Ok(map) => Some(map),
        Err(e) => {
            tracing::error!("Invalid directory attributes in database: {e}");
            None
        }
    })
    .unwrap_or_default()
}

fn tenant_from_row(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    let sync_key_hash: Option<String> = row.get(9)?;
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        custom_domain: row.get(3)?,
        custom_domain_verified: row.get(4)?,
        subdomain: row.get(5)?,
        subdomain_verified: row.get(6)?,
        subdomain_verification_token: row.get(7)?,
        sync_enabled: row.get(8)?,
        sync_key: sync_key_hash.as_deref().and_then(StoredSyncKey::from_hex),
        sync_key_created_at: row
            .get::<_, Option<String>>(10)?
            .map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<PlatformUser> {
    Ok(PlatformUser {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        role: parse_role(&row.get::<_, String>(4)?),
        password_hash: row.get(5)?,
        is_active: row.get(6)?,
        directory_attributes: parse_attributes(row.get(7)?),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl SqliteStore {
    fn query_tenant(&self, filter: &str, value: &str) -> Result<Option<Tenant>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE {filter} LIMIT 1"),
            params![value],
            tenant_from_row,
        )
        .optional()
        .map_err(Error::from)
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Tenant operations

    fn create_tenant(&self, tenant: &Tenant) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tenants (id, name, slug, custom_domain, custom_domain_verified,
                subdomain, subdomain_verified, subdomain_verification_token, sync_enabled,
                sync_key_hash, sync_key_created_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                tenant.id,
                tenant.name,
                tenant.slug,
                tenant.custom_domain,
                tenant.custom_domain_verified,
                tenant.subdomain,
                tenant.subdomain_verified,
                tenant.subdomain_verification_token,
                tenant.sync_enabled,
                tenant.sync_key.as_ref().map(StoredSyncKey::to_hex),
                tenant.sync_key_created_at.as_ref().map(format_datetime),
                format_datetime(&tenant.created_at),
                format_datetime(&tenant.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_tenant(&self, id: &str) -> Result<Option<Tenant>> {
        self.query_tenant("id = ?1", id)
    }

    fn get_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        self.query_tenant("slug = ?1", slug)
    }

    fn list_tenants(&self) -> Result<Vec<Tenant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants ORDER BY slug"
        ))?;

        let rows = stmt.query_map([], tenant_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn find_tenant_by_verified_domain(&self, domain: &str) -> Result<Option<Tenant>> {
        // A verified subdomain wins over a verified custom domain, then the
        // oldest tenant.
        self.query_tenant(
            "(subdomain = ?1 AND subdomain_verified = 1)
                OR (custom_domain = ?1 AND custom_domain_verified = 1)
             ORDER BY (subdomain = ?1 AND subdomain_verified = 1) DESC, created_at, id",
            domain,
        )
    }

    fn find_tenants_holding_domain(&self, domain: &str) -> Result<Vec<Tenant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants
             WHERE subdomain = ?1 OR custom_domain = ?1
             ORDER BY created_at, id"
        ))?;

        let rows = stmt.query_map(params![domain], tenant_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_custom_domain(
        &self,
        tenant_id: &str,
        domain: Option<&str>,
        verified: bool,
    ) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE tenants SET custom_domain = ?1, custom_domain_verified = ?2, updated_at = ?3
             WHERE id = ?4",
            params![
                domain,
                verified && domain.is_some(),
                format_datetime(&Utc::now()),
                tenant_id
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::Conflict(
                "custom domain is already in use by another tenant".into(),
            )),
            Err(e) => Err(Error::from(e)),
        }
    }

    // Subdomain claim operations

    fn set_subdomain_claim(&self, tenant_id: &str, claim: &SubdomainClaim) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE tenants SET subdomain = ?1, subdomain_verified = ?2,
                subdomain_verification_token = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                claim.subdomain,
                claim.verified,
                claim.verification_token,
                format_datetime(&Utc::now()),
                tenant_id
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::Conflict(
                "subdomain is already in use by another tenant".into(),
            )),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn mark_subdomain_verified(&self, tenant_id: &str, token: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE tenants SET subdomain_verified = 1, updated_at = ?1
             WHERE id = ?2 AND subdomain IS NOT NULL AND subdomain_verification_token = ?3",
            params![format_datetime(&Utc::now()), tenant_id, token],
        )?;
        Ok(rows > 0)
    }

    // Sync credential operations

    fn set_sync_key(
        &self,
        tenant_id: &str,
        key: Option<&StoredSyncKey>,
        enabled: bool,
    ) -> Result<()> {
        let now = Utc::now();
        let rows = self.conn().execute(
            "UPDATE tenants SET sync_key_hash = ?1, sync_key_created_at = ?2, sync_enabled = ?3,
                updated_at = ?4
             WHERE id = ?5",
            params![
                key.map(StoredSyncKey::to_hex),
                key.map(|_| format_datetime(&now)),
                enabled && key.is_some(),
                format_datetime(&now),
                tenant_id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &PlatformUser) -> Result<()> {
        let attributes = if user.directory_attributes.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&user.directory_attributes)?)
        };

        let result = self.conn().execute(
            "INSERT INTO users (id, tenant_id, email, name, role, password_hash, is_active,
                directory_attributes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id,
                user.tenant_id,
                user.email,
                user.name,
                user.role.as_str(),
                user.password_hash,
                user.is_active,
                attributes,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<PlatformUser>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, tenant_id: &str, email: &str) -> Result<Option<PlatformUser>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE tenant_id = ?1 AND email = ?2"),
            params![tenant_id, email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tenant_users(&self, tenant_id: &str) -> Result<Vec<PlatformUser>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE tenant_id = ?1 ORDER BY email"
        ))?;

        let rows = stmt.query_map(params![tenant_id], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_tenant_users(&self, tenant_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE tenant_id = ?1",
            params![tenant_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_user_groups(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT group_name FROM user_directory_groups WHERE user_id = ?1 ORDER BY group_name",
        )?;

        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn upsert_directory_user(
        &self,
        tenant_id: &str,
        record: &DirectoryUserRecord,
    ) -> Result<UpsertOutcome> {
        let attributes = record
            .attributes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let new_id = Uuid::new_v4().to_string();
        let now = format_datetime(&Utc::now());

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        // RETURNING yields the surviving row's id, so a mismatch with the id we
        // tried to insert means an existing user was updated instead.
        let user_id: String = tx.query_row(
            "INSERT INTO users (id, tenant_id, email, name, role, password_hash, is_active,
                directory_attributes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, '', ?6, ?7, ?8, ?8)
             ON CONFLICT (tenant_id, email) DO UPDATE SET
                name = excluded.name,
                is_active = excluded.is_active,
                directory_attributes = COALESCE(excluded.directory_attributes, users.directory_attributes),
                updated_at = excluded.updated_at
             RETURNING id",
            params![
                new_id,
                tenant_id,
                record.email,
                record.name,
                Role::default().as_str(),
                record.active,
                attributes,
                now,
            ],
            |row| row.get(0),
        )?;

        if let Some(groups) = &record.groups {
            tx.execute(
                "DELETE FROM user_directory_groups WHERE user_id = ?1",
                params![user_id],
            )?;
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO user_directory_groups (user_id, group_name) VALUES (?1, ?2)",
            )?;
            for group in groups {
                stmt.execute(params![user_id, group])?;
            }
        }

        tx.commit()?;

        if user_id == new_id {
            Ok(UpsertOutcome::Created)
        } else {
            Ok(UpsertOutcome::Updated)
        }
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at,
                expires_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
                token.last_used_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(temp: &TempDir) -> SqliteStore {
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
    }

    fn tenant(id: &str, slug: &str) -> Tenant {
        Tenant::new(id.to_string(), format!("Tenant {slug}"), slug.to_string())
    }

    fn record(email: &str, name: &str) -> DirectoryUserRecord {
        DirectoryUserRecord {
            email: email.to_string(),
            name: name.to_string(),
            active: true,
            groups: None,
            attributes: None,
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"tenants".to_string()));
        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"user_directory_groups".to_string()));
        assert!(tables.contains(&"tokens".to_string()));
    }

    #[test]
    fn test_tenant_crud() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create_tenant(&tenant("t-1", "acme")).unwrap();

        let fetched = store.get_tenant("t-1").unwrap().unwrap();
        assert_eq!(fetched.slug, "acme");
        assert!(!fetched.sync_enabled);
        assert!(fetched.sync_key.is_none());

        let by_slug = store.get_tenant_by_slug("acme").unwrap().unwrap();
        assert_eq!(by_slug.id, "t-1");

        let duplicate = store.create_tenant(&tenant("t-2", "acme"));
        assert!(matches!(duplicate, Err(Error::AlreadyExists)));

        assert_eq!(store.list_tenants().unwrap().len(), 1);
    }

    #[test]
    fn test_verified_domain_lookup_ignores_unverified() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        store.create_tenant(&tenant("t-1", "acme")).unwrap();

        let pending = SubdomainClaim {
            subdomain: Some("help.acme.com".into()),
            verified: false,
            verification_token: Some("onpoints-verify=abc".into()),
        };
        store.set_subdomain_claim("t-1", &pending).unwrap();
        assert!(
            store
                .find_tenant_by_verified_domain("help.acme.com")
                .unwrap()
                .is_none()
        );

        assert!(store.mark_subdomain_verified("t-1", "onpoints-verify=abc").unwrap());
        let found = store
            .find_tenant_by_verified_domain("HELP.acme.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "t-1");

        store
            .set_custom_domain("t-1", Some("support.acme.io"), false)
            .unwrap();
        assert!(
            store
                .find_tenant_by_verified_domain("support.acme.io")
                .unwrap()
                .is_none()
        );
        store
            .set_custom_domain("t-1", Some("support.acme.io"), true)
            .unwrap();
        assert!(
            store
                .find_tenant_by_verified_domain("support.acme.io")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_subdomain_unique_across_tenants() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        store.create_tenant(&tenant("t-1", "acme")).unwrap();
        store.create_tenant(&tenant("t-2", "globex")).unwrap();

        let claim = SubdomainClaim {
            subdomain: Some("help.acme.com".into()),
            verified: false,
            verification_token: Some("onpoints-verify=1".into()),
        };
        store.set_subdomain_claim("t-1", &claim).unwrap();

        let result = store.set_subdomain_claim("t-2", &claim);
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_domain_lookup_prefers_verified_subdomain() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        store.create_tenant(&tenant("t-1", "acme")).unwrap();
        store.create_tenant(&tenant("t-2", "globex")).unwrap();

        // Legacy data: the same name verified as t-1's custom domain and
        // t-2's subdomain.
        store
            .set_custom_domain("t-1", Some("help.example.com"), true)
            .unwrap();
        let claim = SubdomainClaim {
            subdomain: Some("help.example.com".into()),
            verified: false,
            verification_token: Some("onpoints-verify=1".into()),
        };
        store.set_subdomain_claim("t-2", &claim).unwrap();
        assert_eq!(
            store
                .find_tenant_by_verified_domain("help.example.com")
                .unwrap()
                .unwrap()
                .id,
            "t-1"
        );

        assert!(store.mark_subdomain_verified("t-2", "onpoints-verify=1").unwrap());
        for _ in 0..3 {
            let found = store
                .find_tenant_by_verified_domain("help.example.com")
                .unwrap()
                .unwrap();
            assert_eq!(found.id, "t-2");
        }

        let holders: Vec<String> = store
            .find_tenants_holding_domain("HELP.example.com")
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(holders.len(), 2);
        assert!(holders.contains(&"t-1".to_string()));
        assert!(holders.contains(&"t-2".to_string()));
        assert!(
            store
                .find_tenants_holding_domain("support.globex.io")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_mark_verified_requires_current_token() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        store.create_tenant(&tenant("t-1", "acme")).unwrap();

        let claim = SubdomainClaim {
            subdomain: Some("help.acme.com".into()),
            verified: false,
            verification_token: Some("onpoints-verify=new".into()),
        };
        store.set_subdomain_claim("t-1", &claim).unwrap();

        assert!(!store.mark_subdomain_verified("t-1", "onpoints-verify=old").unwrap());
        assert!(!store.get_tenant("t-1").unwrap().unwrap().subdomain_verified);
    }

    #[test]
    fn test_sync_key_set_and_clear() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        store.create_tenant(&tenant("t-1", "acme")).unwrap();

        let issued = IssuedSyncKey::generate();
        store.set_sync_key("t-1", Some(issued.stored()), true).unwrap();
        let secret = issued.into_secret();

        let fetched = store.get_tenant("t-1").unwrap().unwrap();
        assert!(fetched.sync_enabled);
        assert!(fetched.sync_key.unwrap().matches(&secret));
        assert!(fetched.sync_key_created_at.is_some());

        store.set_sync_key("t-1", None, false).unwrap();
        let cleared = store.get_tenant("t-1").unwrap().unwrap();
        assert!(!cleared.sync_enabled);
        assert!(cleared.sync_key.is_none());

        assert!(matches!(
            store.set_sync_key("missing", None, false),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        store.create_tenant(&tenant("t-1", "acme")).unwrap();

        let first = store
            .upsert_directory_user("t-1", &record("a@x.com", "A"))
            .unwrap();
        assert_eq!(first, UpsertOutcome::Created);

        let mut changed = record("A@X.com", "Alice");
        changed.active = false;
        let second = store.upsert_directory_user("t-1", &changed).unwrap();
        assert_eq!(second, UpsertOutcome::Updated);

        let users = store.list_tenant_users("t-1").unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "a@x.com");
        assert_eq!(users[0].name, "Alice");
        assert!(!users[0].is_active);
        assert_eq!(users[0].role, Role::User);
        assert_eq!(users[0].password_hash, "");
    }

    #[test]
    fn test_upsert_preserves_role_and_password() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        store.create_tenant(&tenant("t-1", "acme")).unwrap();

        let now = Utc::now();
        store
            .create_user(&PlatformUser {
                id: "u-1".into(),
                tenant_id: "t-1".into(),
                email: "boss@x.com".into(),
                name: "Boss".into(),
                role: Role::TenantAdmin,
                password_hash: "$argon2id$existing".into(),
                is_active: true,
                directory_attributes: BTreeMap::new(),
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let outcome = store
            .upsert_directory_user("t-1", &record("boss@x.com", "The Boss"))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let user = store.get_user("u-1").unwrap().unwrap();
        assert_eq!(user.name, "The Boss");
        assert_eq!(user.role, Role::TenantAdmin);
        assert_eq!(user.password_hash, "$argon2id$existing");
    }

    #[test]
    fn test_upsert_same_email_different_tenants() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        store.create_tenant(&tenant("t-1", "acme")).unwrap();
        store.create_tenant(&tenant("t-2", "globex")).unwrap();

        let a = store
            .upsert_directory_user("t-1", &record("a@x.com", "A"))
            .unwrap();
        let b = store
            .upsert_directory_user("t-2", &record("a@x.com", "A"))
            .unwrap();
        assert_eq!(a, UpsertOutcome::Created);
        assert_eq!(b, UpsertOutcome::Created);
    }

    #[test]
    fn test_upsert_groups_and_attributes() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        store.create_tenant(&tenant("t-1", "acme")).unwrap();

        let mut rec = record("a@x.com", "A");
        rec.groups = Some(vec!["Staff".into(), "VPN Users".into()]);
        rec.attributes = Some(BTreeMap::from([(
            "department".to_string(),
            serde_json::json!("IT"),
        )]));
        store.upsert_directory_user("t-1", &rec).unwrap();

        let user = store.get_user_by_email("t-1", "a@x.com").unwrap().unwrap();
        assert_eq!(
            store.list_user_groups(&user.id).unwrap(),
            vec!["Staff".to_string(), "VPN Users".to_string()]
        );
        assert_eq!(user.directory_attributes["department"], "IT");

        // Reported groups replace the stored set; absent attributes are kept.
        rec.groups = Some(vec!["Staff".into()]);
        rec.attributes = None;
        store.upsert_directory_user("t-1", &rec).unwrap();

        let user = store.get_user_by_email("t-1", "a@x.com").unwrap().unwrap();
        assert_eq!(store.list_user_groups(&user.id).unwrap(), vec!["Staff".to_string()]);
        assert_eq!(user.directory_attributes["department"], "IT");
    }

    #[test]
    fn test_token_lookup_collision() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let token1 = Token {
            id: "token-1".to_string(),
            token_hash: "hash1".to_string(),
            token_lookup: "lookup12".to_string(),
            is_admin: true,
            user_id: None,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token1).unwrap();
        assert!(store.has_admin_token().unwrap());

        let token2 = Token {
            id: "token-2".to_string(),
            token_lookup: "lookup12".to_string(), // Same lookup
            ..token1.clone()
        };

        let result = store.create_token(&token2);
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
    }
}
