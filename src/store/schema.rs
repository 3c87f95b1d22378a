pub const SCHEMA: &str = r#"
-- Tenants own every other record
CREATE TABLE IF NOT EXISTS tenants (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,

    -- Custom domain, honored for routing only once verified
    custom_domain TEXT UNIQUE COLLATE NOCASE,
    custom_domain_verified INTEGER NOT NULL DEFAULT 0,

    -- Subdomain claim: NULL subdomain implies unverified with no token
    subdomain TEXT UNIQUE COLLATE NOCASE,
    subdomain_verified INTEGER NOT NULL DEFAULT 0,
    subdomain_verification_token TEXT,

    -- Directory sync credential (SHA-256 of the key, never the key itself)
    sync_enabled INTEGER NOT NULL DEFAULT 0,
    sync_key_hash TEXT,
    sync_key_created_at TEXT,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Platform users; (tenant_id, email) is the natural key used by sync
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    email TEXT NOT NULL COLLATE NOCASE,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    password_hash TEXT NOT NULL DEFAULT '',  -- empty for directory-only accounts
    is_active INTEGER NOT NULL DEFAULT 1,
    directory_attributes TEXT,               -- JSON object reported by the sync agent
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(tenant_id, email)
);

-- Directory group membership reported by the sync agent
CREATE TABLE IF NOT EXISTS user_directory_groups (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    group_name TEXT NOT NULL,
    PRIMARY KEY (user_id, group_name)
);

-- Operator tokens; non-admin tokens must belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of ID for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,
    user_id TEXT REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_users_tenant ON users(tenant_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
"#;
