use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;

use crate::types::DirectoryUserRecord;

/// Enabled person accounts only. Bit 2 of `userAccountControl` marks a
/// disabled account and is excluded server-side.
pub const USER_FILTER: &str = "(&(objectClass=user)(objectCategory=person)(!(userAccountControl:1.2.840.113556.1.4.803:=2)))";

pub const USER_ATTRIBUTES: &[&str] = &[
    "sAMAccountName",
    "mail",
    "userPrincipalName",
    "displayName",
    "givenName",
    "sn",
    "memberOf",
    "department",
    "title",
];

/// Extra attributes forwarded in the record's `attributes` map.
const FORWARDED_ATTRIBUTES: &[&str] = &["department", "title"];

/// One directory object with its (possibly multi-valued) attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, values: &[&str]) -> Self {
        self.attributes.insert(
            name.to_string(),
            values.iter().map(|v| (*v).to_string()).collect(),
        );
        self
    }

    /// All values of `name`. Attribute names are case-insensitive.
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or_default()
    }

    /// First non-blank value of `name`, trimmed.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }
}

/// Anything that can list the directory's enabled user accounts.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn fetch_entries(&self) -> anyhow::Result<Vec<DirectoryEntry>>;
}

/// `CN=Helpdesk Staff,OU=Groups,DC=corp` yields `Helpdesk Staff`.
fn group_name(dn: &str) -> Option<String> {
    let first = dn.split(',').next()?.trim();
    let (key, value) = first.split_once('=')?;
    if !key.trim().eq_ignore_ascii_case("cn") {
        return None;
    }
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Turns a directory entry into a sync record. Entries with neither `mail`
/// nor `userPrincipalName` cannot be matched on the platform and yield
/// `None`.
#[must_use]
pub fn normalize_entry(entry: &DirectoryEntry) -> Option<DirectoryUserRecord> {
    let email = entry
        .first("mail")
        .or_else(|| entry.first("userPrincipalName"))?
        .to_string();

    let name = match entry.first("displayName") {
        Some(display) => display.to_string(),
        None => {
            let given = entry.first("givenName").unwrap_or_default();
            let sn = entry.first("sn").unwrap_or_default();
            let full = format!("{given} {sn}").trim().to_string();
            if full.is_empty() {
                email.split('@').next().unwrap_or(&email).to_string()
            } else {
                full
            }
        }
    };

    let groups = entry
        .values("memberOf")
        .iter()
        .filter_map(|dn| group_name(dn))
        .collect();

    let attributes: BTreeMap<String, Value> = FORWARDED_ATTRIBUTES
        .iter()
        .filter_map(|attr| {
            entry
                .first(attr)
                .map(|v| ((*attr).to_string(), Value::String(v.to_string())))
        })
        .collect();

    Some(DirectoryUserRecord {
        email,
        name,
        active: true,
        groups: Some(groups),
        attributes: (!attributes.is_empty()).then_some(attributes),
    })
}

/// Normalizes a batch, logging every skipped entry.
#[must_use]
pub fn normalize_entries(entries: &[DirectoryEntry]) -> Vec<DirectoryUserRecord> {
    entries
        .iter()
        .filter_map(|entry| {
            let record = normalize_entry(entry);
            if record.is_none() {
                let login = entry.first("sAMAccountName").unwrap_or(&entry.dn);
                tracing::warn!("Skipping {login}: no mail or userPrincipalName");
            }
            record
        })
        .collect()
}
