//! Wire types of the directory sync protocol, shared by the endpoint and
//! the agent.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DirectoryUserRecord;

/// Header carrying the tenant's sync key.
pub const SYNC_KEY_HEADER: &str = "x-ad-sync-api-key";

const MAX_EMAIL_LEN: usize = 254;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+'-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Request body as the endpoint receives it. Records stay untyped so that a
/// malformed record is reported on its own instead of failing the batch.
#[derive(Debug, Deserialize)]
pub struct SyncUsersEnvelope {
    pub users: Vec<Value>,
}

/// Request body as the agent sends it.
#[derive(Debug, Serialize)]
pub struct SyncUsersRequest<'a> {
    pub users: &'a [DirectoryUserRecord],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    pub email: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResults {
    pub created: u32,
    pub updated: u32,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    pub results: SyncResults,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTenantInfo {
    pub id: String,
    pub name: String,
    pub sync_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub success: bool,
    pub tenant: SyncTenantInfo,
    pub user_count: i64,
    pub message: String,
}

fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("email cannot be empty".into());
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(format!("email cannot exceed {MAX_EMAIL_LEN} characters"));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("invalid email format".into());
    }
    Ok(())
}

/// Checks one pushed record against the wire schema.
///
/// `active` defaults to `true` when absent. `groups` and `attributes` are
/// optional, but when present must be a string array and an object.
pub fn validate_record(value: &Value) -> Result<DirectoryUserRecord, RecordError> {
    let raw_email = value
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    let fail = |error: String| RecordError {
        email: raw_email.to_string(),
        error,
    };

    let Value::Object(fields) = value else {
        return Err(fail("record must be a JSON object".into()));
    };

    match fields.get("email") {
        Some(Value::String(_)) => validate_email(raw_email).map_err(fail)?,
        Some(_) => return Err(fail("email must be a string".into())),
        None => return Err(fail("email is required".into())),
    }

    let name = match fields.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(Value::String(_)) => return Err(fail("name cannot be empty".into())),
        Some(_) => return Err(fail("name must be a string".into())),
        None => return Err(fail("name is required".into())),
    };

    let active = match fields.get("active") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(active)) => *active,
        Some(_) => return Err(fail("active must be a boolean".into())),
    };

    let groups = match fields.get("groups") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|g| g.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| fail("groups must be an array of strings".into()))?,
        ),
        Some(_) => return Err(fail("groups must be an array of strings".into())),
    };

    let attributes = match fields.get("attributes") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(
            map.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        ),
        Some(_) => return Err(fail("attributes must be an object".into())),
    };

    Ok(DirectoryUserRecord {
        email: raw_email.to_string(),
        name,
        active,
        groups,
        attributes,
    })
}
