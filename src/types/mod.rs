mod models;
mod secret;

pub use models::*;
pub use secret::{IssuedSyncKey, StoredSyncKey};
