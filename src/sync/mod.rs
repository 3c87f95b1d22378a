//! Directory synchronization: the sync credential and the server side of
//! the batch push protocol.

mod credential;
pub mod protocol;
mod service;

pub use credential::SyncCredentialManager;
pub use protocol::{
    RecordError, SYNC_KEY_HEADER, SyncResponse, SyncResults, SyncStatusResponse, SyncTenantInfo,
    SyncUsersEnvelope, SyncUsersRequest, validate_record,
};
pub use service::DirectorySyncService;
