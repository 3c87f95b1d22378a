pub mod dto;
mod lookup;
pub mod response;
mod router;
mod sync;
mod tenants;

pub use router::{AppState, create_router};
pub use sync::{DEFAULT_SYNC_BODY_LIMIT, sync_router};
pub use tenants::tenant_router;
