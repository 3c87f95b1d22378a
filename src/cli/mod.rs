mod agent;
mod commands;
mod tenant;
mod user;

pub use agent::{run_agent, run_agent_test};
pub use commands::{AdminCommands, AgentCommands, TenantCommands, UserCommands};
pub use tenant::{run_tenant_add, run_tenant_list};
pub use user::run_user_add;

use crate::store::SqliteStore;

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: std::path::PathBuf = data_dir.into();
    let db_path = data_path.join("onpoints.db");

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'onpoints admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
