mod agent;
mod server;

pub use agent::{AgentConfig, DirectoryConfig, PlatformConfig};
pub use server::ServerConfig;
