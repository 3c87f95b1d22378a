use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Manage tenants
    Tenant {
        #[command(subcommand)]
        command: TenantCommands,
    },

    /// Manage platform users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum TenantCommands {
    /// Add a new tenant
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Display name of the organization
        #[arg(long)]
        name: String,

        /// Unique slug, used by the X-Tenant header
        #[arg(long)]
        slug: String,

        /// Custom domain served for this tenant
        #[arg(long)]
        custom_domain: Option<String>,

        /// Mark the custom domain as verified
        #[arg(long, requires = "custom_domain")]
        custom_domain_verified: bool,
    },

    /// List tenants
    List {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user to a tenant, optionally with an API token
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Slug of the tenant the user belongs to
        #[arg(long)]
        tenant: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        /// admin, tenant_admin, or user
        #[arg(long, default_value = "user")]
        role: String,

        /// Also create an API token for the user
        #[arg(long)]
        create_token: bool,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Sync the directory to the platform on a schedule
    Run {
        /// Agent configuration file
        #[arg(long, short, default_value = "onpoints-agent.toml")]
        config: PathBuf,

        /// Sync once and exit
        #[arg(long)]
        once: bool,
    },

    /// Check that the platform accepts the configured sync key
    Test {
        /// Agent configuration file
        #[arg(long, short, default_value = "onpoints-agent.toml")]
        config: PathBuf,
    },
}
