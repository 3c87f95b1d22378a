use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use onpoints::auth::TokenGenerator;
use onpoints::cli::{
    AdminCommands, AgentCommands, TenantCommands, UserCommands, run_agent, run_agent_test,
    run_tenant_add, run_tenant_list, run_user_add,
};
use onpoints::config::ServerConfig;
use onpoints::domain::HickoryTxtResolver;
use onpoints::server::{AppState, create_router};
use onpoints::store::{SqliteStore, Store};

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "onpoints")]
#[command(about = "Tenant domain resolution and directory sync for OnPoints", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "3000")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Per-attempt timeout for subdomain DNS verification
        #[arg(long, default_value = "5")]
        dns_timeout_secs: u64,

        /// Largest accepted directory sync push, in MiB
        #[arg(long, default_value = "64")]
        sync_body_limit_mb: usize,
    },

    /// Run the directory sync agent
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },
}

fn run_init(data_dir: String) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let config = ServerConfig {
        data_dir: data_path,
        ..ServerConfig::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = config.admin_token_path();

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let issued = TokenGenerator::new().issue(true, None, None)?;
    store.create_token(&issued.token)?;
    fs::write(&token_file, &issued.raw)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {}", issued.raw);
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let token_file = config.admin_token_path();
    if !token_file.exists() {
        bail!(
            "Server not initialized. Run 'onpoints admin init' first to create the database and admin token."
        );
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(
            "Server not initialized. Run 'onpoints admin init' first to create the database and admin token."
        );
    }

    info!("Admin token available at {}", token_file.display());

    let txt = Arc::new(HickoryTxtResolver::from_system_conf(config.dns_timeout));
    let state = Arc::new(
        AppState::new(Arc::new(store), txt).with_sync_body_limit(config.sync_body_limit),
    );

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("onpoints=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir } => run_init(data_dir)?,
            AdminCommands::Tenant { command } => match command {
                TenantCommands::Add {
                    data_dir,
                    name,
                    slug,
                    custom_domain,
                    custom_domain_verified,
                } => run_tenant_add(
                    &data_dir,
                    &name,
                    &slug,
                    custom_domain.as_deref(),
                    custom_domain_verified,
                )?,
                TenantCommands::List { data_dir, json } => run_tenant_list(&data_dir, json)?,
            },
            AdminCommands::User { command } => match command {
                UserCommands::Add {
                    data_dir,
                    tenant,
                    email,
                    name,
                    role,
                    create_token,
                } => run_user_add(&data_dir, &tenant, &email, &name, &role, create_token)?,
            },
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            dns_timeout_secs,
            sync_body_limit_mb,
        } => {
            run_serve(ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                dns_timeout: Duration::from_secs(dns_timeout_secs),
                sync_body_limit: sync_body_limit_mb.saturating_mul(1024 * 1024),
            })
            .await?;
        }
        Commands::Agent { command } => match command {
            AgentCommands::Run { config, once } => run_agent(&config, once).await?,
            AgentCommands::Test { config } => run_agent_test(&config).await?,
        },
    }

    Ok(())
}
