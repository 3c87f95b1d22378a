use std::path::Path;

use anyhow::Context;

use crate::agent::agent_from_config;
use crate::config::AgentConfig;

fn load(config_path: &Path) -> anyhow::Result<AgentConfig> {
    AgentConfig::load(config_path)
        .with_context(|| format!("failed to load agent config {}", config_path.display()))
}

pub async fn run_agent(config_path: &Path, once: bool) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let agent = agent_from_config(&config)?;

    if once {
        let response = agent.run_once().await?;
        println!("{}", response.message);
        if !response.results.errors.is_empty() {
            println!("{} record(s) rejected:", response.results.errors.len());
            for error in &response.results.errors {
                println!("  {}: {}", error.email, error.error);
            }
        }
        return Ok(());
    }

    tracing::info!(
        "Starting sync agent for tenant {} every {}s",
        config.platform.tenant_id,
        config.sync_interval_secs
    );
    agent.run_forever().await
}

pub async fn run_agent_test(config_path: &Path) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let status = agent_from_config(&config)?.test_connection().await?;

    println!("{}", status.message);
    println!("  tenant: {} ({})", status.tenant.name, status.tenant.id);
    println!("  users:  {}", status.user_count);
    Ok(())
}
