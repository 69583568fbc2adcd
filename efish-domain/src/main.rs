use anyhow::Context;
use efish_domain::{Config, Domain, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment and logging
    let _ = dotenvy::dotenv();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!(
        environment = %config.environment,
        max_connections = config.db_max_connections,
        "e-fish domain starting..."
    );

    // 2. Database and migrations
    let domain = Domain::connect(&config)
        .await
        .context("failed to open the database")?;

    // 3. Smoke read so a broken schema fails at startup
    let species = domain
        .budidaya()
        .new_query()
        .list_fish_species()
        .await
        .context("schema check failed")?;

    tracing::info!(fish_species = species.len(), "e-fish domain ready");
    Ok(())
}
