use anyhow::{bail, Context, Result};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use uniform_inventory::{config, db, migrator::Migrator};

/// Applies or rolls back the schema for the configured database.
///
/// Usage: `migration [up|down|status]` (default `up`). The database comes from
/// `DATABASE_URL` when set, otherwise from the layered application config.
#[tokio::main]
async fn main() -> Result<()> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => config::load_config()
            .context("failed to load configuration")?
            .database_url,
    };
    config::init_tracing("info", false);

    let action = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    match action.as_str() {
        "up" => uniform_inventory::migrator::run_migration(&database_url).await?,
        "down" | "status" => {
            let pool = db::establish_connection(&database_url).await?;
            if action == "down" {
                info!("Rolling back the most recent migration");
                Migrator::down(&pool, Some(1)).await?;
            } else {
                Migrator::status(&pool).await?;
            }
        }
        other => bail!("unknown action '{}'; expected up, down or status", other),
    }

    Ok(())
}
