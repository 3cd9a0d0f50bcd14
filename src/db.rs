use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Open the Postgres pool and apply pending migrations.
pub async fn connect(config: &AppConfig, database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(database_url)
        .await
        .context("connect to database")?;

    // Run migrations if present
    match sqlx::migrate!("./migrations").run(&db).await {
        Ok(()) => info!("database migrations applied"),
        Err(e) => {
            warn!(error = %e, "migrations folder not found or migration failed; continuing")
        }
    }

    Ok(db)
}
