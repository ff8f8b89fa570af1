//! Database setup and initialization

use anyhow::Result;
use clipstash_core::Config;
use sqlx::PgPool;

/// Setup database connection pool and run migrations
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = clipstash_db::connect(
        config.database_url(),
        config.db_max_connections(),
        config.db_timeout_seconds(),
    )
    .await?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );

    clipstash_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}
