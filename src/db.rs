use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::AppConfig;

const MAX_CONNECTIONS: u32 = 10;

/// Connect to Postgres; acquiring a connection shares the dependency deadline
pub async fn create_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(
        "Creating database connection pool (max {} connections, acquire timeout {:?})",
        MAX_CONNECTIONS,
        config.dependency_timeout
    );

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(config.dependency_timeout)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Apply embedded migrations from `migrations/`
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
