use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::config::Config;

use super::error::Error;

pub async fn establish_pool(config: &Config) -> Result<Pool<Postgres>, Error> {
    log::trace!("Creating pool");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    log::info!(
        "Connected to database ({} connections max)",
        config.max_connections
    );
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), Error> {
    log::trace!("Running migrations");
    sqlx::migrate!("./migrations").run(pool).await?;

    Ok(())
}
