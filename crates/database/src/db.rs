use std::time::Duration;

use configs::PoolConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Pool options for `url`, taken from the `[database.pool]` section.
pub fn connect_options(url: &str, pool: &PoolConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(url.to_owned());
    opt.max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .connect_timeout(Duration::from_secs(pool.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(pool.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(pool.max_lifetime_secs))
        .sqlx_logging(pool.sqlx_logging);
    opt
}

pub async fn connect_with_config(url: &str, pool: &PoolConfig) -> Result<DatabaseConnection, DbErr> {
    Database::connect(connect_options(url, pool)).await
}
