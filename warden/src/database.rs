use std::time::Duration;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::debug;
use warden_configuration::DatabaseConfiguration;


const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 200;


/// Connects to the configured PostgreSQL database.
///
/// Authorization checks are served from the in-process cache, so the pool only needs
/// to cover writes and the occasional cache rebuild.
pub async fn establish_database_connection_pool(
    database_configuration: &DatabaseConfiguration,
) -> Result<PgPool, sqlx::Error> {
    let statement_cache_capacity = database_configuration
        .statement_cache_capacity
        .unwrap_or(DEFAULT_STATEMENT_CACHE_CAPACITY);

    let mut connection_options = PgConnectOptions::new_without_pgpass()
        .application_name(&format!("warden_v{}", env!("CARGO_PKG_VERSION")))
        .statement_cache_capacity(statement_cache_capacity)
        .host(&database_configuration.host)
        .port(database_configuration.port)
        .username(&database_configuration.username)
        .database(&database_configuration.database_name);

    if let Some(password) = &database_configuration.password {
        connection_options = connection_options.password(password.as_str());
    }

    debug!(
        host = database_configuration.host.as_str(),
        port = database_configuration.port,
        database_name = database_configuration.database_name.as_str(),
        statement_cache_capacity,
        "Connecting to the PostgreSQL database."
    );


    PgPoolOptions::new()
        .idle_timeout(Some(Duration::from_secs(60 * 20)))
        .max_lifetime(Some(Duration::from_secs(60 * 60)))
        .min_connections(1)
        .max_connections(5)
        .test_before_acquire(true)
        .connect_with(connection_options)
        .await
}
