use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    errors::InitializeMigrationTrackingError,
    identifier::MigrationIdentifier,
    sha256::Sha256Hash,
};


/// Creates the migration tracking table if it doesn't exist yet.
pub(crate) async fn create_tracking_table_if_missing(
    database_connection: &mut PgConnection,
) -> Result<(), InitializeMigrationTrackingError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS warden_schema_migrations (
            version bigint NOT NULL,
            name text NOT NULL,
            up_script_sha256_hash bytea NOT NULL,
            down_script_sha256_hash bytea,
            applied_at timestamp with time zone NOT NULL,
            execution_time_milliseconds bigint NOT NULL,
            CONSTRAINT pk__warden_schema_migrations PRIMARY KEY (version),
            CONSTRAINT check__warden_schema_migrations__min_execution_time
                CHECK (execution_time_milliseconds >= -1)
        )
        "#,
    )
    .execute(database_connection)
    .await
    .map_err(|error| InitializeMigrationTrackingError::UnableToCreateTable { error })?;

    Ok(())
}


pub(crate) async fn insert_tracking_row(
    database_connection: &mut PgConnection,
    identifier: &MigrationIdentifier,
    up_script_sha256_hash: &Sha256Hash,
    down_script_sha256_hash: Option<&Sha256Hash>,
    applied_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO warden_schema_migrations \
            (version, name, up_script_sha256_hash, down_script_sha256_hash, \
            applied_at, execution_time_milliseconds) \
        VALUES ($1, $2, $3, $4, $5, -1)",
    )
    .bind(identifier.version)
    .bind(identifier.name.as_str())
    .bind(up_script_sha256_hash.as_bytes())
    .bind(down_script_sha256_hash.map(Sha256Hash::as_bytes))
    .bind(applied_at)
    .execute(database_connection)
    .await?;

    Ok(())
}


pub(crate) async fn update_execution_time(
    database_connection: &mut PgConnection,
    migration_version: i64,
    execution_time: Duration,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE warden_schema_migrations \
            SET execution_time_milliseconds = $1 \
            WHERE version = $2",
    )
    .bind(i64::try_from(execution_time.as_millis()).unwrap_or(i64::MAX))
    .bind(migration_version)
    .execute(database_connection)
    .await?;

    Ok(())
}


pub(crate) async fn remove_tracking_row(
    database_connection: &mut PgConnection,
    migration_version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM warden_schema_migrations WHERE version = $1")
        .bind(migration_version)
        .execute(database_connection)
        .await?;

    Ok(())
}
