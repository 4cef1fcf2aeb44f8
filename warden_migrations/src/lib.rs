//! Embedded, versioned migrations for the permission tables.
//!
//! Migration scripts are generated from the authorization configuration (table and column
//! names, team mode) and tracked in the `warden_schema_migrations` table along with
//! SHA-256 hashes of their scripts. A hash mismatch means the configuration changed after
//! the migration was applied.

use std::{collections::HashMap, time::Instant};

use chrono::{DateTime, Utc};
use sqlx::{Connection, Executor, PgConnection};
use tracing::info;
use warden_database::PermissionSchema;

pub mod errors;
pub mod identifier;
pub mod permission_tables;
pub(crate) mod remote;
pub mod sha256;
pub(crate) mod tracking;

use errors::{
    InitializeMigrationTrackingError,
    MigrationApplyError,
    MigrationRollbackError,
    StatusError,
};
use identifier::MigrationIdentifier;
use remote::RemoteMigration;
use sha256::Sha256Hash;



pub async fn connect_to_database(database_url: &str) -> Result<PgConnection, sqlx::Error> {
    PgConnection::connect(database_url).await
}


/// Descibes a migration's status: either pending or applied (at some moment in time).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MigrationStatus {
    /// The migration is embedded in this binary, but hasn't yet been applied to the database.
    Pending,

    /// The migration has already been applied to the database.
    Applied {
        /// When the migration had been applied.
        at: DateTime<Utc>,
    },
}



pub struct EmbeddedMigrationScript {
    sql: String,

    sha256_hash: Sha256Hash,
}

impl EmbeddedMigrationScript {
    pub fn new<S>(sql: S) -> Self
    where
        S: Into<String>,
    {
        let sql: String = sql.into();
        let sha256_hash = Sha256Hash::of_script(&sql);

        Self { sql, sha256_hash }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn sha256_hash(&self) -> &Sha256Hash {
        &self.sha256_hash
    }
}


pub struct EmbeddedMigration {
    identifier: MigrationIdentifier,

    up: EmbeddedMigrationScript,

    down: Option<EmbeddedMigrationScript>,
}

impl EmbeddedMigration {
    pub fn new(
        identifier: MigrationIdentifier,
        up: EmbeddedMigrationScript,
        down: Option<EmbeddedMigrationScript>,
    ) -> Self {
        Self {
            identifier,
            up,
            down,
        }
    }

    pub fn identifier(&self) -> &MigrationIdentifier {
        &self.identifier
    }

    pub fn up(&self) -> &EmbeddedMigrationScript {
        &self.up
    }

    pub fn down(&self) -> Option<&EmbeddedMigrationScript> {
        self.down.as_ref()
    }

    /// Runs the up script and records the migration, all inside a single transaction.
    async fn apply(
        &self,
        database_connection: &mut PgConnection,
    ) -> Result<(), MigrationApplyError> {
        let started_at = Instant::now();
        let applied_at = Utc::now();

        let mut transaction = database_connection
            .begin()
            .await
            .map_err(|error| MigrationApplyError::FailedToPerformTransaction { error })?;

        (&mut *transaction)
            .execute(self.up.sql.as_str())
            .await
            .map_err(|error| MigrationApplyError::FailedToExecuteQuery { error })?;

        tracking::insert_tracking_row(
            &mut transaction,
            &self.identifier,
            &self.up.sha256_hash,
            self.down.as_ref().map(EmbeddedMigrationScript::sha256_hash),
            applied_at,
        )
        .await
        .map_err(|error| MigrationApplyError::FailedToExecuteQuery { error })?;

        tracking::update_execution_time(
            &mut transaction,
            self.identifier.version,
            started_at.elapsed(),
        )
        .await
        .map_err(|error| MigrationApplyError::FailedToExecuteQuery { error })?;

        transaction
            .commit()
            .await
            .map_err(|error| MigrationApplyError::FailedToPerformTransaction { error })?;

        Ok(())
    }

    /// Runs the down script and removes the tracking row, all inside a single transaction.
    async fn rollback(
        &self,
        database_connection: &mut PgConnection,
    ) -> Result<(), MigrationRollbackError> {
        let Some(down) = self.down.as_ref() else {
            return Err(MigrationRollbackError::RollbackUndefined {
                identifier: self.identifier.clone(),
            });
        };

        let mut transaction = database_connection
            .begin()
            .await
            .map_err(|error| MigrationRollbackError::FailedToPerformTransaction { error })?;

        (&mut *transaction)
            .execute(down.sql.as_str())
            .await
            .map_err(|error| MigrationRollbackError::FailedToExecuteQuery { error })?;

        tracking::remove_tracking_row(&mut transaction, self.identifier.version)
            .await
            .map_err(|error| MigrationRollbackError::FailedToExecuteQuery { error })?;

        transaction
            .commit()
            .await
            .map_err(|error| MigrationRollbackError::FailedToPerformTransaction { error })?;

        Ok(())
    }
}


/// Builds every embedded migration for the given schema, ordered by version.
pub fn embedded_migrations(schema: &PermissionSchema) -> Vec<EmbeddedMigration> {
    vec![EmbeddedMigration::new(
        MigrationIdentifier::new(permission_tables::VERSION, permission_tables::NAME),
        EmbeddedMigrationScript::new(permission_tables::generate_up_sql(schema)),
        Some(EmbeddedMigrationScript::new(
            permission_tables::generate_down_sql(schema),
        )),
    )]
}



/// Compares the SHA-256 hashes of an embedded and an applied migration.
///
/// If either side has a rollback script, the other must have one with
/// the matching hash as well.
fn embedded_and_remote_migration_hashes_match(
    embedded_migration: &EmbeddedMigration,
    remote_migration: &RemoteMigration,
) -> bool {
    if embedded_migration.up.sha256_hash() != &remote_migration.up_script_sha256_hash {
        return false;
    }

    match (
        embedded_migration.down.as_ref(),
        remote_migration.down_script_sha256_hash.as_ref(),
    ) {
        (Some(embedded_down), Some(remote_down_hash)) => {
            embedded_down.sha256_hash() == remote_down_hash
        }
        (None, None) => true,
        _ => false,
    }
}



pub struct ConsolidatedMigration<'m> {
    migration: &'m EmbeddedMigration,

    status: MigrationStatus,
}

impl<'m> ConsolidatedMigration<'m> {
    pub fn identifier(&self) -> &MigrationIdentifier {
        &self.migration.identifier
    }

    pub fn status(&self) -> &MigrationStatus {
        &self.status
    }

    pub fn has_rollback_script(&self) -> bool {
        self.migration.down.is_some()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, MigrationStatus::Pending)
    }
}



pub struct MigrationManager {
    embedded_migrations: Vec<EmbeddedMigration>,
}

impl MigrationManager {
    pub fn new(schema: &PermissionSchema) -> Self {
        Self {
            embedded_migrations: embedded_migrations(schema),
        }
    }

    pub fn migrations_without_status(&self) -> &[EmbeddedMigration] {
        &self.embedded_migrations
    }

    /// Initializes the migration tracking table in the database.
    ///
    /// If the table has already been initialized, this has no effect.
    pub async fn initialize_migration_tracking_in_database(
        &self,
        database_connection: &mut PgConnection,
    ) -> Result<(), InitializeMigrationTrackingError> {
        tracking::create_tracking_table_if_missing(database_connection).await
    }

    /// Pairs every embedded migration with its status in the database, ordered by version.
    ///
    /// Fails if an applied migration is unknown to this binary, or if its name or
    /// script hashes differ from the embedded one.
    pub async fn migrations_with_status(
        &self,
        database_connection: &mut PgConnection,
    ) -> Result<Vec<ConsolidatedMigration<'_>>, StatusError> {
        let mut embedded_migrations_by_version: HashMap<i64, &EmbeddedMigration> = self
            .embedded_migrations
            .iter()
            .map(|migration| (migration.identifier.version, migration))
            .collect();

        let remote_migrations = RemoteMigration::load_all_from_database(database_connection).await?;

        let mut consolidated_migrations = Vec::with_capacity(self.embedded_migrations.len());

        for remote_migration in remote_migrations {
            let Some(corresponding_embedded_migration) =
                embedded_migrations_by_version.remove(&remote_migration.identifier.version)
            else {
                return Err(StatusError::MigrationDoesNotExistLocally {
                    identifier: remote_migration.identifier,
                });
            };

            if corresponding_embedded_migration.identifier.name != remote_migration.identifier.name {
                return Err(StatusError::NameMismatch {
                    version: remote_migration.identifier.version,
                    remote_migration_name: remote_migration.identifier.name.clone(),
                    embedded_migration_name: corresponding_embedded_migration
                        .identifier
                        .name
                        .clone(),
                });
            }

            if !embedded_and_remote_migration_hashes_match(
                corresponding_embedded_migration,
                &remote_migration,
            ) {
                return Err(StatusError::HashMismatch {
                    identifier: remote_migration.identifier.clone(),
                    remote_up_script_sha256_hash: remote_migration.up_script_sha256_hash.clone(),
                    embedded_up_script_sha256_hash: corresponding_embedded_migration
                        .up
                        .sha256_hash()
                        .clone(),
                    remote_down_script_sha256_hash: remote_migration
                        .down_script_sha256_hash
                        .clone(),
                    embedded_down_script_sha256_hash: corresponding_embedded_migration
                        .down
                        .as_ref()
                        .map(|down| down.sha256_hash().clone()),
                });
            }

            if let Some(execution_time) = remote_migration.execution_time {
                tracing::trace!(
                    migration = %remote_migration.identifier,
                    execution_time_milliseconds = execution_time.as_millis() as u64,
                    "Migration is applied."
                );
            }

            consolidated_migrations.push(ConsolidatedMigration {
                migration: corresponding_embedded_migration,
                status: MigrationStatus::Applied {
                    at: remote_migration.applied_at,
                },
            });
        }

        for remaining_embedded_migration in embedded_migrations_by_version.into_values() {
            consolidated_migrations.push(ConsolidatedMigration {
                migration: remaining_embedded_migration,
                status: MigrationStatus::Pending,
            });
        }

        consolidated_migrations.sort_unstable_by_key(|migration| migration.identifier().version);

        Ok(consolidated_migrations)
    }

    /// Applies pending migrations in version order, up to and including `up_to_version`
    /// (or all of them, if `None`). Returns the identifiers of the applied migrations.
    pub async fn apply_pending(
        &self,
        database_connection: &mut PgConnection,
        up_to_version: Option<i64>,
    ) -> Result<Vec<MigrationIdentifier>, MigrationApplyError> {
        if let Some(target_version) = up_to_version {
            let target_is_known = self
                .embedded_migrations
                .iter()
                .any(|migration| migration.identifier.version == target_version);

            if !target_is_known {
                return Err(MigrationApplyError::UnknownTargetVersion { target_version });
            }
        }

        self.initialize_migration_tracking_in_database(database_connection)
            .await?;

        let pending_migrations: Vec<&EmbeddedMigration> = self
            .migrations_with_status(database_connection)
            .await?
            .into_iter()
            .filter(|migration| migration.is_pending())
            .filter(|migration| match up_to_version {
                Some(target_version) => migration.identifier().version <= target_version,
                None => true,
            })
            .map(|migration| migration.migration)
            .collect();

        let mut applied_migrations = Vec::with_capacity(pending_migrations.len());

        for migration in pending_migrations {
            migration.apply(database_connection).await?;

            info!(migration = %migration.identifier, "Applied migration.");
            applied_migrations.push(migration.identifier.clone());
        }

        Ok(applied_migrations)
    }

    /// Rolls back applied migrations with a version greater than `target_version`,
    /// newest first. A target of `0` rolls back everything.
    pub async fn rollback_to(
        &self,
        database_connection: &mut PgConnection,
        target_version: i64,
    ) -> Result<Vec<MigrationIdentifier>, MigrationRollbackError> {
        let mut migrations_to_roll_back: Vec<&EmbeddedMigration> = self
            .migrations_with_status(database_connection)
            .await?
            .into_iter()
            .filter(|migration| !migration.is_pending())
            .filter(|migration| migration.identifier().version > target_version)
            .map(|migration| migration.migration)
            .collect();

        migrations_to_roll_back
            .sort_unstable_by_key(|migration| std::cmp::Reverse(migration.identifier.version));

        let mut rolled_back_migrations = Vec::with_capacity(migrations_to_roll_back.len());

        for migration in migrations_to_roll_back {
            migration.rollback(database_connection).await?;

            info!(migration = %migration.identifier, "Rolled back migration.");
            rolled_back_migrations.push(migration.identifier.clone());
        }

        Ok(rolled_back_migrations)
    }
}



#[cfg(test)]
mod test {
    use warden_core::{schema::SchemaNames, team::TeamMode};

    use super::*;

    #[test]
    fn migration_hashes_depend_on_configuration() {
        let default_migrations = embedded_migrations(&PermissionSchema::default());
        let team_migrations = embedded_migrations(&PermissionSchema::new(
            SchemaNames::default(),
            TeamMode::Enabled,
        ));

        assert_eq!(default_migrations.len(), 1);
        assert_eq!(
            default_migrations[0].identifier().to_string(),
            "M0001_create-permission-tables"
        );

        assert_ne!(
            default_migrations[0].up().sha256_hash(),
            team_migrations[0].up().sha256_hash()
        );

        // Dropping tables doesn't depend on the team mode.
        assert_eq!(
            default_migrations[0].down().unwrap().sha256_hash(),
            team_migrations[0].down().unwrap().sha256_hash()
        );
    }

    #[test]
    fn detects_hash_mismatches() {
        let migrations = embedded_migrations(&PermissionSchema::default());
        let migration = &migrations[0];

        let matching_remote = RemoteMigration {
            identifier: migration.identifier().clone(),
            up_script_sha256_hash: migration.up().sha256_hash().clone(),
            down_script_sha256_hash: migration.down().map(|down| down.sha256_hash().clone()),
            applied_at: Utc::now(),
            execution_time: None,
        };

        assert!(embedded_and_remote_migration_hashes_match(
            migration,
            &matching_remote
        ));

        let remote_without_rollback = RemoteMigration {
            down_script_sha256_hash: None,
            ..matching_remote
        };

        assert!(!embedded_and_remote_migration_hashes_match(
            migration,
            &remote_without_rollback
        ));

        let remote_with_different_up = RemoteMigration {
            up_script_sha256_hash: Sha256Hash::of_script("SELECT 1"),
            down_script_sha256_hash: migration.down().map(|down| down.sha256_hash().clone()),
            ..remote_without_rollback
        };

        assert!(!embedded_and_remote_migration_hashes_match(
            migration,
            &remote_with_different_up
        ));
    }
}
