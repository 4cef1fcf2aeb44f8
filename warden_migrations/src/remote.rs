use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

use crate::{errors::RemoteMigrationError, identifier::MigrationIdentifier, sha256::Sha256Hash};


/// A row of the migration tracking table, i.e. a migration that has been applied.
pub(crate) struct RemoteMigration {
    pub(crate) identifier: MigrationIdentifier,

    pub(crate) up_script_sha256_hash: Sha256Hash,

    pub(crate) down_script_sha256_hash: Option<Sha256Hash>,

    pub(crate) applied_at: DateTime<Utc>,

    pub(crate) execution_time: Option<Duration>,
}


#[derive(FromRow)]
struct IntermediateRemoteMigration {
    version: i64,

    name: String,

    up_script_sha256_hash: Vec<u8>,

    down_script_sha256_hash: Option<Vec<u8>>,

    applied_at: DateTime<Utc>,

    execution_time_milliseconds: i64,
}

impl IntermediateRemoteMigration {
    fn try_into_remote_migration(self) -> Result<RemoteMigration, RemoteMigrationError> {
        let identifier = MigrationIdentifier::new(self.version, self.name);

        let up_script_sha256_hash = Sha256Hash::try_from(self.up_script_sha256_hash.as_slice())
            .map_err(|error| RemoteMigrationError::InvalidRow {
                identifier: identifier.clone(),
                reason: format!("invalid up_script_sha256_hash field: {}", error).into(),
            })?;

        let down_script_sha256_hash = self
            .down_script_sha256_hash
            .as_deref()
            .map(Sha256Hash::try_from)
            .transpose()
            .map_err(|error| RemoteMigrationError::InvalidRow {
                identifier: identifier.clone(),
                reason: format!("invalid down_script_sha256_hash field: {}", error).into(),
            })?;

        // -1 marks a migration whose execution time was never recorded.
        let execution_time = match self.execution_time_milliseconds {
            -1 => None,
            milliseconds => {
                let milliseconds = u64::try_from(milliseconds).map_err(|_| {
                    RemoteMigrationError::InvalidRow {
                        identifier: identifier.clone(),
                        reason: "invalid execution_time_milliseconds field: must not be negative"
                            .into(),
                    }
                })?;

                Some(Duration::from_millis(milliseconds))
            }
        };

        Ok(RemoteMigration {
            identifier,
            up_script_sha256_hash,
            down_script_sha256_hash,
            applied_at: self.applied_at,
            execution_time,
        })
    }
}


impl RemoteMigration {
    pub(crate) async fn load_all_from_database(
        database_connection: &mut PgConnection,
    ) -> Result<Vec<Self>, RemoteMigrationError> {
        let intermediate_remote_migrations: Vec<IntermediateRemoteMigration> = sqlx::query_as(
            r#"
            SELECT
                version, name, up_script_sha256_hash, down_script_sha256_hash,
                applied_at, execution_time_milliseconds
            FROM warden_schema_migrations
            ORDER BY version ASC
            "#,
        )
        .fetch_all(&mut *database_connection)
        .await
        .map_err(|error| RemoteMigrationError::QueryFailed { error })?;


        let mut remote_migrations = Vec::with_capacity(intermediate_remote_migrations.len());

        for intermediate_model in intermediate_remote_migrations {
            remote_migrations.push(intermediate_model.try_into_remote_migration()?);
        }

        Ok(remote_migrations)
    }
}
