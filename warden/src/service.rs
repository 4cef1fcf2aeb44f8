//! The [`Authorization`] facade wiring storage, cache and the three services together.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};
use warden_configuration::AuthorizationConfiguration;
use warden_core::{team::TeamMode, DEFAULT_GUARD};
use warden_database::PermissionSchema;
use warden_migrations::{identifier::MigrationIdentifier, MigrationManager};

use crate::{
    assignment::AssignmentStore,
    cache::AuthorizationCache,
    errors::MigrationRunError,
    identity::IdentityStore,
    query::QueryService,
    storage::{AuthorizationStorage, MemoryStorage, PostgresStorage},
};


/// Everything a host application needs to manage and check authorization.
///
/// All three services share one storage backend and one cache, so a write through
/// [`Self::identity`] or [`Self::assignments`] is visible to the next call on [`Self::queries`].
/// Cloning is cheap.
#[derive(Clone)]
pub struct Authorization {
    storage: Arc<dyn AuthorizationStorage>,

    /// Set only when built through [`Self::with_postgres`].
    postgres: Option<Arc<PostgresStorage>>,

    cache: Arc<AuthorizationCache>,

    team_mode: TeamMode,

    default_guard: String,

    identity: IdentityStore,

    assignments: AssignmentStore,

    queries: QueryService,
}

impl Authorization {
    pub fn new(
        storage: Arc<dyn AuthorizationStorage>,
        cache: Arc<AuthorizationCache>,
        team_mode: TeamMode,
    ) -> Self {
        let identity = IdentityStore::new(storage.clone(), cache.clone(), team_mode);
        let assignments = AssignmentStore::new(storage.clone(), cache.clone(), team_mode);
        let queries = QueryService::new(storage.clone(), cache.clone(), team_mode);

        Self {
            storage,
            postgres: None,
            cache,
            team_mode,
            default_guard: DEFAULT_GUARD.to_string(),
            identity,
            assignments,
            queries,
        }
    }

    pub fn with_default_guard<G>(mut self, default_guard: G) -> Self
    where
        G: Into<String>,
    {
        self.default_guard = default_guard.into();
        self
    }

    /// Builds the service on top of an arbitrary storage backend,
    /// taking the team mode, default guard and cache time-to-live from configuration.
    pub fn from_configuration(
        storage: Arc<dyn AuthorizationStorage>,
        configuration: &AuthorizationConfiguration,
    ) -> Self {
        let cache = Arc::new(AuthorizationCache::new(
            configuration.cache_time_to_live,
        ));

        Self::new(storage, cache, configuration.team_mode)
            .with_default_guard(configuration.default_guard.clone())
    }

    pub fn in_memory(configuration: &AuthorizationConfiguration) -> Self {
        Self::from_configuration(Arc::new(MemoryStorage::new()), configuration)
    }

    pub fn with_postgres(
        database_pool: PgPool,
        configuration: &AuthorizationConfiguration,
    ) -> Self {
        let storage = Arc::new(PostgresStorage::new(
            database_pool,
            PermissionSchema::new(configuration.schema_names.clone(), configuration.team_mode),
        ));

        let mut authorization = Self::from_configuration(storage.clone(), configuration);
        authorization.postgres = Some(storage);

        authorization
    }


    #[inline]
    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    #[inline]
    pub fn assignments(&self) -> &AssignmentStore {
        &self.assignments
    }

    #[inline]
    pub fn queries(&self) -> &QueryService {
        &self.queries
    }

    #[inline]
    pub fn cache(&self) -> &Arc<AuthorizationCache> {
        &self.cache
    }

    #[inline]
    pub fn team_mode(&self) -> TeamMode {
        self.team_mode
    }

    #[inline]
    pub fn default_guard(&self) -> &str {
        &self.default_guard
    }

    #[inline]
    pub fn storage_backend_name(&self) -> &'static str {
        self.storage.backend_name()
    }


    /// Applies all pending permission-table migrations to the PostgreSQL database this
    /// service was built with, using the same table names and team mode as the storage.
    /// If any were applied, the authorization cache is invalidated.
    ///
    /// Fails with [`MigrationRunError::NotBackedByPostgres`] for any other backend.
    pub async fn apply_pending_migrations(
        &self,
    ) -> Result<Vec<MigrationIdentifier>, MigrationRunError> {
        let Some(postgres) = self.postgres.as_ref() else {
            warn!(
                storage_backend = self.storage_backend_name(),
                "Refusing to apply migrations: storage is not PostgreSQL."
            );
            return Err(MigrationRunError::NotBackedByPostgres);
        };

        let mut database_connection = postgres
            .pool()
            .acquire()
            .await
            .map_err(|error| MigrationRunError::ConnectionError { error })?;

        let applied_migrations = MigrationManager::new(postgres.schema())
            .apply_pending(&mut database_connection, None)
            .await?;

        if !applied_migrations.is_empty() {
            self.cache.invalidate();

            info!(
                applied_migration_count = applied_migrations.len(),
                "Applied pending migrations."
            );
        }

        Ok(applied_migrations)
    }
}
