use std::time::Duration;

use serde::Deserialize;
use warden_core::{
    schema::{ColumnNames, SchemaNames, TableNames},
    team::TeamMode,
    DEFAULT_GUARD,
};

use crate::traits::TryResolve;
use crate::AuthorizationConfigurationError;


/// Twenty-four hours, matching how long permission caches usually live.
const DEFAULT_CACHE_TIME_TO_LIVE_SECONDS: u64 = 60 * 60 * 24;


#[derive(Deserialize, Debug, Clone, Default)]
pub(crate) struct UnresolvedAuthorizationConfiguration {
    #[serde(default)]
    teams: bool,

    default_guard: Option<String>,

    cache_time_to_live_seconds: Option<u64>,

    #[serde(default)]
    table_names: TableNames,

    #[serde(default)]
    column_names: ColumnNames,
}


/// Authorization model configuration.
#[derive(Debug, Clone)]
pub struct AuthorizationConfiguration {
    /// Whether roles and assignments are partitioned by team.
    pub team_mode: TeamMode,

    /// Guard used when a command does not specify one.
    pub default_guard: String,

    /// How long a built authorization graph may be served before it is rebuilt.
    pub cache_time_to_live: Duration,

    /// Table and column names of the permission schema.
    pub schema_names: SchemaNames,
}

impl TryResolve for UnresolvedAuthorizationConfiguration {
    type Resolved = AuthorizationConfiguration;
    type Error = AuthorizationConfigurationError;

    fn try_resolve(self) -> Result<Self::Resolved, Self::Error> {
        let default_guard = self
            .default_guard
            .unwrap_or_else(|| DEFAULT_GUARD.to_string());

        if default_guard.trim().is_empty() {
            return Err(AuthorizationConfigurationError::EmptyDefaultGuard);
        }

        let cache_time_to_live_seconds = self
            .cache_time_to_live_seconds
            .unwrap_or(DEFAULT_CACHE_TIME_TO_LIVE_SECONDS);

        if cache_time_to_live_seconds == 0 {
            return Err(AuthorizationConfigurationError::ZeroCacheTimeToLive);
        }

        let schema_names = SchemaNames {
            tables: self.table_names,
            columns: self.column_names,
        };

        schema_names.validate()?;


        Ok(AuthorizationConfiguration {
            team_mode: TeamMode::from_teams_flag(self.teams),
            default_guard,
            cache_time_to_live: Duration::from_secs(cache_time_to_live_seconds),
            schema_names,
        })
    }
}

impl Default for AuthorizationConfiguration {
    fn default() -> Self {
        Self {
            team_mode: TeamMode::Disabled,
            default_guard: DEFAULT_GUARD.to_string(),
            cache_time_to_live: Duration::from_secs(DEFAULT_CACHE_TIME_TO_LIVE_SECONDS),
            schema_names: SchemaNames::default(),
        }
    }
}
