use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

mod authorization;
mod database;
mod logging;

pub use authorization::*;
pub use database::*;
pub use logging::*;

use crate::traits::{Resolve, TryResolve, TryResolveWithContext};
use crate::utilities::get_default_configuration_file_path;
use crate::{ConfigurationLoadingError, ConfigurationResolutionError};



#[derive(Deserialize, Debug)]
pub(crate) struct UnresolvedConfiguration {
    /// Logging-related configuration.
    logging: UnresolvedLoggingConfiguration,

    /// Configuration related to the database.
    database: UnresolvedDatabaseConfiguration,

    /// Authorization model configuration.
    #[serde(default)]
    authorization: UnresolvedAuthorizationConfiguration,
}


/// The entire warden configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// This is the file path this [`Configuration`] instance was loaded from.
    pub configuration_file_path: PathBuf,

    /// Logging-related configuration.
    pub logging: LoggingConfiguration,

    /// Configuration related to the database.
    pub database: DatabaseConfiguration,

    /// Authorization model configuration.
    pub authorization: AuthorizationConfiguration,
}



pub(crate) struct ConfigurationResolutionContext {
    configuration_file_path: PathBuf,
}


impl TryResolveWithContext for UnresolvedConfiguration {
    type Resolved = Configuration;
    type Context = ConfigurationResolutionContext;
    type Error = ConfigurationResolutionError;

    fn try_resolve_with_context(
        self,
        context: Self::Context,
    ) -> Result<Self::Resolved, Self::Error> {
        let logging = self.logging.try_resolve()?;
        let database = self.database.resolve();
        let authorization = self.authorization.try_resolve()?;

        Ok(Configuration {
            configuration_file_path: context.configuration_file_path,
            logging,
            database,
            authorization,
        })
    }
}


impl Configuration {
    /// Load the configuration from a specific file path.
    pub fn load_from_path<S: AsRef<Path>>(
        configuration_file_path: S,
    ) -> Result<Self, ConfigurationLoadingError> {
        // Read the configuration file into memory as a string.
        let configuration_string =
            fs::read_to_string(configuration_file_path.as_ref()).map_err(|error| {
                ConfigurationLoadingError::UnableToReadConfigurationFile {
                    path: configuration_file_path.as_ref().to_path_buf(),
                    error,
                }
            })?;

        let canonical_configuration_file_path =
            dunce::canonicalize(configuration_file_path.as_ref()).map_err(|error| {
                ConfigurationLoadingError::UnableToReadConfigurationFile {
                    path: configuration_file_path.as_ref().to_path_buf(),
                    error,
                }
            })?;

        Self::load_from_str(&configuration_string, canonical_configuration_file_path)
    }

    /// Parse and resolve the configuration from a TOML string.
    /// `configuration_file_path` is only recorded, never read.
    pub fn load_from_str(
        configuration_string: &str,
        configuration_file_path: PathBuf,
    ) -> Result<Self, ConfigurationLoadingError> {
        // Parse the string into the [`UnresolvedConfiguration`] structure and then resolve it.
        let unresolved_configuration =
            toml::from_str::<UnresolvedConfiguration>(configuration_string)
                .map_err(|error| ConfigurationLoadingError::ParsingError { error })?;

        let resolved_configuration =
            unresolved_configuration.try_resolve_with_context(ConfigurationResolutionContext {
                configuration_file_path,
            })?;

        Ok(resolved_configuration)
    }

    /// Load the configuration from the default path (`./data/configuration.toml`).
    pub fn load_from_default_path() -> Result<Self, ConfigurationLoadingError> {
        Configuration::load_from_path(get_default_configuration_file_path()?)
    }
}



#[cfg(test)]
mod test {
    use std::time::Duration;

    use warden_core::team::TeamMode;

    use super::*;
    use crate::{AuthorizationConfigurationError, LoggingConfigurationError};

    const MINIMAL_CONFIGURATION: &str = r#"
        [logging]
        console_output_level_filter = "info"
        log_file_output_level_filter = "debug,sqlx=warn"
        log_file_output_directory = "./logs"

        [database]
        host = "localhost"
        port = 5432
        username = "warden"
        database_name = "warden"
    "#;

    fn load(configuration: &str) -> Result<Configuration, ConfigurationLoadingError> {
        Configuration::load_from_str(configuration, PathBuf::from("configuration.toml"))
    }

    #[test]
    fn authorization_table_falls_back_to_defaults() {
        let configuration = load(MINIMAL_CONFIGURATION).unwrap();

        assert_eq!(
            configuration.authorization.team_mode,
            TeamMode::Disabled
        );
        assert_eq!(configuration.authorization.default_guard, "web");
        assert_eq!(
            configuration.authorization.cache_time_to_live,
            Duration::from_secs(86400)
        );
        assert_eq!(
            configuration.authorization.schema_names.tables.model_has_roles,
            "model_has_roles"
        );
        assert_eq!(
            configuration.database.connection_url(),
            "postgres://warden@localhost:5432/warden"
        );
    }

    #[test]
    fn parses_team_mode_and_renamed_tables() {
        let configuration = load(&format!(
            "{MINIMAL_CONFIGURATION}\n\
            [authorization]\n\
            teams = true\n\
            default_guard = \"api\"\n\
            cache_time_to_live_seconds = 60\n\
            [authorization.table_names]\n\
            roles = \"acl_roles\"\n\
            [authorization.column_names]\n\
            team_foreign_key = \"organization_id\"\n"
        ))
        .unwrap();

        let authorization = configuration.authorization;

        assert_eq!(authorization.team_mode, TeamMode::Enabled);
        assert_eq!(authorization.default_guard, "api");
        assert_eq!(authorization.cache_time_to_live, Duration::from_secs(60));
        assert_eq!(authorization.schema_names.tables.roles, "acl_roles");
        assert_eq!(
            authorization.schema_names.tables.permissions,
            "permissions"
        );
        assert_eq!(
            authorization.schema_names.columns.team_foreign_key,
            "organization_id"
        );
    }

    #[test]
    fn rejects_invalid_table_names() {
        let error = load(&format!(
            "{MINIMAL_CONFIGURATION}\n\
            [authorization.table_names]\n\
            permissions = \"permissions; --\"\n"
        ))
        .unwrap_err();

        assert!(matches!(
            error,
            ConfigurationLoadingError::ResolutionError {
                error: ConfigurationResolutionError::AuthorizationConfigurationError {
                    error: AuthorizationConfigurationError::InvalidSchemaName { .. }
                }
            }
        ));
    }

    #[test]
    fn rejects_invalid_tracing_filters() {
        let error = load(&MINIMAL_CONFIGURATION.replace("\"info\"", "\"info,warden=notalevel\""))
            .unwrap_err();

        assert!(matches!(
            error,
            ConfigurationLoadingError::ResolutionError {
                error: ConfigurationResolutionError::LoggingConfigurationError {
                    error: LoggingConfigurationError::InvalidTracingFilter { .. }
                }
            }
        ));
    }
}
