use std::{borrow::Cow, io, path::PathBuf};

use thiserror::Error;
use warden_core::schema::InvalidIdentifierError;


#[derive(Debug, Error)]
pub enum LoggingConfigurationError {
    #[error(
        "invalid tracing filter of type {} (doesn't parse with EnvFilter): {}",
        .kind,
        .invalid_filter
    )]
    InvalidTracingFilter {
        invalid_filter: String,

        kind: Cow<'static, str>,

        #[source]
        error: tracing_subscriber::filter::ParseError,
    },
}


#[derive(Debug, Error)]
pub enum AuthorizationConfigurationError {
    #[error("default_guard must not be empty")]
    EmptyDefaultGuard,

    #[error("cache_time_to_live_seconds must be greater than zero")]
    ZeroCacheTimeToLive,

    #[error("invalid table or column name")]
    InvalidSchemaName {
        #[from]
        #[source]
        error: InvalidIdentifierError,
    },
}


#[derive(Debug, Error)]
pub enum ConfigurationResolutionError {
    #[error("error while resolving \"logging\" table")]
    LoggingConfigurationError {
        #[from]
        #[source]
        error: LoggingConfigurationError,
    },

    #[error("error while resolving \"authorization\" table")]
    AuthorizationConfigurationError {
        #[from]
        #[source]
        error: AuthorizationConfigurationError,
    },
}


#[derive(Debug, Error)]
pub enum ConfigurationLoadingError {
    #[error("unable to determine the current directory")]
    UnableToDetermineCurrentDirectory {
        #[source]
        error: io::Error,
    },

    #[error("unable to read configuration file at {}", .path.display())]
    UnableToReadConfigurationFile {
        path: PathBuf,

        #[source]
        error: io::Error,
    },

    #[error("failed to parse the contents of the configuration file as TOML")]
    ParsingError {
        #[from]
        #[source]
        error: toml::de::Error,
    },

    #[error("failed to resolve and validate the contents of the configuration")]
    ResolutionError {
        #[from]
        #[source]
        error: ConfigurationResolutionError,
    },
}
