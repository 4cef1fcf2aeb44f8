use std::fmt::Display;

use thiserror::Error;
use warden_core::{id::TeamId, team::TeamScopeError};
use warden_database::QueryError;
use warden_migrations::errors::MigrationApplyError;


/// The kind of identity record an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityKind {
    Permission,
    Role,
}

impl Display for IdentityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityKind::Permission => write!(f, "permission"),
            IdentityKind::Role => write!(f, "role"),
        }
    }
}


fn team_suffix(team: &Option<TeamId>) -> String {
    match team {
        Some(team) => format!(" (team {})", team),
        None => String::new(),
    }
}


/// Failures of the underlying storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database query failed")]
    QueryError {
        #[from]
        #[source]
        error: QueryError,
    },

    #[error("failed while setting up or commiting transaction")]
    TransactionError {
        #[source]
        error: sqlx::Error,
    },

    #[error("unable to acquire a database connection")]
    ConnectionError {
        #[source]
        error: sqlx::Error,
    },
}


/// Failures of [`Authorization::apply_pending_migrations`][crate::Authorization::apply_pending_migrations].
#[derive(Debug, Error)]
pub enum MigrationRunError {
    #[error("the authorization service is not backed by PostgreSQL, there is nothing to migrate")]
    NotBackedByPostgres,

    #[error("unable to acquire a database connection")]
    ConnectionError {
        #[source]
        error: sqlx::Error,
    },

    #[error("failed to apply migrations")]
    ApplyError {
        #[from]
        #[source]
        error: MigrationApplyError,
    },
}


#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error(
        "{} \"{}\" already exists in guard \"{}\"{}",
        .kind,
        .name,
        .guard,
        team_suffix(.team)
    )]
    DuplicateIdentity {
        kind: IdentityKind,

        name: String,

        guard: String,

        team: Option<TeamId>,
    },

    #[error("{} {} does not exist", .kind, .id)]
    DanglingReference { kind: IdentityKind, id: String },

    #[error("team argument doesn't match the deployment's team mode")]
    ConfigurationMismatch {
        #[from]
        #[source]
        error: TeamScopeError,
    },

    #[error("{} not found: {}", .kind, .description)]
    NotFound {
        kind: IdentityKind,

        description: String,
    },

    #[error(
        "cannot grant permission of guard \"{}\" to role of guard \"{}\"",
        .permission_guard,
        .role_guard
    )]
    GuardMismatch {
        role_guard: String,

        permission_guard: String,
    },

    #[error("storage error")]
    StorageError {
        #[from]
        #[source]
        error: StorageError,
    },
}

impl AuthorizationError {
    pub(crate) fn duplicate_permission<N, G>(name: N, guard: G) -> Self
    where
        N: Into<String>,
        G: Into<String>,
    {
        Self::DuplicateIdentity {
            kind: IdentityKind::Permission,
            name: name.into(),
            guard: guard.into(),
            team: None,
        }
    }

    pub(crate) fn duplicate_role<N, G>(name: N, guard: G, team: Option<TeamId>) -> Self
    where
        N: Into<String>,
        G: Into<String>,
    {
        Self::DuplicateIdentity {
            kind: IdentityKind::Role,
            name: name.into(),
            guard: guard.into(),
            team,
        }
    }

    pub(crate) fn dangling<I>(kind: IdentityKind, id: I) -> Self
    where
        I: Display,
    {
        Self::DanglingReference {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn not_found<D>(kind: IdentityKind, description: D) -> Self
    where
        D: Into<String>,
    {
        Self::NotFound {
            kind,
            description: description.into(),
        }
    }
}

impl From<QueryError> for AuthorizationError {
    fn from(error: QueryError) -> Self {
        Self::StorageError {
            error: StorageError::QueryError { error },
        }
    }
}


pub type AuthorizationResult<T, E = AuthorizationError> = Result<T, E>;
