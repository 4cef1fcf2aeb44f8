//! PostgreSQL access to the permission tables.
//!
//! Every query and mutation takes a `&mut PgConnection` (a pooled connection or an open
//! transaction) and a [`PermissionSchema`], which carries the configured table and column
//! names and the team mode. Queries are checked at runtime, since their shape depends
//! on configuration.

use std::borrow::Cow;

use thiserror::Error;

pub mod entities;
mod schema;

pub use schema::PermissionSchema;



#[derive(Debug, Error)]
pub enum QueryError {
    #[error("sqlx error")]
    SqlxError {
        #[from]
        #[source]
        error: sqlx::Error,
    },

    #[error("model error: {}", .reason)]
    ModelError { reason: Cow<'static, str> },

    #[error("database inconsistency: {}", .problem)]
    DatabaseInconsistencyError { problem: Cow<'static, str> },
}

impl QueryError {
    #[inline]
    pub fn model_error<R>(reason: R) -> Self
    where
        R: Into<Cow<'static, str>>,
    {
        Self::ModelError {
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn database_inconsistency<R>(problem: R) -> Self
    where
        R: Into<Cow<'static, str>>,
    {
        Self::DatabaseInconsistencyError {
            problem: problem.into(),
        }
    }

    /// Returns `true` if this error was caused by a unique (or primary key) constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            QueryError::SqlxError {
                error: sqlx::Error::Database(database_error),
            } => database_error.is_unique_violation(),
            _ => false,
        }
    }

    /// Returns `true` if this error was caused by a foreign key constraint.
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            QueryError::SqlxError {
                error: sqlx::Error::Database(database_error),
            } => database_error.is_foreign_key_violation(),
            _ => false,
        }
    }
}



pub type QueryResult<R, E = QueryError> = Result<R, E>;


pub trait IntoExternalModel {
    type ExternalModel;

    fn into_external_model(self) -> Self::ExternalModel;
}
