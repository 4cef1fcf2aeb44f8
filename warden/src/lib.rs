//! Role-based access control for multi-tenant applications.
//!
//! Start with [`Authorization`], which bundles:
//! - the [`IdentityStore`] (permissions and roles),
//! - the [`AssignmentStore`] (who holds what),
//! - the [`QueryService`] (authorization checks, answered from the [`AuthorizationCache`]).
//!
//! Storage is pluggable through [`AuthorizationStorage`]; PostgreSQL and in-memory
//! backends are provided.

pub mod assignment;
pub mod cache;
pub mod database;
pub mod errors;
pub mod graph;
pub mod identity;
pub mod logging;
pub mod query;
mod scope;
pub mod seeder;
pub mod service;
pub mod storage;

pub use assignment::AssignmentStore;
pub use cache::{AuthorizationCache, BroadcastInvalidationHook, InvalidationHook};
pub use errors::{AuthorizationError, AuthorizationResult};
pub use identity::IdentityStore;
pub use query::QueryService;
pub use service::Authorization;
pub use storage::{AuthorizationStorage, MemoryStorage, PostgresStorage};
