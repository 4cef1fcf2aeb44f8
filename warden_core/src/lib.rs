//! Core types shared by every warden crate: identifiers, polymorphic subjects,
//! team scoping and the permission / role models.

pub mod id;
pub mod models;
pub mod schema;
pub mod subject;
pub mod team;

/// Guard used when none is specified (e.g. by the role seeder).
pub const DEFAULT_GUARD: &str = "web";
