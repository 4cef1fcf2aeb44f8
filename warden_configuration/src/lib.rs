//! This crate contains all configuration-relevant code, including
//! the full configuration structure as well as methods needed to load
//! and validate it.
//!
//! Your starting point should probably be [`Configuration::load_from_default_path`].
//!
//! # Internals
//! The configuration file is first deserialized into unvalidated ("unresolved")
//! structures, which are then turned into validated ("resolved") ones via the traits in
//! [`traits`]. Any additional validation (filter syntax, SQL identifiers, ...) happens
//! during resolution, so a [`Configuration`] that exists is always valid.

#![allow(rustdoc::private_intra_doc_links)]

mod error;
mod structure;
mod traits;
mod utilities;

pub use error::*;
pub use structure::*;
