#![allow(dead_code)]

use std::{borrow::Cow, sync::Arc, time::Duration};

use warden::{Authorization, AuthorizationCache, MemoryStorage};
use warden_core::{subject::AsSubject, team::TeamMode};


pub const WEB: &str = "web";
pub const API: &str = "api";


/// A fresh service over an empty in-memory backend.
pub fn in_memory_authorization(team_mode: TeamMode) -> Authorization {
    Authorization::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(AuthorizationCache::new(Duration::from_secs(60 * 60))),
        team_mode,
    )
}


/// Stand-in for a host application's user entity.
pub struct User {
    pub id: u64,
}

impl AsSubject for User {
    fn subject_type(&self) -> Cow<'_, str> {
        Cow::Borrowed("User")
    }

    fn subject_id(&self) -> Cow<'_, str> {
        Cow::Owned(self.id.to_string())
    }
}
