use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{PermissionId, RoleId, TeamId};


/// A named permission within a guard.
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,

    /// Unique within `guard`.
    pub name: String,

    pub guard: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}


/// A named role within a guard (and a team, if team scoping is enabled).
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,

    /// Always `Some` when team scoping is enabled, always `None` otherwise.
    pub team_id: Option<TeamId>,

    /// Unique within `(guard, team_id)`.
    pub name: String,

    pub guard: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}
