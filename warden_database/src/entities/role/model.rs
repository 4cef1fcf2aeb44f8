use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use warden_core::id::{RoleId, TeamId};
pub use warden_core::models::Role as RoleModel;

use crate::IntoExternalModel;


#[derive(FromRow)]
pub(crate) struct InternalRoleModel {
    pub(crate) id: Uuid,

    /// Selected as a typed NULL when teams are disabled.
    pub(crate) team_id: Option<i64>,

    pub(crate) name: String,

    pub(crate) guard_name: String,

    pub(crate) created_at: DateTime<Utc>,

    pub(crate) updated_at: DateTime<Utc>,
}

impl IntoExternalModel for InternalRoleModel {
    type ExternalModel = RoleModel;

    fn into_external_model(self) -> Self::ExternalModel {
        RoleModel {
            id: RoleId::new(self.id),
            team_id: self.team_id.map(TeamId::new),
            name: self.name,
            guard: self.guard_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
