use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use warden_core::id::PermissionId;
pub use warden_core::models::Permission as PermissionModel;

use crate::IntoExternalModel;


#[derive(FromRow)]
pub(crate) struct InternalPermissionModel {
    pub(crate) id: Uuid,

    pub(crate) name: String,

    pub(crate) guard_name: String,

    pub(crate) created_at: DateTime<Utc>,

    pub(crate) updated_at: DateTime<Utc>,
}

impl IntoExternalModel for InternalPermissionModel {
    type ExternalModel = PermissionModel;

    fn into_external_model(self) -> Self::ExternalModel {
        PermissionModel {
            id: PermissionId::new(self.id),
            name: self.name,
            guard: self.guard_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
