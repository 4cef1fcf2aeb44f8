//! The `role_has_permissions` pivot table.

use sqlx::{FromRow, PgConnection};
use uuid::Uuid;
use warden_core::id::{PermissionId, RoleId};

use crate::{IntoExternalModel, PermissionSchema, QueryResult};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RolePermissionModel {
    pub role_id: RoleId,

    pub permission_id: PermissionId,
}

#[derive(FromRow)]
struct InternalRolePermissionModel {
    role_id: Uuid,

    permission_id: Uuid,
}

impl IntoExternalModel for InternalRolePermissionModel {
    type ExternalModel = RolePermissionModel;

    fn into_external_model(self) -> Self::ExternalModel {
        RolePermissionModel {
            role_id: RoleId::new(self.role_id),
            permission_id: PermissionId::new(self.permission_id),
        }
    }
}



pub struct RolePermissionQuery;

impl RolePermissionQuery {
    pub async fn get_all(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
    ) -> QueryResult<Vec<RolePermissionModel>> {
        let columns = &schema.names.columns;

        let query = format!(
            "SELECT {} AS role_id, {} AS permission_id FROM {}",
            columns.role_pivot_key,
            columns.permission_pivot_key,
            schema.names.tables.role_has_permissions
        );

        let internal_models = sqlx::query_as::<_, InternalRolePermissionModel>(&query)
            .fetch_all(database_connection)
            .await?;

        Ok(internal_models
            .into_iter()
            .map(IntoExternalModel::into_external_model)
            .collect())
    }
}



pub struct RolePermissionMutation;

impl RolePermissionMutation {
    /// Grants a permission to a role. If the role already had the permission,
    /// nothing happens and `false` is returned.
    pub async fn grant(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> QueryResult<bool> {
        let columns = &schema.names.columns;

        let query = format!(
            "INSERT INTO {} ({}, {}) \
                VALUES ($1, $2) \
                ON CONFLICT DO NOTHING",
            schema.names.tables.role_has_permissions,
            columns.role_pivot_key,
            columns.permission_pivot_key
        );

        let query_result = sqlx::query(&query)
            .bind(role_id.into_uuid())
            .bind(permission_id.into_uuid())
            .execute(database_connection)
            .await?;

        Ok(query_result.rows_affected() == 1)
    }

    /// Revokes a permission from a role, returning `true` if the role had it.
    pub async fn revoke(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> QueryResult<bool> {
        let columns = &schema.names.columns;

        let query = format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            schema.names.tables.role_has_permissions,
            columns.role_pivot_key,
            columns.permission_pivot_key
        );

        let query_result = sqlx::query(&query)
            .bind(role_id.into_uuid())
            .bind(permission_id.into_uuid())
            .execute(database_connection)
            .await?;

        Ok(query_result.rows_affected() == 1)
    }
}
