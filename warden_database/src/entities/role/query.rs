use sqlx::PgConnection;
use warden_core::id::{RoleId, TeamId};

use super::{InternalRoleModel, RoleModel};
use crate::{IntoExternalModel, PermissionSchema, QueryResult};


pub struct RoleQuery;

impl RoleQuery {
    pub async fn get_by_id(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        role_id: RoleId,
    ) -> QueryResult<Option<RoleModel>> {
        let query = format!(
            "SELECT id, {}, name, guard_name, created_at, updated_at \
                FROM {} \
                WHERE id = $1",
            schema.team_select_expression(),
            schema.names.tables.roles
        );

        let internal_role = sqlx::query_as::<_, InternalRoleModel>(&query)
            .bind(role_id.into_uuid())
            .fetch_optional(database_connection)
            .await?;

        Ok(internal_role.map(IntoExternalModel::into_external_model))
    }

    /// Looks a role up by its unique key: `(name, guard)`, plus the team when teams are enabled.
    pub async fn get_by_unique_key(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> QueryResult<Option<RoleModel>> {
        let team_binding = schema.team_binding(team)?;

        let query = format!(
            "SELECT id, {}, name, guard_name, created_at, updated_at \
                FROM {} \
                WHERE name = $1 AND guard_name = $2 AND {}",
            schema.team_select_expression(),
            schema.names.tables.roles,
            schema.team_condition(3)
        );

        let mut prepared_query = sqlx::query_as::<_, InternalRoleModel>(&query)
            .bind(name)
            .bind(guard);

        if let Some(team_id) = team_binding {
            prepared_query = prepared_query.bind(team_id);
        }

        let internal_role = prepared_query.fetch_optional(database_connection).await?;

        Ok(internal_role.map(IntoExternalModel::into_external_model))
    }

    /// Returns every role, optionally restricted to a single guard.
    pub async fn get_all(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        guard: Option<&str>,
    ) -> QueryResult<Vec<RoleModel>> {
        let query = format!(
            "SELECT id, {}, name, guard_name, created_at, updated_at \
                FROM {} \
                WHERE ($1::text IS NULL OR guard_name = $1) \
                ORDER BY guard_name, name",
            schema.team_select_expression(),
            schema.names.tables.roles
        );

        let internal_roles = sqlx::query_as::<_, InternalRoleModel>(&query)
            .bind(guard)
            .fetch_all(database_connection)
            .await?;

        Ok(internal_roles
            .into_iter()
            .map(IntoExternalModel::into_external_model)
            .collect())
    }
}
