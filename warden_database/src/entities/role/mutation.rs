use chrono::Utc;
use sqlx::PgConnection;
use warden_core::id::{RoleId, TeamId};
use warden_core::team::TeamMode;

use super::{InternalRoleModel, RoleModel};
use crate::{IntoExternalModel, PermissionSchema, QueryResult};


pub struct RoleMutation;

impl RoleMutation {
    /// Inserts a new role. A unique key collision surfaces as a unique violation.
    pub async fn create(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> QueryResult<RoleModel> {
        let team_binding = schema.team_binding(team)?;

        let role_id = RoleId::generate();
        let creation_time = Utc::now();

        let query = match schema.team_mode {
            TeamMode::Enabled => format!(
                "INSERT INTO {} (id, name, guard_name, created_at, updated_at, {}) \
                    VALUES ($1, $2, $3, $4, $4, $5) \
                    RETURNING id, {}, name, guard_name, created_at, updated_at",
                schema.names.tables.roles,
                schema.names.columns.team_foreign_key,
                schema.team_select_expression()
            ),
            TeamMode::Disabled => format!(
                "INSERT INTO {} (id, name, guard_name, created_at, updated_at) \
                    VALUES ($1, $2, $3, $4, $4) \
                    RETURNING id, {}, name, guard_name, created_at, updated_at",
                schema.names.tables.roles,
                schema.team_select_expression()
            ),
        };

        let mut prepared_query = sqlx::query_as::<_, InternalRoleModel>(&query)
            .bind(role_id.into_uuid())
            .bind(name)
            .bind(guard)
            .bind(creation_time);

        if let Some(team_id) = team_binding {
            prepared_query = prepared_query.bind(team_id);
        }

        let newly_created_role = prepared_query.fetch_one(database_connection).await?;

        Ok(newly_created_role.into_external_model())
    }

    /// Inserts a new role unless one with the same unique key already exists,
    /// in which case `None` is returned. Concurrent inserts of the same key never
    /// surface as a unique violation.
    pub async fn create_if_absent(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> QueryResult<Option<RoleModel>> {
        let team_binding = schema.team_binding(team)?;
        let creation_time = Utc::now();

        let query = match schema.team_mode {
            TeamMode::Enabled => format!(
                "INSERT INTO {} (id, name, guard_name, created_at, updated_at, {}) \
                    VALUES ($1, $2, $3, $4, $4, $5) \
                    ON CONFLICT DO NOTHING \
                    RETURNING id, {}, name, guard_name, created_at, updated_at",
                schema.names.tables.roles,
                schema.names.columns.team_foreign_key,
                schema.team_select_expression()
            ),
            TeamMode::Disabled => format!(
                "INSERT INTO {} (id, name, guard_name, created_at, updated_at) \
                    VALUES ($1, $2, $3, $4, $4) \
                    ON CONFLICT DO NOTHING \
                    RETURNING id, {}, name, guard_name, created_at, updated_at",
                schema.names.tables.roles,
                schema.team_select_expression()
            ),
        };

        let mut prepared_query = sqlx::query_as::<_, InternalRoleModel>(&query)
            .bind(RoleId::generate().into_uuid())
            .bind(name)
            .bind(guard)
            .bind(creation_time);

        if let Some(team_id) = team_binding {
            prepared_query = prepared_query.bind(team_id);
        }

        let newly_created_role = prepared_query
            .fetch_optional(database_connection)
            .await?;

        Ok(newly_created_role.map(IntoExternalModel::into_external_model))
    }

    /// Renames a role. Returns `None` if no such role exists.
    pub async fn rename(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        role_id: RoleId,
        new_name: &str,
    ) -> QueryResult<Option<RoleModel>> {
        let query = format!(
            "UPDATE {} \
                SET name = $1, updated_at = $2 \
                WHERE id = $3 \
                RETURNING id, {}, name, guard_name, created_at, updated_at",
            schema.names.tables.roles,
            schema.team_select_expression()
        );

        let updated_role = sqlx::query_as::<_, InternalRoleModel>(&query)
            .bind(new_name)
            .bind(Utc::now())
            .bind(role_id.into_uuid())
            .fetch_optional(database_connection)
            .await?;

        Ok(updated_role.map(IntoExternalModel::into_external_model))
    }

    /// Deletes a role, returning `true` if it existed.
    ///
    /// Rows in `role_has_permissions` and `model_has_roles` referencing it
    /// are removed by the `ON DELETE CASCADE` foreign keys.
    pub async fn delete(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        role_id: RoleId,
    ) -> QueryResult<bool> {
        let query = format!("DELETE FROM {} WHERE id = $1", schema.names.tables.roles);

        let query_result = sqlx::query(&query)
            .bind(role_id.into_uuid())
            .execute(database_connection)
            .await?;

        Ok(query_result.rows_affected() == 1)
    }
}
