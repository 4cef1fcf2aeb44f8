//! The `model_has_roles` pivot table.

use sqlx::{FromRow, PgConnection};
use uuid::Uuid;
use warden_core::{
    id::{RoleId, TeamId},
    subject::Subject,
    team::TeamMode,
};

use crate::{IntoExternalModel, PermissionSchema, QueryResult};


#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubjectRoleModel {
    pub subject: Subject,

    pub role_id: RoleId,

    pub team_id: Option<TeamId>,
}

#[derive(FromRow)]
struct InternalSubjectRoleModel {
    role_id: Uuid,

    model_type: String,

    model_id: String,

    team_id: Option<i64>,
}

impl IntoExternalModel for InternalSubjectRoleModel {
    type ExternalModel = SubjectRoleModel;

    fn into_external_model(self) -> Self::ExternalModel {
        SubjectRoleModel {
            subject: Subject::new(self.model_type, self.model_id),
            role_id: RoleId::new(self.role_id),
            team_id: self.team_id.map(TeamId::new),
        }
    }
}



pub struct SubjectRoleQuery;

impl SubjectRoleQuery {
    pub async fn get_all(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
    ) -> QueryResult<Vec<SubjectRoleModel>> {
        let columns = &schema.names.columns;

        let query = format!(
            "SELECT {} AS role_id, model_type, {} AS model_id, {} FROM {}",
            columns.role_pivot_key,
            columns.model_morph_key,
            schema.team_select_expression(),
            schema.names.tables.model_has_roles
        );

        let internal_models = sqlx::query_as::<_, InternalSubjectRoleModel>(&query)
            .fetch_all(database_connection)
            .await?;

        Ok(internal_models
            .into_iter()
            .map(IntoExternalModel::into_external_model)
            .collect())
    }
}



pub struct SubjectRoleMutation;

impl SubjectRoleMutation {
    /// Assigns a role to a subject (within `team`, if teams are enabled).
    /// Returns `false` if the subject already had the role.
    pub async fn assign(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        subject: &Subject,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> QueryResult<bool> {
        let team_binding = schema.team_binding(team)?;
        let columns = &schema.names.columns;

        let query = match schema.team_mode {
            TeamMode::Enabled => format!(
                "INSERT INTO {} ({}, model_type, {}, {}) \
                    VALUES ($1, $2, $3, $4) \
                    ON CONFLICT DO NOTHING",
                schema.names.tables.model_has_roles,
                columns.role_pivot_key,
                columns.model_morph_key,
                columns.team_foreign_key
            ),
            TeamMode::Disabled => format!(
                "INSERT INTO {} ({}, model_type, {}) \
                    VALUES ($1, $2, $3) \
                    ON CONFLICT DO NOTHING",
                schema.names.tables.model_has_roles,
                columns.role_pivot_key,
                columns.model_morph_key
            ),
        };

        let mut prepared_query = sqlx::query(&query)
            .bind(role_id.into_uuid())
            .bind(subject.subject_type())
            .bind(subject.subject_id());

        if let Some(team_id) = team_binding {
            prepared_query = prepared_query.bind(team_id);
        }

        let query_result = prepared_query.execute(database_connection).await?;

        Ok(query_result.rows_affected() == 1)
    }

    /// Removes a role from a subject, returning `true` if the subject had it.
    pub async fn remove(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        subject: &Subject,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> QueryResult<bool> {
        let team_binding = schema.team_binding(team)?;
        let columns = &schema.names.columns;

        let query = format!(
            "DELETE FROM {} \
                WHERE {} = $1 AND model_type = $2 AND {} = $3 AND {}",
            schema.names.tables.model_has_roles,
            columns.role_pivot_key,
            columns.model_morph_key,
            schema.team_condition(4)
        );

        let mut prepared_query = sqlx::query(&query)
            .bind(role_id.into_uuid())
            .bind(subject.subject_type())
            .bind(subject.subject_id());

        if let Some(team_id) = team_binding {
            prepared_query = prepared_query.bind(team_id);
        }

        let query_result = prepared_query.execute(database_connection).await?;

        Ok(query_result.rows_affected() == 1)
    }

    /// Removes every role the subject holds (within `team`, if teams are enabled).
    /// Returns the number of removed assignments.
    pub async fn remove_all_for_subject(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        subject: &Subject,
        team: Option<TeamId>,
    ) -> QueryResult<u64> {
        let team_binding = schema.team_binding(team)?;
        let columns = &schema.names.columns;

        let query = format!(
            "DELETE FROM {} \
                WHERE model_type = $1 AND {} = $2 AND {}",
            schema.names.tables.model_has_roles,
            columns.model_morph_key,
            schema.team_condition(3)
        );

        let mut prepared_query = sqlx::query(&query)
            .bind(subject.subject_type())
            .bind(subject.subject_id());

        if let Some(team_id) = team_binding {
            prepared_query = prepared_query.bind(team_id);
        }

        let query_result = prepared_query.execute(database_connection).await?;

        Ok(query_result.rows_affected())
    }
}
