//! The `model_has_permissions` pivot table (permissions granted directly to subjects).

use sqlx::{FromRow, PgConnection};
use uuid::Uuid;
use warden_core::{
    id::{PermissionId, TeamId},
    subject::Subject,
    team::TeamMode,
};

use crate::{IntoExternalModel, PermissionSchema, QueryResult};


#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubjectPermissionModel {
    pub subject: Subject,

    pub permission_id: PermissionId,

    pub team_id: Option<TeamId>,
}

#[derive(FromRow)]
struct InternalSubjectPermissionModel {
    permission_id: Uuid,

    model_type: String,

    model_id: String,

    team_id: Option<i64>,
}

impl IntoExternalModel for InternalSubjectPermissionModel {
    type ExternalModel = SubjectPermissionModel;

    fn into_external_model(self) -> Self::ExternalModel {
        SubjectPermissionModel {
            subject: Subject::new(self.model_type, self.model_id),
            permission_id: PermissionId::new(self.permission_id),
            team_id: self.team_id.map(TeamId::new),
        }
    }
}



pub struct SubjectPermissionQuery;

impl SubjectPermissionQuery {
    pub async fn get_all(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
    ) -> QueryResult<Vec<SubjectPermissionModel>> {
        let columns = &schema.names.columns;

        let query = format!(
            "SELECT {} AS permission_id, model_type, {} AS model_id, {} FROM {}",
            columns.permission_pivot_key,
            columns.model_morph_key,
            schema.team_select_expression(),
            schema.names.tables.model_has_permissions
        );

        let internal_models = sqlx::query_as::<_, InternalSubjectPermissionModel>(&query)
            .fetch_all(database_connection)
            .await?;

        Ok(internal_models
            .into_iter()
            .map(IntoExternalModel::into_external_model)
            .collect())
    }
}



pub struct SubjectPermissionMutation;

impl SubjectPermissionMutation {
    /// Grants a permission directly to a subject (within `team`, if teams are enabled).
    /// Returns `false` if the subject already had the permission.
    pub async fn assign(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        subject: &Subject,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> QueryResult<bool> {
        let team_binding = schema.team_binding(team)?;
        let columns = &schema.names.columns;

        let query = match schema.team_mode {
            TeamMode::Enabled => format!(
                "INSERT INTO {} ({}, model_type, {}, {}) \
                    VALUES ($1, $2, $3, $4) \
                    ON CONFLICT DO NOTHING",
                schema.names.tables.model_has_permissions,
                columns.permission_pivot_key,
                columns.model_morph_key,
                columns.team_foreign_key
            ),
            TeamMode::Disabled => format!(
                "INSERT INTO {} ({}, model_type, {}) \
                    VALUES ($1, $2, $3) \
                    ON CONFLICT DO NOTHING",
                schema.names.tables.model_has_permissions,
                columns.permission_pivot_key,
                columns.model_morph_key
            ),
        };

        let mut prepared_query = sqlx::query(&query)
            .bind(permission_id.into_uuid())
            .bind(subject.subject_type())
            .bind(subject.subject_id());

        if let Some(team_id) = team_binding {
            prepared_query = prepared_query.bind(team_id);
        }

        let query_result = prepared_query.execute(database_connection).await?;

        Ok(query_result.rows_affected() == 1)
    }

    /// Revokes a directly-granted permission, returning `true` if the subject had it.
    pub async fn revoke(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        subject: &Subject,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> QueryResult<bool> {
        let team_binding = schema.team_binding(team)?;
        let columns = &schema.names.columns;

        let query = format!(
            "DELETE FROM {} \
                WHERE {} = $1 AND model_type = $2 AND {} = $3 AND {}",
            schema.names.tables.model_has_permissions,
            columns.permission_pivot_key,
            columns.model_morph_key,
            schema.team_condition(4)
        );

        let mut prepared_query = sqlx::query(&query)
            .bind(permission_id.into_uuid())
            .bind(subject.subject_type())
            .bind(subject.subject_id());

        if let Some(team_id) = team_binding {
            prepared_query = prepared_query.bind(team_id);
        }

        let query_result = prepared_query.execute(database_connection).await?;

        Ok(query_result.rows_affected() == 1)
    }
}
