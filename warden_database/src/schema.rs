use warden_core::{id::TeamId, schema::SchemaNames, team::TeamMode};

use crate::{QueryError, QueryResult};


/// Everything needed to assemble SQL for the permission tables.
#[derive(Clone, Debug, Default)]
pub struct PermissionSchema {
    pub names: SchemaNames,

    pub team_mode: TeamMode,
}

impl PermissionSchema {
    pub fn new(names: SchemaNames, team_mode: TeamMode) -> Self {
        Self { names, team_mode }
    }

    /// Select expression for the team column, aliased as `team_id`.
    ///
    /// Without team scoping the column doesn't exist, so a typed NULL is selected instead.
    pub(crate) fn team_select_expression(&self) -> String {
        match self.team_mode {
            TeamMode::Enabled => format!("{} AS team_id", self.names.columns.team_foreign_key),
            TeamMode::Disabled => "NULL::bigint AS team_id".to_string(),
        }
    }

    /// `WHERE` fragment matching the team column against placeholder `$index`,
    /// or an always-true fragment when teams are disabled (the placeholder is then unused
    /// and must not be bound).
    pub(crate) fn team_condition(&self, placeholder_index: usize) -> String {
        match self.team_mode {
            TeamMode::Enabled => format!(
                "{} = ${}",
                self.names.columns.team_foreign_key, placeholder_index
            ),
            TeamMode::Disabled => "TRUE".to_string(),
        }
    }

    /// Value to bind for the team placeholder, if the schema has a team column.
    pub(crate) fn team_binding(&self, team: Option<TeamId>) -> QueryResult<Option<i64>> {
        match (self.team_mode, team) {
            (TeamMode::Enabled, Some(team)) => Ok(Some(team.into_inner())),
            (TeamMode::Disabled, None) => Ok(None),
            (TeamMode::Enabled, None) => Err(QueryError::model_error(
                "team scoping is enabled, but no team was provided",
            )),
            (TeamMode::Disabled, Some(_)) => Err(QueryError::model_error(
                "team scoping is disabled, but a team was provided",
            )),
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn team_fragments_follow_team_mode() {
        let disabled = PermissionSchema::default();
        assert_eq!(
            disabled.team_select_expression(),
            "NULL::bigint AS team_id"
        );
        assert_eq!(disabled.team_condition(3), "TRUE");

        let enabled = PermissionSchema::new(SchemaNames::default(), TeamMode::Enabled);
        assert_eq!(enabled.team_select_expression(), "team_id AS team_id");
        assert_eq!(enabled.team_condition(3), "team_id = $3");

        assert_eq!(
            enabled.team_binding(Some(TeamId::new(8))).unwrap(),
            Some(8)
        );
        assert!(enabled.team_binding(None).is_err());
        assert_eq!(disabled.team_binding(None).unwrap(), None);
        assert!(disabled.team_binding(Some(TeamId::new(8))).is_err());
    }
}
