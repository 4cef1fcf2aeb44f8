use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::TeamId;


/// Whether roles and subject assignments are partitioned by team.
///
/// This is a deployment-time choice: it decides the shape of the schema
/// and is passed explicitly to every store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamMode {
    #[default]
    Disabled,
    Enabled,
}

impl TeamMode {
    #[inline]
    pub fn from_teams_flag(teams_enabled: bool) -> Self {
        if teams_enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    #[inline]
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Checks that the presence of a team argument matches this mode:
    /// a team is required when enabled and rejected when disabled.
    pub fn check_team_argument(self, team: Option<TeamId>) -> Result<(), TeamScopeError> {
        match (self, team) {
            (TeamMode::Enabled, Some(_)) | (TeamMode::Disabled, None) => Ok(()),
            (TeamMode::Enabled, None) => Err(TeamScopeError::TeamRequired),
            (TeamMode::Disabled, Some(team)) => Err(TeamScopeError::TeamNotAllowed { team }),
        }
    }
}


#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TeamScopeError {
    #[error("team scoping is enabled, but no team was provided")]
    TeamRequired,

    #[error("team scoping is disabled, but team {} was provided", .team)]
    TeamNotAllowed { team: TeamId },
}



#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn team_argument_must_match_mode() {
        assert!(TeamMode::Enabled
            .check_team_argument(Some(TeamId::new(1)))
            .is_ok());
        assert!(TeamMode::Disabled.check_team_argument(None).is_ok());

        assert_eq!(
            TeamMode::Enabled.check_team_argument(None),
            Err(TeamScopeError::TeamRequired)
        );
        assert_eq!(
            TeamMode::Disabled.check_team_argument(Some(TeamId::new(4))),
            Err(TeamScopeError::TeamNotAllowed {
                team: TeamId::new(4)
            })
        );
    }
}
