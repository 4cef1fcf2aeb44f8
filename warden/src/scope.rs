use warden_core::{id::TeamId, team::TeamMode};
use tracing::warn;

use crate::errors::AuthorizationResult;


/// Rejects a team argument that doesn't match the deployment's team mode.
pub(crate) fn check_team_argument(
    team_mode: TeamMode,
    team: Option<TeamId>,
    operation: &'static str,
) -> AuthorizationResult<()> {
    team_mode.check_team_argument(team).map_err(|error| {
        warn!(
            operation,
            team_mode = ?team_mode,
            error = %error,
            "Rejected team argument."
        );

        error.into()
    })
}
