//! Authorization checks.
//!
//! All answers come from the cached [`AssignmentGraph`](crate::graph::AssignmentGraph),
//! which is rebuilt on a miss. "Not granted" is always `Ok(false)`: errors are reserved for
//! storage failures during a rebuild and for team arguments that don't match the
//! deployment's team mode.

use std::sync::Arc;

use warden_core::{id::TeamId, subject::AsSubject, team::TeamMode};

use crate::{
    cache::AuthorizationCache,
    errors::AuthorizationResult,
    graph::AssignmentGraph,
    scope::check_team_argument,
    storage::AuthorizationStorage,
};


#[derive(Clone)]
pub struct QueryService {
    storage: Arc<dyn AuthorizationStorage>,

    cache: Arc<AuthorizationCache>,

    team_mode: TeamMode,
}

impl QueryService {
    pub fn new(
        storage: Arc<dyn AuthorizationStorage>,
        cache: Arc<AuthorizationCache>,
        team_mode: TeamMode,
    ) -> Self {
        Self {
            storage,
            cache,
            team_mode,
        }
    }

    async fn graph_for(
        &self,
        team: Option<TeamId>,
        operation: &'static str,
    ) -> AuthorizationResult<Arc<AssignmentGraph>> {
        check_team_argument(self.team_mode, team, operation)?;

        self.cache.get_or_rebuild(self.storage.as_ref()).await
    }

    /// Whether the subject holds the permission, directly or through one of its roles.
    ///
    /// Unknown permissions and permissions of other guards are simply not granted.
    pub async fn subject_has_permission<S>(
        &self,
        subject: S,
        permission_name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>
    where
        S: AsSubject,
    {
        let graph = self.graph_for(team, "subject_has_permission").await?;

        Ok(graph.subject_has_permission(&subject.to_subject(), permission_name, guard, team))
    }

    /// Whether the subject directly holds the role.
    pub async fn subject_has_role<S>(
        &self,
        subject: S,
        role_name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>
    where
        S: AsSubject,
    {
        let graph = self.graph_for(team, "subject_has_role").await?;

        Ok(graph.subject_has_role(&subject.to_subject(), role_name, guard, team))
    }

    /// `false` for an empty list of names.
    pub async fn subject_has_any_permission<S>(
        &self,
        subject: S,
        permission_names: &[&str],
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>
    where
        S: AsSubject,
    {
        let graph = self.graph_for(team, "subject_has_any_permission").await?;
        let subject = subject.to_subject();

        Ok(permission_names.iter().any(|permission_name| {
            graph.subject_has_permission(&subject, permission_name, guard, team)
        }))
    }

    /// `true` for an empty list of names.
    pub async fn subject_has_all_permissions<S>(
        &self,
        subject: S,
        permission_names: &[&str],
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>
    where
        S: AsSubject,
    {
        let graph = self.graph_for(team, "subject_has_all_permissions").await?;
        let subject = subject.to_subject();

        Ok(permission_names.iter().all(|permission_name| {
            graph.subject_has_permission(&subject, permission_name, guard, team)
        }))
    }

    pub async fn subject_has_any_role<S>(
        &self,
        subject: S,
        role_names: &[&str],
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>
    where
        S: AsSubject,
    {
        let graph = self.graph_for(team, "subject_has_any_role").await?;
        let subject = subject.to_subject();

        Ok(role_names
            .iter()
            .any(|role_name| graph.subject_has_role(&subject, role_name, guard, team)))
    }

    /// Sorted names of the roles the subject holds in `guard`.
    pub async fn subject_role_names<S>(
        &self,
        subject: S,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Vec<String>>
    where
        S: AsSubject,
    {
        let graph = self.graph_for(team, "subject_role_names").await?;

        Ok(graph.role_names_of(&subject.to_subject(), guard, team))
    }

    /// Sorted names of every permission the subject holds in `guard`,
    /// direct or through its roles.
    pub async fn subject_permission_names<S>(
        &self,
        subject: S,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Vec<String>>
    where
        S: AsSubject,
    {
        let graph = self.graph_for(team, "subject_permission_names").await?;

        Ok(graph.permission_names_of(&subject.to_subject(), guard, team))
    }
}
