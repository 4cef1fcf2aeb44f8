//! The resolved assignment graph the query service answers from.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use warden_core::{
    id::{PermissionId, RoleId, TeamId},
    models::{Permission, Role},
    subject::Subject,
};

use crate::storage::StorageSnapshot;


/// An immutable, indexed view of every permission, role and assignment.
///
/// Serializes as the underlying [`StorageSnapshot`]; the indexes are rebuilt on
/// deserialization.
#[derive(Clone, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(from = "StorageSnapshot", into = "StorageSnapshot")]
pub struct AssignmentGraph {
    snapshot: StorageSnapshot,

    permissions_by_id: HashMap<PermissionId, usize>,

    /// `(guard, name) -> permission`
    permission_ids_by_key: HashMap<(String, String), PermissionId>,

    roles_by_id: HashMap<RoleId, usize>,

    permissions_by_role: HashMap<RoleId, HashSet<PermissionId>>,

    roles_by_subject: HashMap<Subject, Vec<(RoleId, Option<TeamId>)>>,

    permissions_by_subject: HashMap<Subject, Vec<(PermissionId, Option<TeamId>)>>,
}

impl From<StorageSnapshot> for AssignmentGraph {
    fn from(snapshot: StorageSnapshot) -> Self {
        Self::from_snapshot(snapshot)
    }
}

impl From<AssignmentGraph> for StorageSnapshot {
    fn from(graph: AssignmentGraph) -> Self {
        graph.snapshot
    }
}

impl AssignmentGraph {
    pub fn from_snapshot(snapshot: StorageSnapshot) -> Self {
        let mut permissions_by_id = HashMap::with_capacity(snapshot.permissions.len());
        let mut permission_ids_by_key = HashMap::with_capacity(snapshot.permissions.len());

        for (index, permission) in snapshot.permissions.iter().enumerate() {
            permissions_by_id.insert(permission.id, index);
            permission_ids_by_key.insert(
                (permission.guard.clone(), permission.name.clone()),
                permission.id,
            );
        }

        let roles_by_id = snapshot
            .roles
            .iter()
            .enumerate()
            .map(|(index, role)| (role.id, index))
            .collect();

        let mut permissions_by_role: HashMap<RoleId, HashSet<PermissionId>> = HashMap::new();
        for assignment in &snapshot.role_permissions {
            permissions_by_role
                .entry(assignment.role_id)
                .or_default()
                .insert(assignment.permission_id);
        }

        let mut roles_by_subject: HashMap<Subject, Vec<(RoleId, Option<TeamId>)>> = HashMap::new();
        for assignment in &snapshot.subject_roles {
            roles_by_subject
                .entry(assignment.subject.clone())
                .or_default()
                .push((assignment.role_id, assignment.team_id));
        }

        let mut permissions_by_subject: HashMap<Subject, Vec<(PermissionId, Option<TeamId>)>> =
            HashMap::new();
        for assignment in &snapshot.subject_permissions {
            permissions_by_subject
                .entry(assignment.subject.clone())
                .or_default()
                .push((assignment.permission_id, assignment.team_id));
        }

        Self {
            snapshot,
            permissions_by_id,
            permission_ids_by_key,
            roles_by_id,
            permissions_by_role,
            roles_by_subject,
            permissions_by_subject,
        }
    }

    pub fn permission_count(&self) -> usize {
        self.snapshot.permissions.len()
    }

    pub fn role_count(&self) -> usize {
        self.snapshot.roles.len()
    }

    pub fn permission(&self, permission_id: PermissionId) -> Option<&Permission> {
        self.permissions_by_id
            .get(&permission_id)
            .map(|index| &self.snapshot.permissions[*index])
    }

    pub fn role(&self, role_id: RoleId) -> Option<&Role> {
        self.roles_by_id
            .get(&role_id)
            .map(|index| &self.snapshot.roles[*index])
    }

    fn permission_id(&self, permission_name: &str, guard: &str) -> Option<PermissionId> {
        self.permission_ids_by_key
            .get(&(guard.to_string(), permission_name.to_string()))
            .copied()
    }

    /// Roles directly held by `subject` within `team` (`None` outside team mode).
    pub fn roles_of(
        &self,
        subject: &Subject,
        team: Option<TeamId>,
    ) -> impl Iterator<Item = &Role> {
        self.roles_by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .filter(move |(_, assignment_team)| *assignment_team == team)
            .filter_map(move |(role_id, _)| self.role(*role_id))
    }

    /// Permissions `subject` holds within `team`, directly or through one of its roles.
    pub fn permissions_of(
        &self,
        subject: &Subject,
        team: Option<TeamId>,
    ) -> impl Iterator<Item = &Permission> {
        let direct_permission_ids = self
            .permissions_by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .filter(move |(_, assignment_team)| *assignment_team == team)
            .map(|(permission_id, _)| *permission_id);

        let role_permission_ids = self
            .roles_of(subject, team)
            .filter_map(move |role| self.permissions_by_role.get(&role.id))
            .flatten()
            .copied();

        direct_permission_ids
            .chain(role_permission_ids)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(move |permission_id| self.permission(permission_id))
    }

    pub fn subject_has_role(
        &self,
        subject: &Subject,
        role_name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> bool {
        self.roles_of(subject, team)
            .any(|role| role.name == role_name && role.guard == guard)
    }

    /// Unknown permission names and guard mismatches simply yield `false`.
    pub fn subject_has_permission(
        &self,
        subject: &Subject,
        permission_name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> bool {
        let Some(permission_id) = self.permission_id(permission_name, guard) else {
            return false;
        };

        let has_direct_permission = self
            .permissions_by_subject
            .get(subject)
            .is_some_and(|assignments| assignments.contains(&(permission_id, team)));

        if has_direct_permission {
            return true;
        }

        self.roles_of(subject, team).any(|role| {
            self.permissions_by_role
                .get(&role.id)
                .is_some_and(|permission_ids| permission_ids.contains(&permission_id))
        })
    }

    /// Sorted names of the roles `subject` holds in `guard`.
    pub fn role_names_of(
        &self,
        subject: &Subject,
        guard: &str,
        team: Option<TeamId>,
    ) -> Vec<String> {
        self.roles_of(subject, team)
            .filter(|role| role.guard == guard)
            .map(|role| role.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted names of the permissions `subject` holds in `guard`, direct or role-derived.
    pub fn permission_names_of(
        &self,
        subject: &Subject,
        guard: &str,
        team: Option<TeamId>,
    ) -> Vec<String> {
        self.permissions_of(subject, team)
            .filter(|permission| permission.guard == guard)
            .map(|permission| permission.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
