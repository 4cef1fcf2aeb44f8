mod common;

use common::{in_memory_authorization, User, API, WEB};
use warden::errors::{AuthorizationError, IdentityKind};
use warden_core::{
    id::{PermissionId, RoleId, TeamId},
    subject::Subject,
    team::TeamMode,
};


#[tokio::test]
async fn granting_across_guards_is_rejected() {
    let authorization = in_memory_authorization(TeamMode::Disabled);

    let role = authorization
        .identity()
        .create_role("admin", WEB, None)
        .await
        .unwrap();
    let api_permission = authorization
        .identity()
        .create_permission("edit-content", API)
        .await
        .unwrap();

    let grant_result = authorization
        .assignments()
        .grant_permission_to_role(role.id, api_permission.id)
        .await;

    match grant_result {
        Err(AuthorizationError::GuardMismatch {
            role_guard,
            permission_guard,
        }) => {
            assert_eq!(role_guard, WEB);
            assert_eq!(permission_guard, API);
        }
        other => panic!("expected a guard mismatch, got {:?}", other),
    }
}


#[tokio::test]
async fn assignments_to_missing_records_are_rejected() {
    let authorization = in_memory_authorization(TeamMode::Disabled);
    let user = User { id: 7 };

    let role = authorization
        .identity()
        .create_role("admin", WEB, None)
        .await
        .unwrap();

    assert!(matches!(
        authorization
            .assignments()
            .grant_permission_to_role(role.id, PermissionId::generate())
            .await,
        Err(AuthorizationError::DanglingReference {
            kind: IdentityKind::Permission,
            ..
        })
    ));

    assert!(matches!(
        authorization
            .assignments()
            .assign_role_to_subject(&user, RoleId::generate(), None)
            .await,
        Err(AuthorizationError::DanglingReference {
            kind: IdentityKind::Role,
            ..
        })
    ));

    assert!(matches!(
        authorization
            .assignments()
            .assign_permission_to_subject(&user, PermissionId::generate(), None)
            .await,
        Err(AuthorizationError::DanglingReference {
            kind: IdentityKind::Permission,
            ..
        })
    ));
}


#[tokio::test]
async fn assigning_twice_is_a_no_op() {
    let authorization = in_memory_authorization(TeamMode::Disabled);
    let user = User { id: 7 };

    let role = authorization
        .identity()
        .create_role("admin", WEB, None)
        .await
        .unwrap();

    assert!(authorization
        .assignments()
        .assign_role_to_subject(&user, role.id, None)
        .await
        .unwrap());
    assert!(!authorization
        .assignments()
        .assign_role_to_subject(&user, role.id, None)
        .await
        .unwrap());

    assert!(authorization
        .assignments()
        .remove_role_from_subject(&user, role.id, None)
        .await
        .unwrap());
    assert!(!authorization
        .assignments()
        .remove_role_from_subject(&user, role.id, None)
        .await
        .unwrap());
}


#[tokio::test]
async fn revoking_takes_effect_immediately() {
    let authorization = in_memory_authorization(TeamMode::Disabled);
    let user = User { id: 3 };

    let role = authorization
        .identity()
        .create_role("editor", WEB, None)
        .await
        .unwrap();
    let permission = authorization
        .identity()
        .create_permission("publish", WEB)
        .await
        .unwrap();

    authorization
        .assignments()
        .grant_permission_to_role(role.id, permission.id)
        .await
        .unwrap();
    authorization
        .assignments()
        .assign_role_to_subject(&user, role.id, None)
        .await
        .unwrap();
    authorization
        .assignments()
        .assign_permission_to_subject(&user, permission.id, None)
        .await
        .unwrap();

    // Still held through the role.
    authorization
        .assignments()
        .revoke_permission_from_subject(&user, permission.id, None)
        .await
        .unwrap();
    assert!(authorization
        .queries()
        .subject_has_permission(&user, "publish", WEB, None)
        .await
        .unwrap());

    authorization
        .assignments()
        .revoke_permission_from_role(role.id, permission.id)
        .await
        .unwrap();
    assert!(!authorization
        .queries()
        .subject_has_permission(&user, "publish", WEB, None)
        .await
        .unwrap());
}


#[tokio::test]
async fn syncing_replaces_the_role_set() {
    let authorization = in_memory_authorization(TeamMode::Disabled);
    let subject = Subject::new("User", 5);

    let admin = authorization
        .identity()
        .create_role("admin", WEB, None)
        .await
        .unwrap();
    let manager = authorization
        .identity()
        .create_role("manager", WEB, None)
        .await
        .unwrap();
    let viewer = authorization
        .identity()
        .create_role("viewer", WEB, None)
        .await
        .unwrap();

    authorization
        .assignments()
        .assign_role_to_subject(&subject, admin.id, None)
        .await
        .unwrap();

    authorization
        .assignments()
        .sync_roles_for_subject(&subject, &[manager.id, viewer.id], None)
        .await
        .unwrap();

    assert_eq!(
        authorization
            .queries()
            .subject_role_names(&subject, WEB, None)
            .await
            .unwrap(),
        vec!["manager".to_string(), "viewer".to_string()]
    );

    authorization
        .assignments()
        .sync_roles_for_subject(&subject, &[], None)
        .await
        .unwrap();

    assert!(authorization
        .queries()
        .subject_role_names(&subject, WEB, None)
        .await
        .unwrap()
        .is_empty());
}


#[tokio::test]
async fn syncing_only_touches_the_given_team() {
    let authorization = in_memory_authorization(TeamMode::Enabled);
    let user = User { id: 3 };
    let first_team = Some(TeamId::new(1));
    let second_team = Some(TeamId::new(2));

    let manager = authorization
        .identity()
        .create_role("manager", WEB, first_team)
        .await
        .unwrap();

    authorization
        .assignments()
        .assign_role_to_subject(&user, manager.id, first_team)
        .await
        .unwrap();
    authorization
        .assignments()
        .assign_role_to_subject(&user, manager.id, second_team)
        .await
        .unwrap();

    authorization
        .assignments()
        .sync_roles_for_subject(&user, &[], second_team)
        .await
        .unwrap();

    assert!(authorization
        .queries()
        .subject_has_role(&user, "manager", WEB, first_team)
        .await
        .unwrap());
    assert!(!authorization
        .queries()
        .subject_has_role(&user, "manager", WEB, second_team)
        .await
        .unwrap());
}


#[tokio::test]
async fn subject_assignments_require_a_team_in_team_mode() {
    let authorization = in_memory_authorization(TeamMode::Enabled);
    let user = User { id: 3 };

    let manager = authorization
        .identity()
        .create_role("manager", WEB, Some(TeamId::new(1)))
        .await
        .unwrap();

    assert!(matches!(
        authorization
            .assignments()
            .assign_role_to_subject(&user, manager.id, None)
            .await,
        Err(AuthorizationError::ConfigurationMismatch { .. })
    ));
}
