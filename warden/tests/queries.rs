mod common;

use std::{sync::Arc, time::Duration};

use common::{in_memory_authorization, User, API, WEB};
use warden::{errors::AuthorizationError, Authorization, AuthorizationCache, MemoryStorage};
use warden_core::{id::TeamId, subject::Subject, team::TeamMode};


#[tokio::test]
async fn role_permissions_are_scoped_to_their_guard() {
    let authorization = in_memory_authorization(TeamMode::Disabled);
    let user = Subject::new("User", 7);

    let admin = authorization
        .identity()
        .create_role("admin", WEB, None)
        .await
        .unwrap();
    let edit_content = authorization
        .identity()
        .create_permission("edit-content", WEB)
        .await
        .unwrap();

    authorization
        .assignments()
        .grant_permission_to_role(admin.id, edit_content.id)
        .await
        .unwrap();
    authorization
        .assignments()
        .assign_role_to_subject(&user, admin.id, None)
        .await
        .unwrap();

    let queries = authorization.queries();

    assert!(queries
        .subject_has_permission(&user, "edit-content", WEB, None)
        .await
        .unwrap());
    assert!(!queries
        .subject_has_permission(&user, "edit-content", API, None)
        .await
        .unwrap());

    assert!(queries
        .subject_has_role(&user, "admin", WEB, None)
        .await
        .unwrap());
    assert!(!queries
        .subject_has_role(&user, "admin", API, None)
        .await
        .unwrap());
}


#[tokio::test]
async fn unknown_names_are_not_granted() {
    let authorization = in_memory_authorization(TeamMode::Disabled);
    let user = User { id: 1 };

    assert!(!authorization
        .queries()
        .subject_has_permission(&user, "does-not-exist", WEB, None)
        .await
        .unwrap());
    assert!(!authorization
        .queries()
        .subject_has_role(&user, "does-not-exist", WEB, None)
        .await
        .unwrap());
}


#[tokio::test]
async fn writes_are_visible_to_the_next_query() {
    let authorization = in_memory_authorization(TeamMode::Disabled);
    let user = User { id: 12 };

    let permission = authorization
        .identity()
        .create_permission("view-reports", WEB)
        .await
        .unwrap();

    // Warm the cache.
    assert!(!authorization
        .queries()
        .subject_has_permission(&user, "view-reports", WEB, None)
        .await
        .unwrap());
    assert!(authorization.cache().get().is_some());

    authorization
        .assignments()
        .assign_permission_to_subject(&user, permission.id, None)
        .await
        .unwrap();

    assert!(authorization.cache().get().is_none());
    assert!(authorization
        .queries()
        .subject_has_permission(&user, "view-reports", WEB, None)
        .await
        .unwrap());
}


#[tokio::test]
async fn roles_are_held_per_team() {
    let authorization = in_memory_authorization(TeamMode::Enabled);
    let user = User { id: 3 };
    let first_team = Some(TeamId::new(1));
    let second_team = Some(TeamId::new(2));

    let manager = authorization
        .identity()
        .create_role("manager", WEB, first_team)
        .await
        .unwrap();
    let edit_content = authorization
        .identity()
        .create_permission("edit-content", WEB)
        .await
        .unwrap();

    authorization
        .assignments()
        .grant_permission_to_role(manager.id, edit_content.id)
        .await
        .unwrap();
    authorization
        .assignments()
        .assign_role_to_subject(&user, manager.id, first_team)
        .await
        .unwrap();

    let queries = authorization.queries();

    assert!(queries
        .subject_has_role(&user, "manager", WEB, first_team)
        .await
        .unwrap());
    assert!(!queries
        .subject_has_role(&user, "manager", WEB, second_team)
        .await
        .unwrap());

    assert!(queries
        .subject_has_permission(&user, "edit-content", WEB, first_team)
        .await
        .unwrap());
    assert!(!queries
        .subject_has_permission(&user, "edit-content", WEB, second_team)
        .await
        .unwrap());
}


#[tokio::test]
async fn queries_reject_team_arguments_that_do_not_match_the_team_mode() {
    let without_teams = in_memory_authorization(TeamMode::Disabled);
    let with_teams = in_memory_authorization(TeamMode::Enabled);
    let user = User { id: 1 };

    assert!(matches!(
        without_teams
            .queries()
            .subject_has_permission(&user, "edit-content", WEB, Some(TeamId::new(1)))
            .await,
        Err(AuthorizationError::ConfigurationMismatch { .. })
    ));

    assert!(matches!(
        with_teams
            .queries()
            .subject_has_role(&user, "manager", WEB, None)
            .await,
        Err(AuthorizationError::ConfigurationMismatch { .. })
    ));
}


#[tokio::test]
async fn any_and_all_permission_checks() {
    let authorization = in_memory_authorization(TeamMode::Disabled);
    let user = User { id: 4 };

    let editor = authorization
        .identity()
        .create_role("editor", WEB, None)
        .await
        .unwrap();
    let edit_content = authorization
        .identity()
        .create_permission("edit-content", WEB)
        .await
        .unwrap();
    let publish = authorization
        .identity()
        .create_permission("publish", WEB)
        .await
        .unwrap();
    authorization
        .identity()
        .create_permission("delete-content", WEB)
        .await
        .unwrap();

    authorization
        .assignments()
        .grant_permission_to_role(editor.id, edit_content.id)
        .await
        .unwrap();
    authorization
        .assignments()
        .assign_role_to_subject(&user, editor.id, None)
        .await
        .unwrap();
    authorization
        .assignments()
        .assign_permission_to_subject(&user, publish.id, None)
        .await
        .unwrap();

    let queries = authorization.queries();

    assert!(queries
        .subject_has_all_permissions(&user, &["edit-content", "publish"], WEB, None)
        .await
        .unwrap());
    assert!(!queries
        .subject_has_all_permissions(&user, &["edit-content", "delete-content"], WEB, None)
        .await
        .unwrap());
    assert!(queries
        .subject_has_all_permissions(&user, &[], WEB, None)
        .await
        .unwrap());

    assert!(queries
        .subject_has_any_permission(&user, &["delete-content", "publish"], WEB, None)
        .await
        .unwrap());
    assert!(!queries
        .subject_has_any_permission(&user, &["delete-content"], WEB, None)
        .await
        .unwrap());
    assert!(!queries
        .subject_has_any_permission(&user, &[], WEB, None)
        .await
        .unwrap());

    assert!(queries
        .subject_has_any_role(&user, &["admin", "editor"], WEB, None)
        .await
        .unwrap());
    assert!(!queries
        .subject_has_any_role(&user, &["admin"], WEB, None)
        .await
        .unwrap());

    assert_eq!(
        queries
            .subject_permission_names(&user, WEB, None)
            .await
            .unwrap(),
        vec!["edit-content".to_string(), "publish".to_string()]
    );
    assert_eq!(
        queries.subject_role_names(&user, WEB, None).await.unwrap(),
        vec!["editor".to_string()]
    );
}


#[tokio::test]
async fn services_sharing_a_cache_see_each_others_writes() {
    let storage = Arc::new(MemoryStorage::new());
    let cache = Arc::new(AuthorizationCache::new(Duration::from_secs(60)));

    let writer = Authorization::new(storage.clone(), cache.clone(), TeamMode::Disabled);
    let reader = Authorization::new(storage, cache, TeamMode::Disabled);
    let user = User { id: 9 };

    assert!(!reader
        .queries()
        .subject_has_role(&user, "admin", WEB, None)
        .await
        .unwrap());

    let admin = writer
        .identity()
        .create_role("admin", WEB, None)
        .await
        .unwrap();
    writer
        .assignments()
        .assign_role_to_subject(&user, admin.id, None)
        .await
        .unwrap();

    assert!(reader
        .queries()
        .subject_has_role(&user, "admin", WEB, None)
        .await
        .unwrap());
}
