mod common;

use common::{in_memory_authorization, WEB};
use warden::{errors::AuthorizationError, seeder::seed_roles};
use warden_core::{id::TeamId, team::TeamMode};


#[tokio::test]
async fn seeding_is_idempotent_and_always_invalidates() {
    let authorization = in_memory_authorization(TeamMode::Disabled);

    let generation_before = authorization.cache().generation();
    let first_run = seed_roles(&authorization, None).await.unwrap();
    let generation_after_first_run = authorization.cache().generation();

    assert!(generation_after_first_run > generation_before);

    let second_run = seed_roles(&authorization, None).await.unwrap();

    assert!(authorization.cache().generation() > generation_after_first_run);

    let first_ids: Vec<_> = first_run.iter().map(|role| role.id).collect();
    let second_ids: Vec<_> = second_run.iter().map(|role| role.id).collect();
    assert_eq!(first_ids, second_ids);

    let roles = authorization.identity().list_roles(None).await.unwrap();
    let role_names: Vec<&str> = roles.iter().map(|role| role.name.as_str()).collect();

    assert_eq!(role_names, vec!["admin", "manager"]);
    assert!(roles.iter().all(|role| role.guard == WEB));
}


#[tokio::test]
async fn seeding_uses_the_configured_default_guard() {
    let authorization = in_memory_authorization(TeamMode::Disabled).with_default_guard("api");

    let seeded_roles = seed_roles(&authorization, None).await.unwrap();

    assert_eq!(seeded_roles.len(), 2);
    assert!(seeded_roles.iter().all(|role| role.guard == "api"));
}


#[tokio::test]
async fn seeding_in_team_mode_requires_a_team() {
    let authorization = in_memory_authorization(TeamMode::Enabled);

    assert!(matches!(
        seed_roles(&authorization, None).await,
        Err(AuthorizationError::ConfigurationMismatch { .. })
    ));

    let team = Some(TeamId::new(4));
    let seeded_roles = seed_roles(&authorization, team).await.unwrap();

    assert!(seeded_roles.iter().all(|role| role.team_id == team));
}
