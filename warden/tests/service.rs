mod common;

use std::path::PathBuf;

use common::User;
use warden::{errors::MigrationRunError, seeder::seed_roles, Authorization};
use warden_configuration::Configuration;
use warden_core::{id::TeamId, team::TeamMode};


const TEAM_CONFIGURATION: &str = r#"
    [logging]
    console_output_level_filter = "info"
    log_file_output_level_filter = "debug"
    log_file_output_directory = "./logs"

    [database]
    host = "localhost"
    port = 5432
    username = "warden"
    database_name = "warden"

    [authorization]
    teams = true
    default_guard = "admin-panel"
    cache_time_to_live_seconds = 300
"#;


#[tokio::test]
async fn in_memory_service_follows_the_configuration() {
    let configuration =
        Configuration::load_from_str(TEAM_CONFIGURATION, PathBuf::from("configuration.toml"))
            .unwrap();

    let authorization = Authorization::in_memory(&configuration.authorization);

    assert_eq!(authorization.team_mode(), TeamMode::Enabled);
    assert_eq!(authorization.default_guard(), "admin-panel");
    assert_eq!(authorization.storage_backend_name(), "memory");
    assert_eq!(
        authorization.cache().time_to_live(),
        configuration.authorization.cache_time_to_live
    );

    let team = Some(TeamId::new(10));
    let user = User { id: 1 };

    let seeded_roles = seed_roles(&authorization, team).await.unwrap();
    let admin = seeded_roles
        .iter()
        .find(|role| role.name == "admin")
        .unwrap();

    authorization
        .assignments()
        .assign_role_to_subject(&user, admin.id, team)
        .await
        .unwrap();

    assert!(authorization
        .queries()
        .subject_has_role(&user, "admin", "admin-panel", team)
        .await
        .unwrap());
}


#[tokio::test]
async fn in_memory_service_has_no_migrations_to_apply() {
    let configuration =
        Configuration::load_from_str(TEAM_CONFIGURATION, PathBuf::from("configuration.toml"))
            .unwrap();

    let authorization = Authorization::in_memory(&configuration.authorization);
    let generation_before = authorization.cache().generation();

    let migration_result = authorization.apply_pending_migrations().await;

    assert!(matches!(
        migration_result,
        Err(MigrationRunError::NotBackedByPostgres)
    ));
    assert_eq!(authorization.cache().generation(), generation_before);
}
