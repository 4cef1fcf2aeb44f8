//! Runs the service against a real PostgreSQL server.
//!
//! Set `WARDEN_TEST_DATABASE_URL` (or `DATABASE_URL`) to a database the tests may create
//! schemas in; without it every test here is skipped. Each test works in its own schema,
//! so tests can run in parallel against the same database.

mod common;

use std::time::Duration;

use common::{User, API, WEB};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tokio::task::JoinSet;
use warden::{
    errors::{AuthorizationError, IdentityKind},
    Authorization,
};
use warden_configuration::AuthorizationConfiguration;
use warden_core::{
    id::{PermissionId, RoleId, TeamId},
    schema::SchemaNames,
    team::TeamMode,
};


fn test_database_url() -> Option<String> {
    std::env::var("WARDEN_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}


/// A migrated, empty permission schema living in its own PostgreSQL schema.
struct IsolatedDatabase {
    authorization: Authorization,

    administration_pool: PgPool,

    schema_name: String,
}

impl IsolatedDatabase {
    async fn connect(test_name: &str, team_mode: TeamMode) -> Option<Self> {
        let Some(url) = test_database_url() else {
            eprintln!("skipping {test_name}: WARDEN_TEST_DATABASE_URL is not set");
            return None;
        };

        let administration_pool = match tokio::time::timeout(
            Duration::from_secs(2),
            PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(2))
                .connect(&url),
        )
        .await
        {
            Ok(Ok(pool)) => pool,
            Ok(Err(error)) => {
                eprintln!("skipping {test_name}: cannot connect to PostgreSQL ({error})");
                return None;
            }
            Err(_) => {
                eprintln!("skipping {test_name}: timed out connecting to PostgreSQL");
                return None;
            }
        };

        let schema_name = format!("warden_test_{}_{}", test_name, std::process::id());

        sqlx::query(&format!("DROP SCHEMA IF EXISTS {schema_name} CASCADE"))
            .execute(&administration_pool)
            .await
            .unwrap();
        sqlx::query(&format!("CREATE SCHEMA {schema_name}"))
            .execute(&administration_pool)
            .await
            .unwrap();

        let connect_options = url
            .parse::<PgConnectOptions>()
            .unwrap()
            .options([("search_path", schema_name.as_str())]);

        let service_pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(connect_options)
            .await
            .unwrap();

        let configuration = AuthorizationConfiguration {
            team_mode,
            default_guard: WEB.to_string(),
            cache_time_to_live: Duration::from_secs(60 * 60),
            schema_names: SchemaNames::default(),
        };

        let authorization = Authorization::with_postgres(service_pool, &configuration);

        let applied_migrations = authorization.apply_pending_migrations().await.unwrap();
        assert!(!applied_migrations.is_empty());

        Some(Self {
            authorization,
            administration_pool,
            schema_name,
        })
    }

    async fn count_rows(&self, table: &str, name: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {}.{} WHERE name = $1",
            self.schema_name, table
        ))
        .bind(name)
        .fetch_one(&self.administration_pool)
        .await
        .unwrap()
    }

    async fn drop_schema(self) {
        sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema_name))
            .execute(&self.administration_pool)
            .await
            .unwrap();
    }
}



#[tokio::test]
async fn migrations_are_applied_only_once() {
    let Some(database) = IsolatedDatabase::connect("migrations_once", TeamMode::Disabled).await
    else {
        return;
    };

    let reapplied_migrations = database
        .authorization
        .apply_pending_migrations()
        .await
        .unwrap();
    assert!(reapplied_migrations.is_empty());

    database.drop_schema().await;
}


#[tokio::test]
async fn admin_role_grants_its_permissions_in_its_guard_only() {
    let Some(database) = IsolatedDatabase::connect("admin_guard", TeamMode::Disabled).await
    else {
        return;
    };
    let authorization = &database.authorization;
    let user = User { id: 1 };

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

    assert!(authorization
        .queries()
        .subject_has_role(&user, "admin", WEB, None)
        .await
        .unwrap());
    assert!(authorization
        .queries()
        .subject_has_permission(&user, "edit-content", WEB, None)
        .await
        .unwrap());
    assert!(!authorization
        .queries()
        .subject_has_permission(&user, "edit-content", API, None)
        .await
        .unwrap());

    database.drop_schema().await;
}


#[tokio::test]
async fn deleting_a_role_cascades_to_its_assignments() {
    let Some(database) = IsolatedDatabase::connect("role_cascade", TeamMode::Disabled).await
    else {
        return;
    };
    let authorization = &database.authorization;
    let user = User { id: 2 };

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

    authorization.identity().delete_role(editor.id).await.unwrap();

    assert!(!authorization
        .queries()
        .subject_has_permission(&user, "edit-content", WEB, None)
        .await
        .unwrap());

    let recreated_editor = authorization
        .identity()
        .create_role("editor", WEB, None)
        .await
        .unwrap();
    assert_ne!(recreated_editor.id, editor.id);
    assert!(!authorization
        .queries()
        .subject_has_role(&user, "editor", WEB, None)
        .await
        .unwrap());

    // The permission outlives the role.
    assert_eq!(
        authorization
            .identity()
            .find_permission_by_name("edit-content", WEB)
            .await
            .unwrap()
            .id,
        edit_content.id
    );

    database.drop_schema().await;
}


#[tokio::test]
async fn team_scoped_roles_do_not_leak_across_teams() {
    let Some(database) = IsolatedDatabase::connect("team_scope", TeamMode::Enabled).await
    else {
        return;
    };
    let authorization = &database.authorization;
    let user = User { id: 3 };
    let first_team = Some(TeamId::new(1));
    let second_team = Some(TeamId::new(2));

    let first_team_admin = authorization
        .identity()
        .create_role("admin", WEB, first_team)
        .await
        .unwrap();
    let second_team_admin = authorization
        .identity()
        .create_role("admin", WEB, second_team)
        .await
        .unwrap();
    assert_ne!(first_team_admin.id, second_team_admin.id);
    assert_eq!(first_team_admin.team_id, first_team);

    authorization
        .assignments()
        .assign_role_to_subject(&user, first_team_admin.id, first_team)
        .await
        .unwrap();

    assert!(authorization
        .queries()
        .subject_has_role(&user, "admin", WEB, first_team)
        .await
        .unwrap());
    assert!(!authorization
        .queries()
        .subject_has_role(&user, "admin", WEB, second_team)
        .await
        .unwrap());

    assert!(matches!(
        authorization
            .identity()
            .create_role("editor", WEB, None)
            .await,
        Err(AuthorizationError::ConfigurationMismatch { .. })
    ));

    database.drop_schema().await;
}


#[tokio::test]
async fn duplicates_and_dangling_references_are_rejected() {
    let Some(database) = IsolatedDatabase::connect("rejections", TeamMode::Disabled).await
    else {
        return;
    };
    let authorization = &database.authorization;
    let user = User { id: 4 };

    authorization
        .identity()
        .create_permission("edit-content", WEB)
        .await
        .unwrap();
    let api_permission = authorization
        .identity()
        .create_permission("edit-content", API)
        .await
        .unwrap();

    assert!(matches!(
        authorization
            .identity()
            .create_permission("edit-content", WEB)
            .await,
        Err(AuthorizationError::DuplicateIdentity {
            kind: IdentityKind::Permission,
            ..
        })
    ));

    let admin = authorization
        .identity()
        .create_role("admin", WEB, None)
        .await
        .unwrap();

    assert!(matches!(
        authorization
            .identity()
            .create_role("admin", WEB, None)
            .await,
        Err(AuthorizationError::DuplicateIdentity {
            kind: IdentityKind::Role,
            ..
        })
    ));

    assert!(matches!(
        authorization
            .assignments()
            .grant_permission_to_role(admin.id, api_permission.id)
            .await,
        Err(AuthorizationError::GuardMismatch { .. })
    ));
    assert!(matches!(
        authorization
            .assignments()
            .grant_permission_to_role(admin.id, PermissionId::generate())
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

    database.drop_schema().await;
}


#[tokio::test]
async fn syncing_and_renaming_roles_is_reflected_in_checks() {
    let Some(database) = IsolatedDatabase::connect("sync_rename", TeamMode::Disabled).await
    else {
        return;
    };
    let authorization = &database.authorization;
    let user = User { id: 5 };

    let admin = authorization
        .identity()
        .create_role("admin", WEB, None)
        .await
        .unwrap();
    let writer = authorization
        .identity()
        .create_role("writer", WEB, None)
        .await
        .unwrap();
    let reader = authorization
        .identity()
        .create_role("reader", WEB, None)
        .await
        .unwrap();

    authorization
        .assignments()
        .assign_role_to_subject(&user, reader.id, None)
        .await
        .unwrap();

    authorization
        .assignments()
        .sync_roles_for_subject(&user, &[admin.id, writer.id, admin.id], None)
        .await
        .unwrap();

    assert_eq!(
        authorization
            .queries()
            .subject_role_names(&user, WEB, None)
            .await
            .unwrap(),
        vec!["admin".to_string(), "writer".to_string()]
    );

    authorization
        .identity()
        .rename_role(writer.id, "author")
        .await
        .unwrap();

    assert!(authorization
        .queries()
        .subject_has_role(&user, "author", WEB, None)
        .await
        .unwrap());
    assert!(!authorization
        .queries()
        .subject_has_role(&user, "writer", WEB, None)
        .await
        .unwrap());

    database.drop_schema().await;
}


#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_find_or_create_settles_on_a_single_record() {
    const CONCURRENT_CALLERS: usize = 8;
    const ROUNDS: usize = 5;

    let Some(database) = IsolatedDatabase::connect("find_or_create_race", TeamMode::Disabled).await
    else {
        return;
    };

    for round in 0..ROUNDS {
        let role_name = format!("moderator-{round}");
        let permission_name = format!("ban-users-{round}");

        let mut callers = JoinSet::new();
        for _ in 0..CONCURRENT_CALLERS {
            let authorization = database.authorization.clone();
            let role_name = role_name.clone();
            let permission_name = permission_name.clone();

            callers.spawn(async move {
                let role = authorization
                    .identity()
                    .find_or_create_role(&role_name, WEB, None)
                    .await;
                let permission = authorization
                    .identity()
                    .find_or_create_permission(&permission_name, WEB)
                    .await;

                (role, permission)
            });
        }

        let mut role_ids = Vec::with_capacity(CONCURRENT_CALLERS);
        let mut permission_ids = Vec::with_capacity(CONCURRENT_CALLERS);

        while let Some(joined) = callers.join_next().await {
            let (role, permission) = joined.unwrap();

            role_ids.push(role.unwrap().id);
            permission_ids.push(permission.unwrap().id);
        }

        assert_eq!(role_ids.len(), CONCURRENT_CALLERS);
        assert!(role_ids.iter().all(|role_id| *role_id == role_ids[0]));
        assert!(permission_ids
            .iter()
            .all(|permission_id| *permission_id == permission_ids[0]));

        assert_eq!(database.count_rows("roles", &role_name).await, 1);
        assert_eq!(database.count_rows("permissions", &permission_name).await, 1);
    }

    database.drop_schema().await;
}
