//! `M0001 create-permission-tables`: the five tables backing permissions, roles
//! and their assignments.
//!
//! The scripts are generated from the configured [`PermissionSchema`], so the same
//! migration produces different SQL (and hashes) for different table names or team modes.

use warden_core::team::TeamMode;
use warden_database::PermissionSchema;


pub const VERSION: i64 = 1;
pub const NAME: &str = "create-permission-tables";


pub fn generate_up_sql(schema: &PermissionSchema) -> String {
    let tables = &schema.names.tables;
    let columns = &schema.names.columns;
    let team_column = &columns.team_foreign_key;

    let mut statements: Vec<String> = Vec::with_capacity(12);


    statements.push(format!(
        "CREATE TABLE {permissions} (\n    \
            id uuid NOT NULL,\n    \
            name text NOT NULL,\n    \
            guard_name text NOT NULL,\n    \
            created_at timestamp with time zone NOT NULL,\n    \
            updated_at timestamp with time zone NOT NULL,\n    \
            CONSTRAINT pk__{permissions} PRIMARY KEY (id),\n    \
            CONSTRAINT unique__{permissions}__name_guard UNIQUE (name, guard_name)\n\
        )",
        permissions = tables.permissions
    ));


    match schema.team_mode {
        TeamMode::Enabled => {
            statements.push(format!(
                "CREATE TABLE {roles} (\n    \
                    id uuid NOT NULL,\n    \
                    {team_column} bigint,\n    \
                    name text NOT NULL,\n    \
                    guard_name text NOT NULL,\n    \
                    created_at timestamp with time zone NOT NULL,\n    \
                    updated_at timestamp with time zone NOT NULL,\n    \
                    CONSTRAINT pk__{roles} PRIMARY KEY (id),\n    \
                    CONSTRAINT unique__{roles}__team_name_guard \
                        UNIQUE ({team_column}, name, guard_name)\n\
                )",
                roles = tables.roles
            ));

            statements.push(format!(
                "CREATE INDEX index__{roles}__{team_column} ON {roles} ({team_column})",
                roles = tables.roles
            ));
        }
        TeamMode::Disabled => {
            statements.push(format!(
                "CREATE TABLE {roles} (\n    \
                    id uuid NOT NULL,\n    \
                    name text NOT NULL,\n    \
                    guard_name text NOT NULL,\n    \
                    created_at timestamp with time zone NOT NULL,\n    \
                    updated_at timestamp with time zone NOT NULL,\n    \
                    CONSTRAINT pk__{roles} PRIMARY KEY (id),\n    \
                    CONSTRAINT unique__{roles}__name_guard UNIQUE (name, guard_name)\n\
                )",
                roles = tables.roles
            ));
        }
    }


    // Both subject pivot tables share the same shape.
    for (pivot_table, pivot_key, referenced_table) in [
        (
            &tables.model_has_permissions,
            &columns.permission_pivot_key,
            &tables.permissions,
        ),
        (
            &tables.model_has_roles,
            &columns.role_pivot_key,
            &tables.roles,
        ),
    ] {
        statements.extend(generate_subject_pivot_table_statements(
            schema,
            pivot_table,
            pivot_key,
            referenced_table,
        ));
    }


    statements.push(format!(
        "CREATE TABLE {role_has_permissions} (\n    \
            {permission_key} uuid NOT NULL,\n    \
            {role_key} uuid NOT NULL,\n    \
            CONSTRAINT pk__{role_has_permissions} PRIMARY KEY ({permission_key}, {role_key}),\n    \
            CONSTRAINT fk__{role_has_permissions}__{permission_key} \
                FOREIGN KEY ({permission_key}) REFERENCES {permissions} (id) ON DELETE CASCADE,\n    \
            CONSTRAINT fk__{role_has_permissions}__{role_key} \
                FOREIGN KEY ({role_key}) REFERENCES {roles} (id) ON DELETE CASCADE\n\
        )",
        role_has_permissions = tables.role_has_permissions,
        permission_key = columns.permission_pivot_key,
        role_key = columns.role_pivot_key,
        permissions = tables.permissions,
        roles = tables.roles
    ));


    join_statements(statements)
}


fn generate_subject_pivot_table_statements(
    schema: &PermissionSchema,
    pivot_table: &str,
    pivot_key: &str,
    referenced_table: &str,
) -> Vec<String> {
    let morph_key = &schema.names.columns.model_morph_key;
    let team_column = &schema.names.columns.team_foreign_key;

    let mut statements = Vec::with_capacity(3);

    let (team_column_definition, primary_key_columns) = match schema.team_mode {
        TeamMode::Enabled => (
            format!("\n    {team_column} bigint NOT NULL,"),
            format!("{team_column}, {pivot_key}, {morph_key}, model_type"),
        ),
        TeamMode::Disabled => (
            String::new(),
            format!("{pivot_key}, {morph_key}, model_type"),
        ),
    };

    statements.push(format!(
        "CREATE TABLE {pivot_table} (\n    \
            {pivot_key} uuid NOT NULL,\n    \
            model_type text NOT NULL,\n    \
            {morph_key} text NOT NULL,{team_column_definition}\n    \
            CONSTRAINT pk__{pivot_table} PRIMARY KEY ({primary_key_columns}),\n    \
            CONSTRAINT fk__{pivot_table}__{pivot_key} \
                FOREIGN KEY ({pivot_key}) REFERENCES {referenced_table} (id) ON DELETE CASCADE\n\
        )"
    ));

    statements.push(format!(
        "CREATE INDEX index__{pivot_table}__{morph_key}_model_type \
            ON {pivot_table} ({morph_key}, model_type)"
    ));

    if schema.team_mode.is_enabled() {
        statements.push(format!(
            "CREATE INDEX index__{pivot_table}__{team_column} ON {pivot_table} ({team_column})"
        ));
    }

    statements
}


pub fn generate_down_sql(schema: &PermissionSchema) -> String {
    let tables = &schema.names.tables;

    join_statements(
        [
            &tables.role_has_permissions,
            &tables.model_has_roles,
            &tables.model_has_permissions,
            &tables.roles,
            &tables.permissions,
        ]
        .into_iter()
        .map(|table_name| format!("DROP TABLE IF EXISTS {}", table_name))
        .collect(),
    )
}


fn join_statements(statements: Vec<String>) -> String {
    let mut script = statements.join(";\n\n");
    script.push_str(";\n");

    script
}



#[cfg(test)]
mod test {
    use warden_core::schema::SchemaNames;

    use super::*;

    #[test]
    fn generates_tables_without_team_columns_when_teams_are_disabled() {
        let up_sql = generate_up_sql(&PermissionSchema::default());

        assert!(up_sql.contains("CREATE TABLE permissions ("));
        assert!(up_sql.contains("CREATE TABLE roles ("));
        assert!(up_sql.contains("CREATE TABLE model_has_permissions ("));
        assert!(up_sql.contains("CREATE TABLE model_has_roles ("));
        assert!(up_sql.contains("CREATE TABLE role_has_permissions ("));

        assert!(!up_sql.contains("team_id"));
        assert!(up_sql.contains("UNIQUE (name, guard_name)"));
        assert!(up_sql.contains("PRIMARY KEY (role_id, model_id, model_type)"));
        assert!(up_sql.contains("PRIMARY KEY (permission_id, role_id)"));
        assert_eq!(up_sql.matches("ON DELETE CASCADE").count(), 4);
    }

    #[test]
    fn generates_team_columns_and_keys_when_teams_are_enabled() {
        let schema = PermissionSchema::new(SchemaNames::default(), TeamMode::Enabled);
        let up_sql = generate_up_sql(&schema);

        assert!(up_sql.contains("UNIQUE (team_id, name, guard_name)"));
        assert!(up_sql.contains("PRIMARY KEY (team_id, role_id, model_id, model_type)"));
        assert!(up_sql.contains("PRIMARY KEY (team_id, permission_id, model_id, model_type)"));
        assert!(up_sql.contains("CREATE INDEX index__roles__team_id ON roles (team_id)"));
        assert!(up_sql.contains(
            "CREATE INDEX index__model_has_roles__team_id ON model_has_roles (team_id)"
        ));
    }

    #[test]
    fn uses_configured_names() {
        let mut names = SchemaNames::default();
        names.tables.roles = "acl_roles".to_string();
        names.columns.role_pivot_key = "acl_role_id".to_string();

        let schema = PermissionSchema::new(names, TeamMode::Disabled);
        let up_sql = generate_up_sql(&schema);

        assert!(up_sql.contains("CREATE TABLE acl_roles ("));
        assert!(up_sql.contains("REFERENCES acl_roles (id) ON DELETE CASCADE"));
        assert!(up_sql.contains("acl_role_id uuid NOT NULL"));
        assert!(!up_sql.contains("CREATE TABLE roles ("));
    }

    #[test]
    fn drops_dependent_tables_first() {
        let down_sql = generate_down_sql(&PermissionSchema::default());

        let drop_positions: Vec<usize> = [
            "role_has_permissions",
            "model_has_roles",
            "model_has_permissions",
            "roles;",
            "permissions;",
        ]
        .into_iter()
        .map(|table_name| {
            down_sql
                .find(&format!("DROP TABLE IF EXISTS {}", table_name))
                .unwrap()
        })
        .collect();

        assert!(drop_positions.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
