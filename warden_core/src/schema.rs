//! Names of the tables and columns backing the permission model.
//!
//! Every name can be overridden through configuration, which is why the SQL in
//! `warden_database` and `warden_migrations` is assembled from these values instead of
//! being written out literally. Names are validated as plain identifiers before use.

use serde::{Deserialize, Serialize};
use thiserror::Error;


#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub permissions: String,

    pub roles: String,

    pub role_has_permissions: String,

    pub model_has_roles: String,

    pub model_has_permissions: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            permissions: "permissions".to_string(),
            roles: "roles".to_string(),
            role_has_permissions: "role_has_permissions".to_string(),
            model_has_roles: "model_has_roles".to_string(),
            model_has_permissions: "model_has_permissions".to_string(),
        }
    }
}


#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Column referencing `roles.id` in the pivot tables.
    pub role_pivot_key: String,

    /// Column referencing `permissions.id` in the pivot tables.
    pub permission_pivot_key: String,

    /// Column holding the subject identifier in the `model_has_*` tables.
    pub model_morph_key: String,

    /// Column holding the team identifier (only present when teams are enabled).
    pub team_foreign_key: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            role_pivot_key: "role_id".to_string(),
            permission_pivot_key: "permission_id".to_string(),
            model_morph_key: "model_id".to_string(),
            team_foreign_key: "team_id".to_string(),
        }
    }
}


#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaNames {
    pub tables: TableNames,

    pub columns: ColumnNames,
}


#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "invalid SQL identifier \"{}\" for {}: expected lowercase ASCII letters, \
    digits and underscores (at most 63 characters, not starting with a digit)",
    .value,
    .field
)]
pub struct InvalidIdentifierError {
    pub field: &'static str,

    pub value: String,
}


/// Returns `true` if `identifier` can be spliced into SQL without quoting.
pub fn is_plain_sql_identifier(identifier: &str) -> bool {
    let mut characters = identifier.chars();

    let Some(first_character) = characters.next() else {
        return false;
    };

    if !(first_character.is_ascii_lowercase() || first_character == '_') {
        return false;
    }

    identifier.len() <= 63
        && characters.all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        })
}

impl SchemaNames {
    pub fn validate(&self) -> Result<(), InvalidIdentifierError> {
        let named_identifiers = [
            ("table_names.permissions", &self.tables.permissions),
            ("table_names.roles", &self.tables.roles),
            (
                "table_names.role_has_permissions",
                &self.tables.role_has_permissions,
            ),
            ("table_names.model_has_roles", &self.tables.model_has_roles),
            (
                "table_names.model_has_permissions",
                &self.tables.model_has_permissions,
            ),
            ("column_names.role_pivot_key", &self.columns.role_pivot_key),
            (
                "column_names.permission_pivot_key",
                &self.columns.permission_pivot_key,
            ),
            ("column_names.model_morph_key", &self.columns.model_morph_key),
            (
                "column_names.team_foreign_key",
                &self.columns.team_foreign_key,
            ),
        ];

        for (field, value) in named_identifiers {
            if !is_plain_sql_identifier(value) {
                return Err(InvalidIdentifierError {
                    field,
                    value: value.clone(),
                });
            }
        }

        Ok(())
    }
}



#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_names_are_valid() {
        assert!(SchemaNames::default().validate().is_ok());
    }

    #[test]
    fn recognizes_plain_identifiers() {
        assert!(is_plain_sql_identifier("model_has_roles"));
        assert!(is_plain_sql_identifier("_private2"));

        assert!(!is_plain_sql_identifier(""));
        assert!(!is_plain_sql_identifier("2fast"));
        assert!(!is_plain_sql_identifier("Roles"));
        assert!(!is_plain_sql_identifier("roles; DROP TABLE roles"));
        assert!(!is_plain_sql_identifier(&"a".repeat(64)));
    }

    #[test]
    fn reports_the_offending_field() {
        let mut names = SchemaNames::default();
        names.columns.team_foreign_key = "team-id".to_string();

        let error = names.validate().unwrap_err();

        assert_eq!(error.field, "column_names.team_foreign_key");
        assert_eq!(error.value, "team-id");
    }
}
