use serde::Deserialize;

use crate::traits::Resolve;


pub(crate) type UnresolvedDatabaseConfiguration = DatabaseConfiguration;

/// PostgreSQL-related configuration.
#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseConfiguration {
    /// Host of the database.
    pub host: String,

    /// Port the database is listening at.
    pub port: u16,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: Option<String>,

    /// Database name.
    pub database_name: String,

    /// Number of prepared statements to cache per connection.
    pub statement_cache_capacity: Option<usize>,
}

impl Resolve for UnresolvedDatabaseConfiguration {
    type Resolved = DatabaseConfiguration;

    fn resolve(self) -> Self::Resolved {
        self
    }
}

impl DatabaseConfiguration {
    /// Builds a `postgres://` URL out of this configuration.
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, password, self.host, self.port, self.database_name
            ),
            None => format!(
                "postgres://{}@{}:{}/{}",
                self.username, self.host, self.port, self.database_name
            ),
        }
    }
}
