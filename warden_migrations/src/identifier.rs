use std::{
    fmt::Display,
    hash::{Hash, Hasher},
};


/// Uniquely identifies a migration by its version.
/// The name is purely descriptive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationIdentifier {
    pub version: i64,

    pub name: String,
}

impl MigrationIdentifier {
    pub(crate) fn new<N>(version: i64, name: N) -> Self
    where
        N: Into<String>,
    {
        Self {
            version,
            name: name.into(),
        }
    }
}

impl Hash for MigrationIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.version.hash(state)
    }
}

impl Display for MigrationIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{:04}_{}", self.version, self.name)
    }
}
