//! Polymorphic subjects.
//!
//! Anything in the host system can hold roles or permissions, as long as it can describe
//! itself with a `(subject_type, subject_id)` pair. There is no shared base table:
//! the pair is stored verbatim in the `model_has_*` tables.

use std::{borrow::Cow, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;


/// A concrete subject identity, e.g. `User:7`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub struct Subject {
    subject_type: String,

    subject_id: String,
}

impl Subject {
    pub fn new<T, I>(subject_type: T, subject_id: I) -> Self
    where
        T: Into<String>,
        I: ToString,
    {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.to_string(),
        }
    }

    #[inline]
    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    #[inline]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.subject_type, self.subject_id)
    }
}



#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubjectParseError {
    #[error("expected a subject in the form <type>:<id>, got \"{}\"", .input)]
    MissingSeparator { input: String },

    #[error("subject type must not be empty")]
    EmptyType,

    #[error("subject id must not be empty")]
    EmptyId,
}

impl FromStr for Subject {
    type Err = SubjectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((subject_type, subject_id)) = s.split_once(':') else {
            return Err(SubjectParseError::MissingSeparator {
                input: s.to_string(),
            });
        };

        if subject_type.is_empty() {
            return Err(SubjectParseError::EmptyType);
        }

        if subject_id.is_empty() {
            return Err(SubjectParseError::EmptyId);
        }

        Ok(Self::new(subject_type, subject_id))
    }
}



/// Capability of host entities that can hold roles or permissions.
///
/// Implement this on your own user, service account or API key types
/// and pass them anywhere a subject is expected.
pub trait AsSubject {
    /// Discriminator of the entity kind (e.g. `"User"`).
    fn subject_type(&self) -> Cow<'_, str>;

    /// Identifier of the entity, unique within its kind.
    fn subject_id(&self) -> Cow<'_, str>;

    fn to_subject(&self) -> Subject {
        Subject::new(
            self.subject_type().into_owned(),
            self.subject_id().into_owned(),
        )
    }
}

impl AsSubject for Subject {
    fn subject_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.subject_type)
    }

    fn subject_id(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.subject_id)
    }

    fn to_subject(&self) -> Subject {
        self.clone()
    }
}

impl<S> AsSubject for &S
where
    S: AsSubject + ?Sized,
{
    fn subject_type(&self) -> Cow<'_, str> {
        (**self).subject_type()
    }

    fn subject_id(&self) -> Cow<'_, str> {
        (**self).subject_id()
    }

    fn to_subject(&self) -> Subject {
        (**self).to_subject()
    }
}
