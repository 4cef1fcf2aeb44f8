//! SHA-256 digests of migration scripts.
//!
//! The tracking table stores digests as raw `bytea`; they are displayed as uppercase hex.

use std::fmt::{self, Display, Formatter};

use sha2::{Digest, Sha256};
use thiserror::Error;


const DIGEST_LENGTH: usize = 32;


#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected a {} byte SHA-256 digest, got {} bytes", DIGEST_LENGTH, .length)]
pub struct InvalidDigestLengthError {
    pub length: usize,
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sha256Hash([u8; DIGEST_LENGTH]);

impl Sha256Hash {
    /// Digest of a migration script's exact SQL text.
    pub fn of_script(sql: &str) -> Self {
        Self(Sha256::digest(sql.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Sha256Hash {
    type Error = InvalidDigestLengthError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; DIGEST_LENGTH]>::try_from(bytes)
            .map(Self)
            .map_err(|_| InvalidDigestLengthError {
                length: bytes.len(),
            })
    }
}

impl Display for Sha256Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0
            .iter()
            .try_for_each(|byte| write!(f, "{byte:02X}"))
    }
}



#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn digest_of_empty_script_displays_as_uppercase_hex() {
        assert_eq!(
            Sha256Hash::of_script("").to_string(),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }

    #[test]
    fn stored_digests_must_be_32_bytes_long() {
        let digest = Sha256Hash::of_script("SELECT 1");

        assert_eq!(Sha256Hash::try_from(digest.as_bytes()), Ok(digest));
        assert_eq!(
            Sha256Hash::try_from([0u8; 31].as_slice()),
            Err(InvalidDigestLengthError { length: 31 })
        );
    }
}
