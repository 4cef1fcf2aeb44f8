use std::str::FromStr;

use serde::{Deserialize, Serialize};


macro_rules! impl_transparent_display_for_newtype_struct {
    ($struct_type:ty) => {
        impl std::fmt::Display for $struct_type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}


pub trait WardenUuidNewtype: FromStr {}


macro_rules! create_uuid_newtype {
    ($struct_name:ident) => {
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $struct_name(#[serde(with = "uuid::serde::simple")] pub(crate) uuid::Uuid);

        impl $struct_name {
            #[inline]
            pub fn new(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            #[inline]
            pub fn generate() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            #[inline]
            pub fn into_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl std::str::FromStr for $struct_name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let inner_uuid = <uuid::Uuid as std::str::FromStr>::from_str(s)?;

                Ok(Self(inner_uuid))
            }
        }

        impl $crate::id::WardenUuidNewtype for $struct_name {}

        impl std::fmt::Display for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                uuid::fmt::Simple::from_uuid(self.0).fmt(f)
            }
        }
    };
}



create_uuid_newtype!(PermissionId);

create_uuid_newtype!(RoleId);



/// Identifier of a team (tenant). Teams are owned by a system outside of warden,
/// which is why this is an opaque 64-bit foreign identifier and not a UUID.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub(crate) i64);

impl TeamId {
    #[inline]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl FromStr for TeamId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl_transparent_display_for_newtype_struct!(TeamId);
