pub mod auth;
pub mod comment;
pub mod post;
pub mod text;
pub mod user;

use crate::{
    model::{
        auth::InvalidSessionTokenHashError, text::EmptyBodyTextError,
        user::InvalidDisplayNameError,
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    DisplayName(#[from] InvalidDisplayNameError),
    #[error(transparent)]
    BodyText(#[from] EmptyBodyTextError),
    #[error(transparent)]
    TokenHash(#[from] InvalidSessionTokenHashError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct DevioEpoch;
impl Epoch for DevioEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type DevioSnowflake = Snowflake<DevioEpoch>;
pub type DevioSnowflakeGenerator = SnowflakeGenerator<DevioEpoch>;

/// A snowflake tagged with the kind of entity it identifies.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(DevioSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: DevioSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> DevioSnowflake {
        self.0
    }

    /// Signed form used by `BIGINT` columns.
    #[must_use]
    pub fn to_db(self) -> i64 {
        self.0.get().cast_signed()
    }

    #[must_use]
    pub fn from_db(value: i64) -> Self {
        value.cast_unsigned().into()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<DevioSnowflake> for Id<Marker> {
    fn from(value: DevioSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(DevioSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
