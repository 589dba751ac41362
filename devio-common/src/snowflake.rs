//! Snowflake identifiers.
//!
//! Bit layout, most significant first: 42 bits of milliseconds since an [`Epoch`],
//! 5 bits worker id, 5 bits process id and a 12 bit per-millisecond increment.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_BITS: u32 = 42;
pub const WORKER_ID_BITS: u32 = 5;
pub const PROCESS_ID_BITS: u32 = 5;
pub const INCREMENT_BITS: u32 = 12;

const INCREMENT_SHIFT: u32 = 0;
const PROCESS_ID_SHIFT: u32 = INCREMENT_SHIFT + INCREMENT_BITS;
const WORKER_ID_SHIFT: u32 = PROCESS_ID_SHIFT + PROCESS_ID_BITS;
const TIMESTAMP_SHIFT: u32 = WORKER_ID_SHIFT + WORKER_ID_BITS;

const fn mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum SnowflakeError {
    #[error("Time is before the snowflake epoch")]
    TimeBeforeEpoch,
    #[error("Timestamp does not fit into {TIMESTAMP_BITS} bits")]
    TimestampTooLarge,
    #[error("{part} {value} is out of range")]
    PartOutOfRange { part: &'static str, value: u64 },
}

macro_rules! bounded_part {
    ($name:ident($repr:ty), $bits:ident) => {
        #[derive(
            Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            pub fn new(value: $repr) -> Result<Self, SnowflakeError> {
                if u64::from(value) <= mask($bits) {
                    Ok(Self(value))
                } else {
                    Err(SnowflakeError::PartOutOfRange {
                        part: stringify!($name),
                        value: value.into(),
                    })
                }
            }

            #[must_use]
            pub fn get(self) -> $repr {
                self.0
            }
        }

        impl TryFrom<$repr> for $name {
            type Error = SnowflakeError;

            fn try_from(value: $repr) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = <$repr>::deserialize(deserializer)?;
                Self::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

bounded_part!(WorkerId(u8), WORKER_ID_BITS);
bounded_part!(ProcessId(u8), PROCESS_ID_BITS);

/// Milliseconds between the epoch of `E` and `time`.
pub fn millis_since_epoch<E: Epoch>(time: UtcDateTime) -> Result<u64, SnowflakeError> {
    let millis = (time - E::EPOCH_TIME).whole_milliseconds();
    if millis < 0 {
        return Err(SnowflakeError::TimeBeforeEpoch);
    }
    u64::try_from(millis)
        .ok()
        .filter(|millis| *millis <= mask(TIMESTAMP_BITS))
        .ok_or(SnowflakeError::TimestampTooLarge)
}

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake<E>(u64, #[serde(skip)] PhantomData<E>);

impl<E> Snowflake<E> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    /// Packs the parts. `millis` and `increment` are truncated to their bit widths.
    #[must_use]
    pub fn compose(
        millis: u64,
        worker_id: WorkerId,
        process_id: ProcessId,
        increment: u16,
    ) -> Self {
        Self::new(
            ((millis & mask(TIMESTAMP_BITS)) << TIMESTAMP_SHIFT)
                | (u64::from(worker_id.get()) << WORKER_ID_SHIFT)
                | (u64::from(process_id.get()) << PROCESS_ID_SHIFT)
                | ((u64::from(increment) & mask(INCREMENT_BITS)) << INCREMENT_SHIFT),
        )
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn millis(self) -> u64 {
        (self.0 >> TIMESTAMP_SHIFT) & mask(TIMESTAMP_BITS)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn worker_id(self) -> WorkerId {
        WorkerId(((self.0 >> WORKER_ID_SHIFT) & mask(WORKER_ID_BITS)) as u8)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn process_id(self) -> ProcessId {
        ProcessId(((self.0 >> PROCESS_ID_SHIFT) & mask(PROCESS_ID_BITS)) as u8)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn increment(self) -> u16 {
        ((self.0 >> INCREMENT_SHIFT) & mask(INCREMENT_BITS)) as u16
    }

    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        E: Epoch,
    {
        // 42 bits of milliseconds always fit into an i64.
        #[allow(clippy::cast_possible_wrap)]
        let millis = self.millis() as i64;
        E::EPOCH_TIME + Duration::milliseconds(millis)
    }
}

impl<E> Display for Snowflake<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<E> From<u64> for Snowflake<E> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<E> From<Snowflake<E>> for u64 {
    fn from(value: Snowflake<E>) -> Self {
        value.get()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
struct LastIssued {
    millis: u64,
    increment: u16,
}

/// Issues strictly increasing snowflakes for one worker/process pair.
///
/// Safe to share between tasks. When all increments of a millisecond are used up
/// the generator moves on to the following millisecond instead of repeating an id.
#[derive_where(Debug)]
pub struct SnowflakeGenerator<E> {
    worker_id: WorkerId,
    process_id: ProcessId,
    last: Mutex<Option<LastIssued>>,
    epoch: PhantomData<fn() -> E>,
}

impl<E> SnowflakeGenerator<E> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            last: Mutex::new(None),
            epoch: PhantomData,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn generate_at(&self, time: UtcDateTime) -> Result<Snowflake<E>, SnowflakeError>
    where
        E: Epoch,
    {
        let now = millis_since_epoch::<E>(time)?;

        let mut last = self.last.lock();
        let next = match *last {
            Some(previous) if previous.millis >= now => {
                if u64::from(previous.increment) < mask(INCREMENT_BITS) {
                    LastIssued {
                        millis: previous.millis,
                        increment: previous.increment + 1,
                    }
                } else {
                    LastIssued {
                        millis: previous.millis + 1,
                        increment: 0,
                    }
                }
            }
            _ => LastIssued {
                millis: now,
                increment: 0,
            },
        };
        if next.millis > mask(TIMESTAMP_BITS) {
            return Err(SnowflakeError::TimestampTooLarge);
        }
        *last = Some(next);

        Ok(Snowflake::compose(
            next.millis,
            self.worker_id,
            self.process_id,
            next.increment,
        ))
    }

    pub fn generate(&self) -> Result<Snowflake<E>, SnowflakeError>
    where
        E: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}
