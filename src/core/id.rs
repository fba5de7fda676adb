// ============================================================================
// Entity identifiers
// ============================================================================
//
// Every entity kind has its own id namespace. Ids are positive integers shown
// as `<tag>-<lowercase hex>` (`p-2a`, `o-3`, `t-10`) and are ordered by their
// numeric value, which is also the order they were issued in.
//
// ============================================================================

use super::validated::{InputErrors, Validated};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

lazy_static! {
    static ref GID_PATTERN: Regex = Regex::new(r"^([a-z])-([0-9a-f]+)$").expect("valid id regex");
}

/// The closed set of top-level entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Program,
    Observation,
    Target,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Program => write!(f, "Program"),
            EntityKind::Observation => write!(f, "Observation"),
            EntityKind::Target => write!(f, "Target"),
        }
    }
}

/// Behaviour shared by all kind-specific ids.
pub trait Gid:
    Copy + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const TAG: char;
    const KIND: EntityKind;

    /// `None` for zero, which is never a valid id.
    fn from_value(value: u64) -> Option<Self>;

    fn value(self) -> u64;

    /// Parses the textual form, reporting malformed input as a validation error.
    fn parse(s: &str) -> Validated<Self> {
        let malformed = || {
            InputErrors::single(format!("'{s}' is not a valid {} id", Self::KIND))
        };
        let caps = GID_PATTERN.captures(s).ok_or_else(malformed)?;
        if !caps[1].starts_with(Self::TAG) {
            return Err(malformed());
        }
        u64::from_str_radix(&caps[2], 16)
            .ok()
            .and_then(Self::from_value)
            .ok_or_else(malformed)
    }
}

macro_rules! define_gid {
    ($(#[$meta:meta])* $name:ident, $tag:literal, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(std::num::NonZeroU64);

        impl Gid for $name {
            const TAG: char = $tag;
            const KIND: EntityKind = $kind;

            fn from_value(value: u64) -> Option<Self> {
                std::num::NonZeroU64::new(value).map($name)
            }

            fn value(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{:x}", $tag, self.0.get())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InputErrors;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                <$name as Gid>::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                <$name as Gid>::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

define_gid!(
    /// Identifies a program.
    ProgramId, 'p', EntityKind::Program
);
define_gid!(
    /// Identifies an observation.
    ObservationId, 'o', EntityKind::Observation
);
define_gid!(
    /// Identifies a target.
    TargetId, 't', EntityKind::Target
);
