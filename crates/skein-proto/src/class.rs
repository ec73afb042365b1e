//! Record classes.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Assigned record classes (RFC 1035 section 3.2.4, RFC 2136).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
pub enum RecordClass {
    /// Internet
    IN = 1,
    /// CHAOS
    CH = 3,
    /// Hesiod
    HS = 4,
    /// NONE, used by dynamic update
    NONE = 254,
    /// ANY, query only
    ANY = 255,
}

impl Default for RecordClass {
    fn default() -> Self {
        Self::IN
    }
}

impl RecordClass {
    /// Creates a class from its numeric value.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns the mnemonic of the class.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IN => "IN",
            Self::CH => "CH",
            Self::HS => "HS",
            Self::NONE => "NONE",
            Self::ANY => "ANY",
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Any 16-bit class value, assigned or not.
///
/// The OPT pseudo-record reuses this field as its UDP payload size, so
/// arbitrary values must survive a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Class {
    /// An assigned class.
    Known(RecordClass),
    /// Any other value (`CLASS<n>` in text, RFC 3597).
    Unknown(u16),
}

impl Class {
    /// Creates a class from a u16 value.
    #[inline]
    pub fn from_u16(value: u16) -> Self {
        RecordClass::from_u16(value).map_or(Self::Unknown(value), Self::Known)
    }

    /// Returns the numeric value.
    #[inline]
    pub fn to_u16(self) -> u16 {
        match self {
            Self::Known(c) => c.into(),
            Self::Unknown(v) => v,
        }
    }

    /// Returns the assigned class, if any.
    #[inline]
    pub const fn as_known(self) -> Option<RecordClass> {
        match self {
            Self::Known(c) => Some(c),
            Self::Unknown(_) => None,
        }
    }
}

impl From<RecordClass> for Class {
    fn from(c: RecordClass) -> Self {
        Self::Known(c)
    }
}

impl Default for Class {
    fn default() -> Self {
        Self::Known(RecordClass::IN)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(c) => write!(f, "{c}"),
            Self::Unknown(v) => write!(f, "CLASS{v}"),
        }
    }
}

impl FromStr for Class {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let known = match upper.as_str() {
            "IN" => Some(RecordClass::IN),
            "CH" => Some(RecordClass::CH),
            "HS" => Some(RecordClass::HS),
            "NONE" => Some(RecordClass::NONE),
            "ANY" => Some(RecordClass::ANY),
            _ => None,
        };
        if let Some(class) = known {
            return Ok(class.into());
        }
        upper
            .strip_prefix("CLASS")
            .and_then(|n| n.parse::<u16>().ok())
            .map(Self::from_u16)
            .ok_or_else(|| Error::invalid_data(0, format!("unknown class '{s}'")))
    }
}
