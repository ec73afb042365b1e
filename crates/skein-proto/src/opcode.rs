//! Header operation codes (RFC 1035 section 4.1.1, RFC 6895 registry).

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS operation code carried in bits 11-14 of the header flags word.
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
#[repr(u8)]
pub enum OpCode {
    /// Standard query - RFC 1035
    Query = 0,

    /// Inverse query - RFC 1035, obsoleted by RFC 3425
    IQuery = 1,

    /// Server status request - RFC 1035
    Status = 2,

    /// Zone change notification - RFC 1996
    Notify = 4,

    /// Dynamic update - RFC 2136
    Update = 5,

    /// DNS Stateful Operations - RFC 8490
    Dso = 6,
}

impl Default for OpCode {
    fn default() -> Self {
        Self::Query
    }
}

impl OpCode {
    /// Creates an opcode from its numeric value.
    ///
    /// Returns `None` for unassigned values.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns the numeric value of the opcode.
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Returns the mnemonic used in dig-style output.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::IQuery => "IQUERY",
            Self::Status => "STATUS",
            Self::Notify => "NOTIFY",
            Self::Update => "UPDATE",
            Self::Dso => "DSO",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values() {
        assert_eq!(OpCode::from_u8(0), Some(OpCode::Query));
        assert_eq!(OpCode::from_u8(5), Some(OpCode::Update));
        assert_eq!(OpCode::from_u8(3), None);
        assert_eq!(OpCode::Notify.to_u8(), 4);
        assert_eq!(OpCode::Notify.to_string(), "NOTIFY");
    }
}
