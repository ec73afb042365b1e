//! DNS codec error types.
//!
//! Every malformed input surfaces as one of these errors. Parsing never
//! hands back a partially decoded message.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// DNS codec errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Wire Format Errors
    // =========================================================================
    /// Buffer is too short to contain the expected data.
    #[error("buffer too short: expected at least {expected} bytes, got {actual}")]
    BufferTooShort {
        /// Expected minimum size.
        expected: usize,
        /// Actual buffer size.
        actual: usize,
    },

    /// Unexpected end of data while parsing.
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof {
        /// Byte offset where EOF was encountered.
        offset: usize,
    },

    /// Invalid data encountered during parsing.
    #[error("invalid data at offset {offset}: {message}")]
    InvalidData {
        /// Byte offset of the invalid data.
        offset: usize,
        /// Description of the error.
        message: String,
    },

    // =========================================================================
    // Domain Name Errors
    // =========================================================================
    /// Label exceeds maximum length of 63 bytes.
    #[error("label too long: {length} bytes exceeds maximum of 63")]
    LabelTooLong {
        /// Actual label length.
        length: usize,
    },

    /// Domain name exceeds maximum length of 255 bytes.
    #[error("name too long: {length} bytes exceeds maximum of 255")]
    NameTooLong {
        /// Actual name length in wire format.
        length: usize,
    },

    /// Empty label in the middle of a domain name.
    #[error("empty label at position {position} (only allowed at end for root)")]
    EmptyLabel {
        /// Position of the empty label.
        position: usize,
    },

    /// Malformed escape sequence in a presentation-format name.
    #[error("invalid escape sequence in name at position {position}")]
    InvalidEscape {
        /// Character position of the backslash.
        position: usize,
    },

    /// Compression pointer referencing itself or a later offset.
    #[error("invalid compression pointer at offset {offset}: points to {target}")]
    InvalidCompressionPointer {
        /// Offset of the pointer.
        offset: usize,
        /// Target offset the pointer references.
        target: usize,
    },

    /// Too many compression pointer jumps.
    #[error("too many compression pointer jumps (>{max_jumps})")]
    TooManyCompressionJumps {
        /// Maximum allowed jumps.
        max_jumps: usize,
    },

    // =========================================================================
    // Header Errors
    // =========================================================================
    /// Invalid opcode value.
    #[error("invalid opcode: {value}")]
    InvalidOpCode {
        /// The invalid opcode value.
        value: u8,
    },

    // =========================================================================
    // RDATA Errors
    // =========================================================================
    /// Declared RDATA length does not match what the record consumed.
    #[error("RDATA length mismatch for {rtype}: expected {expected}, got {actual}")]
    RDataLengthMismatch {
        /// Record type.
        rtype: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid RDATA content.
    #[error("invalid RDATA for {rtype}: {message}")]
    InvalidRData {
        /// Record type.
        rtype: String,
        /// Error description.
        message: String,
    },

    /// RDATA that does not fit the 16-bit length field.
    #[error("RDATA for {rtype} is {length} bytes, exceeding 65535")]
    RDataTooLong {
        /// Record type.
        rtype: String,
        /// Encoded length.
        length: usize,
    },

    // =========================================================================
    // Master-File Text Errors
    // =========================================================================
    /// Token count outside the range a record type accepts.
    #[error("{rtype} expects {expected} tokens, got {actual}")]
    InvalidTokenCount {
        /// Record type.
        rtype: String,
        /// Human-readable accepted range.
        expected: String,
        /// Number of tokens supplied.
        actual: usize,
    },

    /// A token that cannot be converted to the field it represents.
    #[error("invalid {rtype} token '{token}': {message}")]
    InvalidToken {
        /// Record type.
        rtype: String,
        /// Offending token.
        token: String,
        /// Error description.
        message: String,
    },

    // =========================================================================
    // EDNS Errors
    // =========================================================================
    /// Invalid EDNS option.
    #[error("invalid EDNS option {code}: {message}")]
    InvalidEdnsOption {
        /// Option code.
        code: u16,
        /// Error description.
        message: String,
    },

    /// Multiple OPT records in message.
    #[error("multiple OPT records in message (only one allowed)")]
    MultipleOptRecords,

    /// A flag carried by the OPT record was set on a message without EDNS.
    #[error("setting {flag} requires an EDNS OPT record")]
    EdnsRequired {
        /// The flag being set.
        flag: &'static str,
    },

    // =========================================================================
    // Message Errors
    // =========================================================================
    /// Message exceeds maximum size.
    #[error("message too large: {size} bytes exceeds maximum of {max_size}")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },
}

impl Error {
    /// Creates a new `BufferTooShort` error.
    #[inline]
    pub fn buffer_too_short(expected: usize, actual: usize) -> Self {
        Self::BufferTooShort { expected, actual }
    }

    /// Creates a new `UnexpectedEof` error.
    #[inline]
    pub fn unexpected_eof(offset: usize) -> Self {
        Self::UnexpectedEof { offset }
    }

    /// Creates a new `InvalidData` error.
    #[inline]
    pub fn invalid_data(offset: usize, message: impl Into<String>) -> Self {
        Self::InvalidData {
            offset,
            message: message.into(),
        }
    }

    /// Creates a new `RDataLengthMismatch` error.
    #[inline]
    pub fn rdata_length(rtype: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::RDataLengthMismatch {
            rtype: rtype.into(),
            expected,
            actual,
        }
    }

    /// Creates a new `InvalidRData` error.
    #[inline]
    pub fn invalid_rdata(rtype: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRData {
            rtype: rtype.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidTokenCount` error.
    #[inline]
    pub fn token_count(rtype: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        Self::InvalidTokenCount {
            rtype: rtype.into(),
            expected: expected.into(),
            actual,
        }
    }

    /// Creates a new `InvalidToken` error.
    #[inline]
    pub fn invalid_token(
        rtype: impl Into<String>,
        token: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidToken {
            rtype: rtype.into(),
            token: token.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidEdnsOption` error.
    #[inline]
    pub fn invalid_edns_option(code: u16, message: impl Into<String>) -> Self {
        Self::InvalidEdnsOption {
            code,
            message: message.into(),
        }
    }

    /// Returns true if the bytes themselves are broken (truncated or pointing
    /// outside the message) and the message should be dropped.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::BufferTooShort { .. }
                | Self::UnexpectedEof { .. }
                | Self::InvalidData { .. }
                | Self::InvalidCompressionPointer { .. }
                | Self::TooManyCompressionJumps { .. }
                | Self::RDataLengthMismatch { .. }
        )
    }

    /// Returns true if this error indicates a format error (FORMERR).
    #[inline]
    pub fn is_format_error(&self) -> bool {
        self.is_malformed()
            || matches!(
                self,
                Self::LabelTooLong { .. }
                    | Self::NameTooLong { .. }
                    | Self::EmptyLabel { .. }
                    | Self::InvalidEscape { .. }
                    | Self::InvalidOpCode { .. }
                    | Self::InvalidRData { .. }
                    | Self::InvalidTokenCount { .. }
                    | Self::InvalidToken { .. }
                    | Self::InvalidEdnsOption { .. }
                    | Self::MultipleOptRecords
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::buffer_too_short(12, 8);
        assert_eq!(
            err.to_string(),
            "buffer too short: expected at least 12 bytes, got 8"
        );

        let err = Error::token_count("ISDN", "1 to 2", 3);
        assert_eq!(err.to_string(), "ISDN expects 1 to 2 tokens, got 3");

        let err = Error::EdnsRequired { flag: "DO" };
        assert_eq!(err.to_string(), "setting DO requires an EDNS OPT record");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::buffer_too_short(10, 5).is_malformed());
        assert!(Error::rdata_length("A", 4, 5).is_malformed());
        assert!(Error::LabelTooLong { length: 64 }.is_format_error());
        assert!(Error::MultipleOptRecords.is_format_error());
        assert!(Error::token_count("SSHFP", "at least 3", 2).is_format_error());
        assert!(!Error::EdnsRequired { flag: "DO" }.is_format_error());
    }
}
