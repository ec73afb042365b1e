//! Resolution failure taxonomy.
//!
//! Failures are plain data handed up to resolver-level callers. Nothing here
//! performs I/O.

use serde::{Deserialize, Serialize};
use skein_proto::{Name, ResponseCode};
use std::fmt;
use thiserror::Error;

/// Why a resolution failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// No specific reason.
    #[default]
    None,

    /// The best known server answered without authority and without referrals.
    NoAuthoritativeResult,

    /// A signed record had fewer labels than its signature claims.
    TooFewLabels,

    /// The query budget ran out before an authoritative answer was found.
    QueryLimitReached,

    /// Resolution failed on an internal error.
    InternalResolutionFailure,

    /// The same delegation was visited twice.
    ResolveLoop,

    /// The server answered with a non-success response code.
    DnsServerError,

    /// No response arrived before the query timeout.
    QueryTimeout,

    /// The query itself was unusable, e.g. it carried no question.
    InvalidQuery,

    /// A DNS-over-HTTPS server sent a response that is not a DNS message.
    HttpsResponseInvalid,
}

impl FailureReason {
    /// Returns the fixed human-readable description for this reason.
    pub const fn description(self) -> &'static str {
        match self {
            Self::NoAuthoritativeResult => {
                "Response of best known server is not authoritative and has no referrals."
            }
            Self::TooFewLabels => {
                "Encoding of records with less labels than RrSigRecord is not allowed."
            }
            Self::QueryLimitReached => "Query limit reached without authoritive answer.",
            Self::InternalResolutionFailure => "The resolution failed due to an internal error.",
            Self::ResolveLoop => "A resolve loop was detected.",
            Self::None
            | Self::DnsServerError
            | Self::QueryTimeout
            | Self::InvalidQuery
            | Self::HttpsResponseInvalid => "DNS resolution failed for an unknown reason.",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::NoAuthoritativeResult => "no-authoritative-result",
            Self::TooFewLabels => "too-few-labels",
            Self::QueryLimitReached => "query-limit-reached",
            Self::InternalResolutionFailure => "internal-resolution-failure",
            Self::ResolveLoop => "resolve-loop",
            Self::DnsServerError => "dns-server-error",
            Self::QueryTimeout => "query-timeout",
            Self::InvalidQuery => "invalid-query",
            Self::HttpsResponseInvalid => "https-response-invalid",
        };
        f.write_str(s)
    }
}

/// A failed resolution of `name`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({name})")]
pub struct ResolutionFailure {
    reason: FailureReason,
    name: Name,
    rcode: Option<ResponseCode>,
    message: String,
}

impl ResolutionFailure {
    /// Creates a failure with the given reason.
    pub fn new(reason: FailureReason, name: Name) -> Self {
        Self {
            reason,
            name,
            rcode: None,
            message: reason.description().to_string(),
        }
    }

    /// Creates a failure from a server response code.
    ///
    /// The reason is always [`FailureReason::DnsServerError`].
    pub fn from_response_code(rcode: ResponseCode, name: Name) -> Self {
        Self {
            reason: FailureReason::DnsServerError,
            name,
            rcode: Some(rcode),
            message: format!("The DNS resolution failed with error {rcode}."),
        }
    }

    /// Returns the failure reason.
    #[inline]
    pub const fn reason(&self) -> FailureReason {
        self.reason
    }

    /// Returns the name that was being resolved.
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the server's response code, if the failure came from one.
    #[inline]
    pub const fn rcode(&self) -> Option<ResponseCode> {
        self.rcode
    }

    /// Returns the human-readable message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn name() -> Name {
        Name::from_str("example.com.").unwrap()
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            FailureReason::ResolveLoop.description(),
            "A resolve loop was detected."
        );
        assert_eq!(
            FailureReason::QueryLimitReached.description(),
            "Query limit reached without authoritive answer."
        );
        assert_eq!(
            FailureReason::default().description(),
            "DNS resolution failed for an unknown reason."
        );
        assert_eq!(
            FailureReason::QueryTimeout.description(),
            FailureReason::None.description()
        );
    }

    #[test]
    fn test_from_response_code_normalizes_reason() {
        let failure = ResolutionFailure::from_response_code(ResponseCode::Refused, name());
        assert_eq!(failure.reason(), FailureReason::DnsServerError);
        assert_eq!(failure.rcode(), Some(ResponseCode::Refused));
        assert_eq!(failure.name(), &name());
        assert!(failure.message().contains("REFUSED"));
    }

    #[test]
    fn test_reason_failure_has_no_rcode() {
        let failure = ResolutionFailure::new(FailureReason::TooFewLabels, name());
        assert_eq!(failure.rcode(), None);
        assert!(failure.to_string().starts_with("Encoding of records"));
        assert!(failure.to_string().ends_with("(example.com.)"));
    }
}
