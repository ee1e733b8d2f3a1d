//! Error types for SigV4 signing.
//!
//! All signing failures are represented by [`AuthError`]. Signing itself is
//! deterministic; errors only come from malformed inputs or missing
//! credentials.

/// Errors that can occur while producing an AWS Signature Version 4.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request URL could not be parsed.
    #[error("invalid request URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The timestamp is not in the compact ISO-8601 basic format (`YYYYMMDDThhmmssZ`).
    #[error("invalid request timestamp: {0}")]
    InvalidTimestamp(String),

    /// A required credential component is missing.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// A computed header could not be represented as an HTTP header value.
    #[error("invalid value for header {0}")]
    InvalidHeaderValue(String),
}
