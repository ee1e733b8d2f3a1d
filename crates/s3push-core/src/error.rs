//! Upload error types.
//!
//! [`UploadError`] covers the four failure classes of an upload: input errors
//! detected before any network call, transport errors, protocol errors from
//! the service, and consistency errors in the collected part results. Network
//! errors carry the [`UploadPhase`] they happened in.

use std::fmt;
use std::path::PathBuf;

use http::StatusCode;
use s3push_auth::AuthError;
use s3push_model::S3ErrorCode;

use crate::session::UploadState;
use crate::transport::TransportError;

/// The network phase a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadPhase {
    /// `POST ?uploads`.
    Initiate,
    /// `PUT ?partNumber=N&uploadId=ID` for the given 1-based part number.
    UploadPart(u32),
    /// `POST ?uploadId=ID`.
    Complete,
    /// `DELETE ?uploadId=ID`.
    Abort,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiate => f.write_str("initiate multipart upload"),
            Self::UploadPart(n) => write!(f, "upload part {n}"),
            Self::Complete => f.write_str("complete multipart upload"),
            Self::Abort => f.write_str("abort multipart upload"),
        }
    }
}

/// A part that did not produce a completion token.
#[derive(Debug)]
pub struct PartFailure {
    /// 1-based part number.
    pub part_number: u32,
    /// Why the part failed.
    pub error: UploadError,
}

/// Errors produced while uploading a file.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The local file could not be opened or read.
    #[error("failed to read {}: {source}", path.display())]
    Input {
        /// The file being uploaded.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No object key was given and none could be derived from the file path.
    #[error("object key must not be empty")]
    EmptyObjectKey,

    /// The bucket name violates S3 naming rules.
    #[error("invalid bucket name '{name}': {reason}")]
    InvalidBucketName {
        /// The rejected name.
        name: String,
        /// The rule it violates.
        reason: String,
    },

    /// The object key exceeds the maximum length.
    #[error("object key is {len} bytes, maximum is {max}")]
    ObjectKeyTooLong {
        /// Key length in bytes.
        len: usize,
        /// The limit.
        max: usize,
    },

    /// The object key cannot be sent as a request path unchanged.
    #[error("invalid object key '{key}': {reason}")]
    InvalidObjectKey {
        /// The rejected key.
        key: String,
        /// The rule it violates.
        reason: &'static str,
    },

    /// The file would need more parts than a multipart upload allows.
    #[error("file needs {parts} parts, maximum is {max}; increase the part size")]
    TooManyParts {
        /// Number of parts the file splits into.
        parts: usize,
        /// The limit.
        max: usize,
    },

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A request could not be delivered.
    #[error("{phase} failed: {source}")]
    Transport {
        /// The phase of the failed request.
        phase: UploadPhase,
        /// The transport failure.
        source: TransportError,
    },

    /// The service rejected a request.
    #[error(
        "{phase} failed with status {status} ({}): {message}",
        code.as_deref().unwrap_or("no error code")
    )]
    Protocol {
        /// The phase of the rejected request.
        phase: UploadPhase,
        /// Response status.
        status: StatusCode,
        /// S3 error code from the error document, if any.
        code: Option<String>,
        /// Error message, or the raw body when it was not an error document.
        message: String,
    },

    /// A response body could not be parsed.
    #[error("{phase} returned a malformed response: {source}")]
    MalformedResponse {
        /// The phase of the request.
        phase: UploadPhase,
        /// The parse failure.
        source: s3push_xml::XmlError,
    },

    /// Initiate succeeded but returned no upload id.
    #[error("initiate multipart upload returned no upload id")]
    MissingUploadId,

    /// A part upload succeeded but the response carried no `ETag` header.
    #[error("upload part {part_number} response has no ETag header")]
    MissingETag {
        /// 1-based part number.
        part_number: u32,
    },

    /// A part task ended without producing a result.
    #[error("upload part {part_number} task failed: {reason}")]
    PartTaskFailed {
        /// 1-based part number.
        part_number: u32,
        /// Why the task ended.
        reason: String,
    },

    /// Some parts failed; the upload was not completed.
    #[error(
        "{completed} of {expected} parts uploaded, {} failed",
        failures.len()
    )]
    IncompleteUpload {
        /// Number of parts the file was split into.
        expected: usize,
        /// Number of parts that produced a completion token.
        completed: usize,
        /// The failed parts, in ascending part order.
        failures: Vec<PartFailure>,
    },

    /// Completion was attempted without a token for every part.
    #[error("missing completion tokens for parts {missing:?}")]
    MissingParts {
        /// Part numbers with no token.
        missing: Vec<u32>,
    },

    /// Completion tokens exist for parts that were never planned.
    #[error("unexpected completion tokens for parts {unexpected:?}")]
    UnexpectedParts {
        /// Part numbers outside `1..=expected`.
        unexpected: Vec<u32>,
    },

    /// The completion document could not be encoded.
    #[error("failed to encode completion document: {0}")]
    Encode(s3push_xml::XmlError),

    /// The upload session was asked to skip or repeat a phase.
    #[error("upload session cannot move from {from} to {to}")]
    InvalidTransition {
        /// State the session was in.
        from: UploadState,
        /// State that was requested.
        to: UploadState,
    },

    /// A request could not be signed.
    #[error("failed to sign request: {0}")]
    Signing(#[from] AuthError),
}

impl UploadError {
    /// The S3 error code carried by a protocol error.
    #[must_use]
    pub fn s3_error_code(&self) -> Option<&str> {
        match self {
            Self::Protocol { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// The S3 error code, if it is one the client acts on.
    #[must_use]
    pub fn service_code(&self) -> Option<S3ErrorCode> {
        self.s3_error_code().and_then(S3ErrorCode::from_code)
    }
}
