//! Multipart upload request and response documents.

use crate::error::S3ErrorCode;

/// Body of `POST /{key}?uploads`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitiateMultipartUploadResult {
    /// Bucket the upload belongs to.
    pub bucket: Option<String>,
    /// Object key being uploaded.
    pub key: Option<String>,
    /// Identifier of the new upload session.
    pub upload_id: Option<String>,
}

/// One entry of the completion document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// Entity tag returned when the part was uploaded, quotes included.
    pub e_tag: String,
}

/// Body of `POST /{key}?uploadId=...`.
///
/// Parts must be listed in ascending `part_number` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteMultipartUpload {
    /// Every uploaded part.
    pub parts: Vec<CompletedPart>,
}

/// Response to a successful completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteMultipartUploadResult {
    /// URL of the assembled object.
    pub location: Option<String>,
    /// Bucket holding the object.
    pub bucket: Option<String>,
    /// Object key.
    pub key: Option<String>,
    /// Entity tag of the assembled object.
    pub e_tag: Option<String>,
}

/// The `<Error>` document the service returns on failure.
///
/// Completion may return it with a `200 OK` status after the connection has
/// been held open, so callers must check the body even on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3ErrorResponse {
    /// Machine-readable error code, e.g. `NoSuchUpload`.
    pub code: Option<String>,
    /// Human-readable description.
    pub message: Option<String>,
    /// Resource the error refers to.
    pub resource: Option<String>,
    /// Request id assigned by the service.
    pub request_id: Option<String>,
}

impl S3ErrorResponse {
    /// The error code, if it is one this crate knows about.
    #[must_use]
    pub fn error_code(&self) -> Option<S3ErrorCode> {
        self.code.as_deref().and_then(S3ErrorCode::from_code)
    }
}
