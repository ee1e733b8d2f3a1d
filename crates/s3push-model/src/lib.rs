//! Wire-level types for the S3 multipart upload operations.
//!
//! These mirror the XML documents exchanged with the storage service:
//! `InitiateMultipartUploadResult`, `CompleteMultipartUpload`,
//! `CompleteMultipartUploadResult`, and the `<Error>` body returned on failure.
//! Serialization lives in `s3push-xml`.

pub mod error;
pub mod types;

pub use error::S3ErrorCode;
pub use types::{
    CompleteMultipartUpload, CompleteMultipartUploadResult, CompletedPart,
    InitiateMultipartUploadResult, S3ErrorResponse,
};
