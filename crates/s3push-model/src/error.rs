//! Error codes the client acts on.

use std::fmt;

/// S3 error codes that change what s3push does or tells the user.
///
/// Any other code is kept as a plain string on the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum S3ErrorCode {
    /// AccessDenied: the credential may not write to the bucket.
    AccessDenied,
    /// EntityTooSmall: a non-final part is below the minimum size.
    EntityTooSmall,
    /// InvalidAccessKeyId: the access key id is unknown.
    InvalidAccessKeyId,
    /// NoSuchBucket: the bucket does not exist.
    NoSuchBucket,
    /// NoSuchUpload: the upload id is unknown, completed, or aborted.
    NoSuchUpload,
    /// RequestTimeTooSkewed: the request timestamp is too far from the server's time.
    RequestTimeTooSkewed,
    /// SignatureDoesNotMatch: the service computed a different signature.
    SignatureDoesNotMatch,
}

impl S3ErrorCode {
    /// Returns the error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::EntityTooSmall => "EntityTooSmall",
            Self::InvalidAccessKeyId => "InvalidAccessKeyId",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchUpload => "NoSuchUpload",
            Self::RequestTimeTooSkewed => "RequestTimeTooSkewed",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
        }
    }

    /// Parse an error code string, returning `None` for unknown codes.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let parsed = match code {
            "AccessDenied" => Self::AccessDenied,
            "EntityTooSmall" => Self::EntityTooSmall,
            "InvalidAccessKeyId" => Self::InvalidAccessKeyId,
            "NoSuchBucket" => Self::NoSuchBucket,
            "NoSuchUpload" => Self::NoSuchUpload,
            "RequestTimeTooSkewed" => Self::RequestTimeTooSkewed,
            "SignatureDoesNotMatch" => Self::SignatureDoesNotMatch,
            _ => return None,
        };
        Some(parsed)
    }

    /// What the user can check to resolve the error.
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::AccessDenied => "check that the credential may write to the bucket",
            Self::EntityTooSmall => "raise S3_PART_SIZE to at least 5 MiB",
            Self::InvalidAccessKeyId | Self::SignatureDoesNotMatch => {
                "check AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, and the region"
            }
            Self::NoSuchBucket => "check the bucket name and region",
            Self::NoSuchUpload => "the upload was completed or aborted elsewhere",
            Self::RequestTimeTooSkewed => "synchronize the system clock",
        }
    }
}

impl fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
