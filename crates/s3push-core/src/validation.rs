//! Checks run before any network call.
//!
//! Bucket naming rules follow the
//! [Amazon S3 documentation](https://docs.aws.amazon.com/AmazonS3/latest/userguide/bucketnamingrules.html).

use std::net::Ipv4Addr;

use crate::error::UploadError;

/// Maximum object key length in bytes.
pub const MAX_KEY_BYTES: usize = 1024;

/// Maximum number of parts in one multipart upload.
pub const MAX_PARTS: usize = 10_000;

const MIN_BUCKET_NAME_LEN: usize = 3;
const MAX_BUCKET_NAME_LEN: usize = 63;

type BucketRule = (fn(&str) -> bool, &'static str);

/// Each rule returns `true` when the name is acceptable.
const BUCKET_RULES: &[BucketRule] = &[
    (
        |name| (MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&name.len()),
        "must be between 3 and 63 characters long",
    ),
    (
        |name| {
            name.bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
        },
        "must only contain lowercase letters, numbers, hyphens, and dots",
    ),
    (
        |name| {
            let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
            name.as_bytes().first().is_some_and(alnum) && name.as_bytes().last().is_some_and(alnum)
        },
        "must start and end with a letter or number",
    ),
    (|name| !name.contains(".."), "must not contain consecutive dots"),
    (
        |name| name.parse::<Ipv4Addr>().is_err(),
        "must not be formatted as an IP address",
    ),
    (|name| !name.starts_with("xn--"), "must not start with 'xn--'"),
    (|name| !name.starts_with("sthree-"), "must not start with 'sthree-'"),
    (|name| !name.ends_with("-s3alias"), "must not end with '-s3alias'"),
];

/// Validate a bucket name.
///
/// # Errors
///
/// Returns [`UploadError::InvalidBucketName`] naming the first violated rule.
///
/// # Examples
///
/// ```
/// use s3push_core::validation::validate_bucket_name;
///
/// assert!(validate_bucket_name("s3go-cli-test").is_ok());
/// assert!(validate_bucket_name("AB").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), UploadError> {
    match BUCKET_RULES.iter().find(|(accepts, _)| !accepts(name)) {
        Some((_, reason)) => Err(UploadError::InvalidBucketName {
            name: name.to_owned(),
            reason: format!("bucket name {reason}"),
        }),
        None => Ok(()),
    }
}

/// Validate an object key: 1 to [`MAX_KEY_BYTES`] bytes, with no `.` or `..`
/// path segment.
///
/// HTTP clients resolve dot segments before sending, so such a key would be
/// sent to a different path than the one signed.
///
/// # Errors
///
/// Returns [`UploadError::EmptyObjectKey`], [`UploadError::ObjectKeyTooLong`],
/// or [`UploadError::InvalidObjectKey`].
pub fn validate_object_key(key: &str) -> Result<(), UploadError> {
    if key.is_empty() {
        return Err(UploadError::EmptyObjectKey);
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(UploadError::ObjectKeyTooLong {
            len: key.len(),
            max: MAX_KEY_BYTES,
        });
    }
    if key.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(UploadError::InvalidObjectKey {
            key: key.to_owned(),
            reason: "path segments '.' and '..' are not allowed",
        });
    }
    Ok(())
}

/// Validate the number of parts a file splits into.
///
/// # Errors
///
/// Returns [`UploadError::TooManyParts`] above [`MAX_PARTS`].
pub fn validate_part_count(parts: usize) -> Result<(), UploadError> {
    if parts > MAX_PARTS {
        return Err(UploadError::TooManyParts {
            parts,
            max: MAX_PARTS,
        });
    }
    Ok(())
}
