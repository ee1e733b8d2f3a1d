//! AWS Signature Version 4 primitives.
//!
//! Signing a request takes four steps:
//!
//! 1. Hash the canonical request (see [`crate::canonical`]).
//! 2. Build the string to sign from the timestamp, credential scope, and that hash.
//! 3. Derive the signing key with an HMAC-SHA256 chain over the scope components.
//! 4. HMAC the string to sign with the signing key and hex-encode the result.
//!
//! [`crate::signer::RequestSigner`] wires these together for outgoing requests.

use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

/// The only algorithm this crate produces.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name used in every credential scope.
pub const SERVICE: &str = "s3";

/// Terminal component of the credential scope.
pub const SCOPE_TERMINATOR: &str = "aws4_request";

/// Hex SHA-256 of an empty payload.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

type HmacSha256 = Hmac<Sha256>;

/// Build the credential scope: `date/region/service/aws4_request`.
///
/// # Examples
///
/// ```
/// use s3push_auth::sigv4::credential_scope;
///
/// assert_eq!(
///     credential_scope("20130524", "us-east-1", "s3"),
///     "20130524/us-east-1/s3/aws4_request"
/// );
/// ```
#[must_use]
pub fn credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/{SCOPE_TERMINATOR}")
}

/// Build the string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256\n
/// <timestamp>\n
/// <credential_scope>\n
/// <hex(sha256(canonical_request))>
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the hex-encoded HMAC-SHA256 signature of `string_to_sign`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], string_to_sign: &str) -> String {
    hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes()))
}

/// Format the `Authorization` header value.
///
/// # Examples
///
/// ```
/// use s3push_auth::sigv4::build_authorization_header;
///
/// let value = build_authorization_header(
///     "AKIDEXAMPLE",
///     "20150830/us-east-1/iam/aws4_request",
///     "host;x-amz-date",
///     "abc123",
/// );
/// assert_eq!(
///     value,
///     "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
///      SignedHeaders=host;x-amz-date, Signature=abc123"
/// );
/// ```
#[must_use]
pub fn build_authorization_header(
    access_key_id: &str,
    credential_scope: &str,
    signed_headers: &str,
    signature: &str,
) -> String {
    format!(
        "{ALGORITHM} Credential={access_key_id}/{credential_scope}, \
         SignedHeaders={signed_headers}, Signature={signature}"
    )
}

/// Compute the SHA-256 hash of the given payload and return it as a hex string.
///
/// # Examples
///
/// ```
/// use s3push_auth::sigv4::{EMPTY_PAYLOAD_SHA256, hash_payload};
///
/// assert_eq!(hash_payload(b""), EMPTY_PAYLOAD_SHA256);
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
