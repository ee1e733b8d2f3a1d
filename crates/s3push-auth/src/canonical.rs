//! Canonical request construction for AWS Signature Version 4.
//!
//! The canonical request is the deterministic string both sides hash:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders          (one `name:value\n` line per header)
//! \n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! The path is taken exactly as it appears in the URL: object keys are already
//! percent-encoded by the caller and must not be encoded a second time.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::AuthError;

/// Characters percent-encoded in canonical query components.
///
/// Everything except the RFC 3986 unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) is encoded.
pub const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The canonical header block together with its signed-headers list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHeaders {
    /// One `name:value\n` line per header, sorted by lower-cased name.
    pub block: String,
    /// The same sorted names joined with `;`.
    pub signed_headers: String,
}

/// Build the full canonical request.
///
/// # Errors
///
/// Returns [`AuthError::InvalidUrl`] if `url` cannot be parsed.
///
/// # Examples
///
/// ```
/// use s3push_auth::canonical::{build_canonical_request, canonicalize_headers};
///
/// let headers = canonicalize_headers(&[("Host", "examplebucket.s3.amazonaws.com")]);
/// let canonical = build_canonical_request(
///     "GET",
///     "https://examplebucket.s3.amazonaws.com/test.txt",
///     &headers,
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// )
/// .unwrap();
/// assert!(canonical.starts_with("GET\n/test.txt\n\nhost:examplebucket.s3.amazonaws.com\n"));
/// ```
pub fn build_canonical_request(
    method: &str,
    url: &str,
    headers: &CanonicalHeaders,
    payload_hash: &str,
) -> Result<String, AuthError> {
    let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| AuthError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    let canonical_uri = build_canonical_uri(uri.path());
    let canonical_query = build_canonical_query_string(uri.query().unwrap_or(""));

    Ok(format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{}\n{}\n{payload_hash}",
        headers.block, headers.signed_headers
    ))
}

/// Build the canonical URI.
///
/// The path is preserved byte-for-byte; only an empty path is normalized to `/`.
///
/// # Examples
///
/// ```
/// use s3push_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/photos/my%20cat.jpg"), "/photos/my%20cat.jpg");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        "/".to_owned()
    } else {
        path.to_owned()
    }
}

/// Build the canonical query string.
///
/// Parameters are decoded, stably sorted by their encoded key, and re-encoded
/// with [`URI_ENCODE_SET`]. Values sharing a key keep their original order. A
/// parameter without `=` gets an empty value.
///
/// # Examples
///
/// ```
/// use s3push_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(""), "");
/// assert_eq!(build_canonical_query_string("uploads"), "uploads=");
/// assert_eq!(build_canonical_query_string("b=2&a=1"), "a=1&b=2");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    let mut params: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonicalize a header mapping.
///
/// Names are lower-cased and sorted byte-wise; values are normalized with
/// [`normalize_header_value`]. Names that collide after lower-casing have
/// their values joined with `,` in input order. An empty mapping yields an
/// empty block and an empty signed-headers list.
///
/// # Examples
///
/// ```
/// use s3push_auth::canonical::canonicalize_headers;
///
/// let headers = canonicalize_headers(&[("X-Amz-Date", "20150830T123600Z"), ("Host", "example.com")]);
/// assert_eq!(headers.block, "host:example.com\nx-amz-date:20150830T123600Z\n");
/// assert_eq!(headers.signed_headers, "host;x-amz-date");
/// ```
#[must_use]
pub fn canonicalize_headers(headers: &[(&str, &str)]) -> CanonicalHeaders {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let normalized = normalize_header_value(value);
        header_map
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&normalized);
            })
            .or_insert(normalized);
    }

    let block = header_map
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect::<String>();
    let signed_headers = header_map.keys().map(String::as_str).collect::<Vec<_>>().join(";");

    CanonicalHeaders {
        block,
        signed_headers,
    }
}

/// Normalize a header value.
///
/// The leading whitespace run is dropped, every interior run collapses to a
/// single space, and a trailing run disappears entirely. A value made only of
/// whitespace becomes empty.
///
/// # Examples
///
/// ```
/// use s3push_auth::canonical::normalize_header_value;
///
/// assert_eq!(normalize_header_value("   a   b   c  "), "a b c");
/// assert_eq!(normalize_header_value("\"a   b\"\n"), "\"a b\"");
/// assert_eq!(normalize_header_value(" \t "), "");
/// ```
#[must_use]
pub fn normalize_header_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut pending_space = false;
    for ch in value.trim_start_matches(|c: char| c.is_ascii_whitespace()).chars() {
        if ch.is_ascii_whitespace() {
            pending_space = true;
        } else {
            if pending_space {
                result.push(' ');
                pending_space = false;
            }
            result.push(ch);
        }
    }
    result
}

/// Percent-encode a query component.
fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}
