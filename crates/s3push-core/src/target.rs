//! Bucket/key addressing.
//!
//! [`UploadTarget`] turns a bucket, key, region, and optional custom endpoint
//! into the URLs of the multipart calls. Key segments are percent-encoded once
//! here; the signer then uses the path exactly as given.

use percent_encoding::utf8_percent_encode;
use s3push_auth::canonical::URI_ENCODE_SET;

use crate::error::UploadError;

/// Where an object is uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    bucket: String,
    key: String,
    host: String,
    /// `scheme://host[:port]` plus `/{bucket}` in path style.
    base_url: String,
    /// Percent-encoded `/{key}`.
    object_path: String,
}

impl UploadTarget {
    /// Resolve the target.
    ///
    /// Without an endpoint, objects are addressed virtual-hosted style at
    /// `https://{bucket}.s3.{region}.amazonaws.com`, or path style at
    /// `https://s3.{region}.amazonaws.com/{bucket}`. With an endpoint, the
    /// bucket is prepended to its host or, in path style, to the path.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidConfig`] if `endpoint` is not an absolute
    /// `http` or `https` URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3push_core::target::UploadTarget;
    ///
    /// let target = UploadTarget::new("photos", "2024/my cat.jpg", "eu-west-1", None, false).unwrap();
    /// assert_eq!(target.host(), "photos.s3.eu-west-1.amazonaws.com");
    /// assert_eq!(
    ///     target.initiate_url(),
    ///     "https://photos.s3.eu-west-1.amazonaws.com/2024/my%20cat.jpg?uploads"
    /// );
    /// ```
    pub fn new(
        bucket: &str,
        key: &str,
        region: &str,
        endpoint: Option<&str>,
        path_style: bool,
    ) -> Result<Self, UploadError> {
        let (scheme, authority) = match endpoint {
            Some(endpoint) => parse_endpoint(endpoint)?,
            None => ("https".to_owned(), format!("s3.{region}.amazonaws.com")),
        };

        let (host, base_url) = if path_style {
            (authority.clone(), format!("{scheme}://{authority}/{bucket}"))
        } else {
            let host = format!("{bucket}.{authority}");
            let base_url = format!("{scheme}://{host}");
            (host, base_url)
        };

        Ok(Self {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            host,
            base_url,
            object_path: encode_key(key),
        })
    }

    /// The bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The object key, unencoded.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value of the `host` header.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The object URL without a query.
    #[must_use]
    pub fn object_url(&self) -> String {
        format!("{}{}", self.base_url, self.object_path)
    }

    /// `POST` target that starts an upload.
    #[must_use]
    pub fn initiate_url(&self) -> String {
        format!("{}?uploads", self.object_url())
    }

    /// `PUT` target for one part.
    #[must_use]
    pub fn part_url(&self, part_number: u32, upload_id: &str) -> String {
        format!(
            "{}?partNumber={part_number}&uploadId={}",
            self.object_url(),
            encode_query_value(upload_id)
        )
    }

    /// `POST` target that completes an upload.
    #[must_use]
    pub fn complete_url(&self, upload_id: &str) -> String {
        format!("{}?uploadId={}", self.object_url(), encode_query_value(upload_id))
    }

    /// `DELETE` target that aborts an upload.
    #[must_use]
    pub fn abort_url(&self, upload_id: &str) -> String {
        self.complete_url(upload_id)
    }
}

fn parse_endpoint(endpoint: &str) -> Result<(String, String), UploadError> {
    let invalid =
        |reason: &str| UploadError::InvalidConfig(format!("endpoint '{endpoint}' {reason}"));

    let uri: http::Uri = endpoint
        .parse()
        .map_err(|e: http::uri::InvalidUri| invalid(&format!("is not a valid URL: {e}")))?;
    let scheme = match uri.scheme_str() {
        Some(scheme @ ("http" | "https")) => scheme.to_owned(),
        Some(other) => return Err(invalid(&format!("has unsupported scheme '{other}'"))),
        None => return Err(invalid("must include a scheme")),
    };
    let authority = uri
        .authority()
        .map(|a| a.as_str().to_owned())
        .ok_or_else(|| invalid("must include a host"))?;
    if !uri.path().trim_matches('/').is_empty() || uri.query().is_some() {
        return Err(invalid("must not include a path or query"));
    }

    Ok((scheme, authority))
}

/// Percent-encode each `/`-separated key segment.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| format!("/{}", utf8_percent_encode(segment, URI_ENCODE_SET)))
        .collect()
}

fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, URI_ENCODE_SET).to_string()
}
