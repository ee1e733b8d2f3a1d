//! Request signer binding credentials to a clock.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{AUTHORIZATION, HOST};
use http::{HeaderName, HeaderValue, Method, Request, Uri};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{build_canonical_request, canonicalize_headers};
use crate::clock::{Clock, ClockReading};
use crate::credentials::Credential;
use crate::error::AuthError;
use crate::sigv4::{
    SERVICE, build_authorization_header, build_string_to_sign, compute_signature,
    credential_scope, derive_signing_key, hash_payload,
};

/// Header carrying the request timestamp.
pub const X_AMZ_DATE: &str = "x-amz-date";

/// Header carrying the hex SHA-256 of the payload.
pub const X_AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";

/// Produces SigV4 authorization tokens for outgoing requests.
///
/// The signer is immutable and cheap to clone; it can be shared by any number
/// of concurrent tasks.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credential: Credential,
    clock: Arc<dyn Clock>,
}

impl RequestSigner {
    /// Create a signer from a credential and a clock.
    #[must_use]
    pub fn new(credential: Credential, clock: Arc<dyn Clock>) -> Self {
        Self { credential, clock }
    }

    /// The credential used for signing.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Compute the `Authorization` value for a request, reading the clock once.
    ///
    /// The caller is responsible for sending the same timestamp in `x-amz-date`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidUrl`] if `url` cannot be parsed.
    pub fn authorize(
        &self,
        method: &str,
        url: &str,
        payload: &[u8],
        headers: &[(&str, &str)],
    ) -> Result<String, AuthError> {
        let reading = self.clock.now();
        self.authorize_at(&reading, method, url, payload, headers)
    }

    /// Compute the `Authorization` value for a request at a fixed clock reading.
    ///
    /// This is a pure function of its inputs and the credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidUrl`] if `url` cannot be parsed.
    pub fn authorize_at(
        &self,
        reading: &ClockReading,
        method: &str,
        url: &str,
        payload: &[u8],
        headers: &[(&str, &str)],
    ) -> Result<String, AuthError> {
        let canonical_headers = canonicalize_headers(headers);
        let canonical_request =
            build_canonical_request(method, url, &canonical_headers, &hash_payload(payload))?;

        let scope = credential_scope(reading.date(), self.credential.region(), SERVICE);
        let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = build_string_to_sign(reading.timestamp(), &scope, &canonical_hash);
        debug!(
            canonical_request = %canonical_request,
            string_to_sign = %string_to_sign,
            "computed signing inputs"
        );

        let signing_key = derive_signing_key(
            self.credential.secret_access_key(),
            reading.date(),
            self.credential.region(),
            SERVICE,
        );
        let signature = compute_signature(&signing_key, &string_to_sign);

        Ok(build_authorization_header(
            self.credential.access_key_id(),
            &scope,
            &canonical_headers.signed_headers,
            &signature,
        ))
    }

    /// Build a fully signed request.
    ///
    /// The clock is read once; the resulting request carries `host`,
    /// `x-amz-content-sha256`, `x-amz-date`, and `authorization`, and the
    /// signature covers the first three.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidUrl`] if `url` is not an absolute URL, or
    /// [`AuthError::InvalidHeaderValue`] if a computed header is not a valid
    /// header value.
    pub fn sign_request(
        &self,
        method: Method,
        url: &str,
        body: Bytes,
    ) -> Result<Request<Bytes>, AuthError> {
        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| AuthError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        let host = uri
            .authority()
            .map(|authority| authority.as_str().to_owned())
            .ok_or_else(|| AuthError::InvalidUrl {
                url: url.to_owned(),
                reason: "missing host".to_owned(),
            })?;

        let reading = self.clock.now();
        let payload_hash = hash_payload(&body);
        let headers = [
            ("host", host.as_str()),
            (X_AMZ_CONTENT_SHA256, payload_hash.as_str()),
            (X_AMZ_DATE, reading.timestamp()),
        ];
        let authorization = self.authorize_at(&reading, method.as_str(), url, &body, &headers)?;

        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .map_err(|e| AuthError::InvalidUrl {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;

        let request_headers = request.headers_mut();
        request_headers.insert(HOST, header_value(HOST.as_str(), &host)?);
        request_headers.insert(
            HeaderName::from_static(X_AMZ_CONTENT_SHA256),
            header_value(X_AMZ_CONTENT_SHA256, &payload_hash)?,
        );
        request_headers.insert(
            HeaderName::from_static(X_AMZ_DATE),
            header_value(X_AMZ_DATE, reading.timestamp())?,
        );
        request_headers.insert(
            AUTHORIZATION,
            header_value(AUTHORIZATION.as_str(), &authorization)?,
        );

        Ok(request)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|_| AuthError::InvalidHeaderValue(name.to_owned()))
}
