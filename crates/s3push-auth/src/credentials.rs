//! Credential type and provider implementations.
//!
//! A [`Credential`] is supplied once, when the signer is constructed, and never
//! mutated afterwards. [`CredentialProvider`] is the seam that produces it:
//! [`StaticCredentialProvider`] for tests and embedding, [`EnvCredentialProvider`]
//! for the command-line tool.

use std::fmt;

use crate::error::AuthError;

/// Region used when neither `AWS_DEFAULT_REGION` nor `AWS_REGION` is set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Static signing credentials: access key id, secret access key, and region.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_key_id: String,
    secret_access_key: String,
    region: String,
}

impl Credential {
    /// Create a credential from its three components.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// The access key id embedded in the credential scope.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret access key used to derive signing keys.
    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// The region embedded in the credential scope.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// Trait for obtaining the credential used to sign requests.
///
/// Implementations may back this with environment variables, a configuration
/// file, or any other credential store.
pub trait CredentialProvider: Send + Sync {
    /// Resolve the credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredential`] if a required component is absent.
    fn credential(&self) -> Result<Credential, AuthError>;
}

/// A provider that always returns the same credential.
///
/// # Examples
///
/// ```
/// use s3push_auth::credentials::{Credential, CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(Credential::new("AKID", "secret", "eu-west-1"));
/// let credential = provider.credential().unwrap();
/// assert_eq!(credential.region(), "eu-west-1");
/// ```
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Wrap a credential.
    #[must_use]
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn credential(&self) -> Result<Credential, AuthError> {
        Ok(self.credential.clone())
    }
}

/// A provider reading the standard AWS environment variables.
///
/// | Variable | Notes |
/// |----------|-------|
/// | `AWS_ACCESS_KEY_ID` | required |
/// | `AWS_SECRET_ACCESS_KEY` | required (`AWS_ACCESS_KEY_SECRET` accepted as a fallback) |
/// | `AWS_DEFAULT_REGION` | falls back to `AWS_REGION`, then `us-east-1` |
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialProvider;

impl CredentialProvider for EnvCredentialProvider {
    fn credential(&self) -> Result<Credential, AuthError> {
        credential_from(|name| std::env::var(name).ok())
    }
}

/// Build a credential from a variable lookup function.
fn credential_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Credential, AuthError> {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

    let access_key_id =
        non_empty("AWS_ACCESS_KEY_ID").ok_or(AuthError::MissingCredential("AWS_ACCESS_KEY_ID"))?;
    let secret_access_key = non_empty("AWS_SECRET_ACCESS_KEY")
        .or_else(|| non_empty("AWS_ACCESS_KEY_SECRET"))
        .ok_or(AuthError::MissingCredential("AWS_SECRET_ACCESS_KEY"))?;
    let region = non_empty("AWS_DEFAULT_REGION")
        .or_else(|| non_empty("AWS_REGION"))
        .unwrap_or_else(|| DEFAULT_REGION.to_owned());

    Ok(Credential::new(access_key_id, secret_access_key, region))
}
