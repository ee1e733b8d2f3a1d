//! Uploader configuration.
//!
//! Provides [`UploadConfig`]. Values are loaded from environment variables;
//! credentials are resolved separately by `s3push_auth::EnvCredentialProvider`.

use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::error::UploadError;

/// Smallest part size the service accepts for non-final parts (5 MiB).
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Part size used when none is configured.
pub const DEFAULT_PART_SIZE: usize = MIN_PART_SIZE;

/// Uploader configuration.
///
/// # Examples
///
/// ```
/// use s3push_core::config::UploadConfig;
///
/// let config = UploadConfig::default();
/// assert_eq!(config.part_size, 5 * 1024 * 1024);
/// assert!(config.endpoint_url.is_none());
/// assert!(config.abort_on_failure);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct UploadConfig {
    /// Custom endpoint (`scheme://host[:port]`). `None` addresses AWS directly.
    #[builder(default, setter(strip_option, into))]
    pub endpoint_url: Option<String>,

    /// Address objects as `/{bucket}/{key}` instead of `{bucket}.{host}/{key}`.
    #[builder(default = false)]
    pub force_path_style: bool,

    /// Size of every part except the last, in bytes.
    #[builder(default = DEFAULT_PART_SIZE)]
    pub part_size: usize,

    /// Abort the multipart upload when a phase after initiate fails.
    #[builder(default = true)]
    pub abort_on_failure: bool,

    /// Timeout of a single HTTP request, in seconds.
    #[builder(default = 60)]
    pub request_timeout_secs: u64,

    /// Log level filter string used when `RUST_LOG` is unset.
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            force_path_style: false,
            part_size: DEFAULT_PART_SIZE,
            abort_on_failure: true,
            request_timeout_secs: 60,
            log_level: String::from("info"),
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3_ENDPOINT_URL` | unset |
    /// | `S3_FORCE_PATH_STYLE` | `false` |
    /// | `S3_PART_SIZE` | `5242880` |
    /// | `S3_ABORT_ON_FAILURE` | `true` |
    /// | `S3_REQUEST_TIMEOUT_SECS` | `60` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Unparsable numbers keep their default; [`UploadConfig::validate`]
    /// catches values that parse but are out of range.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("S3_ENDPOINT_URL").filter(|v| !v.is_empty()) {
            config.endpoint_url = Some(v);
        }
        if let Some(v) = lookup("S3_FORCE_PATH_STYLE") {
            config.force_path_style = parse_bool(&v);
        }
        if let Some(v) = lookup("S3_PART_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                config.part_size = n;
            }
        }
        if let Some(v) = lookup("S3_ABORT_ON_FAILURE") {
            config.abort_on_failure = parse_bool(&v);
        }
        if let Some(v) = lookup("S3_REQUEST_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.request_timeout_secs = n;
            }
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidConfig`] if the part size is below
    /// [`MIN_PART_SIZE`] or the request timeout is zero.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.part_size < MIN_PART_SIZE {
            return Err(UploadError::InvalidConfig(format!(
                "part size {} is below the minimum of {MIN_PART_SIZE} bytes",
                self.part_size
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(UploadError::InvalidConfig(
                "request timeout must be at least one second".to_owned(),
            ));
        }
        Ok(())
    }

    /// The per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
