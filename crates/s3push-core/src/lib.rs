//! Multipart upload coordination for s3push.
//!
//! This crate splits a local file into fixed-size parts and drives the three
//! phases of an S3 multipart upload:
//!
//! 1. **Initiate** (`POST /{key}?uploads`) obtains an upload id.
//! 2. **Upload parts** (`PUT /{key}?partNumber=N&uploadId=ID`) runs one task per
//!    part, all at once, and collects each part's ETag.
//! 3. **Complete** (`POST /{key}?uploadId=ID`) submits the ETags in ascending
//!    part order.
//!
//! Every request is signed with [`s3push_auth::RequestSigner`] and sent through
//! the [`Transport`](transport::Transport) seam, so tests can substitute an
//! in-memory service.
//!
//! # Modules
//!
//! - [`chunk`] - The [`ChunkPlanner`](chunk::ChunkPlanner)
//! - [`config`] - [`UploadConfig`](config::UploadConfig) loaded from the environment
//! - [`error`] - [`UploadError`](error::UploadError) and [`UploadPhase`](error::UploadPhase)
//! - [`parts`] - Completion tokens and the per-part report
//! - [`session`] - Upload session state machine
//! - [`target`] - Bucket/key addressing and request URLs
//! - [`transport`] - The HTTP transport trait and its `reqwest` implementation
//! - [`uploader`] - The [`MultipartUploader`](uploader::MultipartUploader)
//! - [`validation`] - Bucket name, object key, and part count checks

pub mod chunk;
pub mod config;
pub mod error;
pub mod parts;
pub mod session;
pub mod target;
pub mod transport;
pub mod uploader;
pub mod validation;

pub use chunk::ChunkPlanner;
pub use config::UploadConfig;
pub use error::{PartFailure, UploadError, UploadPhase};
pub use parts::{CompletionTokens, PartsReport};
pub use session::{UploadSession, UploadState};
pub use target::UploadTarget;
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use uploader::{MultipartUploader, UploadOutcome};
