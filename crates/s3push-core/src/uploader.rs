//! The multipart upload coordinator.
//!
//! [`MultipartUploader`] drives one upload through its phases:
//!
//! 1. Split the file (before any network call, so unreadable input never
//!    reaches the service). Zero parts ends the run as a no-op.
//! 2. Initiate and obtain a non-empty upload id.
//! 3. Upload every part concurrently, one task per part. A failed part does
//!    not cancel its siblings; all tasks run to the barrier.
//! 4. Complete with the tokens in ascending part order, but only if every part
//!    succeeded.
//!
//! If anything after initiate fails, the upload is aborted (best effort)
//! unless disabled in [`UploadConfig`].

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Response, StatusCode};
use s3push_auth::RequestSigner;
use s3push_model::S3ErrorCode;
use s3push_model::types::{
    CompleteMultipartUpload, CompleteMultipartUploadResult, InitiateMultipartUploadResult,
    S3ErrorResponse,
};
use s3push_xml::{S3Deserialize, from_xml, root_element, to_xml};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::chunk::ChunkPlanner;
use crate::config::UploadConfig;
use crate::error::{PartFailure, UploadError, UploadPhase};
use crate::parts::PartsReport;
use crate::session::{UploadSession, UploadState};
use crate::target::UploadTarget;
use crate::transport::Transport;
use crate::validation::{validate_bucket_name, validate_object_key, validate_part_count};

/// Result of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Destination bucket.
    pub bucket: String,
    /// Destination key.
    pub key: String,
    /// Upload id; `None` when the input was empty and nothing was sent.
    pub upload_id: Option<String>,
    /// Number of parts uploaded.
    pub parts: usize,
    /// Total bytes uploaded.
    pub bytes: u64,
    /// `Location` from the completion result.
    pub location: Option<String>,
    /// `ETag` of the assembled object.
    pub e_tag: Option<String>,
    /// Final session state: `Completed`, or `Idle` when nothing was sent.
    pub state: UploadState,
}

/// Uploads files with the S3 multipart protocol.
#[derive(Debug, Clone)]
pub struct MultipartUploader {
    signer: RequestSigner,
    transport: Arc<dyn Transport>,
    config: UploadConfig,
    planner: ChunkPlanner,
}

impl MultipartUploader {
    /// Create an uploader.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        signer: RequestSigner,
        transport: Arc<dyn Transport>,
        config: UploadConfig,
    ) -> Result<Self, UploadError> {
        config.validate()?;
        let planner = ChunkPlanner::new(config.part_size)?;
        Ok(Self {
            signer,
            transport,
            config,
            planner,
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Validate `bucket` and `key` and resolve their URLs.
    ///
    /// # Errors
    ///
    /// Returns an input error if either name is invalid, or
    /// [`UploadError::InvalidConfig`] for a bad endpoint.
    pub fn target(&self, bucket: &str, key: &str) -> Result<UploadTarget, UploadError> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;
        UploadTarget::new(
            bucket,
            key,
            self.signer.credential().region(),
            self.config.endpoint_url.as_deref(),
            self.config.force_path_style,
        )
    }

    /// Upload the file at `path` to `bucket`.
    ///
    /// The key defaults to the file name.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`UploadError`] of the run.
    pub async fn upload_file(
        &self,
        bucket: &str,
        path: &Path,
        key: Option<&str>,
    ) -> Result<UploadOutcome, UploadError> {
        let key = match key {
            Some(key) => key.to_owned(),
            None => default_key(path)?,
        };
        let target = self.target(bucket, &key)?;
        let chunks = self.planner.split_file(path).await?;
        self.upload_chunks(&target, chunks).await
    }

    /// Upload pre-split `chunks` to `target`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`UploadError`] of the run.
    pub async fn upload_chunks(
        &self,
        target: &UploadTarget,
        chunks: Vec<Bytes>,
    ) -> Result<UploadOutcome, UploadError> {
        validate_part_count(chunks.len())?;

        let mut outcome = UploadOutcome {
            bucket: target.bucket().to_owned(),
            key: target.key().to_owned(),
            upload_id: None,
            parts: chunks.len(),
            bytes: chunks.iter().map(|c| c.len() as u64).sum(),
            location: None,
            e_tag: None,
            state: UploadState::Idle,
        };
        if chunks.is_empty() {
            info!(
                bucket = %outcome.bucket,
                key = %outcome.key,
                "input is empty, nothing to upload"
            );
            return Ok(outcome);
        }

        let mut session = UploadSession::new(chunks.len());
        match self.run(target, chunks, &mut session).await {
            Ok(result) => {
                outcome.upload_id = session.upload_id().map(str::to_owned);
                outcome.state = session.state();
                outcome.location = result.location;
                outcome.e_tag = result.e_tag;
                info!(
                    bucket = %outcome.bucket,
                    key = %outcome.key,
                    upload_id = outcome.upload_id.as_deref().unwrap_or_default(),
                    parts = session.part_count(),
                    bytes = outcome.bytes,
                    "multipart upload completed"
                );
                Ok(outcome)
            }
            Err(err) => {
                let reached = session.fail();
                warn!(
                    bucket = %outcome.bucket,
                    key = %outcome.key,
                    state = %reached,
                    error = %err,
                    "multipart upload failed"
                );
                if let Some(upload_id) = session.upload_id() {
                    if self.should_abort(&err) {
                        if let Err(abort_err) = self.abort(target, upload_id).await {
                            warn!(
                                upload_id = %upload_id,
                                error = %abort_err,
                                "failed to abort multipart upload"
                            );
                        }
                    }
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        target: &UploadTarget,
        chunks: Vec<Bytes>,
        session: &mut UploadSession,
    ) -> Result<CompleteMultipartUploadResult, UploadError> {
        let expected = session.part_count();
        let upload_id = self.initiate(target).await?;
        session.initiated(upload_id)?;

        let upload_id = session.begin_upload()?.to_owned();
        let report = self.upload_parts(target, &upload_id, chunks).await;
        let tokens = report.into_tokens(expected)?;
        let part_count = u32::try_from(expected).map_err(|_| UploadError::TooManyParts {
            parts: expected,
            max: crate::validation::MAX_PARTS,
        })?;
        let document = tokens.into_document(part_count)?;

        let result = self
            .complete(target, session.completion_upload_id()?, &document)
            .await?;
        session.completed()?;
        Ok(result)
    }

    /// Start a multipart upload and return its id.
    ///
    /// # Errors
    ///
    /// Returns a transport or protocol error, or [`UploadError::MissingUploadId`]
    /// if the response carries no usable id.
    pub async fn initiate(&self, target: &UploadTarget) -> Result<String, UploadError> {
        let phase = UploadPhase::Initiate;
        let response = send_signed(
            &self.signer,
            self.transport.as_ref(),
            phase,
            Method::POST,
            &target.initiate_url(),
            Bytes::new(),
        )
        .await?;

        let result: InitiateMultipartUploadResult =
            parse_result(phase, response.status(), response.body())?;
        let upload_id = result
            .upload_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(UploadError::MissingUploadId)?;

        info!(
            bucket = %target.bucket(),
            key = %target.key(),
            upload_id = %upload_id,
            "initiated multipart upload"
        );
        Ok(upload_id)
    }

    /// Upload every chunk as a part, all concurrently.
    ///
    /// Chunk `i` (0-based) becomes part `i + 1`. Every task runs to completion;
    /// failures are collected, not propagated.
    pub async fn upload_parts(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        chunks: Vec<Bytes>,
    ) -> PartsReport {
        let mut set = JoinSet::new();
        let mut part_of_task = HashMap::with_capacity(chunks.len());

        for (part_number, body) in (1u32..).zip(chunks) {
            let signer = self.signer.clone();
            let transport = Arc::clone(&self.transport);
            let url = target.part_url(part_number, upload_id);
            let handle = set.spawn(async move {
                let result =
                    upload_part(&signer, transport.as_ref(), part_number, &url, body).await;
                (part_number, result)
            });
            part_of_task.insert(handle.id(), part_number);
        }

        let mut report = PartsReport::default();
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, (part_number, Ok(e_tag)))) => {
                    report.tokens.insert(part_number, e_tag);
                }
                Ok((_, (part_number, Err(error)))) => {
                    warn!(part_number, error = %error, "part upload failed");
                    report.failures.push(PartFailure { part_number, error });
                }
                Err(join_error) => {
                    let part_number = part_of_task.get(&join_error.id()).copied().unwrap_or(0);
                    warn!(part_number, error = %join_error, "part upload task failed");
                    report.failures.push(PartFailure {
                        part_number,
                        error: UploadError::PartTaskFailed {
                            part_number,
                            reason: join_error.to_string(),
                        },
                    });
                }
            }
        }

        report.failures.sort_by_key(|failure| failure.part_number);
        report
    }

    /// Submit the completion document.
    ///
    /// # Errors
    ///
    /// Returns a transport or protocol error. An `<Error>` body is a protocol
    /// error even with status 200.
    pub async fn complete(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        document: &CompleteMultipartUpload,
    ) -> Result<CompleteMultipartUploadResult, UploadError> {
        let phase = UploadPhase::Complete;
        let body = to_xml("CompleteMultipartUpload", document).map_err(UploadError::Encode)?;

        let response = send_signed(
            &self.signer,
            self.transport.as_ref(),
            phase,
            Method::POST,
            &target.complete_url(upload_id),
            Bytes::from(body),
        )
        .await?;

        parse_result(phase, response.status(), response.body())
    }

    /// Abort the upload, discarding uploaded parts.
    ///
    /// # Errors
    ///
    /// Returns a transport or protocol error.
    pub async fn abort(&self, target: &UploadTarget, upload_id: &str) -> Result<(), UploadError> {
        send_signed(
            &self.signer,
            self.transport.as_ref(),
            UploadPhase::Abort,
            Method::DELETE,
            &target.abort_url(upload_id),
            Bytes::new(),
        )
        .await?;
        warn!(
            bucket = %target.bucket(),
            key = %target.key(),
            upload_id = %upload_id,
            "aborted multipart upload"
        );
        Ok(())
    }

    fn should_abort(&self, err: &UploadError) -> bool {
        let upload_gone = err.service_code() == Some(S3ErrorCode::NoSuchUpload);
        self.config.abort_on_failure && !upload_gone
    }
}

async fn upload_part(
    signer: &RequestSigner,
    transport: &dyn Transport,
    part_number: u32,
    url: &str,
    body: Bytes,
) -> Result<String, UploadError> {
    let size = body.len();
    let response = send_signed(
        signer,
        transport,
        UploadPhase::UploadPart(part_number),
        Method::PUT,
        url,
        body,
    )
    .await?;

    let e_tag = response
        .headers()
        .get(http::header::ETAG)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .filter(|value| !value.is_empty())
        .ok_or(UploadError::MissingETag { part_number })?;

    debug!(part_number, size, e_tag = %e_tag, "uploaded part");
    Ok(e_tag)
}

/// Sign and send a request; non-2xx responses become protocol errors.
async fn send_signed(
    signer: &RequestSigner,
    transport: &dyn Transport,
    phase: UploadPhase,
    method: Method,
    url: &str,
    body: Bytes,
) -> Result<Response<Bytes>, UploadError> {
    let request = signer.sign_request(method, url, body)?;
    debug!(%phase, method = %request.method(), url, "sending signed request");

    let response = transport
        .send(request)
        .await
        .map_err(|source| UploadError::Transport { phase, source })?;

    if !response.status().is_success() {
        return Err(protocol_error(phase, response.status(), response.body()));
    }
    Ok(response)
}

/// Parse a success body, treating an `<Error>` root as a protocol error.
fn parse_result<T: S3Deserialize>(
    phase: UploadPhase,
    status: StatusCode,
    body: &[u8],
) -> Result<T, UploadError> {
    let root =
        root_element(body).map_err(|source| UploadError::MalformedResponse { phase, source })?;
    if root == "Error" {
        return Err(protocol_error(phase, status, body));
    }
    from_xml(body).map_err(|source| UploadError::MalformedResponse { phase, source })
}

fn protocol_error(phase: UploadPhase, status: StatusCode, body: &[u8]) -> UploadError {
    let parsed = root_element(body)
        .ok()
        .filter(|root| root == "Error")
        .and_then(|_| from_xml::<S3ErrorResponse>(body).ok());

    match parsed {
        Some(error) => UploadError::Protocol {
            phase,
            status,
            code: error.code,
            message: error.message.unwrap_or_default(),
        },
        None => UploadError::Protocol {
            phase,
            status,
            code: None,
            message: String::from_utf8_lossy(body).trim().to_owned(),
        },
    }
}

fn default_key(path: &Path) -> Result<String, UploadError> {
    path.file_name()
        .and_then(OsStr::to_str)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .ok_or(UploadError::EmptyObjectKey)
}
