//! Upload session state.
//!
//! A session moves forward one phase at a time:
//!
//! ```text
//! Idle -> Initiated -> Uploading -> Completed
//!   \________\____________\--------> Failed
//! ```
//!
//! The coordinator takes the upload id from the session at each phase, so a
//! phase that was skipped or repeated surfaces as
//! [`UploadError::InvalidTransition`] instead of a request with a stale id.

use std::fmt;

use tracing::trace;

use crate::error::UploadError;

/// Where an upload session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadState {
    /// Nothing sent yet.
    Idle,
    /// The service assigned an upload id.
    Initiated,
    /// Parts are being uploaded.
    Uploading,
    /// The object was assembled.
    Completed,
    /// A phase failed; the session is finished.
    Failed,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Initiated => "initiated",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One multipart upload, from initiate to completion or failure.
#[derive(Debug)]
pub struct UploadSession {
    upload_id: Option<String>,
    part_count: usize,
    state: UploadState,
}

impl UploadSession {
    /// A new idle session for `part_count` parts.
    #[must_use]
    pub fn new(part_count: usize) -> Self {
        Self {
            upload_id: None,
            part_count,
            state: UploadState::Idle,
        }
    }

    /// Record the id assigned by initiate and move to [`UploadState::Initiated`].
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidTransition`] unless the session is idle.
    pub fn initiated(&mut self, upload_id: String) -> Result<(), UploadError> {
        self.transition(UploadState::Idle, UploadState::Initiated)?;
        self.upload_id = Some(upload_id);
        Ok(())
    }

    /// Move to [`UploadState::Uploading`] and return the id parts are sent to.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidTransition`] unless the session is initiated.
    pub fn begin_upload(&mut self) -> Result<&str, UploadError> {
        self.transition(UploadState::Initiated, UploadState::Uploading)?;
        self.require_upload_id()
    }

    /// The id to complete, available only while parts are uploading.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidTransition`] unless the session is uploading.
    pub fn completion_upload_id(&self) -> Result<&str, UploadError> {
        if self.state != UploadState::Uploading {
            return Err(UploadError::InvalidTransition {
                from: self.state,
                to: UploadState::Completed,
            });
        }
        self.require_upload_id()
    }

    /// Move to [`UploadState::Completed`].
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidTransition`] unless the session is uploading.
    pub fn completed(&mut self) -> Result<(), UploadError> {
        self.transition(UploadState::Uploading, UploadState::Completed)
    }

    /// Mark the session failed and return the state it had reached.
    ///
    /// A completed session stays completed.
    pub fn fail(&mut self) -> UploadState {
        let reached = self.state;
        if reached != UploadState::Completed {
            trace!(from = %reached, "upload session failed");
            self.state = UploadState::Failed;
        }
        reached
    }

    /// The upload id, once initiated.
    #[must_use]
    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    /// Number of parts in this upload.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.part_count
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> UploadState {
        self.state
    }

    fn transition(&mut self, from: UploadState, to: UploadState) -> Result<(), UploadError> {
        if self.state != from {
            return Err(UploadError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        trace!(from = %from, to = %to, "upload state change");
        self.state = to;
        Ok(())
    }

    fn require_upload_id(&self) -> Result<&str, UploadError> {
        self.upload_id.as_deref().ok_or(UploadError::MissingUploadId)
    }
}
