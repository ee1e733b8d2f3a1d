//! s3push - upload a local file to S3 with concurrent multipart uploads.
//!
//! # Usage
//!
//! ```text
//! s3push -b my-bucket -f ./backup.tar.gz [-k backups/backup.tar.gz]
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AWS_ACCESS_KEY_ID` | *(required)* | Access key id |
//! | `AWS_SECRET_ACCESS_KEY` | *(required)* | Secret key (`AWS_ACCESS_KEY_SECRET` also accepted) |
//! | `AWS_DEFAULT_REGION` | `us-east-1` | Region (`AWS_REGION` also accepted) |
//! | `S3_ENDPOINT_URL` | *(unset)* | Custom endpoint |
//! | `S3_FORCE_PATH_STYLE` | `false` | Path-style addressing |
//! | `S3_PART_SIZE` | `5242880` | Part size in bytes |
//! | `S3_ABORT_ON_FAILURE` | `true` | Abort the upload when it fails |
//! | `S3_REQUEST_TIMEOUT_SECS` | `60` | Per-request timeout |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use s3push_auth::{CredentialProvider, EnvCredentialProvider, RequestSigner, SystemClock};
use s3push_core::{
    MultipartUploader, ReqwestTransport, UploadConfig, UploadError, UploadOutcome, UploadState,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Initialize the tracing subscriber, writing to stderr.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    Ok(())
}

fn summary(outcome: &UploadOutcome) -> String {
    if outcome.state == UploadState::Idle {
        return format!(
            "nothing uploaded to s3://{}/{} (file is empty)",
            outcome.bucket, outcome.key
        );
    }
    format!(
        "uploaded s3://{}/{} ({} parts, {} bytes)",
        outcome.bucket, outcome.key, outcome.parts, outcome.bytes
    )
}

fn report_failure(err: &UploadError) {
    if let UploadError::IncompleteUpload { failures, .. } = err {
        for failure in failures {
            error!(
                part_number = failure.part_number,
                error = %failure.error,
                hint = failure.error.service_code().map(|code| code.hint()),
                "part failed"
            );
        }
    }
    if let Some(code) = err.service_code() {
        error!(code = %code, "{}", code.hint());
    }
}

fn build_uploader(config: UploadConfig) -> Result<MultipartUploader> {
    let credential = EnvCredentialProvider
        .credential()
        .context("failed to load AWS credentials")?;
    let signer = RequestSigner::new(credential, Arc::new(SystemClock));
    let transport = ReqwestTransport::new(config.request_timeout())
        .context("failed to build HTTP client")?;
    MultipartUploader::new(signer, Arc::new(transport), config).context("invalid configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = UploadConfig::from_env();
    cli.apply_to(&mut config);
    init_tracing(&config.log_level)?;

    info!(
        bucket = %cli.bucket,
        file = %cli.file.display(),
        endpoint = config.endpoint_url.as_deref().unwrap_or("aws"),
        part_size = config.part_size,
        "starting upload",
    );

    let uploader = build_uploader(config)?;
    let result = uploader
        .upload_file(&cli.bucket, &cli.file, cli.key.as_deref())
        .await;

    if let Err(err) = &result {
        report_failure(err);
    }

    let outcome = result.with_context(|| format!("failed to upload {}", cli.file.display()))?;
    println!("{}", summary(&outcome));
    Ok(())
}
