use std::path::PathBuf;

use clap::Parser;
use s3push_core::UploadConfig;

#[derive(Debug, Parser)]
#[command(name = "s3push")]
#[command(bin_name = "s3push")]
#[command(
    version,
    about = "Upload a local file to S3 using concurrent multipart uploads",
    long_about = None
)]
pub struct Cli {
    /// Destination bucket.
    #[arg(short, long)]
    pub bucket: String,

    /// Local file to upload.
    #[arg(short, long)]
    pub file: PathBuf,

    /// Object key; defaults to the file name.
    #[arg(short, long)]
    pub key: Option<String>,

    /// Custom endpoint such as `http://localhost:9000`; overrides `S3_ENDPOINT_URL`.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Address the bucket in the path instead of the host name.
    #[arg(long)]
    pub path_style: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the environment configuration.
    pub fn apply_to(&self, config: &mut UploadConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint_url = Some(endpoint.clone());
        }
        if self.path_style {
            config.force_path_style = true;
        }
    }
}
