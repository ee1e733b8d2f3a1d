//! End-to-end tests for s3push.
//!
//! Each test starts a [`MockS3`] endpoint on `127.0.0.1` that speaks the
//! path-style multipart subset of the S3 API and re-verifies every SigV4
//! signature it receives. The uploader talks to it over real HTTP through
//! [`ReqwestTransport`].
//!
//! ```text
//! cargo test -p s3push-integration
//! ```

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use parking_lot::Mutex;
use s3push_auth::{ClockReading, Credential, RequestSigner, SystemClock, hash_payload};
use s3push_core::{MultipartUploader, ReqwestTransport, UploadConfig};
use s3push_model::types::CompleteMultipartUpload;
use s3push_xml::from_xml;
use tokio::net::TcpListener;
use tracing::{debug, warn};

/// Access key accepted by the mock endpoint.
pub const ACCESS_KEY: &str = "test";
/// Secret key accepted by the mock endpoint.
pub const SECRET_KEY: &str = "test";
/// Region used on both sides.
pub const REGION: &str = "us-east-1";
/// Smallest part size S3 accepts.
pub const PART_SIZE: usize = 5 * 1024 * 1024;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Behavior switches for a [`MockS3`] endpoint.
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Answer `500 InternalError` for this part number.
    pub fail_part: Option<u32>,
}

#[derive(Debug, Default)]
struct PendingUpload {
    bucket: String,
    key: String,
    parts: BTreeMap<u32, (String, Bytes)>,
}

#[derive(Debug)]
struct MockState {
    verifier: RequestSigner,
    options: MockOptions,
    next_id: AtomicU64,
    requests: Mutex<Vec<(Method, String)>>,
    uploads: Mutex<HashMap<String, PendingUpload>>,
    objects: Mutex<HashMap<(String, String), Bytes>>,
    aborted: Mutex<Vec<String>>,
}

/// In-process S3 endpoint for multipart uploads.
#[derive(Debug)]
pub struct MockS3 {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockS3 {
    /// Start an endpoint with default behavior.
    pub async fn start() -> Result<Self> {
        Self::start_with(MockOptions::default()).await
    }

    /// Start an endpoint on an ephemeral port.
    pub async fn start_with(options: MockOptions) -> Result<Self> {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock endpoint")?;
        let addr = listener.local_addr()?;

        let state = Arc::new(MockState {
            verifier: RequestSigner::new(
                Credential::new(ACCESS_KEY, SECRET_KEY, REGION),
                Arc::new(SystemClock),
            ),
            options,
            next_id: AtomicU64::new(1),
            requests: Mutex::new(Vec::new()),
            uploads: Mutex::new(HashMap::new()),
            objects: Mutex::new(HashMap::new()),
            aborted: Mutex::new(Vec::new()),
        });

        tokio::spawn(serve(listener, Arc::clone(&state)));
        Ok(Self { addr, state })
    }

    /// Base URL of the endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The assembled object, if an upload for it completed.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state
            .objects
            .lock()
            .get(&(bucket.to_owned(), key.to_owned()))
            .cloned()
    }

    /// Upload ids that were aborted.
    #[must_use]
    pub fn aborted(&self) -> Vec<String> {
        self.state.aborted.lock().clone()
    }

    /// Number of uploads that are neither completed nor aborted.
    #[must_use]
    pub fn pending_uploads(&self) -> usize {
        self.state.uploads.lock().len()
    }

    /// Method and path-and-query of every request received.
    #[must_use]
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state.requests.lock().clone()
    }

    /// Build an uploader pointed at this endpoint with path-style addressing.
    pub fn uploader(&self, secret_key: &str) -> Result<MultipartUploader> {
        let config = UploadConfig::builder()
            .endpoint_url(self.endpoint())
            .force_path_style(true)
            .part_size(PART_SIZE)
            .request_timeout_secs(30)
            .build();
        let signer = RequestSigner::new(
            Credential::new(ACCESS_KEY, secret_key, REGION),
            Arc::new(SystemClock),
        );
        let transport = ReqwestTransport::new(Duration::from_secs(30))?;
        Ok(MultipartUploader::new(signer, Arc::new(transport), config)?)
    }
}

async fn serve(listener: TcpListener, state: Arc<MockState>) {
    let http = HttpConnBuilder::new(TokioExecutor::new());

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };

        let state = Arc::clone(&state);
        let svc = service_fn(move |req| {
            let state = Arc::clone(&state);
            async move { Ok::<_, Infallible>(handle(&state, req).await) }
        });
        let conn = http.serve_connection(TokioIo::new(stream), svc).into_owned();

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(peer_addr = %peer_addr, error = %e, "connection error");
            }
        });
    }
}

fn xml_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response<Full<Bytes>> {
    xml_response(
        status,
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{code}</Code><Message>{message}</Message></Error>"
        ),
    )
}

async fn handle(state: &MockState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "IncompleteBody", &e.to_string()),
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or_else(|| "/".to_owned(), ToString::to_string);
    state
        .requests
        .lock()
        .push((parts.method.clone(), path_and_query.clone()));

    if let Err(message) = verify_signature(state, &parts, &path_and_query, &body) {
        return error_response(StatusCode::FORBIDDEN, "SignatureDoesNotMatch", &message);
    }

    let Some((bucket, key)) = parts
        .uri
        .path()
        .trim_start_matches('/')
        .split_once('/')
        .map(|(b, k)| (b.to_owned(), k.to_owned()))
    else {
        return error_response(StatusCode::BAD_REQUEST, "InvalidRequest", "missing key");
    };

    let query: HashMap<String, String> = parts
        .uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let upload_id = query.get("uploadId").cloned();

    match (parts.method.as_str(), upload_id) {
        ("POST", None) if query.contains_key("uploads") => initiate(state, bucket, key),
        ("PUT", Some(upload_id)) => {
            let part_number = query.get("partNumber").and_then(|n| n.parse::<u32>().ok());
            match part_number {
                Some(n) => upload_part(state, &upload_id, n, body),
                None => {
                    error_response(StatusCode::BAD_REQUEST, "InvalidArgument", "bad partNumber")
                }
            }
        }
        ("POST", Some(upload_id)) => complete(state, &upload_id, &body),
        ("DELETE", Some(upload_id)) => abort(state, &upload_id),
        _ => error_response(StatusCode::NOT_IMPLEMENTED, "NotImplemented", "unsupported request"),
    }
}

fn verify_signature(
    state: &MockState,
    parts: &http::request::Parts,
    path_and_query: &str,
    body: &[u8],
) -> Result<(), String> {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| format!("missing {name} header"))
    };
    let host = header("host")?;
    let date = header("x-amz-date")?;
    let content_sha = header("x-amz-content-sha256")?;
    let authorization = header("authorization")?;

    if content_sha != hash_payload(body) {
        return Err("payload hash mismatch".to_owned());
    }

    let reading = ClockReading::parse(date).map_err(|e| e.to_string())?;
    let url = format!("http://{host}{path_and_query}");
    let expected = state
        .verifier
        .authorize_at(
            &reading,
            parts.method.as_str(),
            &url,
            body,
            &[
                ("host", host),
                ("x-amz-content-sha256", content_sha),
                ("x-amz-date", date),
            ],
        )
        .map_err(|e| e.to_string())?;

    if expected == authorization {
        Ok(())
    } else {
        Err("The request signature we calculated does not match the signature you provided."
            .to_owned())
    }
}

fn initiate(state: &MockState, bucket: String, key: String) -> Response<Full<Bytes>> {
    let upload_id = format!(
        "mock-upload-{}",
        state.next_id.fetch_add(1, Ordering::Relaxed)
    );
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<InitiateMultipartUploadResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><Bucket>{bucket}</Bucket><Key>{key}</Key><UploadId>{upload_id}</UploadId></InitiateMultipartUploadResult>"
    );
    state.uploads.lock().insert(
        upload_id,
        PendingUpload {
            bucket,
            key,
            parts: BTreeMap::new(),
        },
    );
    xml_response(StatusCode::OK, body)
}

fn upload_part(
    state: &MockState,
    upload_id: &str,
    part_number: u32,
    body: Bytes,
) -> Response<Full<Bytes>> {
    if state.options.fail_part == Some(part_number) {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalError",
            "We encountered an internal error. Please try again.",
        );
    }

    let mut uploads = state.uploads.lock();
    let Some(upload) = uploads.get_mut(upload_id) else {
        return error_response(StatusCode::NOT_FOUND, "NoSuchUpload", "unknown upload id");
    };

    let e_tag = format!("\"{}\"", &hash_payload(&body)[..32]);
    upload.parts.insert(part_number, (e_tag.clone(), body));

    let mut response = xml_response(StatusCode::OK, String::new());
    if let Ok(value) = e_tag.parse() {
        response.headers_mut().insert(http::header::ETAG, value);
    }
    response
}

fn complete(state: &MockState, upload_id: &str, body: &[u8]) -> Response<Full<Bytes>> {
    let document: CompleteMultipartUpload = match from_xml(body) {
        Ok(document) => document,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "MalformedXML", &e.to_string()),
    };

    let mut uploads = state.uploads.lock();
    let Some(upload) = uploads.get(upload_id) else {
        return error_response(StatusCode::NOT_FOUND, "NoSuchUpload", "unknown upload id");
    };

    let numbers: Vec<u32> = document.parts.iter().map(|p| p.part_number).collect();
    if numbers.is_empty() || numbers.windows(2).any(|w| w[0] >= w[1]) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "InvalidPartOrder",
            "The list of parts was not in ascending order.",
        );
    }

    let mut assembled = Vec::new();
    for part in &document.parts {
        match upload.parts.get(&part.part_number) {
            Some((e_tag, data)) if *e_tag == part.e_tag => assembled.extend_from_slice(data),
            _ => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "InvalidPart",
                    "One or more of the specified parts could not be found.",
                );
            }
        }
    }

    let Some(upload) = uploads.remove(upload_id) else {
        return error_response(StatusCode::NOT_FOUND, "NoSuchUpload", "unknown upload id");
    };
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CompleteMultipartUploadResult><Location>http://mock/{bucket}/{key}</Location><Bucket>{bucket}</Bucket><Key>{key}</Key><ETag>&quot;mock-{count}&quot;</ETag></CompleteMultipartUploadResult>",
        bucket = upload.bucket,
        key = upload.key,
        count = document.parts.len(),
    );
    state
        .objects
        .lock()
        .insert((upload.bucket, upload.key), Bytes::from(assembled));
    xml_response(StatusCode::OK, body)
}

fn abort(state: &MockState, upload_id: &str) -> Response<Full<Bytes>> {
    if state.uploads.lock().remove(upload_id).is_none() {
        return error_response(StatusCode::NOT_FOUND, "NoSuchUpload", "unknown upload id");
    }
    state.aborted.lock().push(upload_id.to_owned());
    xml_response(StatusCode::NO_CONTENT, String::new())
}

/// Deterministic test content of `len` bytes.
#[must_use]
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| u8::try_from(i % 251).unwrap_or_default())
        .collect()
}

mod test_upload;
