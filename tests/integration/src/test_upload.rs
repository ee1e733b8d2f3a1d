//! Multipart upload integration tests.

#[cfg(test)]
mod tests {
    use std::io::Write;

    use http::Method;
    use s3push_core::{UploadError, UploadPhase, UploadState};

    use crate::{MockOptions, MockS3, PART_SIZE, SECRET_KEY, pattern};

    fn write_temp(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content).expect("write temp file");
        file.flush().expect("flush temp file");
        file
    }

    #[tokio::test]
    async fn test_should_upload_file_in_two_parts() {
        let s3 = MockS3::start().await.expect("start mock");
        let uploader = s3.uploader(SECRET_KEY).expect("uploader");
        let content = pattern(PART_SIZE + 4321);
        let file = write_temp(&content);

        let outcome = uploader
            .upload_file("s3push-it", file.path(), Some("backups/data.bin"))
            .await
            .expect("upload");

        assert_eq!(outcome.parts, 2);
        assert_eq!(outcome.state, UploadState::Completed);
        assert_eq!(outcome.bytes, content.len() as u64);
        assert_eq!(outcome.e_tag.as_deref(), Some("\"mock-2\""));
        assert_eq!(
            s3.object("s3push-it", "backups/data.bin").as_deref(),
            Some(content.as_slice())
        );
        assert_eq!(s3.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_should_send_initiate_parts_then_complete() {
        let s3 = MockS3::start().await.expect("start mock");
        let uploader = s3.uploader(SECRET_KEY).expect("uploader");
        let file = write_temp(&pattern(PART_SIZE * 3));

        let outcome = uploader
            .upload_file("s3push-it", file.path(), Some("three.bin"))
            .await
            .expect("upload");
        assert_eq!(outcome.parts, 3);

        let requests = s3.requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[0], (Method::POST, "/s3push-it/three.bin?uploads".to_owned()));

        let mut part_paths: Vec<&str> = requests[1..4]
            .iter()
            .map(|(method, path)| {
                assert_eq!(*method, Method::PUT);
                path.as_str()
            })
            .collect();
        part_paths.sort_unstable();
        let upload_id = outcome.upload_id.expect("upload id");
        for (i, path) in part_paths.iter().enumerate() {
            assert_eq!(
                *path,
                format!("/s3push-it/three.bin?partNumber={}&uploadId={upload_id}", i + 1)
            );
        }

        assert_eq!(
            requests[4],
            (Method::POST, format!("/s3push-it/three.bin?uploadId={upload_id}"))
        );
        assert_eq!(
            s3.object("s3push-it", "three.bin").map(|b| b.len()),
            Some(PART_SIZE * 3)
        );
    }

    #[tokio::test]
    async fn test_should_default_key_to_file_name() {
        let s3 = MockS3::start().await.expect("start mock");
        let uploader = s3.uploader(SECRET_KEY).expect("uploader");
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("earth.jpg");
        std::fs::write(&path, pattern(1024)).expect("write");

        let outcome = uploader
            .upload_file("s3push-it", &path, None)
            .await
            .expect("upload");

        assert_eq!(outcome.key, "earth.jpg");
        assert_eq!(outcome.parts, 1);
        assert_eq!(s3.object("s3push-it", "earth.jpg").map(|b| b.len()), Some(1024));
    }

    #[tokio::test]
    async fn test_should_abort_when_a_part_fails() {
        let s3 = MockS3::start_with(MockOptions {
            fail_part: Some(2),
        })
        .await
        .expect("start mock");
        let uploader = s3.uploader(SECRET_KEY).expect("uploader");
        let file = write_temp(&pattern(PART_SIZE * 2 + 10));

        let err = uploader
            .upload_file("s3push-it", file.path(), Some("broken.bin"))
            .await
            .expect_err("part 2 fails");

        match err {
            UploadError::IncompleteUpload {
                expected,
                completed,
                failures,
            } => {
                assert_eq!(expected, 3);
                assert_eq!(completed, 2);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].part_number, 2);
                assert_eq!(failures[0].error.s3_error_code(), Some("InternalError"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(s3.object("s3push-it", "broken.bin").is_none());
        assert_eq!(s3.aborted().len(), 1);
        assert_eq!(s3.pending_uploads(), 0);
        assert!(
            !s3.requests()
                .iter()
                .any(|(method, path)| *method == Method::POST && !path.ends_with("?uploads")),
            "complete must not be sent"
        );
    }

    #[tokio::test]
    async fn test_should_reject_wrong_secret_at_initiate() {
        let s3 = MockS3::start().await.expect("start mock");
        let uploader = s3.uploader("not-the-secret").expect("uploader");
        let file = write_temp(&pattern(64));

        let err = uploader
            .upload_file("s3push-it", file.path(), Some("denied.bin"))
            .await
            .expect_err("signature rejected");

        match &err {
            UploadError::Protocol { phase, status, .. } => {
                assert_eq!(*phase, UploadPhase::Initiate);
                assert_eq!(*status, 403);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.s3_error_code(), Some("SignatureDoesNotMatch"));
        assert_eq!(s3.requests().len(), 1);
        assert!(s3.aborted().is_empty());
    }

    #[tokio::test]
    async fn test_should_skip_network_for_empty_file() {
        let s3 = MockS3::start().await.expect("start mock");
        let uploader = s3.uploader(SECRET_KEY).expect("uploader");
        let file = write_temp(b"");

        let outcome = uploader
            .upload_file("s3push-it", file.path(), Some("empty.bin"))
            .await
            .expect("empty upload");

        assert_eq!(outcome.parts, 0);
        assert!(outcome.upload_id.is_none());
        assert_eq!(outcome.state, UploadState::Idle);
        assert!(s3.requests().is_empty());
    }

    #[tokio::test]
    async fn test_should_fail_missing_file_without_requests() {
        let s3 = MockS3::start().await.expect("start mock");
        let uploader = s3.uploader(SECRET_KEY).expect("uploader");
        let dir = tempfile::tempdir().expect("temp dir");

        let err = uploader
            .upload_file("s3push-it", &dir.path().join("missing.bin"), None)
            .await
            .expect_err("missing file");

        assert!(matches!(err, UploadError::Input { .. }));
        assert!(s3.requests().is_empty());
    }
}
