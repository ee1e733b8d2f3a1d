//! Splitting input into fixed-size parts.

use std::io;
use std::path::Path;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::UploadError;

/// Splits a byte stream into parts of a fixed size.
///
/// Every part is exactly `chunk_size` bytes except the last, which holds the
/// remaining 1 to `chunk_size` bytes. An empty stream yields no parts.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPlanner {
    chunk_size: usize,
}

impl ChunkPlanner {
    /// Create a planner.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidConfig`] if `chunk_size` is zero.
    pub fn new(chunk_size: usize) -> Result<Self, UploadError> {
        if chunk_size == 0 {
            return Err(UploadError::InvalidConfig(
                "chunk size must be greater than zero".to_owned(),
            ));
        }
        Ok(Self { chunk_size })
    }

    /// The configured chunk size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Read `reader` to exhaustion and return its parts in order.
    ///
    /// # Errors
    ///
    /// Returns any read error other than end of stream.
    pub async fn split<R>(&self, mut reader: R) -> io::Result<Vec<Bytes>>
    where
        R: AsyncRead + Unpin,
    {
        let limit = u64::try_from(self.chunk_size).unwrap_or(u64::MAX);
        let mut chunks = Vec::new();

        loop {
            let mut chunk = Vec::with_capacity(self.chunk_size);
            let read = (&mut reader).take(limit).read_to_end(&mut chunk).await?;
            if read == 0 {
                break;
            }
            chunks.push(Bytes::from(chunk));
            if read < self.chunk_size {
                break;
            }
        }

        Ok(chunks)
    }

    /// Open `path` and split its contents.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Input`] if the file cannot be opened or read.
    pub async fn split_file(&self, path: &Path) -> Result<Vec<Bytes>, UploadError> {
        let input_error = |source| UploadError::Input {
            path: path.to_path_buf(),
            source,
        };

        let file = tokio::fs::File::open(path).await.map_err(input_error)?;
        let chunks = self.split(file).await.map_err(input_error)?;
        debug!(
            path = %path.display(),
            parts = chunks.len(),
            chunk_size = self.chunk_size,
            "split file"
        );
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    const MIB: usize = 1024 * 1024;

    /// Yields some bytes, then fails.
    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                Poll::Ready(Err(io::Error::other("disk on fire")))
            } else {
                self.sent = true;
                buf.put_slice(b"abc");
                Poll::Ready(Ok(()))
            }
        }
    }

    #[tokio::test]
    async fn test_should_split_five_mib_plus_one() {
        let data = vec![7u8; 5 * MIB + 1];
        let planner = ChunkPlanner::new(5 * MIB).unwrap();

        let chunks = planner.split(data.as_slice()).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 5 * MIB);
        assert_eq!(chunks[1].len(), 1);
    }

    #[tokio::test]
    async fn test_should_yield_no_chunks_for_empty_input() {
        let planner = ChunkPlanner::new(5 * MIB).unwrap();
        let chunks = planner.split(&b""[..]).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_should_not_emit_trailing_empty_chunk() {
        let planner = ChunkPlanner::new(4).unwrap();
        let chunks = planner.split(&b"abcdefgh"[..]).await.unwrap();
        assert_eq!(chunks, vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh")]);
    }

    #[tokio::test]
    async fn test_should_preserve_content_and_order() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let planner = ChunkPlanner::new(300).unwrap();

        let chunks = planner.split(data.as_slice()).await.unwrap();

        assert_eq!(chunks.iter().map(Bytes::len).collect::<Vec<_>>(), vec![300, 300, 300, 100]);
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn test_should_propagate_read_errors() {
        let planner = ChunkPlanner::new(16).unwrap();
        let result = planner.split(FailingReader { sent: false }).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_should_reject_zero_chunk_size() {
        assert!(matches!(ChunkPlanner::new(0), Err(UploadError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_should_split_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1u8; 10]).unwrap();
        file.flush().unwrap();

        let planner = ChunkPlanner::new(4).unwrap();
        let chunks = planner.split_file(file.path()).await.unwrap();

        assert_eq!(chunks.iter().map(Bytes::len).collect::<Vec<_>>(), vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn test_should_report_missing_file_as_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.bin");

        let planner = ChunkPlanner::new(4).unwrap();
        let result = planner.split_file(&path).await;

        match result {
            Err(UploadError::Input { path: reported, source }) => {
                assert_eq!(reported, path);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected Input error, got {other:?}"),
        }
    }
}
