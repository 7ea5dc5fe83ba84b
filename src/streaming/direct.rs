//! Chunked partial-content responses from files on disk.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use cinestream_common::{Error, Result};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use std::io::{self, SeekFrom};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::ReaderStream;

use super::range::{resolve_range, ByteRange};
use crate::config::StreamingConfig;

/// Size of each read from disk while streaming a window.
pub const READ_CAPACITY: usize = 64 * 1024;

/// Content type of every `/video` response.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Size in bytes of the file at `path`.
///
/// A missing file is [`Error::NotFound`]; anything else is a storage fault.
pub async fn file_size(path: &Path) -> Result<u64> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
        Ok(_) => Err(Error::not_found("video", path.display())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(Error::not_found("video", path.display()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Stream of the bytes `[range.start, range.end]` of `path`.
///
/// Dropping the stream closes the file. A window that ends before
/// `range.len()` bytes, because the file shrank or a read failed, yields an
/// error as its last item.
pub async fn open_window(
    path: &Path,
    range: ByteRange,
    idle_timeout: Option<Duration>,
) -> Result<BoxStream<'static, io::Result<Bytes>>> {
    let mut file = File::open(path).await.map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::not_found("video", path.display())
        } else {
            e.into()
        }
    })?;
    file.seek(SeekFrom::Start(range.start)).await?;

    let shown = path.display().to_string();
    Ok(window_stream(file, range.len(), idle_timeout)
        .inspect_err(move |e| {
            tracing::warn!(path = %shown, error = %e, "Aborting video stream");
        })
        .boxed())
}

/// Chunks of the first `len` bytes of `reader`, at most [`READ_CAPACITY`]
/// each.
///
/// Without a timeout the reader is only advanced when the consumer polls.
/// With one, a reader task fills a one-slot channel; a read that stalls, or
/// a consumer that takes no chunk, for longer than `idle_timeout` ends the
/// task and drops the reader.
pub fn window_stream<R>(
    reader: R,
    len: u64,
    idle_timeout: Option<Duration>,
) -> BoxStream<'static, io::Result<Bytes>>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let chunks = ReaderStream::with_capacity(reader.take(len), READ_CAPACITY);
    let chunks = match idle_timeout {
        Some(limit) => spawn_reader(chunks, limit),
        None => chunks.boxed(),
    };
    require_len(chunks, len)
}

fn spawn_reader<S>(mut chunks: S, limit: Duration) -> BoxStream<'static, io::Result<Bytes>>
where
    S: Stream<Item = io::Result<Bytes>> + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        loop {
            let item = match tokio::time::timeout(limit, chunks.next()).await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "video read stalled")),
            };
            let failed = item.is_err();

            match tx.send_timeout(item, limit).await {
                Ok(()) if !failed => {}
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(_)) => {
                    tracing::debug!(timeout = ?limit, "Video consumer idle, closing file");
                    break;
                }
                Err(SendTimeoutError::Closed(_)) => break,
            }
        }
    });

    ReceiverStream::new(rx).boxed()
}

/// Pass `chunks` through, turning an early end into `UnexpectedEof`.
fn require_len(
    chunks: BoxStream<'static, io::Result<Bytes>>,
    len: u64,
) -> BoxStream<'static, io::Result<Bytes>> {
    futures::stream::unfold(Some((chunks, 0u64)), move |state| async move {
        let (mut chunks, sent) = state?;
        match chunks.next().await {
            Some(Ok(chunk)) => {
                let sent = sent + chunk.len() as u64;
                Some((Ok(chunk), Some((chunks, sent))))
            }
            Some(Err(e)) => Some((Err(e), None)),
            None if sent < len => Some((
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("window ended after {sent} of {len} bytes"),
                )),
                None,
            )),
            None => None,
        }
    })
    .boxed()
}

/// Serve one chunk of `path` for the given `Range` header value.
pub async fn serve_range(
    path: &Path,
    range_header: &str,
    settings: &StreamingConfig,
) -> Result<Response> {
    let total_size = file_size(path).await?;
    let range = resolve_range(
        range_header,
        total_size,
        settings.chunk_size,
        settings.range_mode,
    )?;

    tracing::debug!(
        path = %path.display(),
        start = range.start,
        end = range.end,
        total = total_size,
        "Serving video range"
    );

    let stream = open_window(
        path,
        range,
        settings.idle_timeout_secs.map(Duration::from_secs),
    )
    .await?;

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_RANGE, range.content_range())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, range.len().to_string())
        .header(header::CONTENT_TYPE, VIDEO_CONTENT_TYPE)
        .body(Body::from_stream(stream))
        .map_err(|e| Error::Internal(format!("failed to build response: {e}")))
}

/// Plain-text error response for the video endpoint.
///
/// Unsatisfiable ranges carry `Content-Range: bytes */<size>`.
pub fn plain_error_response(err: &Error) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match err {
        Error::Validation(message) => (status, message.clone()).into_response(),
        Error::NotFound { .. } => (status, "Video not found").into_response(),
        Error::RangeNotSatisfiable { size, .. } => (
            status,
            [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            "Range Not Satisfiable",
        )
            .into_response(),
        _ => {
            if status.is_server_error() {
                tracing::error!(status = %status, error = %err, "Video request failed");
            }
            (status, "Internal Server Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RangeMode;
    use http_body_util::BodyExt;
    use std::io::Write;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// In-memory reader that records when it is dropped.
    struct TrackedReader {
        inner: std::io::Cursor<Vec<u8>>,
        dropped: Arc<AtomicBool>,
    }

    impl TrackedReader {
        fn new(len: usize) -> (Self, Arc<AtomicBool>) {
            let dropped = Arc::new(AtomicBool::new(false));
            let reader = Self {
                inner: std::io::Cursor::new(vec![7u8; len]),
                dropped: dropped.clone(),
            };
            (reader, dropped)
        }
    }

    impl AsyncRead for TrackedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.inner).poll_read(cx, buf)
        }
    }

    impl Drop for TrackedReader {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    async fn wait_for(flag: &AtomicBool) -> bool {
        for _ in 0..100 {
            if flag.load(Ordering::SeqCst) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn fixture(len: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();
        file
    }

    #[tokio::test]
    async fn serves_exact_window() {
        let file = fixture(3_000);
        let settings = StreamingConfig {
            chunk_size: 1_000,
            ..Default::default()
        };

        let response = serve_range(file.path(), "bytes=1500-", &settings).await.unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 1500-2499/3000");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "1000");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let expected: Vec<u8> = (1500..2500).map(|i| (i % 251) as u8).collect();
        assert_eq!(body.as_ref(), expected.as_slice());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = serve_range(&dir.path().join("gone.mp4"), "bytes=0-", &StreamingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let response = plain_error_response(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn directory_is_not_a_video() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            file_size(dir.path()).await.unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn unsatisfiable_range_response() {
        let file = fixture(100);
        let err = serve_range(file.path(), "bytes=100-", &StreamingConfig::default())
            .await
            .unwrap_err();

        let response = plain_error_response(&err);
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */100");
    }

    #[tokio::test]
    async fn lenient_mode_serves_from_zero() {
        let file = fixture(10);
        let settings = StreamingConfig {
            range_mode: RangeMode::Lenient,
            ..Default::default()
        };

        let response = serve_range(file.path(), "bytes=abc", &settings).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-9/10");
    }

    #[tokio::test]
    async fn window_stream_with_idle_timeout_completes() {
        let file = fixture(200_000);
        let range = ByteRange {
            start: 0,
            end: 199_999,
            total_size: 200_000,
        };

        let stream = open_window(file.path(), range, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert!(chunks.iter().all(|c| c.len() <= READ_CAPACITY));
        assert_eq!(chunks.iter().map(Bytes::len).sum::<usize>(), 200_000);
    }

    #[tokio::test]
    async fn shrunk_file_ends_window_with_error() {
        let file = fixture(300_000);
        let range = ByteRange {
            start: 0,
            end: 299_999,
            total_size: 300_000,
        };

        let mut stream = open_window(file.path(), range, None).await.unwrap();
        file.as_file().set_len(100_000).unwrap();

        let mut received = 0;
        let mut failure = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => received += chunk.len(),
                Err(e) => failure = Some(e),
            }
        }
        assert_eq!(received, 100_000);
        assert_eq!(failure.unwrap().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn shrunk_file_fails_response_body() {
        let file = fixture(300_000);
        let response = serve_range(file.path(), "bytes=0-", &StreamingConfig::default())
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "300000");

        file.as_file().set_len(1_000).unwrap();
        assert!(response.into_body().collect().await.is_err());
    }

    #[tokio::test]
    async fn dropping_window_releases_reader() {
        let (reader, dropped) = TrackedReader::new(4 * READ_CAPACITY);
        let mut stream = window_stream(reader, 4 * READ_CAPACITY as u64, None);

        assert_eq!(stream.next().await.unwrap().unwrap().len(), READ_CAPACITY);
        assert!(!dropped.load(Ordering::SeqCst));

        drop(stream);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropping_timed_window_releases_reader() {
        let (reader, dropped) = TrackedReader::new(4 * READ_CAPACITY);
        let mut stream = window_stream(
            reader,
            4 * READ_CAPACITY as u64,
            Some(Duration::from_secs(30)),
        );

        assert!(stream.next().await.unwrap().is_ok());
        drop(stream);
        assert!(wait_for(&dropped).await, "reader task kept the file open");
    }

    #[tokio::test]
    async fn stalled_consumer_is_cut_off() {
        let len = 10 * READ_CAPACITY;
        let (reader, dropped) = TrackedReader::new(len);
        let mut stream = window_stream(reader, len as u64, Some(Duration::from_millis(50)));

        let mut received = stream.next().await.unwrap().unwrap().len();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(dropped.load(Ordering::SeqCst), "reader held during stall");

        let mut failure = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => received += chunk.len(),
                Err(e) => failure = Some(e),
            }
        }
        assert!(received < len);
        assert_eq!(failure.unwrap().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn stalled_read_times_out() {
        // The writer half stays open and silent, so reads never complete.
        let (_writer, reader) = tokio::io::duplex(64);
        let mut stream = window_stream(reader, 100, Some(Duration::from_millis(50)));

        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(stream.next().await.is_none());
    }
}
