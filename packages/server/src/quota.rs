//! Upload admission: size limits, per-owner quota and content sniffing.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use common::sniff::{SNIFF_LEN, sniff};
use common::storage::BoxReader;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::config::UploadConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },
    #[error("quota exceeded: {used} bytes stored, {requested} requested, {quota} allowed")]
    QuotaExceeded { used: u64, requested: u64, quota: u64 },
    #[error("no file content")]
    NoFile,
    #[error("failed to read upload: {0}")]
    ReadError(String),
}

/// Limits applied before any byte reaches storage.
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    pub max_size: u64,
    pub user_quota: u64,
}

impl Admission {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            max_size: config.max_size,
            user_quota: config.user_quota,
        }
    }

    /// Reject a request whose declared `Content-Length` already exceeds the file limit.
    pub fn check_request_length(&self, content_length: Option<u64>) -> Result<(), AdmissionError> {
        match content_length {
            Some(length) if length > self.max_size => Err(AdmissionError::PayloadTooLarge {
                size: length,
                limit: self.max_size,
            }),
            _ => Ok(()),
        }
    }

    /// `used` is the owner's currently stored total.
    pub fn check(
        &self,
        content_length: Option<u64>,
        declared_size: u64,
        used: u64,
    ) -> Result<(), AdmissionError> {
        self.check_request_length(content_length)?;
        if declared_size > self.max_size {
            return Err(AdmissionError::PayloadTooLarge {
                size: declared_size,
                limit: self.max_size,
            });
        }
        if declared_size == 0 {
            return Err(AdmissionError::NoFile);
        }
        if used.saturating_add(declared_size) > self.user_quota {
            return Err(AdmissionError::QuotaExceeded {
                used,
                requested: declared_size,
                quota: self.user_quota,
            });
        }
        Ok(())
    }
}

/// Read up to [`SNIFF_LEN`] bytes, detect the content type, and return a reader that
/// yields those bytes again before the remainder of `reader`.
pub async fn sniff_reader(mut reader: BoxReader) -> Result<(&'static str, BoxReader), AdmissionError> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    (&mut reader)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .await
        .map_err(|e| AdmissionError::ReadError(e.to_string()))?;

    if head.is_empty() {
        return Err(AdmissionError::NoFile);
    }

    let mime = sniff(&head);
    let replay: BoxReader = Box::new(Cursor::new(head).chain(reader));
    Ok((mime, replay))
}

/// Fails the stream once more than `limit` bytes have been read.
///
/// The shared flag records that the limit, not the source, caused the failure.
pub struct LimitedReader {
    inner: BoxReader,
    remaining: u64,
    tripped: Arc<AtomicBool>,
}

impl LimitedReader {
    pub fn new(inner: BoxReader, limit: u64) -> (Self, Arc<AtomicBool>) {
        let tripped = Arc::new(AtomicBool::new(false));
        (
            Self {
                inner,
                remaining: limit,
                tripped: tripped.clone(),
            },
            tripped,
        )
    }
}

impl AsyncRead for LimitedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let read = (buf.filled().len() - before) as u64;
                if read > self.remaining {
                    self.tripped.store(true, Ordering::SeqCst);
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "upload exceeds its declared size",
                    )));
                }
                self.remaining -= read;
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
