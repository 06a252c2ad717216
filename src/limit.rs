//! Byte-length limiting for request body streams.
//!
//! [`LimitedReader`] is the stream wrapper the decoder recognises when it
//! reclassifies a failed decode as `413 Payload Too Large`. Any reader that
//! fails with an [`io::Error`] carrying a [`LengthLimitError`] gets the same
//! treatment, so servers with their own limiter only need to emit that error.

use std::cmp;
use std::error::Error as StdError;
use std::io::{self, Read};

/// The body was longer than the configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request body exceeds the {limit} byte limit")]
pub struct LengthLimitError {
    /// The limit that was exceeded, in bytes
    pub limit: u64,
}

/// Reader that yields at most `limit` bytes of the wrapped stream.
///
/// Reading past the limit fails with an [`io::Error`] wrapping a
/// [`LengthLimitError`], and keeps failing on every later call.
#[derive(Debug)]
pub struct LimitedReader<R> {
    inner: R,
    limit: Option<u64>,
    remaining: u64,
    exceeded: bool,
}

impl<R: Read> LimitedReader<R> {
    /// Wrap `inner`. A `None` limit never fails.
    #[must_use]
    pub fn new(inner: R, limit: Option<u64>) -> Self {
        LimitedReader {
            inner,
            limit,
            remaining: limit.unwrap_or(u64::MAX),
            exceeded: false,
        }
    }

    /// The configured limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Unwrap the inner reader.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn limit_error(&self) -> io::Error {
        io::Error::other(LengthLimitError {
            limit: self.limit.unwrap_or(u64::MAX),
        })
    }
}

impl<R: Read> Read for LimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.exceeded {
            return Err(self.limit_error());
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.limit.is_none() {
            return self.inner.read(buf);
        }

        // One byte of headroom tells "exactly at the limit" from "over it".
        let want = cmp::min(buf.len() as u64, self.remaining.saturating_add(1)) as usize;
        let n = self.inner.read(&mut buf[..want])?;
        if n as u64 > self.remaining {
            self.exceeded = true;
            self.remaining = 0;
            return Err(self.limit_error());
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Find a [`LengthLimitError`] anywhere in `err`'s source chain.
///
/// `io::Error` does not report its payload as a source, so payloads are
/// inspected explicitly at every level.
pub(crate) fn find_limit_error<'a>(
    err: &'a (dyn StdError + 'static),
) -> Option<&'a LengthLimitError> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(limit) = err.downcast_ref::<LengthLimitError>() {
            return Some(limit);
        }
        if let Some(limit) = err
            .downcast_ref::<io::Error>()
            .and_then(|io| io.get_ref())
            .and_then(|inner| inner.downcast_ref::<LengthLimitError>())
        {
            return Some(limit);
        }
        current = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, ErrorKind};

    #[test]
    fn test_body_at_limit_is_accepted() {
        let mut reader = LimitedReader::new(&b"abcd"[..], Some(4));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcd");
    }

    #[test]
    fn test_body_over_limit_fails() {
        let mut reader = LimitedReader::new(&b"abcde"[..], Some(4));
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        let limit = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<LengthLimitError>())
            .copied();
        assert_eq!(limit, Some(LengthLimitError { limit: 4 }));

        // Sticky: the reader keeps failing after the first violation.
        let mut buf = [0u8; 8];
        assert!(reader.read(&mut buf).is_err());
    }

    #[test]
    fn test_unbounded_reader_passes_through() {
        let data = vec![b'x'; 10_000];
        let mut reader = LimitedReader::new(data.as_slice(), None);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 10_000);
        assert_eq!(reader.limit(), None);
    }

    #[test]
    fn test_find_limit_error_through_decode_error() {
        let io_err = io::Error::other(LengthLimitError { limit: 16 });
        let err = DecodeError::new(ErrorKind::ReadFailed, "read failed").with_source(io_err);
        let found = find_limit_error(&err).copied();
        assert_eq!(found, Some(LengthLimitError { limit: 16 }));
    }

    #[test]
    fn test_find_limit_error_ignores_other_io_errors() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err = DecodeError::new(ErrorKind::ReadFailed, "read failed").with_source(io_err);
        assert!(find_limit_error(&err).is_none());
    }
}
