//! # Error Module
//!
//! Every failure produced while decoding a request body is a [`DecodeError`].
//! An error carries one or more [`ErrorKind`] tags so callers can ask either a
//! broad question ("is this any kind of bad body?") or a narrow one ("is this
//! specifically an unknown field?").
//!
//! ## Taxonomy
//!
//! | Class                  | Specific tags                                                   | Status |
//! |------------------------|-----------------------------------------------------------------|--------|
//! | `BadRequest`           | `MissingContentType`, `ReadFailed`                              | 400    |
//! | `UnsupportedMediaType` | `InvalidMediaType`, `NoMatchingCodec`                           | 415    |
//! | `PayloadTooLarge`      | added on top of whatever the codec reported                     | 413    |
//! | `BadContent`           | `MalformedDocument`, `UnknownField`, `EmptyBody`, `MultipleDocuments` | 400 |
//!
//! `BadContent` errors are always co-tagged with `BadRequest`.
//!
//! ## Usage
//!
//! ```rust
//! use brrtrouter_body::{DecodeError, ErrorKind};
//!
//! let err = DecodeError::bad_content(ErrorKind::UnknownField, "unknown field \"B\"");
//! assert!(err.is(ErrorKind::BadRequest));
//! assert!(err.is(ErrorKind::UnknownField));
//! assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
//! ```

use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use smallvec::{smallvec, SmallVec};
use std::error::Error as StdError;
use std::fmt;

/// Boxed cause attached to a [`DecodeError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A classification tag carried by a [`DecodeError`].
///
/// The first four variants are the caller-facing classes; the rest narrow a
/// failure down to its exact cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed input at the transport level
    BadRequest,
    /// Declared content type is unparsable or no codec handles it
    UnsupportedMediaType,
    /// The body stream hit its size limit during decode
    PayloadTooLarge,
    /// Codec-level content error; always paired with `BadRequest`
    BadContent,
    /// No `Content-Type` header, or an empty one
    MissingContentType,
    /// The `Content-Type` header could not be parsed as a media type
    InvalidMediaType,
    /// The media type parsed but no registered codec detects it
    NoMatchingCodec,
    /// Syntax error, truncated document or a value of the wrong type
    MalformedDocument,
    /// The document names a field the destination does not have
    UnknownField,
    /// The body contained no document at all
    EmptyBody,
    /// More data followed the first document
    MultipleDocuments,
    /// The body stream failed while being read
    ReadFailed,
}

impl ErrorKind {
    /// Stable snake_case name, as used in problem details.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::UnsupportedMediaType => "unsupported_media_type",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::BadContent => "bad_content",
            ErrorKind::MissingContentType => "missing_content_type",
            ErrorKind::InvalidMediaType => "invalid_media_type",
            ErrorKind::NoMatchingCodec => "no_matching_codec",
            ErrorKind::MalformedDocument => "malformed_document",
            ErrorKind::UnknownField => "unknown_field",
            ErrorKind::EmptyBody => "empty_body",
            ErrorKind::MultipleDocuments => "multiple_documents",
            ErrorKind::ReadFailed => "read_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified request body decoding failure.
///
/// Display shows the human-readable message only; the original diagnostic
/// (parser error, I/O error, media type error) is available through
/// [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DecodeError {
    kinds: SmallVec<[ErrorKind; 4]>,
    message: String,
    offset: Option<u64>,
    field: Option<String>,
    #[source]
    source: Option<BoxError>,
}

impl DecodeError {
    /// Create an error with a single kind tag.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        DecodeError {
            kinds: smallvec![kind],
            message: message.into(),
            offset: None,
            field: None,
            source: None,
        }
    }

    /// Create a content error tagged `BadRequest`, `BadContent` and `kind`.
    ///
    /// Codecs should build all of their document-level failures through this
    /// constructor so callers can test for "any bad body" generically.
    #[must_use]
    pub fn bad_content(kind: ErrorKind, message: impl Into<String>) -> Self {
        DecodeError::new(ErrorKind::BadRequest, message)
            .with_kind(ErrorKind::BadContent)
            .with_kind(kind)
    }

    /// Add a kind tag. Adding a tag that is already present is a no-op.
    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Record the byte offset in the body where the problem was found.
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Record the (dotted) name of the offending field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Whether this error carries `kind`.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// All kind tags, in the order they were attached.
    #[must_use]
    pub fn kinds(&self) -> &[ErrorKind] {
        &self.kinds
    }

    /// Human-readable message without the cause chain.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset into the body, when the codec knows it.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Offending field, when the codec knows it.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// The HTTP status most callers would answer with.
    ///
    /// Precedence is 413, then 415, then 400. Errors without any class tag
    /// map to 400 as well since they all stem from the request body.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        if self.is(ErrorKind::PayloadTooLarge) {
            StatusCode::PAYLOAD_TOO_LARGE
        } else if self.is(ErrorKind::UnsupportedMediaType) {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    /// Render the error as an RFC 7807 problem details object.
    ///
    /// ```rust
    /// use brrtrouter_body::{DecodeError, ErrorKind};
    ///
    /// let err = DecodeError::bad_content(ErrorKind::EmptyBody, "body must not be empty");
    /// let problem = err.to_problem_details();
    /// assert_eq!(problem["status"], 400);
    /// assert_eq!(problem["detail"], "body must not be empty");
    /// ```
    #[must_use]
    pub fn to_problem_details(&self) -> Value {
        let status = self.status();
        let mut problem = json!({
            "type": "about:blank",
            "title": status.canonical_reason().unwrap_or("Bad Request"),
            "status": status.as_u16(),
            "detail": self.message,
            "kinds": self.kinds.as_slice(),
        });
        if let Some(obj) = problem.as_object_mut() {
            if let Some(offset) = self.offset {
                obj.insert("offset".to_string(), json!(offset));
            }
            if let Some(field) = &self.field {
                obj.insert("field".to_string(), json!(field));
            }
        }
        problem
    }
}
