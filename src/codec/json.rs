//! # JSON Codec
//!
//! Decodes `application/json` bodies (media type parameters are ignored) with
//! two guarantees on top of plain `serde_json`:
//!
//! - **Strict fields**: a field the destination does not know about is an
//!   error, whether or not the destination type uses
//!   `#[serde(deny_unknown_fields)]`.
//! - **Single document**: anything other than whitespace after the first
//!   document is an error, so trailing garbage or a second concatenated
//!   document is never silently dropped.
//!
//! ## Error Messages
//!
//! | Input                    | Kind                | Message                                           |
//! |--------------------------|---------------------|---------------------------------------------------|
//! | `{”A”: 1}`               | `MalformedDocument` | `malformed JSON (at position 2)`                  |
//! | `{"hello wor`            | `MalformedDocument` | `malformed JSON`                                  |
//! | `{"A": 1}` (A is text)   | `MalformedDocument` | `malformed JSON (at position 7), bad value for "A"` |
//! | `{}` (A is required)     | `MalformedDocument` | `malformed JSON (at position 2), missing field "A"` |
//! | `{"B": 23}` (no field B) | `UnknownField`      | `unknown field "B"`                               |
//! | empty body               | `EmptyBody`         | `body must not be empty`                          |
//! | `{}{}`                   | `MultipleDocuments` | `multiple json objects`                           |
//!
//! All of them are tagged `BadRequest` and `BadContent` as well. Positions
//! are byte offsets into the body.
//!
//! ## Destination Writes
//!
//! Syntax errors, truncated documents, empty bodies and bad values leave the
//! destination untouched. Unknown fields and trailing documents are only known
//! once the value has been built, so in those two cases the destination has
//! already been overwritten when the error is returned.

use super::capture::Capture;
use super::{Codec, Destination, MediaType};
use crate::error::{DecodeError, ErrorKind};
use serde::de::{Deserialize, IgnoredAny};
use serde_json::error::Category;
use std::io::Read;
use tracing::debug;

/// The bundled `application/json` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create the codec.
    #[must_use]
    pub fn new() -> Self {
        JsonCodec
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn detect(&self, media_type: &MediaType) -> bool {
        media_type.type_() == mime::APPLICATION && media_type.subtype() == mime::JSON
    }

    fn decode(
        &self,
        body: &mut dyn Read,
        _media_type: &MediaType,
        out: &mut dyn Destination,
    ) -> Result<(), DecodeError> {
        let mut buf = Vec::new();
        body.read_to_end(&mut buf).map_err(|err| {
            DecodeError::new(ErrorKind::BadRequest, format!("failed to read body: {err}"))
                .with_kind(ErrorKind::ReadFailed)
                .with_source(err)
        })?;
        debug!(body_size_bytes = buf.len(), "JSON body read");
        decode_slice(&buf, out)
    }
}

/// Decode one JSON document held in `buf` into `out`, with the same checks
/// and error classification as [`JsonCodec`].
pub fn decode_slice(buf: &[u8], out: &mut dyn Destination) -> Result<(), DecodeError> {
    if buf.iter().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r')) {
        return Err(DecodeError::bad_content(
            ErrorKind::EmptyBody,
            "body must not be empty",
        ));
    }

    // Syntax first: erased deserialization below cannot tell a syntax error
    // from a bad value anymore.
    let mut probe = serde_json::Deserializer::from_slice(buf);
    IgnoredAny::deserialize(&mut probe).map_err(|err| classify(buf, err, None))?;

    let mut stash: Option<serde_json::Error> = None;
    let mut unknown: Option<String> = None;
    let mut track = serde_path_to_error::Track::new();
    let mut de = serde_json::Deserializer::from_slice(buf);
    let filled = {
        let mut on_ignored = |path: serde_ignored::Path<'_>| {
            if unknown.is_none() {
                unknown = Some(path.to_string());
            }
        };
        let captured = Capture::new(&mut de, &mut stash);
        let tracked = serde_path_to_error::Deserializer::new(captured, &mut track);
        let strict = serde_ignored::Deserializer::new(tracked, &mut on_ignored);
        out.fill(&mut <dyn erased_serde::Deserializer>::erase(strict))
    };

    // An ignored field is reported in stream order, so if one was seen it
    // precedes whatever else went wrong.
    if let Some(field) = unknown {
        return Err(unknown_field(field));
    }
    if let Err(err) = filled {
        return Err(match stash {
            Some(json_err) => {
                let path = track.path().to_string();
                let field = (path != ".").then_some(path);
                classify(buf, json_err, field)
            }
            None => DecodeError::new(ErrorKind::BadRequest, format!("invalid JSON value: {err}"))
                .with_source(err),
        });
    }

    de.end().map_err(|err| {
        DecodeError::bad_content(ErrorKind::MultipleDocuments, "multiple json objects")
            .with_source(err)
    })
}

fn unknown_field(field: String) -> DecodeError {
    DecodeError::bad_content(ErrorKind::UnknownField, format!("unknown field {field:?}"))
        .with_field(field)
}

/// Map a positioned `serde_json` error onto the shared taxonomy.
fn classify(buf: &[u8], err: serde_json::Error, field: Option<String>) -> DecodeError {
    match err.classify() {
        Category::Syntax => {
            let offset = byte_offset(buf, err.line(), err.column());
            DecodeError::bad_content(
                ErrorKind::MalformedDocument,
                format!("malformed JSON (at position {offset})"),
            )
            .with_offset(offset)
            .with_source(err)
        }
        Category::Eof => {
            DecodeError::bad_content(ErrorKind::MalformedDocument, "malformed JSON").with_source(err)
        }
        Category::Data => {
            // Destinations with `deny_unknown_fields` report the field themselves.
            if let Some(name) = denied_field(&err.to_string()) {
                return unknown_field(name).with_source(err);
            }
            let offset = byte_offset(buf, err.line(), err.column());
            let missing = missing_field(&err.to_string());
            let message = match (&missing, &field) {
                (Some(name), _) => {
                    format!("malformed JSON (at position {offset}), missing field {name:?}")
                }
                (None, Some(field)) => {
                    format!("malformed JSON (at position {offset}), bad value for {field:?}")
                }
                (None, None) => format!("malformed JSON (at position {offset})"),
            };
            let field = match (missing, field) {
                (Some(name), Some(parent)) => Some(format!("{parent}.{name}")),
                (Some(name), None) => Some(name),
                (None, field) => field,
            };
            let classified = DecodeError::bad_content(ErrorKind::MalformedDocument, message)
                .with_offset(offset)
                .with_source(err);
            match field {
                Some(field) => classified.with_field(field),
                None => classified,
            }
        }
        Category::Io => DecodeError::new(ErrorKind::BadRequest, err.to_string())
            .with_kind(ErrorKind::ReadFailed)
            .with_source(err),
    }
}

/// Field name from serde's "unknown field `name`, expected ..." message.
fn denied_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("unknown field `")?;
    rest.split_once('`').map(|(name, _)| name.to_string())
}

/// Field name from serde's "missing field `name`" message.
fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split_once('`').map(|(name, _)| name.to_string())
}

/// Convert serde_json's 1-based line and byte column into a byte offset.
fn byte_offset(buf: &[u8], line: usize, column: usize) -> u64 {
    let line_start = if line <= 1 {
        0
    } else {
        buf.iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .nth(line - 2)
            .map_or(0, |(i, _)| i + 1)
    };
    (line_start + column) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Empty {}

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Single {
        #[serde(rename = "A")]
        a: String,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Denying {
        #[serde(rename = "A")]
        a: String,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Outer {
        inner: Inner,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Inner {
        count: u32,
    }

    fn decode<T: Destination>(input: &str, out: &mut T) -> Result<(), DecodeError> {
        JsonCodec::new().decode(&mut input.as_bytes(), &mime::APPLICATION_JSON, out)
    }

    fn assert_bad_content(err: &DecodeError, kind: ErrorKind, message: &str) {
        assert!(err.is(ErrorKind::BadRequest), "{err:?}");
        assert!(err.is(ErrorKind::BadContent), "{err:?}");
        assert!(err.is(kind), "{err:?}");
        assert!(err.to_string().contains(message), "{err} does not contain {message}");
    }

    #[test]
    fn test_detect() {
        let codec = JsonCodec::new();
        assert!(codec.detect(&mime::APPLICATION_JSON));
        assert!(codec.detect(&"application/json; charset=utf-8".parse().unwrap()));
        assert!(!codec.detect(&mime::APPLICATION_WWW_FORM_URLENCODED));
        assert!(!codec.detect(&mime::TEXT_PLAIN));
    }

    #[test]
    fn test_ok_empty_object() {
        let mut out = Empty {};
        decode("{}", &mut out).unwrap();
    }

    #[test]
    fn test_ok_surrounding_whitespace() {
        let mut out = Single::default();
        decode(" \n{\"A\": \"x\"}\r\n ", &mut out).unwrap();
        assert_eq!(out.a, "x");
    }

    #[test]
    fn test_ok_dynamic_value() {
        let mut out = serde_json::Value::Null;
        decode(r#"{"anything": [1, 2, {"goes": true}]}"#, &mut out).unwrap();
        assert_eq!(out, json!({"anything": [1, 2, {"goes": true}]}));
    }

    #[test]
    fn test_err_empty() {
        let mut out = Single::default();
        let err = decode("", &mut out).unwrap_err();
        assert_bad_content(&err, ErrorKind::EmptyBody, "body must not be empty");
        assert!(!err.is(ErrorKind::MalformedDocument));

        let err = decode(" \n\t ", &mut out).unwrap_err();
        assert!(err.is(ErrorKind::EmptyBody));
    }

    #[test]
    fn test_err_multiple_bodies() {
        let mut out = Empty {};
        let err = decode("{}{}", &mut out).unwrap_err();
        assert_bad_content(&err, ErrorKind::MultipleDocuments, "multiple json objects");

        let err = decode("{} trailing", &mut out).unwrap_err();
        assert!(err.is(ErrorKind::MultipleDocuments));
    }

    #[test]
    fn test_err_bad_quote_marks() {
        let mut out = Single::default();
        let err = decode("{”A”: 1}", &mut out).unwrap_err();
        assert_bad_content(&err, ErrorKind::MalformedDocument, "malformed JSON (at position 2)");
        assert_eq!(err.offset(), Some(2));
    }

    #[test]
    fn test_err_bad_type() {
        let mut out = Single {
            a: "kept".to_string(),
        };
        let err = decode(r#"{"A": 1}"#, &mut out).unwrap_err();
        assert_bad_content(
            &err,
            ErrorKind::MalformedDocument,
            r#"malformed JSON (at position 7), bad value for "A""#,
        );
        assert_eq!(err.offset(), Some(7));
        assert_eq!(err.field(), Some("A"));
        assert_eq!(out.a, "kept");
    }

    #[test]
    fn test_err_bad_type_nested_on_second_line() {
        let mut out = Outer::default();
        let err = decode("{\n\"inner\": {\"count\": \"x\"}}", &mut out).unwrap_err();
        assert!(err.is(ErrorKind::MalformedDocument));
        assert_eq!(err.field(), Some("inner.count"));
        // "x" ends at byte 24: 2 bytes on line one, 22 on line two.
        assert_eq!(err.offset(), Some(24));
    }

    #[test]
    fn test_err_unknown_field() {
        let mut out = Single::default();
        let err = decode(r#"{"B": 23}"#, &mut out).unwrap_err();
        assert_bad_content(&err, ErrorKind::UnknownField, r#"unknown field "B""#);
        assert_eq!(err.field(), Some("B"));
    }

    #[test]
    fn test_err_unknown_field_after_known() {
        let mut out = Single::default();
        let err = decode(r#"{"A": "x", "extra": {"deep": 1}}"#, &mut out).unwrap_err();
        assert_bad_content(&err, ErrorKind::UnknownField, r#"unknown field "extra""#);
    }

    #[test]
    fn test_err_unknown_field_with_deny_attribute() {
        let mut out = Denying::default();
        let err = decode(r#"{"B": 23}"#, &mut out).unwrap_err();
        assert_bad_content(&err, ErrorKind::UnknownField, r#"unknown field "B""#);
    }

    #[test]
    fn test_err_bad_content() {
        let mut out = Empty {};
        let err = decode(r#"{"hello wor"#, &mut out).unwrap_err();
        assert_bad_content(&err, ErrorKind::MalformedDocument, "malformed JSON");
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn test_syntax_error_beats_later_type_error() {
        let mut out = Single::default();
        let err = decode(r#"{"A": 1, }"#, &mut out).unwrap_err();
        assert!(err.is(ErrorKind::MalformedDocument));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_read_failure_is_bad_request() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let mut out = Empty {};
        let err = JsonCodec::new()
            .decode(&mut Broken, &mime::APPLICATION_JSON, &mut out)
            .unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));
        assert!(err.is(ErrorKind::ReadFailed));
        assert!(!err.is(ErrorKind::BadContent));
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(try_from = "RawCount")]
    struct PositiveCount {
        n: u32,
    }

    #[derive(Deserialize)]
    struct RawCount {
        n: u32,
    }

    impl TryFrom<RawCount> for PositiveCount {
        type Error = String;

        fn try_from(raw: RawCount) -> Result<Self, Self::Error> {
            if raw.n == 0 {
                return Err("n must be positive".to_string());
            }
            Ok(PositiveCount { n: raw.n })
        }
    }

    #[test]
    fn test_err_destination_validation_keeps_cause() {
        let mut out = PositiveCount::default();
        let err = decode(r#"{"n":0}"#, &mut out).unwrap_err();
        assert_eq!(err.kinds(), &[ErrorKind::BadRequest]);
        assert!(err.to_string().contains("n must be positive"));
        let source = std::error::Error::source(&err).expect("cause kept");
        assert!(source.to_string().contains("n must be positive"));
        assert_eq!(out.n, 0);

        decode(r#"{"n":3}"#, &mut out).unwrap();
        assert_eq!(out.n, 3);
    }

    #[test]
    fn test_err_missing_field_is_named() {
        let mut out = Single::default();
        let err = decode("{}", &mut out).unwrap_err();
        assert_bad_content(&err, ErrorKind::MalformedDocument, r#"missing field "A""#);
        assert_eq!(err.field(), Some("A"));
        assert!(err.offset().is_some());
    }

    #[test]
    fn test_type_error_before_unknown_field_wins() {
        let mut out = Single::default();
        let err = decode(r#"{"A":2,"B":1}"#, &mut out).unwrap_err();
        assert!(err.is(ErrorKind::MalformedDocument), "{err:?}");
        assert!(!err.is(ErrorKind::UnknownField));
        assert_eq!(err.field(), Some("A"));
    }

    #[test]
    fn test_unknown_field_before_type_error_wins() {
        let mut out = Single::default();
        let err = decode(r#"{"B":1,"A":2}"#, &mut out).unwrap_err();
        assert!(err.is(ErrorKind::UnknownField), "{err:?}");
        assert!(!err.is(ErrorKind::MalformedDocument));
        assert_eq!(err.field(), Some("B"));
    }

    #[test]
    fn test_missing_field() {
        assert_eq!(missing_field("missing field `A`").as_deref(), Some("A"));
        assert_eq!(missing_field("unknown field `A`"), None);
    }

    #[test]
    fn test_byte_offset() {
        assert_eq!(byte_offset(b"abc", 1, 2), 2);
        assert_eq!(byte_offset(b"ab\ncd\nef", 2, 1), 4);
        assert_eq!(byte_offset(b"ab\ncd\nef", 3, 2), 8);
    }

    #[test]
    fn test_denied_field() {
        assert_eq!(
            denied_field("unknown field `B`, expected `A`").as_deref(),
            Some("B")
        );
        assert_eq!(denied_field("invalid type: integer `1`"), None);
    }
}
