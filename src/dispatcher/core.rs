//! Dispatcher core module - codec registry and the decode hot path.
//!
//! Lookups never take a lock: they load the current registry snapshot from
//! the `ArcSwap` and scan it. Registration is expected at startup but stays
//! correct when it races with in-flight requests.

use crate::codec::{Codec, Destination, JsonCodec, MediaType};
use crate::error::{DecodeError, ErrorKind};
use crate::limit::find_limit_error;
use arc_swap::ArcSwap;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use once_cell::sync::Lazy;
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Immutable registry snapshot, in registration order.
pub type CodecRegistry = Vec<Arc<dyn Codec>>;

/// Anything a `Content-Type` header can be read from.
///
/// Only the first `Content-Type` value is consulted.
pub trait ContentTypeSource {
    /// The raw `Content-Type` value, if present.
    fn content_type(&self) -> Option<&HeaderValue>;
}

impl ContentTypeSource for HeaderMap {
    fn content_type(&self) -> Option<&HeaderValue> {
        self.get(CONTENT_TYPE)
    }
}

impl<B> ContentTypeSource for http::Request<B> {
    fn content_type(&self) -> Option<&HeaderValue> {
        self.headers().get(CONTENT_TYPE)
    }
}

impl ContentTypeSource for http::request::Parts {
    fn content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(CONTENT_TYPE)
    }
}

/// Codec registry and decode dispatcher.
///
/// Codecs are tried in registration order; the first whose
/// [`Codec::detect`] accepts the media type wins. A `Decoder` is cheap to
/// share by reference across threads.
pub struct Decoder {
    codecs: ArcSwap<CodecRegistry>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codecs = self.codecs.load();
        let names: Vec<&str> = codecs.iter().map(|codec| codec.name()).collect();
        f.debug_struct("Decoder").field("codecs", &names).finish()
    }
}

impl Decoder {
    /// Create a decoder with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Decoder {
            codecs: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Create a decoder with the bundled [`JsonCodec`] registered.
    #[must_use]
    pub fn with_json() -> Self {
        let decoder = Self::new();
        decoder.register(JsonCodec::new());
        decoder
    }

    /// Append `codec` to the registry.
    ///
    /// Safe to call concurrently with other registrations and with decodes.
    pub fn register<C: Codec + 'static>(&self, codec: C) {
        self.register_arc(Arc::new(codec));
    }

    /// Append an already shared codec to the registry.
    pub fn register_arc(&self, codec: Arc<dyn Codec>) {
        // rcu re-runs the closure against the newer snapshot whenever the
        // compare-and-swap loses to a concurrent registration.
        let previous = self.codecs.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().map(Arc::clone));
            next.push(Arc::clone(&codec));
            next
        });
        info!(
            codec = codec.name(),
            registered = previous.len() + 1,
            "Codec registered"
        );
    }

    /// The current registry snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CodecRegistry> {
        self.codecs.load_full()
    }

    /// Number of registered codecs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.load().len()
    }

    /// Whether no codec has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.load().is_empty()
    }

    /// First registered codec that detects `media_type`.
    #[must_use]
    pub fn find_codec(&self, media_type: &MediaType) -> Option<Arc<dyn Codec>> {
        self.codecs
            .load()
            .iter()
            .find(|codec| codec.detect(media_type))
            .map(Arc::clone)
    }

    /// Decode `body` into `out` using the codec selected by the request's
    /// `Content-Type`.
    ///
    /// To limit the body size, wrap `body` in a
    /// [`LimitedReader`](crate::limit::LimitedReader) first; exceeding the
    /// limit is then reported as `PayloadTooLarge`.
    ///
    /// # Errors
    ///
    /// A [`DecodeError`] tagged as described in the [module docs](super).
    /// Codecs may have written part of `out` before failing.
    pub fn decode<S, R, T>(&self, request: &S, mut body: R, out: &mut T) -> Result<(), DecodeError>
    where
        S: ContentTypeSource + ?Sized,
        R: Read,
        T: Destination,
    {
        let result = self.dispatch(request.content_type(), &mut body, out);
        if let Err(err) = &result {
            debug!(kinds = ?err.kinds(), error = %err, "Request body rejected");
        }
        result
    }

    fn dispatch(
        &self,
        content_type: Option<&HeaderValue>,
        body: &mut dyn Read,
        out: &mut dyn Destination,
    ) -> Result<(), DecodeError> {
        let raw = match content_type {
            Some(value) if !value.is_empty() => value,
            _ => {
                return Err(DecodeError::new(ErrorKind::BadRequest, "missing content-type")
                    .with_kind(ErrorKind::MissingContentType));
            }
        };

        let media_type = parse_media_type(raw)?;

        let Some(codec) = self.find_codec(&media_type) else {
            return Err(DecodeError::new(
                ErrorKind::UnsupportedMediaType,
                format!("{:?}: unsupported media type", media_type.as_ref()),
            )
            .with_kind(ErrorKind::NoMatchingCodec));
        };
        debug!(media_type = %media_type, codec = codec.name(), "Codec selected");

        codec.decode(body, &media_type, out).map_err(|err| {
            match find_limit_error(&err).map(|limit| limit.limit) {
                Some(limit) => {
                    warn!(limit_bytes = limit, codec = codec.name(), "Request body too large");
                    err.with_kind(ErrorKind::PayloadTooLarge)
                }
                None => err,
            }
        })
    }
}

fn parse_media_type(raw: &HeaderValue) -> Result<MediaType, DecodeError> {
    let text = raw.to_str().map_err(|err| {
        DecodeError::new(
            ErrorKind::UnsupportedMediaType,
            format!("{raw:?}: content-type is not visible ASCII"),
        )
        .with_kind(ErrorKind::InvalidMediaType)
        .with_source(err)
    })?;
    text.parse::<MediaType>().map_err(|err| {
        DecodeError::new(ErrorKind::UnsupportedMediaType, format!("{text:?}: {err}"))
            .with_kind(ErrorKind::InvalidMediaType)
            .with_source(err)
    })
}

static DEFAULT: Lazy<Decoder> = Lazy::new(Decoder::with_json);

/// The process-wide decoder, created on first use with the JSON codec
/// registered.
#[must_use]
pub fn default_decoder() -> &'static Decoder {
    &DEFAULT
}

/// Register `codec` with the process-wide decoder.
pub fn register<C: Codec + 'static>(codec: C) {
    DEFAULT.register(codec);
}

/// Decode with the process-wide decoder. See [`Decoder::decode`].
///
/// # Errors
///
/// See [`Decoder::decode`].
pub fn decode<S, R, T>(request: &S, body: R, out: &mut T) -> Result<(), DecodeError>
where
    S: ContentTypeSource + ?Sized,
    R: Read,
    T: Destination,
{
    DEFAULT.decode(request, body, out)
}
