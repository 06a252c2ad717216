//! # Codec Module
//!
//! A codec is a content-type aware decoding strategy: it answers "do I handle
//! this media type?" ([`Codec::detect`]) and "turn this stream into that
//! value" ([`Codec::decode`]). Codecs are registered with a
//! [`Decoder`](crate::dispatcher::Decoder), which picks the first one whose
//! `detect` accepts the request's media type.
//!
//! ## Writing a Codec
//!
//! ```rust
//! use brrtrouter_body::codec::{Codec, Destination, MediaType};
//! use brrtrouter_body::{DecodeError, ErrorKind};
//! use std::io::Read;
//!
//! struct PlainText;
//!
//! impl Codec for PlainText {
//!     fn detect(&self, media_type: &MediaType) -> bool {
//!         media_type.type_() == mime::TEXT && media_type.subtype() == mime::PLAIN
//!     }
//!
//!     fn decode(
//!         &self,
//!         body: &mut dyn Read,
//!         _media_type: &MediaType,
//!         out: &mut dyn Destination,
//!     ) -> Result<(), DecodeError> {
//!         let mut text = String::new();
//!         body.read_to_string(&mut text).map_err(|err| {
//!             DecodeError::new(ErrorKind::BadRequest, "unreadable body").with_source(err)
//!         })?;
//!         let mut de = <dyn erased_serde::Deserializer>::erase(
//!             serde::de::value::StringDeserializer::<serde::de::value::Error>::new(text),
//!         );
//!         out.fill(&mut de).map_err(|err| {
//!             DecodeError::bad_content(ErrorKind::MalformedDocument, err.to_string())
//!         })
//!     }
//! }
//! ```
//!
//! ## Destinations
//!
//! Codecs are stored as trait objects, so they cannot be generic over the
//! destination type. [`Destination`] erases it instead: every
//! `T: DeserializeOwned` is a destination and can be filled from any
//! [`erased_serde::Deserializer`].

use crate::error::DecodeError;
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

pub mod json;
mod capture;

pub use json::JsonCodec;

/// Structured media type (type, subtype, parameters) parsed from a
/// `Content-Type` header.
pub type MediaType = mime::Mime;

/// A value a codec can decode into.
///
/// Implemented for every `T: DeserializeOwned`; the value is replaced only
/// when deserialization succeeds.
pub trait Destination {
    /// Deserialize a fresh value from `de` and store it.
    fn fill(
        &mut self,
        de: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), erased_serde::Error>;
}

impl<T: DeserializeOwned> Destination for T {
    fn fill(
        &mut self,
        de: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), erased_serde::Error> {
        *self = erased_serde::deserialize(de)?;
        Ok(())
    }
}

/// A decoding strategy for one content-type family.
///
/// Codecs must be immutable once registered; the registry shares them
/// between threads without synchronisation.
///
/// A codec may have written part of a value into `out` before failing.
/// Callers should not rely on `out` after an error unless the codec documents
/// otherwise.
pub trait Codec: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether this codec handles `media_type`.
    fn detect(&self, media_type: &MediaType) -> bool;

    /// Decode exactly one value from `body` into `out`.
    fn decode(
        &self,
        body: &mut dyn Read,
        media_type: &MediaType,
        out: &mut dyn Destination,
    ) -> Result<(), DecodeError>;
}

impl<C: Codec + ?Sized> Codec for Arc<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(&self, media_type: &MediaType) -> bool {
        (**self).detect(media_type)
    }

    fn decode(
        &self,
        body: &mut dyn Read,
        media_type: &MediaType,
        out: &mut dyn Destination,
    ) -> Result<(), DecodeError> {
        (**self).decode(body, media_type, out)
    }
}

/// Codec assembled from a detect closure and a decode closure.
///
/// ```rust
/// use brrtrouter_body::codec::{Destination, FnCodec, MediaType};
/// use std::io::Read;
///
/// let codec = FnCodec::new(
///     "accept-application",
///     |mt: &MediaType| mt.type_() == mime::APPLICATION,
///     |_body: &mut dyn Read, _mt: &MediaType, _out: &mut dyn Destination| Ok(()),
/// );
/// # let _ = codec;
/// ```
pub struct FnCodec<D, F> {
    name: String,
    detect_fn: D,
    decode_fn: F,
}

impl<D, F> FnCodec<D, F>
where
    D: Fn(&MediaType) -> bool + Send + Sync,
    F: Fn(&mut dyn Read, &MediaType, &mut dyn Destination) -> Result<(), DecodeError>
        + Send
        + Sync,
{
    /// Create a codec named `name` from a pair of closures.
    #[must_use]
    pub fn new(name: impl Into<String>, detect_fn: D, decode_fn: F) -> Self {
        FnCodec {
            name: name.into(),
            detect_fn,
            decode_fn,
        }
    }
}

impl<D, F> Codec for FnCodec<D, F>
where
    D: Fn(&MediaType) -> bool + Send + Sync,
    F: Fn(&mut dyn Read, &MediaType, &mut dyn Destination) -> Result<(), DecodeError>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, media_type: &MediaType) -> bool {
        (self.detect_fn)(media_type)
    }

    fn decode(
        &self,
        body: &mut dyn Read,
        media_type: &MediaType,
        out: &mut dyn Destination,
    ) -> Result<(), DecodeError> {
        (self.decode_fn)(body, media_type, out)
    }
}

impl<D, F> fmt::Debug for FnCodec<D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec").field("name", &self.name).finish()
    }
}
