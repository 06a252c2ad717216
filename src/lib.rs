//! # BRRTRouter Body
//!
//! **BRRTRouter Body** is the request body decoding layer for BRRTRouter services. It turns an
//! HTTP request body into a typed value, choosing the decoding strategy from the request's
//! `Content-Type` header, and reports failures as classified errors that map straight onto
//! HTTP status codes.
//!
//! ## Architecture
//!
//! - **[`codec`]** - the [`Codec`] trait, closure-built codecs and the bundled [`JsonCodec`]
//! - **[`dispatcher`]** - the codec registry and the [`Decoder`] that selects and runs codecs
//! - **[`error`]** - [`DecodeError`] with composable [`ErrorKind`] tags and RFC 7807 rendering
//! - **[`limit`]** - [`LimitedReader`], a body size limiter the dispatcher recognises
//! - **[`runtime_config`]** - environment-driven limits ([`BodyConfig`])
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Handler
//!     participant Decoder
//!     participant Registry as Codec Registry
//!     participant Codec
//!
//!     Handler->>Decoder: decode(&request, body, &mut out)
//!     Decoder->>Decoder: Read Content-Type
//!     alt Missing
//!         Decoder-->>Handler: 400 BadRequest + MissingContentType
//!     end
//!     Decoder->>Decoder: Parse media type
//!     alt Unparsable
//!         Decoder-->>Handler: 415 UnsupportedMediaType + InvalidMediaType
//!     end
//!     Decoder->>Registry: first codec whose detect() accepts it
//!     alt None
//!         Decoder-->>Handler: 415 UnsupportedMediaType + NoMatchingCodec
//!     end
//!     Decoder->>Codec: decode(body, media_type, out)
//!     Codec-->>Decoder: Ok / DecodeError
//!     Decoder->>Decoder: Size limit hit? add PayloadTooLarge (413)
//!     Decoder-->>Handler: Result
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtrouter_body::{BodyConfig, ErrorKind};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct NewPet {
//!     name: String,
//!     species: String,
//! }
//!
//! let request = http::Request::builder()
//!     .method("POST")
//!     .uri("/pets")
//!     .header("Content-Type", "application/json")
//!     .body(&br#"{"name":"Fluffy","species":"Cat"}"#[..])
//!     .unwrap();
//!
//! let body = BodyConfig::default().limit(*request.body());
//! let mut pet = NewPet::default();
//! brrtrouter_body::decode(&request, body, &mut pet).unwrap();
//! assert_eq!(pet.species, "Cat");
//!
//! let mut pet = NewPet::default();
//! let err = brrtrouter_body::decode(&request, &br#"{"name":"Rex","legs":4}"#[..], &mut pet)
//!     .unwrap_err();
//! assert!(err.is(ErrorKind::UnknownField));
//! assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
//! ```
//!
//! ## Custom Codecs
//!
//! Register additional codecs at startup. Codecs are tried in registration order and the
//! first match wins, so a codec registered after the bundled JSON codec cannot take over
//! `application/json`; build a fresh [`Decoder`] for that.
//!
//! ```rust
//! use brrtrouter_body::{Destination, DecodeError, ErrorKind, FnCodec, MediaType};
//! use std::io::Read;
//!
//! brrtrouter_body::register(FnCodec::new(
//!     "form",
//!     |mt: &MediaType| mt.essence_str() == "application/x-www-form-urlencoded",
//!     |_body: &mut dyn Read, _mt: &MediaType, _out: &mut dyn Destination| {
//!         Err(DecodeError::new(ErrorKind::BadRequest, "forms are not accepted here"))
//!     },
//! ));
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber:
//!
//! - `info` when a codec is registered
//! - `debug` when a codec is selected and when a body is rejected
//! - `warn` when a body exceeds its size limit

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod limit;
pub mod runtime_config;

pub use codec::{Codec, Destination, FnCodec, JsonCodec, MediaType};
pub use dispatcher::{decode, default_decoder, register, ContentTypeSource, Decoder};
pub use error::{DecodeError, ErrorKind};
pub use limit::{LengthLimitError, LimitedReader};
pub use runtime_config::BodyConfig;
