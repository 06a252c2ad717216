//! # Dispatcher Module
//!
//! The dispatcher owns the codec registry and ties the decoding pipeline
//! together: read the request's `Content-Type`, parse it into a media type,
//! pick the first registered codec that detects it, run that codec against
//! the body, and classify whatever went wrong.
//!
//! ## Overview
//!
//! - **[`Decoder`]** - an independent registry + dispatcher instance
//! - **[`default_decoder`]** - the process-wide instance, created on first use
//!   with the JSON codec already registered
//! - **[`register`] / [`decode`]** - shorthands for the process-wide instance
//!
//! ## Request Flow
//!
//! 1. Missing or empty `Content-Type` → `BadRequest` + `MissingContentType`
//! 2. Unparsable `Content-Type` → `UnsupportedMediaType` + `InvalidMediaType`
//! 3. No codec detects the media type → `UnsupportedMediaType` + `NoMatchingCodec`
//! 4. The codec decodes the body; its error is returned as is, except that a
//!    failure caused by a body size limit also gets `PayloadTooLarge`
//!
//! ## Concurrency
//!
//! The registry is an immutable `Vec` behind an [`arc_swap::ArcSwap`]. Lookups
//! load the current snapshot without locking; registration copies the
//! snapshot, appends, and publishes with compare-and-swap, retrying when
//! another registration won the race. Readers therefore see either the old or
//! the new registry, and no registration is ever lost.
//!
//! ```rust
//! use brrtrouter_body::dispatcher::Decoder;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct NewPet {
//!     name: String,
//! }
//!
//! let decoder = Decoder::with_json();
//! let request = http::Request::builder()
//!     .header("Content-Type", "application/json")
//!     .body(())
//!     .unwrap();
//!
//! let mut pet = NewPet { name: String::new() };
//! decoder
//!     .decode(&request, &br#"{"name":"Fluffy"}"#[..], &mut pet)
//!     .unwrap();
//! assert_eq!(pet.name, "Fluffy");
//! ```

mod core;

pub use self::core::{decode, default_decoder, register, CodecRegistry, ContentTypeSource, Decoder};
