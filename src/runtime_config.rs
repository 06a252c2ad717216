//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for body decoding.
//!
//! ## Environment Variables
//!
//! ### `BRRTR_MAX_BODY_BYTES`
//!
//! Maximum number of body bytes a decode may consume. Accepts values in:
//! - Decimal: `1048576` (1 MiB)
//! - Hexadecimal: `0x100000` (1 MiB)
//!
//! `0` disables the limit. Unparsable values fall back to the default.
//!
//! Default: `0x100000` (1 MiB)
//!
//! ## Usage
//!
//! ```rust
//! use brrtrouter_body::runtime_config::BodyConfig;
//!
//! let config = BodyConfig::from_env();
//! let body = config.limit(&b"{}"[..]);
//! # let _ = body;
//! ```

use crate::limit::LimitedReader;
use std::env;
use std::io::Read;

/// Environment variable holding the body size limit.
pub const MAX_BODY_BYTES_ENV: &str = "BRRTR_MAX_BODY_BYTES";

/// Default body size limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: u64 = 0x100000;

/// Body decoding configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyConfig {
    /// Maximum body size in bytes; `None` means unlimited
    pub max_body_bytes: Option<u64>,
}

impl Default for BodyConfig {
    fn default() -> Self {
        BodyConfig {
            max_body_bytes: Some(DEFAULT_MAX_BODY_BYTES),
        }
    }
}

impl BodyConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        match env::var(MAX_BODY_BYTES_ENV) {
            Ok(val) => Self::from_value(&val),
            Err(_) => Self::default(),
        }
    }

    /// Build a configuration from a raw `BRRTR_MAX_BODY_BYTES` value.
    #[must_use]
    pub fn from_value(val: &str) -> Self {
        let val = val.trim();
        let parsed = if let Some(hex) = val.strip_prefix("0x") {
            u64::from_str_radix(hex, 16).ok()
        } else {
            val.parse().ok()
        };
        let max_body_bytes = match parsed {
            Some(0) => None,
            Some(n) => Some(n),
            None => Some(DEFAULT_MAX_BODY_BYTES),
        };
        BodyConfig { max_body_bytes }
    }

    /// Wrap a body stream so it fails once the configured limit is exceeded.
    #[must_use]
    pub fn limit<R: Read>(&self, body: R) -> LimitedReader<R> {
        LimitedReader::new(body, self.max_body_bytes)
    }
}
