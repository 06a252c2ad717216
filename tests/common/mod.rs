#![allow(dead_code)]

pub mod logging {
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();

    /// Install a test-writer subscriber once per test binary.
    ///
    /// Set `RUST_LOG=brrtrouter_body=debug` to see codec selection and
    /// rejection events in failing tests.
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });
    }
}

pub mod codecs {
    use brrtrouter_body::{Codec, DecodeError, Destination, MediaType};
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Codec that accepts one media type essence and counts its calls.
    #[derive(Debug)]
    pub struct RecordingCodec {
        pub name: String,
        pub essence: String,
        pub detects: AtomicUsize,
        pub decodes: AtomicUsize,
    }

    impl RecordingCodec {
        pub fn new(name: &str, essence: &str) -> Arc<Self> {
            Arc::new(RecordingCodec {
                name: name.to_string(),
                essence: essence.to_string(),
                detects: AtomicUsize::new(0),
                decodes: AtomicUsize::new(0),
            })
        }

        pub fn detect_calls(&self) -> usize {
            self.detects.load(Ordering::SeqCst)
        }

        pub fn decode_calls(&self) -> usize {
            self.decodes.load(Ordering::SeqCst)
        }
    }

    impl Codec for RecordingCodec {
        fn name(&self) -> &str {
            &self.name
        }

        fn detect(&self, media_type: &MediaType) -> bool {
            self.detects.fetch_add(1, Ordering::SeqCst);
            media_type.essence_str() == self.essence
        }

        fn decode(
            &self,
            body: &mut dyn Read,
            _media_type: &MediaType,
            _out: &mut dyn Destination,
        ) -> Result<(), DecodeError> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            let mut sink = Vec::new();
            body.read_to_end(&mut sink).map_err(|err| {
                DecodeError::new(brrtrouter_body::ErrorKind::BadRequest, err.to_string())
                    .with_source(err)
            })?;
            Ok(())
        }
    }
}
