use crate::{Error, Result};
use flate2::write::GzEncoder;
use std::fmt;
use std::io::Write;

/// Compresses encoded request bodies.
pub trait Compression: Send + Sync + fmt::Debug {
    /// The `Content-Encoding` token for this compression.
    fn content_encoding(&self) -> &'static str;

    /// Compresses `data`.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Gzip compression at a configurable level (0-9, default 6).
#[derive(Debug, Clone, Copy)]
pub struct GzipCompression {
    level: u32,
}

impl GzipCompression {
    /// Creates a gzip compressor with the given level, clamped to 9.
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }
}

impl Default for GzipCompression {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compression for GzipCompression {
    fn content_encoding(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| Error::SerializationFailed(format!("Gzip compression failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| Error::SerializationFailed(format!("Gzip finalization failed: {}", e)))
    }
}
