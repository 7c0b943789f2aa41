//! Storage codec: gzip, then base64
//!
//! The key/value store only holds strings, so binary documents are compressed and
//! text-encoded before they are written and decoded after they are read back.

use std::io::{self, Cursor, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

/// Errors produced while encoding or decoding a stored payload
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("stored data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("stored data is not a valid gzip stream: {0}")]
    Gzip(#[from] io::Error),
    #[error("could not compress data for storage: {0}")]
    Encode(#[source] io::Error),
}

/// Compress + text-encode pair used for everything written to web storage
#[derive(Debug, Clone, Copy)]
pub struct StorageCodec {
    level: Compression,
}

impl Default for StorageCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl StorageCodec {
    /// Create a codec with the given gzip level (clamped to 0..=9)
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    /// Encode raw bytes into a storable string
    pub fn encode(&self, raw: &[u8]) -> Result<String, CodecError> {
        self.encode_with(|out| out.write_all(raw))
    }

    /// Run `write_task` against a gzip sink and return the base64 text of the result
    pub fn encode_with<F>(&self, write_task: F) -> Result<String, CodecError>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        write_task(&mut encoder).map_err(CodecError::Encode)?;
        let compressed = encoder.finish().map_err(CodecError::Encode)?;
        Ok(STANDARD.encode(compressed))
    }

    /// Decode a stored string back into the original bytes
    pub fn decode(&self, payload: &str) -> Result<Vec<u8>, CodecError> {
        let mut raw = Vec::new();
        self.decode_reader(payload)?.read_to_end(&mut raw)?;
        Ok(raw)
    }

    /// Decode the text layer and hand back a streaming gzip reader.
    ///
    /// Decompression errors surface from the returned reader's `read` calls.
    pub fn decode_reader(&self, payload: &str) -> Result<GzDecoder<Cursor<Vec<u8>>>, CodecError> {
        let compressed = STANDARD.decode(payload)?;
        Ok(GzDecoder::new(Cursor::new(compressed)))
    }
}
