use std::io::Read;

use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::errors::DecompressError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression formats recognised by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Uncompressed,
}

/// Magic byte detection and whole-payload decompression
pub struct DecompressionService;

impl DecompressionService {
    /// Detect compression format using magic bytes
    pub fn detect_compression_format(data: &[u8]) -> CompressionFormat {
        if data.starts_with(&GZIP_MAGIC) {
            CompressionFormat::Gzip
        } else {
            CompressionFormat::Uncompressed
        }
    }

    /// Return the decompressed payload, or the input untouched when it is not gzip
    pub fn maybe_decompress(data: Bytes) -> Result<Bytes, DecompressError> {
        match Self::detect_compression_format(&data) {
            CompressionFormat::Gzip => {
                let decompressed = Self::decompress_gzip(&data)?;
                debug!(
                    "Decompressed gzip payload: {} bytes -> {} bytes",
                    data.len(),
                    decompressed.len()
                );
                Ok(Bytes::from(decompressed))
            }
            CompressionFormat::Uncompressed => Ok(data),
        }
    }

    /// Decompress every gzip member in the payload
    fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>, DecompressError> {
        let mut decoder = MultiGzDecoder::new(data);
        let mut decompressed = Vec::with_capacity(data.len() * 4);
        decoder
            .read_to_end(&mut decompressed)
            .map_err(DecompressError::Gzip)?;
        Ok(decompressed)
    }
}
