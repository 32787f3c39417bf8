//! The zlib capability the codec is parameterized over. Cel pixels, tileset
//! strips and tilemap payloads go through this seam; nothing else in the
//! crate touches a compressor directly.

use std::io::Read;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CompressionError(pub String);

/// Injectable `{inflate, deflate}` pair. The default implementation is
/// [`Zlib`]; callers with special needs (dictionaries, hardware offload)
/// supply their own.
pub trait Compression {
    fn inflate(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
    fn deflate(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// flate2-backed zlib streams, the format's native payload encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zlib;

impl Compression for Zlib {
    fn inflate(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CompressionError(e.to_string()))?;
        Ok(out)
    }

    fn deflate(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut encoder =
            flate2::read::ZlibEncoder::new(data, flate2::Compression::default());
        let mut out = Vec::new();
        encoder
            .read_to_end(&mut out)
            .map_err(|e| CompressionError(e.to_string()))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_round_trip() {
        let data = b"the same bytes in, the same bytes out".repeat(8);
        let deflated = Zlib.deflate(&data).unwrap();
        assert!(deflated.len() < data.len());
        assert_eq!(Zlib.inflate(&deflated).unwrap(), data);
    }

    #[test]
    fn inflate_rejects_garbage() {
        assert!(Zlib.inflate(&[0x00, 0x01, 0x02]).is_err());
    }
}
