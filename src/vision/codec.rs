// ABOUTME: ImageCodec is the opaque decode/encode capability the core consumes
// ABOUTME: implemented in memory, so no scratch file or file mutex exists (see DESIGN.md)

use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid image")]
    Decode(#[from] image::ImageError),
    #[error("failed to encode output image: {0}")]
    Encode(String),
}

/// Decodes a byte buffer into a raster and re-encodes a raster back into
/// bytes in the same format. The reference implementation stages both
/// directions through an on-disk scratch file because its codec library
/// only exposes a file-path API; this adapter instead decodes and encodes
/// entirely in memory (§9 of the spec explicitly invites this), so the
/// file mutex has no synchronization role to play here.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError>;
    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, CodecError>;
}

/// The production codec: JPEG in, JPEG out, backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        Ok(image::load_from_memory(bytes)?)
    }

    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);
        image
            .write_to(&mut cursor, image::ImageFormat::Jpeg)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_garbage_bytes() {
        let codec = JpegCodec;
        assert!(codec.decode(b"not an image").is_err());
    }

    #[test]
    fn round_trips_a_solid_image() {
        let codec = JpegCodec;
        let image = DynamicImage::new_rgb8(16, 16);
        let encoded = codec.encode(&image).unwrap();
        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 16);
    }
}
