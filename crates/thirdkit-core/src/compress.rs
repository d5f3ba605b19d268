use image::codecs::jpeg::JpegEncoder;

use crate::errors::ThirdError;

/// Images larger than this are recompressed before sharing.
pub const IMAGE_CEILING: usize = 25 * 1024 * 1024;
/// Link thumbnail limit.
pub const LINK_THUMB_CEILING: usize = 32 * 1024;
/// Mini-program preview image limit.
pub const MINI_PROGRAM_THUMB_CEILING: usize = 128 * 1024;

/// JPEG quality ladder, in percent: 90, 70, 50, 30, 10, 0.
const START_QUALITY: u8 = 90;
const QUALITY_STEP: u8 = 20;

/// Lossy recompression of image payloads.
pub trait ImageCompressor: Send + Sync {
    /// Re-encode `source` until it fits in `ceiling` bytes or the quality floor is reached.
    fn compress_under(&self, source: &[u8], ceiling: usize) -> Result<Vec<u8>, ThirdError>;
}

/// Walk the quality ladder, calling `encode` with each quality until the
/// output fits in `ceiling`.
///
/// `encode` runs at most six times. If the output at quality 0 still does not
/// fit, the result is [`ThirdError::ResourceTooLarge`].
pub fn descend_quality<F>(ceiling: usize, mut encode: F) -> Result<Vec<u8>, ThirdError>
where
    F: FnMut(u8) -> Result<Vec<u8>, ThirdError>,
{
    let mut quality = START_QUALITY;
    loop {
        let data = encode(quality)?;
        if data.len() <= ceiling {
            tracing::debug!("compressed to {} bytes at quality {quality}", data.len());
            return Ok(data);
        }
        if quality == 0 {
            return Err(ThirdError::ResourceTooLarge {
                size: data.len(),
                ceiling,
            });
        }
        quality = quality.saturating_sub(QUALITY_STEP);
    }
}

/// Decodes any format the `image` crate recognizes and re-encodes as JPEG.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegCompressor;

impl ImageCompressor for JpegCompressor {
    fn compress_under(&self, source: &[u8], ceiling: usize) -> Result<Vec<u8>, ThirdError> {
        let rgb = image::load_from_memory(source)?.to_rgb8();
        descend_quality(ceiling, |quality| {
            let mut out = Vec::new();
            {
                // The encoder rejects quality 0.
                let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.max(1));
                encoder.encode_image(&rgb)?;
            }
            Ok(out)
        })
    }
}
