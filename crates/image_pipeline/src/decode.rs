use bytes::Bytes;
use image::load_from_memory;

use crate::error::PipelineError;

/// Decoded RGBA8 pixels, ready for upload into the texture store.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

/// Decode arbitrary image bytes into RGBA8.
///
/// The format is sniffed from the content, never from the URI the bytes
/// came from, so a PNG served with a `.gif` name still decodes. Runs on a
/// blocking worker; callers must not invoke it from the render loop.
pub(crate) fn decode_rgba8(bytes: &[u8], max_dimension: u32) -> Result<DecodedImage, PipelineError> {
    let image = load_from_memory(bytes).map_err(|err| PipelineError::Decode(err.to_string()))?;
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(PipelineError::Decode("image has a zero dimension".to_owned()));
    }
    if width > max_dimension || height > max_dimension {
        return Err(PipelineError::Decode(format!(
            "image {width}x{height} exceeds the {max_dimension}px decode limit"
        )));
    }
    Ok(DecodedImage {
        width,
        height,
        pixels: Bytes::from(image.to_rgba8().into_raw()),
    })
}
