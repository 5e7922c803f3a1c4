use image::{GrayImage, ImageBuffer, Luma, RgbImage, imageops};
use ndarray::Array3;

use super::config::{ChannelMode, PreprocessConfig};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Image payload is empty")]
    Empty,
    #[error("Unparseable image: {0}")]
    Malformed(#[from] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Decoded image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Decodes an uploaded PNG/JPEG payload into 8-bit RGB, whatever the source color type.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let image = image::load_from_memory(bytes)?;
    Ok(image.to_rgb8())
}

/// Produces the `C×H×W` network input: channel reduction, resize, scale to `[0,1]`, then
/// per-channel `(x - mean) / std`.
pub fn normalize(image: &RgbImage, config: &PreprocessConfig) -> Result<Array3<f32>, NormalizeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(NormalizeError::EmptyImage { width, height });
    }

    let filter = config.resize_filter.into();
    let tensor = match config.channels {
        ChannelMode::Rgb => {
            let resized = imageops::resize(image, config.width, config.height, filter);
            standardize(resized.as_raw(), config)
        }
        ChannelMode::Grayscale => {
            // Luma is taken from the RGB decode; the weights were trained on that path.
            let gray = to_luma(image);
            let resized = imageops::resize(&gray, config.width, config.height, filter);
            standardize(resized.as_raw(), config)
        }
    };
    Ok(tensor)
}

/// ITU-R 601-2 luma in 16-bit fixed point.
fn to_luma(image: &RgbImage) -> GrayImage {
    ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16;
        Luma([luma as u8])
    })
}

fn standardize(interleaved: &[u8], config: &PreprocessConfig) -> Array3<f32> {
    let channels = config.channels.count();
    let (height, width) = (config.height as usize, config.width as usize);
    Array3::from_shape_fn((channels, height, width), |(c, y, x)| {
        let value = f32::from(interleaved[(y * width + x) * channels + c]) / 255.0;
        (value - config.mean[c]) / config.std[c]
    })
}
