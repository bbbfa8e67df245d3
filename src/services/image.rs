use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;

use crate::models::{ImageMeta, OutputFormat, ResizePlan};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to read image format: {0}")]
    Format(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode {format:?}: {message}")]
    Encode { format: OutputFormat, message: String },

    #[error("Image task failed: {0}")]
    Task(String),
}

pub struct DecodedImage {
    pub image: DynamicImage,
    pub meta: ImageMeta,
}

/// Decode an original, sniffing the format from its bytes.
pub fn decode(data: &[u8]) -> Result<DecodedImage, CodecError> {
    let image = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()
        .map_err(CodecError::Decode)?;

    let meta = ImageMeta {
        width: image.width(),
        height: image.height(),
    };

    Ok(DecodedImage { image, meta })
}

/// Scale to cover `width` x `height`, then crop anchored at the top center.
pub fn resize_to_fill(image: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.width() == width && image.height() == height {
        return image;
    }

    let scale = f64::max(
        width as f64 / image.width() as f64,
        height as f64 / image.height() as f64,
    );
    let scaled_width = ((image.width() as f64 * scale).ceil() as u32).max(width);
    let scaled_height = ((image.height() as f64 * scale).ceil() as u32).max(height);

    tracing::debug!(
        "Resizing image from {}x{} to {}x{} (crop {}x{})",
        image.width(),
        image.height(),
        scaled_width,
        scaled_height,
        width,
        height
    );

    let resized = image.resize_exact(scaled_width, scaled_height, FilterType::Lanczos3);
    let x = (scaled_width - width) / 2;
    resized.crop_imm(x, 0, width, height)
}

pub fn encode(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::new();
    let encode_error = |message: String| CodecError::Encode { format, message };

    match format {
        OutputFormat::Jpeg => {
            // The image crate's baseline encoder samples every component at
            // full resolution, i.e. 4:4:4.
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, OutputFormat::QUALITY);
            encoder
                .encode_image(&image.to_rgb8())
                .map_err(|e| encode_error(e.to_string()))?;
        }
        OutputFormat::WebP => {
            let rgba = image.to_rgba8();
            let encoded = webp::Encoder::from_rgba(&rgba, rgba.width(), rgba.height())
                .encode(OutputFormat::QUALITY as f32);
            buffer.extend_from_slice(&encoded);
        }
        OutputFormat::Png => {
            image
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| encode_error(e.to_string()))?;
        }
        OutputFormat::Tiff => {
            image
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Tiff)
                .map_err(|e| encode_error(e.to_string()))?;
        }
    }

    Ok(buffer)
}

/// Resize and encode a decoded original according to `plan`.
pub fn render(image: DynamicImage, plan: &ResizePlan) -> Result<Vec<u8>, CodecError> {
    let resized = resize_to_fill(image, plan.target_width, plan.target_height);
    encode(&resized, plan.output_format)
}
