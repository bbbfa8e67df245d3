use thiserror::Error;

use crate::models::{ImageMeta, OutputFormat, ResizePlan, SourceExtension, VariantRequest};

/// Upper bound for either side of a generated variant.
pub const MAX_DIMENSION: u32 = 5000;

// Absorbs float error so that e.g. 1500 * (1000 / 1500) floors to 1000.
const EPSILON: f64 = 1e-6;

/// How the output encoding is chosen when the client does not take WebP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatPolicy {
    /// Always transcode to JPEG.
    #[default]
    ForceJpeg,
    /// Keep the original's encoding.
    PreserveOriginal,
}

impl FormatPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatPolicy::ForceJpeg => "jpeg",
            FormatPolicy::PreserveOriginal => "original",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(FormatPolicy::ForceJpeg),
            "original" | "preserve" => Some(FormatPolicy::PreserveOriginal),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Invalid image metadata: {width}x{height}")]
    InvalidMetadata { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResizePlanner {
    format_policy: FormatPolicy,
}

impl ResizePlanner {
    pub fn new(format_policy: FormatPolicy) -> Self {
        Self { format_policy }
    }

    /// Output encoding and storage key for a request. Independent of the
    /// original's pixels, so it can be decided before anything is fetched.
    pub fn output_for(&self, req: &VariantRequest, accepts_webp: bool) -> (OutputFormat, String) {
        if accepts_webp {
            let key = if req.original_extension == SourceExtension::Webp {
                req.variant_key.clone()
            } else {
                with_extension(&req.variant_key, SourceExtension::Webp.as_str())
            };
            return (OutputFormat::WebP, key);
        }

        let format = match self.format_policy {
            FormatPolicy::ForceJpeg => OutputFormat::Jpeg,
            FormatPolicy::PreserveOriginal => req.original_extension.native_format(),
        };

        (format, req.variant_key.clone())
    }

    pub fn plan(
        &self,
        req: &VariantRequest,
        meta: ImageMeta,
        accepts_webp: bool,
    ) -> Result<ResizePlan, PlanError> {
        let (target_width, target_height) =
            target_dimensions(req.requested_width, req.requested_height, meta)?;
        let (output_format, variant_key) = self.output_for(req, accepts_webp);

        Ok(ResizePlan {
            target_width,
            target_height,
            output_format,
            variant_key,
        })
    }
}

/// Final size for a request against an original of `meta` size.
///
/// The requested box is completed from the original aspect ratio when one
/// side is missing, then scaled down uniformly until it fits inside both the
/// original and `MAX_DIMENSION`. Explicit `WxH` therefore keeps its own ratio.
fn target_dimensions(
    requested_width: Option<u32>,
    requested_height: Option<u32>,
    meta: ImageMeta,
) -> Result<(u32, u32), PlanError> {
    if meta.width == 0 || meta.height == 0 {
        return Err(PlanError::InvalidMetadata {
            width: meta.width,
            height: meta.height,
        });
    }

    let (orig_w, orig_h) = (meta.width as f64, meta.height as f64);
    let ratio = orig_w / orig_h;

    let (width, height) = match (requested_width, requested_height) {
        (Some(w), Some(h)) => (w as f64, h as f64),
        (Some(w), None) => (w as f64, w as f64 / ratio),
        // Requested height wins; width follows the original ratio.
        (None, Some(h)) => (h as f64 * ratio, h as f64),
        (None, None) => (orig_w, orig_h),
    };

    let max = MAX_DIMENSION as f64;
    let scale = 1f64
        .min(orig_w / width)
        .min(orig_h / height)
        .min(max / width)
        .min(max / height);

    let target_width = to_pixels(width * scale, meta.width);
    let target_height = to_pixels(height * scale, meta.height);

    Ok((target_width, target_height))
}

fn to_pixels(value: f64, original: u32) -> u32 {
    let floored = (value + EPSILON).floor() as u32;
    floored.min(original).min(MAX_DIMENSION).max(1)
}

fn with_extension(key: &str, extension: &str) -> String {
    match key.rfind('.') {
        Some(dot) => format!("{}.{}", &key[..dot], extension),
        None => format!("{}.{}", key, extension),
    }
}
