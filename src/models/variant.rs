use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Extensions an original key may end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceExtension {
    Png,
    Jpg,
    Jpeg,
    Tif,
    Tiff,
    Webp,
}

impl SourceExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceExtension::Png => "png",
            SourceExtension::Jpg => "jpg",
            SourceExtension::Jpeg => "jpeg",
            SourceExtension::Tif => "tif",
            SourceExtension::Tiff => "tiff",
            SourceExtension::Webp => "webp",
        }
    }

    /// Case-insensitive lookup, without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(SourceExtension::Png),
            "jpg" => Some(SourceExtension::Jpg),
            "jpeg" => Some(SourceExtension::Jpeg),
            "tif" => Some(SourceExtension::Tif),
            "tiff" => Some(SourceExtension::Tiff),
            "webp" => Some(SourceExtension::Webp),
            _ => None,
        }
    }

    /// The encoding that reproduces this extension as-is.
    pub fn native_format(&self) -> OutputFormat {
        match self {
            SourceExtension::Png => OutputFormat::Png,
            SourceExtension::Jpg | SourceExtension::Jpeg => OutputFormat::Jpeg,
            SourceExtension::Tif | SourceExtension::Tiff => OutputFormat::Tiff,
            SourceExtension::Webp => OutputFormat::WebP,
        }
    }
}

/// Parsed form of one requested variant key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRequest {
    /// Raw dimension token as it appeared in the key, e.g. `300x200` or `x200`.
    pub dimension_spec: Option<String>,
    pub requested_width: Option<u32>,
    pub requested_height: Option<u32>,
    pub original_key: String,
    pub original_extension: SourceExtension,
    pub variant_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    WebP,
    Png,
    Tiff,
}

impl OutputFormat {
    pub const QUALITY: u8 = 90;

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Png => "image/png",
            OutputFormat::Tiff => "image/tiff",
        }
    }
}

/// Width and height read from a decoded original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizePlan {
    pub target_width: u32,
    pub target_height: u32,
    pub output_format: OutputFormat,
    /// Storage key of the variant. Differs from the requested key when WebP
    /// was substituted through content negotiation.
    pub variant_key: String,
}

impl ResizePlan {
    pub fn content_type(&self) -> &'static str {
        self.output_format.content_type()
    }
}

/// Permanent redirect to a stored variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRedirect {
    pub variant_key: String,
    pub location: String,
}

impl IntoResponse for VariantRedirect {
    fn into_response(self) -> Response {
        // axum's Redirect::permanent is a 308; callers expect a 301
        (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, self.location)]).into_response()
    }
}
