use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::models::{SourceExtension, VariantRequest};

/// Human-readable form of the accepted key grammar, echoed back on rejection.
pub const KEY_FORM: &str = "[WIDTHxHEIGHT/]PATH.(png|jpg|jpeg|tif|tiff|webp)";

// Optional leading `WxH/`, `Wx/`, `W/` or `xH/` segment, then the original key
// ending in a recognized extension.
static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?P<dims>\d+x\d+|\d+x?|x\d+)/)?(?P<original>.+\.(?P<ext>png|jpe?g|tiff?|webp))$",
    )
    .expect("key pattern is a valid regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Key does not exists.")]
    MissingKey,

    #[error("Key does not match form: {KEY_FORM}")]
    MalformedKey,
}

/// Parse a requested variant key such as `300x200/photos/cat.jpg`.
pub fn parse_variant_key(raw: Option<&str>) -> Result<VariantRequest, ParseError> {
    let key = match raw {
        Some(key) if !key.is_empty() => key,
        _ => return Err(ParseError::MissingKey),
    };

    let captures = KEY_PATTERN.captures(key).ok_or(ParseError::MalformedKey)?;

    let original_key = captures["original"].to_string();
    let original_extension =
        SourceExtension::from_extension(&captures["ext"]).ok_or(ParseError::MalformedKey)?;

    let dimension_spec = captures.name("dims").map(|m| m.as_str().to_string());
    let (requested_width, requested_height) = match dimension_spec.as_deref() {
        Some(dims) => split_dimensions(dims)?,
        None => (None, None),
    };

    Ok(VariantRequest {
        dimension_spec,
        requested_width,
        requested_height,
        original_key,
        original_extension,
        variant_key: key.to_string(),
    })
}

fn split_dimensions(dims: &str) -> Result<(Option<u32>, Option<u32>), ParseError> {
    let (width, height) = dims
        .split_once(['x', 'X'])
        .unwrap_or((dims, ""));

    Ok((parse_dimension(width)?, parse_dimension(height)?))
}

fn parse_dimension(digits: &str) -> Result<Option<u32>, ParseError> {
    if digits.is_empty() {
        return Ok(None);
    }

    match digits.parse::<u32>() {
        Ok(0) | Err(_) => Err(ParseError::MalformedKey),
        Ok(value) => Ok(Some(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(key: &str) -> Result<VariantRequest, ParseError> {
        parse_variant_key(Some(key))
    }

    #[test]
    fn full_dimensions() {
        let req = parse("300x200/photo.jpg").unwrap();
        assert_eq!(req.dimension_spec.as_deref(), Some("300x200"));
        assert_eq!(req.requested_width, Some(300));
        assert_eq!(req.requested_height, Some(200));
        assert_eq!(req.original_key, "photo.jpg");
        assert_eq!(req.original_extension, SourceExtension::Jpg);
        assert_eq!(req.variant_key, "300x200/photo.jpg");
    }

    #[test]
    fn width_only_with_and_without_separator() {
        let req = parse("300x/photo.png").unwrap();
        assert_eq!(req.dimension_spec.as_deref(), Some("300x"));
        assert_eq!((req.requested_width, req.requested_height), (Some(300), None));

        let req = parse("300/photo.png").unwrap();
        assert_eq!(req.dimension_spec.as_deref(), Some("300"));
        assert_eq!((req.requested_width, req.requested_height), (Some(300), None));
    }

    #[test]
    fn height_only() {
        let req = parse("x200/photo.jpg").unwrap();
        assert_eq!(req.dimension_spec.as_deref(), Some("x200"));
        assert_eq!((req.requested_width, req.requested_height), (None, Some(200)));
    }

    #[test]
    fn no_dimension_segment() {
        let req = parse("albums/2024/photo.webp").unwrap();
        assert_eq!(req.dimension_spec, None);
        assert_eq!((req.requested_width, req.requested_height), (None, None));
        assert_eq!(req.original_key, "albums/2024/photo.webp");
        assert_eq!(req.original_extension, SourceExtension::Webp);
    }

    #[test]
    fn nested_original_key_keeps_path() {
        let req = parse("640x480/albums/summer/beach.tiff").unwrap();
        assert_eq!(req.original_key, "albums/summer/beach.tiff");
        assert_eq!(req.original_extension, SourceExtension::Tiff);
    }

    #[test]
    fn extension_is_case_insensitive_and_lowercased() {
        let req = parse("100x100/IMG_0001.JPEG").unwrap();
        assert_eq!(req.original_extension, SourceExtension::Jpeg);
        assert_eq!(req.original_key, "IMG_0001.JPEG");
        assert_eq!(req.original_extension.as_str(), "jpeg");
    }

    #[test]
    fn bare_x_is_part_of_the_original_key() {
        let req = parse("x/photo.jpg").unwrap();
        assert_eq!(req.dimension_spec, None);
        assert_eq!(req.original_key, "x/photo.jpg");
    }

    #[test]
    fn missing_key() {
        assert_eq!(parse_variant_key(None), Err(ParseError::MissingKey));
        assert_eq!(parse_variant_key(Some("")), Err(ParseError::MissingKey));
    }

    #[test]
    fn unrecognized_extension_is_malformed() {
        assert_eq!(parse("abc/photo.bmp"), Err(ParseError::MalformedKey));
        assert_eq!(parse("300x200/photo"), Err(ParseError::MalformedKey));
        assert_eq!(parse("300x200/.jpg.txt"), Err(ParseError::MalformedKey));
    }

    #[test]
    fn degenerate_dimensions_are_malformed() {
        assert_eq!(parse("0x200/photo.jpg"), Err(ParseError::MalformedKey));
        assert_eq!(parse("300x0/photo.jpg"), Err(ParseError::MalformedKey));
        assert_eq!(parse("99999999999x1/photo.jpg"), Err(ParseError::MalformedKey));
    }

    #[test]
    fn malformed_message_names_the_form() {
        assert_eq!(
            ParseError::MalformedKey.to_string(),
            format!("Key does not match form: {}", KEY_FORM)
        );
    }
}
