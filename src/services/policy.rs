use std::collections::HashSet;
use thiserror::Error;

use crate::models::VariantRequest;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Not supported image dimensions.")]
    DimensionNotAllowed,

    #[error("Not supported image extension.")]
    ExtensionNotAllowed,
}

/// Check a parsed request against the configured allow-lists.
///
/// An empty list admits everything. When the dimension list is non-empty a
/// request without a dimension segment is rejected, since no token can match.
pub fn check(
    req: &VariantRequest,
    allowed_dimensions: &HashSet<String>,
    allowed_extensions: &HashSet<String>,
) -> Result<(), PolicyError> {
    if !allowed_dimensions.is_empty() {
        let allowed = req
            .dimension_spec
            .as_deref()
            .is_some_and(|dims| allowed_dimensions.contains(dims));

        if !allowed {
            tracing::debug!(
                "Dimension {:?} rejected for key {}",
                req.dimension_spec,
                req.variant_key
            );
            return Err(PolicyError::DimensionNotAllowed);
        }
    }

    if !allowed_extensions.is_empty() && !allowed_extensions.contains(req.original_extension.as_str())
    {
        tracing::debug!(
            "Extension {} rejected for key {}",
            req.original_extension.as_str(),
            req.variant_key
        );
        return Err(PolicyError::ExtensionNotAllowed);
    }

    Ok(())
}
