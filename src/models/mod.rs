pub mod variant;

pub use variant::{ImageMeta, OutputFormat, ResizePlan, SourceExtension, VariantRedirect, VariantRequest};
