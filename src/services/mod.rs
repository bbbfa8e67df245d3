pub mod image;
pub mod key_parser;
pub mod materializer;
pub mod planner;
pub mod policy;

pub use materializer::VariantMaterializer;
pub use planner::ResizePlanner;
