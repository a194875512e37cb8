//! Image classification and transform stages.
//!
//! - **eligibility**: Name-based pre-filter (hidden files, metadata folders, extensions)
//! - **decode**: Load and decode images with size guards
//! - **transform**: Aspect-ratio gate and pad-to-canvas JPEG output
//! - **processor**: Runs one file through decode, gate, and transform
//! - **walker**: Applies the processor to every file of an extracted tree

pub mod decode;
pub mod eligibility;
pub mod processor;
pub mod transform;
pub mod walker;

pub use decode::{DecodedImage, ImageDecoder};
pub use eligibility::Eligibility;
pub use processor::ImageProcessor;
pub use transform::{AspectWindow, PadTransform};
pub use walker::BatchWalker;
