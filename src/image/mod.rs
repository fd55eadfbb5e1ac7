//! Image format conversion
//!
//! Conversion shells out to whatever native tool the platform provides and
//! always degrades to the original bytes.

pub mod convert;

pub use convert::{ConversionResult, ConversionTool, ConvertError, ImageConverter, SaveFormat};
