//! Byte storage shared between values.

pub mod bytes;
pub mod zeros;

pub use bytes::VariantBytes;
pub use zeros::zeros;
