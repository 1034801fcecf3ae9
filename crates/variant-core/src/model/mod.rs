//! Data model: types, type layouts and values.
//!
//! - [`ty`]: type strings and their classes
//! - [`type_info`]: cached layout facts per type
//! - [`value`]: the value handle and its condition-driven representation
//! - [`condition`]: condition bits and the rules relating them
//! - [`scalar`]: constructors and getters
//! - [`builder`]: incremental container construction
//! - [`iter`]: child iteration
//! - [`format`]: text notation

pub mod builder;
pub mod condition;
mod enable;
pub mod format;
pub mod iter;
pub mod scalar;
pub mod ty;
pub mod type_info;
pub mod value;

pub use builder::{ContainerClass, VariantBuilder};
pub use condition::Conditions;
pub use iter::VariantIter;
pub use ty::{VariantClass, VariantType};
pub use type_info::TypeInfo;
pub use value::{ByteOrder, LoadFlags, Variant};
