//! Lazy, self-describing variant values over the GVariant serialisation
//! format.
//!
//! A [`Variant`] is an immutable typed value. It is held either as a tree of
//! child values or as a buffer of serialised bytes, and converts between the
//! two on demand: building a value is cheap, loading serialised bytes does
//! no parsing up front, and children of a serialised container are views
//! into their parent's buffer.
//!
//! # Quick Start
//!
//! ```rust
//! use variant_core::{LoadFlags, Variant, VariantType};
//!
//! // Build a value from parts
//! let value = Variant::new_tuple([
//!     Variant::from_i32(7),
//!     Variant::new_string("seven").unwrap(),
//! ]);
//! assert_eq!(value.type_string(), "(is)");
//!
//! // Serialise it
//! let bytes = value.get_data();
//!
//! // Load it back; untrusted bytes are read lazily and safely
//! let ty = VariantType::new("(is)").unwrap();
//! let loaded = Variant::load(&ty, &bytes, LoadFlags::new());
//! assert_eq!(loaded.get_child_value(1).get_str(), "seven");
//! assert_eq!(loaded, value);
//! assert_eq!(loaded.to_string(), "(7, 'seven')");
//! ```
//!
//! # Modules
//!
//! - [`model`]: Types, type layouts, values, builder and iteration
//! - [`codec`]: Framing offsets, slicing, serialising and byteswapping
//! - [`validate`]: Normal-form checks
//! - [`util`]: Shared byte buffers and the zero pool
//! - [`error`]: Error types
//! - [`limits`]: Depth and size limits
//!
//! # Security
//!
//! Loading never fails and never reads out of bounds:
//! - Children whose framing is invalid read as zeros of the right size
//! - Offsets are bounds-checked with overflow-safe arithmetic
//! - Nesting is limited to [`limits::MAX_RECURSION_DEPTH`]
//!
//! Whether data was in normal form is reported by [`Variant::is_normal`];
//! [`Variant::get_normal_form`] rebuilds it when it was not.

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use error::{BuilderError, TypeError, ValueError};
pub use model::{
    ByteOrder, Conditions, ContainerClass, LoadFlags, TypeInfo, Variant, VariantBuilder, VariantClass,
    VariantIter, VariantType,
};
pub use util::bytes::ReleaseFn;
pub use util::VariantBytes;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
