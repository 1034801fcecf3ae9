//! Serialised-form layout: framing offsets, container slicing and
//! serialising, and byte-order conversion.
//!
//! Everything here works on plain byte slices plus [`TypeInfo`]; the
//! lazily-converting value type lives in [`crate::model`].
//!
//! [`TypeInfo`]: crate::model::TypeInfo

pub mod byteswap;
pub mod primitives;
pub mod value;

pub use byteswap::{byteswap_in_place, byteswapped};
pub use primitives::{offset_size, read_offset, total_size, write_offset};
pub use value::{get_child, n_children, needed_size, serialise, ChildSlice, SerialiseSource, Serialised};
