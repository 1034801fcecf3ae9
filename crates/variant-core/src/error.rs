//! Error types for type strings, value construction and the builder.
//!
//! Malformed serialised data is never an error: it is handled by
//! substituting zero-filled children and reported through
//! [`Variant::is_normal`](crate::Variant::is_normal). Programmer-contract
//! violations (wrong accessor, index out of range) panic.

use thiserror::Error;

use crate::model::VariantType;

/// Error while parsing a type string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("empty type string")]
    Empty,

    #[error("unexpected character {found:?} at position {pos}")]
    UnexpectedChar { pos: usize, found: char },

    #[error("type string ends inside a container")]
    Incomplete,

    #[error("trailing data after complete type at position {pos}")]
    TrailingData { pos: usize },

    #[error("dictionary entry key at position {pos} is not a basic type")]
    NonBasicDictKey { pos: usize },

    #[error("type nesting exceeds maximum depth {max}")]
    TooDeep { max: usize },

    #[error("type string length {len} exceeds maximum {max}")]
    TooLong { len: usize, max: usize },
}

/// Error while constructing a basic value from caller-supplied data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("string contains an interior NUL byte at position {pos}")]
    InteriorNul { pos: usize },

    #[error("invalid D-Bus object path: {path:?}")]
    InvalidObjectPath { path: String },

    #[error("invalid type signature: {signature:?}")]
    InvalidSignature { signature: String },
}

/// Error from incremental container construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("{container} holds at most {max} children")]
    TooMany { container: VariantType, max: usize },

    #[error("{container} needs at least {min} children, found {found}")]
    TooFew {
        container: VariantType,
        min: usize,
        found: usize,
    },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: VariantType,
        found: VariantType,
    },

    #[error("cannot infer a definite type for {container}")]
    CannotInferType { container: VariantType },

    #[error("{0} is not a container type")]
    NotAContainer(VariantType),

    #[error("close without a matching open")]
    NoOpenContainer,

    #[error("{open} nested containers are still open")]
    UnclosedContainers { open: usize },
}
