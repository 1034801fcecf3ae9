//! Limits applied to type strings and serialised data.
//!
//! Untrusted data can nest variants inside variants; these bounds keep
//! every recursive walk (normal-form check, byteswap, deep copy) within a
//! bounded stack depth.

/// Maximum nesting of containers, counting each boxed variant as a level.
pub const MAX_RECURSION_DEPTH: usize = 128;

/// Maximum length of a single type string.
pub const MAX_TYPE_STRING_LEN: usize = 255 * 4;

/// Smallest zero-filled buffer kept in the shared pool.
pub const ZERO_POOL_MIN: usize = 4096;

/// Number of cached type entries after which dead entries are pruned.
pub const TYPE_INFO_PRUNE_THRESHOLD: usize = 1024;
