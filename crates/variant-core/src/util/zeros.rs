//! Shared zero-filled buffers.
//!
//! Children whose framing is invalid, and fixed-size values loaded with the
//! wrong length, read as zeros. Those zeros come from a process-wide pool
//! of immutable buffers, one per power-of-two size class, so substitution
//! never allocates per value.

use std::collections::BTreeMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::limits::ZERO_POOL_MIN;
use crate::util::bytes::{Storage, VariantBytes};

lazy_static! {
    static ref ZERO_POOL: Mutex<BTreeMap<usize, Arc<Storage>>> = Mutex::new(BTreeMap::new());
}

/// Returns `size` zero bytes backed by the shared pool.
pub fn zeros(size: usize) -> VariantBytes {
    let Some(class) = size.max(ZERO_POOL_MIN).checked_next_power_of_two() else {
        return VariantBytes::from_vec(vec![0; size]);
    };
    let storage = Arc::clone(
        ZERO_POOL
            .lock()
            .entry(class)
            .or_insert_with(|| Arc::new(Storage::Owned(vec![0; class]))),
    );
    VariantBytes::from_storage(storage, size)
}
