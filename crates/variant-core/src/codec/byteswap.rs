//! Byte-order conversion of serialised values.
//!
//! Only multi-byte numbers change; framing offsets are always little-endian
//! and strings have no byte order, so container layout is identical before
//! and after a swap.

use crate::codec::value::{get_child, n_children, ChildSlice, Serialised};
use crate::model::{TypeInfo, VariantClass};

/// Reverses the byte order of every number inside `data`, in place.
///
/// Children with invalid framing are left alone; they read as zeros either
/// way.
pub fn byteswap_in_place(info: &TypeInfo, data: &mut [u8], depth: usize) {
    if !info.has_byte_order() {
        return;
    }

    if !info.is_container() {
        if info.fixed_size() == Some(data.len()) {
            data.reverse();
        }
        return;
    }

    if info.class() == VariantClass::Array {
        let element = info.element();
        if let Some(size) = element.fixed_size() {
            if data.len() % size != 0 {
                return;
            }
            if element.is_container() {
                for chunk in data.chunks_exact_mut(size) {
                    byteswap_in_place(element, chunk, depth + 1);
                }
            } else {
                for chunk in data.chunks_exact_mut(size) {
                    chunk.reverse();
                }
            }
            return;
        }
    }

    // Offsets do not move during a swap, so the layout can be read up front.
    let children: Vec<ChildSlice> = {
        let s = Serialised::new(info, data, depth);
        (0..n_children(s)).map(|i| get_child(s, i)).collect()
    };
    for child in children {
        if let Some(range) = child.range {
            byteswap_in_place(&child.info, &mut data[range], depth + 1);
        }
    }
}

/// Returns a byteswapped copy of `data`.
pub fn byteswapped(info: &TypeInfo, data: &[u8], depth: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    byteswap_in_place(info, &mut out, depth);
    out
}
