//! Framing offsets.
//!
//! Variable-sized containers record where their children end using
//! little-endian framing offsets. The width of every offset in a container
//! is chosen from the container's total size, so the same bytes always
//! decode the same way regardless of the byte order of the data they frame.

/// Returns the width in bytes of the framing offsets of a container whose
/// serialised size is `container_size`.
#[inline]
pub fn offset_size(container_size: usize) -> usize {
    if container_size > u32::MAX as usize {
        8
    } else if container_size > u16::MAX as usize {
        4
    } else if container_size > u8::MAX as usize {
        2
    } else if container_size > 0 {
        1
    } else {
        0
    }
}

/// Returns the total size of a container with `body_size` bytes of
/// children followed by `n_offsets` framing offsets of the smallest width
/// that can address the result.
pub fn total_size(body_size: usize, n_offsets: usize) -> usize {
    if body_size + n_offsets <= u8::MAX as usize {
        body_size + n_offsets
    } else if body_size + 2 * n_offsets <= u16::MAX as usize {
        body_size + 2 * n_offsets
    } else if body_size + 4 * n_offsets <= u32::MAX as usize {
        body_size + 4 * n_offsets
    } else {
        body_size + 8 * n_offsets
    }
}

/// Reads a little-endian offset of `size` bytes at `pos`.
///
/// Returns `None` if the offset would extend past the end of `data`.
#[inline]
pub fn read_offset(data: &[u8], pos: usize, size: usize) -> Option<usize> {
    let bytes = data.get(pos..pos.checked_add(size)?)?;
    let mut value: u64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        value |= (*byte as u64) << (8 * i);
    }
    usize::try_from(value).ok()
}

/// Writes `value` as a little-endian offset of `size` bytes at `pos`.
#[inline]
pub fn write_offset(dest: &mut [u8], pos: usize, value: usize, size: usize) {
    let bytes = (value as u64).to_le_bytes();
    dest[pos..pos + size].copy_from_slice(&bytes[..size]);
}

/// Returns true if every byte of `data` is zero.
#[inline]
pub fn is_zeroed(data: &[u8]) -> bool {
    data.iter().all(|b| *b == 0)
}
