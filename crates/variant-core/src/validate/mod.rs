//! Normal-form checks for serialised data.
//!
//! Data in normal form is exactly what the serialiser would produce for the
//! same logical value: minimal framing offsets, zero padding, booleans of 0
//! or 1, NUL-terminated UTF-8 strings and well-formed embedded types. Data
//! that passes [`is_normal`] can be trusted; anything else is read through
//! the tolerant slicing rules in [`crate::codec`].

use crate::codec::primitives::{is_zeroed, offset_size, read_offset, total_size};
use crate::codec::value::{get_child, Serialised};
use crate::limits::MAX_RECURSION_DEPTH;
use crate::model::type_info::align_up;
use crate::model::ty::scan;
use crate::model::VariantClass;

/// Returns true if `s` is in normal form.
pub fn is_normal(s: Serialised<'_>) -> bool {
    if s.depth > MAX_RECURSION_DEPTH {
        return false;
    }
    if let Some(fixed) = s.info.fixed_size() {
        if s.data.len() != fixed {
            return false;
        }
    }

    match s.info.class() {
        VariantClass::Boolean => s.data[0] <= 1,
        VariantClass::Byte
        | VariantClass::Int16
        | VariantClass::Uint16
        | VariantClass::Int32
        | VariantClass::Uint32
        | VariantClass::Int64
        | VariantClass::Uint64
        | VariantClass::Handle
        | VariantClass::Double => true,
        VariantClass::String => string_contents(s.data).is_some(),
        VariantClass::ObjectPath => string_contents(s.data).is_some_and(is_object_path),
        VariantClass::Signature => string_contents(s.data).is_some_and(is_signature),
        VariantClass::Maybe => maybe_is_normal(s),
        VariantClass::Array => array_is_normal(s),
        VariantClass::Tuple | VariantClass::DictEntry => tuple_is_normal(s),
        VariantClass::Variant => {
            let child = get_child(s, 0);
            s.child(&child).is_some_and(is_normal)
        }
    }
}

/// Returns the text of a serialised string: UTF-8 with exactly one NUL, at
/// the end.
pub fn string_contents(data: &[u8]) -> Option<&str> {
    let (&last, text) = data.split_last()?;
    if last != 0 || text.contains(&0) {
        return None;
    }
    std::str::from_utf8(text).ok()
}

/// Returns true if `path` is a D-Bus object path: `/`, or `/`-separated
/// non-empty elements of `[A-Za-z0-9_]` with no trailing `/`.
pub fn is_object_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    rest.split('/').all(|element| {
        !element.is_empty()
            && element
                .bytes()
                .all(|c| c.is_ascii_alphanumeric() || c == b'_')
    })
}

/// Returns true if `signature` is a sequence of zero or more definite
/// D-Bus types (no maybes, no wildcards).
pub fn is_signature(signature: &str) -> bool {
    let bytes = signature.as_bytes();
    if !bytes.iter().all(|c| b"ybnqiuxthdvasog(){}".contains(c)) {
        return false;
    }
    let mut pos = 0;
    while pos < bytes.len() {
        match scan(bytes, pos, 1) {
            Ok(end) => pos = end,
            Err(_) => return false,
        }
    }
    true
}

fn maybe_is_normal(s: Serialised<'_>) -> bool {
    let element = s.info.element();
    let Some((&last, body)) = s.data.split_last() else {
        return true;
    };
    let child = match element.fixed_size() {
        Some(_) => s.data,
        None if last == 0 => body,
        None => return false,
    };
    is_normal(Serialised::new(element, child, s.depth + 1))
}

fn array_is_normal(s: Serialised<'_>) -> bool {
    let element = s.info.element();
    let data = s.data;

    if let Some(fixed) = element.fixed_size() {
        return data.len() % fixed == 0
            && data
                .chunks_exact(fixed)
                .all(|chunk| is_normal(Serialised::new(element, chunk, s.depth + 1)));
    }

    if data.is_empty() {
        return true;
    }

    let width = offset_size(data.len());
    let Some(last_end) = read_offset(data, data.len() - width, width) else {
        return false;
    };
    if last_end > data.len() || (data.len() - last_end) % width != 0 {
        return false;
    }
    let n = (data.len() - last_end) / width;
    if total_size(last_end, n) != data.len() {
        return false;
    }

    let mut offset = 0;
    for i in 0..n {
        let Some(end) = read_offset(data, last_end + i * width, width) else {
            return false;
        };
        let start = align_up(offset, element.alignment());
        if start > end || end > last_end {
            return false;
        }
        if !is_zeroed(&data[offset..start])
            || !is_normal(Serialised::new(element, &data[start..end], s.depth + 1))
        {
            return false;
        }
        offset = end;
    }

    offset == last_end
}

fn tuple_is_normal(s: Serialised<'_>) -> bool {
    let members = s.info.members();
    let data = s.data;
    let width = offset_size(data.len());

    let mut offset = 0;
    let mut frame_pos = data.len();
    let mut n_frames = 0;
    for (i, member) in members.iter().enumerate() {
        let start = align_up(offset, member.alignment());
        let end = match member.fixed_size() {
            Some(size) => start + size,
            None if i + 1 == members.len() => frame_pos,
            None => {
                let Some(pos) = frame_pos.checked_sub(width) else {
                    return false;
                };
                frame_pos = pos;
                n_frames += 1;
                match read_offset(data, frame_pos, width) {
                    Some(end) => end,
                    None => return false,
                }
            }
        };
        if start > end || end > frame_pos {
            return false;
        }
        if !is_zeroed(&data[offset..start])
            || !is_normal(Serialised::new(member, &data[start..end], s.depth + 1))
        {
            return false;
        }
        offset = end;
    }

    if s.info.fixed_size().is_some() {
        return is_zeroed(&data[offset..]);
    }
    offset == frame_pos && total_size(offset, n_frames) == data.len()
}
