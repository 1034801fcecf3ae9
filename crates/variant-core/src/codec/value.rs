//! Serialising containers and slicing children out of serialised data.
//!
//! Layout rules:
//! - Every child starts at its type's alignment, with zero padding before it.
//! - Maybe: empty for nothing; the child for fixed-size elements; the child
//!   plus one zero byte for variable-sized elements.
//! - Array of fixed-size elements: children back to back.
//! - Array of variable-sized elements: children, then one framing offset per
//!   child giving its end.
//! - Tuple/dictionary entry: members in order; the end of every
//!   variable-sized member except the last is recorded as a framing offset,
//!   stored in reverse order at the end. Fixed-size tuples are padded to
//!   their fixed size.
//! - Variant: child, a zero byte, then the child's type string.
//!
//! Slicing never trusts the data: a child whose computed range is out of
//! bounds or inconsistent comes back without a range, and the caller reads
//! it as zeros.

use std::ops::Range;
use std::sync::Arc;

use crate::codec::primitives::{offset_size, read_offset, total_size, write_offset};
use crate::limits::MAX_RECURSION_DEPTH;
use crate::model::type_info::align_up;
use crate::model::{TypeInfo, VariantClass, VariantType};

/// A serialised value: its type, its bytes and its nesting depth.
#[derive(Debug, Clone, Copy)]
pub struct Serialised<'a> {
    pub info: &'a TypeInfo,
    pub data: &'a [u8],
    pub depth: usize,
}

impl<'a> Serialised<'a> {
    pub fn new(info: &'a TypeInfo, data: &'a [u8], depth: usize) -> Self {
        Self { info, data, depth }
    }

    /// Returns the serialised form of a child slice.
    ///
    /// Children without a valid range have no bytes to describe and are
    /// read as zeros by the caller instead.
    pub fn child(&self, child: &'a ChildSlice) -> Option<Serialised<'a>> {
        child
            .range
            .clone()
            .map(|range| Serialised::new(&child.info, &self.data[range], self.depth + 1))
    }
}

/// Location of one child inside its container's bytes.
#[derive(Debug, Clone)]
pub struct ChildSlice {
    pub info: Arc<TypeInfo>,
    /// Byte range within the container, or `None` if the framing is invalid.
    pub range: Option<Range<usize>>,
    /// Size of the child; equals the range length when there is a range.
    pub size: usize,
}

impl ChildSlice {
    fn new(info: Arc<TypeInfo>, range: Option<Range<usize>>) -> Self {
        match (info.fixed_size(), range) {
            (Some(fixed), Some(range)) if range.len() != fixed => ChildSlice {
                info,
                range: None,
                size: fixed,
            },
            (Some(fixed), None) => ChildSlice {
                info,
                range: None,
                size: fixed,
            },
            (None, None) => ChildSlice {
                info,
                range: None,
                size: 0,
            },
            (_, Some(range)) => ChildSlice {
                info,
                size: range.len(),
                range: Some(range),
            },
        }
    }
}

/// A child supplied to [`needed_size`] and [`serialise`].
pub trait SerialiseSource {
    /// Type of the child.
    fn type_info(&self) -> &TypeInfo;

    /// Serialised size of the child.
    fn serialised_size(&self) -> usize;

    /// Writes the child into `dest`, which is exactly `serialised_size` long.
    fn serialise_into(&self, dest: &mut [u8]);
}

#[inline]
pub(crate) fn checked_align(offset: usize, alignment: usize) -> Option<usize> {
    offset.checked_add(alignment).map(|v| v & !alignment)
}

// =============================================================================
// SERIALISING
// =============================================================================

/// Computes the serialised size of a container with the given children.
pub fn needed_size<C: SerialiseSource>(info: &TypeInfo, children: &[C]) -> usize {
    if let Some(fixed) = info.fixed_size() {
        return fixed;
    }

    match info.class() {
        VariantClass::Maybe => match children.first() {
            None => 0,
            Some(child) if info.element().fixed_size().is_some() => child.serialised_size(),
            Some(child) => child.serialised_size() + 1,
        },
        VariantClass::Array => {
            let element = info.element();
            if let Some(fixed) = element.fixed_size() {
                return fixed * children.len();
            }
            let mut offset = 0;
            for child in children {
                offset = align_up(offset, element.alignment()) + child.serialised_size();
            }
            total_size(offset, children.len())
        }
        VariantClass::Tuple | VariantClass::DictEntry => {
            let members = info.members();
            let mut offset = 0;
            let mut n_frames = 0;
            for (i, (member, child)) in members.iter().zip(children).enumerate() {
                offset = align_up(offset, member.alignment()) + child.serialised_size();
                if member.fixed_size().is_none() && i + 1 < members.len() {
                    n_frames += 1;
                }
            }
            total_size(offset, n_frames)
        }
        VariantClass::Variant => {
            let child = &children[0];
            child.serialised_size() + 1 + child.type_info().type_string().len()
        }
        class => panic!("cannot serialise children of basic class {class:?}"),
    }
}

/// Serialises a container into `dest`, which must be exactly
/// [`needed_size`] bytes long.
pub fn serialise<C: SerialiseSource>(info: &TypeInfo, children: &[C], dest: &mut [u8]) {
    match info.class() {
        VariantClass::Maybe => {
            if let Some(child) = children.first() {
                let size = child.serialised_size();
                child.serialise_into(&mut dest[..size]);
                if info.element().fixed_size().is_none() {
                    dest[size] = 0;
                }
            }
        }
        VariantClass::Array => serialise_array(info, children, dest),
        VariantClass::Tuple | VariantClass::DictEntry => serialise_tuple(info, children, dest),
        VariantClass::Variant => {
            let child = &children[0];
            let size = child.serialised_size();
            child.serialise_into(&mut dest[..size]);
            dest[size] = 0;
            dest[size + 1..].copy_from_slice(child.type_info().type_string().as_bytes());
        }
        class => panic!("cannot serialise children of basic class {class:?}"),
    }
}

fn serialise_array<C: SerialiseSource>(info: &TypeInfo, children: &[C], dest: &mut [u8]) {
    let element = info.element();

    if let Some(fixed) = element.fixed_size() {
        for (child, chunk) in children.iter().zip(dest.chunks_exact_mut(fixed)) {
            child.serialise_into(chunk);
        }
        return;
    }

    let offset_width = offset_size(dest.len());
    let mut ends = Vec::with_capacity(children.len());
    let mut offset = 0;
    for child in children {
        let start = align_up(offset, element.alignment());
        dest[offset..start].fill(0);
        let end = start + child.serialised_size();
        child.serialise_into(&mut dest[start..end]);
        ends.push(end);
        offset = end;
    }
    for (i, end) in ends.into_iter().enumerate() {
        write_offset(dest, offset + i * offset_width, end, offset_width);
    }
}

fn serialise_tuple<C: SerialiseSource>(info: &TypeInfo, children: &[C], dest: &mut [u8]) {
    let members = info.members();
    assert_eq!(
        members.len(),
        children.len(),
        "{} needs {} members",
        info.type_string(),
        members.len()
    );

    let offset_width = offset_size(dest.len());
    let mut offset = 0;
    let mut frame_pos = dest.len();
    for (i, (member, child)) in members.iter().zip(children).enumerate() {
        let start = align_up(offset, member.alignment());
        dest[offset..start].fill(0);
        let end = start + child.serialised_size();
        child.serialise_into(&mut dest[start..end]);
        offset = end;
        if member.fixed_size().is_none() && i + 1 < members.len() {
            frame_pos -= offset_width;
            write_offset(dest, frame_pos, offset, offset_width);
        }
    }
    dest[offset..frame_pos].fill(0);
}

// =============================================================================
// SLICING
// =============================================================================

/// Framing of a variable-sized array: (offset width, end of body, count).
fn array_frame(data: &[u8]) -> Option<(usize, usize, usize)> {
    if data.is_empty() {
        return Some((0, 0, 0));
    }
    let width = offset_size(data.len());
    let last_end = read_offset(data, data.len() - width, width)?;
    if last_end > data.len() {
        return None;
    }
    let table = data.len() - last_end;
    if table % width != 0 {
        return None;
    }
    Some((width, last_end, table / width))
}

/// Returns the number of children in a serialised container.
///
/// Malformed framing yields zero children for arrays and maybes; tuples,
/// dictionary entries and variants always report their declared count.
pub fn n_children(s: Serialised<'_>) -> usize {
    match s.info.class() {
        VariantClass::Maybe => match s.info.element().fixed_size() {
            Some(fixed) => usize::from(s.data.len() == fixed),
            None => usize::from(!s.data.is_empty()),
        },
        VariantClass::Array => match s.info.element().fixed_size() {
            Some(fixed) if s.data.len() % fixed == 0 => s.data.len() / fixed,
            Some(_) => 0,
            None => array_frame(s.data).map_or(0, |(_, _, n)| n),
        },
        VariantClass::Tuple | VariantClass::DictEntry => s.info.members().len(),
        VariantClass::Variant => 1,
        _ => 0,
    }
}

/// Locates child `index` of a serialised container.
///
/// # Panics
///
/// Panics if `index` is not below [`n_children`].
pub fn get_child(s: Serialised<'_>, index: usize) -> ChildSlice {
    let n = n_children(s);
    assert!(
        index < n,
        "child index {index} out of range for {} with {n} children",
        s.info.type_string()
    );

    match s.info.class() {
        VariantClass::Maybe => {
            let element = s.info.element().clone();
            let end = match element.fixed_size() {
                Some(fixed) => fixed,
                None => s.data.len() - 1,
            };
            ChildSlice::new(element, Some(0..end))
        }
        VariantClass::Array => array_child(s, index),
        VariantClass::Tuple | VariantClass::DictEntry => tuple_child(s, index),
        VariantClass::Variant => variant_child(s),
        _ => unreachable!("basic values have no children"),
    }
}

fn array_child(s: Serialised<'_>, index: usize) -> ChildSlice {
    let element = s.info.element().clone();

    if let Some(fixed) = element.fixed_size() {
        let start = index * fixed;
        return ChildSlice::new(element, Some(start..start + fixed));
    }

    let Some((width, last_end, _)) = array_frame(s.data) else {
        return ChildSlice::new(element, None);
    };
    let start = if index == 0 {
        Some(0)
    } else {
        read_offset(s.data, last_end + (index - 1) * width, width)
            .and_then(|prev| checked_align(prev, element.alignment()))
    };
    let end = read_offset(s.data, last_end + index * width, width);

    let range = match (start, end) {
        (Some(start), Some(end)) if start <= end && end <= last_end => Some(start..end),
        _ => None,
    };
    ChildSlice::new(element, range)
}

fn tuple_child(s: Serialised<'_>, index: usize) -> ChildSlice {
    let members = s.info.members();
    let len = s.data.len();
    let width = offset_size(len);
    let n_frames = members[..members.len() - 1]
        .iter()
        .filter(|m| m.fixed_size().is_none())
        .count();

    let Some(body_end) = len.checked_sub(width * n_frames) else {
        return ChildSlice::new(members[index].clone(), None);
    };

    let mut offset = Some(0);
    let mut frame = 0;
    for (i, member) in members.iter().enumerate() {
        let start = offset.and_then(|o| checked_align(o, member.alignment()));
        let end = match member.fixed_size() {
            Some(size) => start.and_then(|s| s.checked_add(size)),
            None if i + 1 == members.len() => Some(body_end),
            None => {
                frame += 1;
                read_offset(s.data, len - width * frame, width)
            }
        };

        if i == index {
            let range = match (start, end) {
                (Some(start), Some(end)) if start <= end && end <= body_end => Some(start..end),
                _ => None,
            };
            return ChildSlice::new(member.clone(), range);
        }
        offset = end;
    }

    unreachable!("index checked against member count")
}

fn variant_child(s: Serialised<'_>) -> ChildSlice {
    let parsed = s.data.iter().rposition(|b| *b == 0).and_then(|zero| {
        let type_str = std::str::from_utf8(&s.data[zero + 1..]).ok()?;
        let ty = VariantType::new(type_str).ok()?;
        let fits = ty.is_definite() && s.depth + 1 + ty.depth() <= MAX_RECURSION_DEPTH;
        fits.then_some((ty, zero))
    });

    match parsed {
        Some((ty, zero)) => ChildSlice::new(TypeInfo::get(&ty), Some(0..zero)),
        None => ChildSlice::new(TypeInfo::get(&VariantType::UNIT), None),
    }
}
