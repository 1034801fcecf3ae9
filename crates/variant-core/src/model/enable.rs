//! Procedures that establish a condition by changing a value's state.
//!
//! Each runs with the value's lock held and its clause's prerequisites in
//! place. Returning `None` declines, letting the engine try the next
//! clause; `Some(extra)` reports conditions established as a side effect.
//! None of these may lock the value they are given: anything they touch is
//! a descendant or a freshly created value.

use std::sync::Arc;

use log::debug;

use crate::codec::{byteswap_in_place, needed_size, serialise, SerialiseSource, Serialised};
use crate::model::condition::Conditions;
use crate::model::value::{Payload, Source, State};
use crate::model::{TypeInfo, Variant};
use crate::util::{zeros, VariantBytes};
use crate::validate::is_normal;

use Conditions as C;

pub(crate) type Enable = fn(&Variant, &mut State) -> Option<Conditions>;

/// Bytes of one child, captured before flattening.
pub(crate) struct Snapshot {
    info: Arc<TypeInfo>,
    depth: usize,
    data: VariantBytes,
}

impl Snapshot {
    fn take_all(children: &[Variant]) -> Vec<Snapshot> {
        children
            .iter()
            .map(|child| Snapshot {
                info: Arc::clone(child.type_info()),
                depth: child.depth(),
                data: child.get_data(),
            })
            .collect()
    }

    pub(crate) fn is_normal(&self) -> bool {
        is_normal(Serialised::new(&self.info, &self.data, self.depth))
    }
}

impl SerialiseSource for Snapshot {
    fn type_info(&self) -> &TypeInfo {
        &self.info
    }

    fn serialised_size(&self) -> usize {
        self.data.len()
    }

    fn serialise_into(&self, dest: &mut [u8]) {
        dest.copy_from_slice(&self.data);
    }
}

pub(crate) fn fixed_size(value: &Variant, state: &mut State) -> Option<Conditions> {
    let fixed = value.type_info().fixed_size()?;
    if let Payload::Tree { .. } = state.payload {
        state.size = fixed;
    }
    Some(C::EMPTY)
}

/// Sizes a tree from its children's current bytes and keeps those bytes,
/// so that a later flatten produces exactly this many.
pub(crate) fn size_known(value: &Variant, state: &mut State) -> Option<Conditions> {
    let Payload::Tree { children, snapshots } = &mut state.payload else {
        unreachable!("only trees compute their size");
    };
    let taken = snapshots.get_or_insert_with(|| Snapshot::take_all(children));
    let size = needed_size(value.type_info(), &taken[..]);
    state.size = size;
    Some(C::EMPTY)
}

pub(crate) fn size_valid(value: &Variant, state: &mut State) -> Option<Conditions> {
    let Some(fixed) = value.type_info().fixed_size() else {
        return Some(C::EMPTY);
    };
    if let Payload::Serialised { source, data } = &mut state.payload {
        if data.len() != fixed {
            debug!(
                "{} bytes of {} replaced by zeros, expected {fixed}",
                data.len(),
                value.type_string()
            );
            *data = zeros(fixed);
            *source = Source::Zeros;
            state.malformed = true;
        }
    }
    state.size = fixed;
    Some(C::EMPTY)
}

/// Flattens a tree into one owned buffer and releases the children.
pub(crate) fn serialised(value: &Variant, state: &mut State) -> Option<Conditions> {
    let snapshots = match &mut state.payload {
        Payload::Tree { children, snapshots } => {
            snapshots.take().unwrap_or_else(|| Snapshot::take_all(children))
        }
        _ => unreachable!("only trees are flattened"),
    };

    let info = value.type_info();
    let size = needed_size(info, &snapshots);
    let mut buf = vec![0; size];
    serialise(info, &snapshots, &mut buf);

    state.payload = Payload::Serialised {
        source: Source::Independent,
        data: VariantBytes::from_vec(buf),
    };
    state.size = size;
    Some(C::INDEPENDENT)
}

pub(crate) fn independent(_value: &Variant, state: &mut State) -> Option<Conditions> {
    let Payload::Serialised { source, data } = &mut state.payload else {
        unreachable!("only serialised values own bytes");
    };
    if !matches!(source, Source::Independent) {
        *data = VariantBytes::copy_from_slice(&data[..]);
        *source = Source::Independent;
    }
    Some(C::EMPTY)
}

pub(crate) fn became_native(value: &Variant, state: &mut State) -> Option<Conditions> {
    let Payload::Serialised { data, .. } = &mut state.payload else {
        unreachable!("only serialised values are byteswapped");
    };
    debug!("byteswapping {} bytes of {}", data.len(), value.type_string());
    byteswap_in_place(value.type_info(), data.make_mut(), value.depth());
    Some(C::EMPTY)
}

pub(crate) fn became_trusted(value: &Variant, state: &mut State) -> Option<Conditions> {
    if state.malformed {
        return None;
    }
    let Payload::Serialised { data, .. } = &state.payload else {
        unreachable!("only serialised values are checked");
    };
    is_normal(Serialised::new(value.type_info(), data, value.depth())).then_some(C::EMPTY)
}

/// Replaces untrusted bytes with the normal form of the same content.
///
/// The current bytes are viewed through a temporary value borrowing from
/// `value`, deep-copied into a tree of trusted leaves, and flattened.
pub(crate) fn reconstructed(value: &Variant, state: &mut State) -> Option<Conditions> {
    let Payload::Serialised { data, .. } = &state.payload else {
        unreachable!("only serialised values are reconstructed");
    };
    let native = if value.has(C::NATIVE) {
        C::SOURCE_NATIVE
    } else {
        C::EMPTY
    };

    let shell = Variant::serialised(
        Arc::clone(value.type_info()),
        value.depth(),
        Source::Ancestor(value.clone()),
        data.clone(),
        native,
        state.malformed,
    );
    let copy = shell.deep_copy();
    drop(shell);
    let flat = copy.get_data();

    debug!(
        "reconstructed {} as {} bytes of normal form",
        value.type_string(),
        flat.len()
    );
    state.size = flat.len();
    state.malformed = false;
    state.payload = Payload::Serialised {
        source: Source::Independent,
        data: flat,
    };
    Some(C::EMPTY)
}
