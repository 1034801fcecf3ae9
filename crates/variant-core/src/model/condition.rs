//! Condition bits and the rules that relate them.
//!
//! Every value carries a set of conditions describing what is currently
//! known about its representation: whether it is serialised, in native
//! byte order, in normal form, and so on. Conditions are only ever added.
//! Each condition has a descriptor listing what it implies, what prevents
//! it from being enabled, and the alternative sets of prerequisites
//! (clauses) under which its enable procedure may run.
//!
//! The descriptors are plain data; the procedures that walk them live on
//! [`Variant`](crate::Variant) and in `enable.rs`.

use crate::model::enable::{self, Enable};

bitflags::bitflags! {
    /// A set of conditions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Conditions: u32 {
        /// The bytes were supplied in native byte order.
        const SOURCE_NATIVE = 1 << 0;
        /// The bytes were converted to native byte order in place.
        const BECAME_NATIVE = 1 << 1;
        /// The bytes are in native byte order.
        const NATIVE = 1 << 2;
        /// The bytes were supplied with a promise of normal form.
        const SOURCE_TRUSTED = 1 << 3;
        /// The bytes were checked and found to be in normal form.
        const BECAME_TRUSTED = 1 << 4;
        /// The value is in normal form.
        const TRUSTED = 1 << 5;
        /// The type has a fixed serialised size.
        const FIXED_SIZE = 1 << 6;
        /// The serialised size has been computed.
        const SIZE_KNOWN = 1 << 7;
        /// The serialised size is consistent with the type.
        const SIZE_VALID = 1 << 8;
        /// The value is held as bytes rather than as a tree of children.
        const SERIALISED = 1 << 9;
        /// The bytes are not borrowed from another value.
        const INDEPENDENT = 1 << 10;
        /// The bytes were rebuilt from a deep copy.
        const RECONSTRUCTED = 1 << 11;
        /// Anchor for externally owned bytes.
        const NOTIFY = 1 << 12;
        /// The value's lock is held.
        const LOCKED = 1 << 13;
    }
}

const N_CONDITIONS: usize = 14;

impl Conditions {
    pub const EMPTY: Conditions = Conditions::empty();

    /// Returns the name of a single condition.
    pub fn name(self) -> &'static str {
        self.iter_names().next().map_or("?", |(name, _)| name)
    }
}

// =============================================================================
// RULE TABLE
// =============================================================================

/// One alternative set of prerequisites for enabling a condition.
#[derive(Debug)]
pub(crate) struct Clause {
    pub required: Conditions,
    pub forbidden: Conditions,
}

pub(crate) struct Descriptor {
    pub condition: Conditions,
    pub implies: Conditions,
    /// Present conditions that make this one impossible to enable.
    pub forbids: Conditions,
    /// Conditions that must hold whenever this one is absent.
    pub absence_implies: Conditions,
    pub clauses: &'static [Clause],
    pub enable: Option<Enable>,
}

const fn clause(required: Conditions) -> Clause {
    Clause {
        required,
        forbidden: Conditions::EMPTY,
    }
}

const fn descriptor(condition: Conditions) -> Descriptor {
    Descriptor {
        condition,
        implies: Conditions::EMPTY,
        forbids: Conditions::EMPTY,
        absence_implies: Conditions::EMPTY,
        clauses: &[],
        enable: None,
    }
}

use Conditions as C;

const SERIALISED_AND_VALID: Conditions = C::SERIALISED.union(C::SIZE_VALID);

static TABLE: [Descriptor; N_CONDITIONS] = [
    Descriptor {
        implies: C::NATIVE,
        ..descriptor(C::SOURCE_NATIVE)
    },
    Descriptor {
        implies: C::NATIVE,
        forbids: C::SOURCE_NATIVE.union(C::RECONSTRUCTED).union(C::NOTIFY),
        clauses: &[clause(SERIALISED_AND_VALID.union(C::INDEPENDENT))],
        enable: Some(enable::became_native),
        ..descriptor(C::BECAME_NATIVE)
    },
    Descriptor {
        forbids: C::NOTIFY,
        clauses: &[
            clause(C::SOURCE_NATIVE),
            clause(C::BECAME_NATIVE),
            clause(C::RECONSTRUCTED),
        ],
        ..descriptor(C::NATIVE)
    },
    Descriptor {
        implies: C::TRUSTED,
        ..descriptor(C::SOURCE_TRUSTED)
    },
    Descriptor {
        implies: C::TRUSTED,
        forbids: C::SOURCE_TRUSTED.union(C::RECONSTRUCTED).union(C::NOTIFY),
        clauses: &[clause(SERIALISED_AND_VALID)],
        enable: Some(enable::became_trusted),
        ..descriptor(C::BECAME_TRUSTED)
    },
    Descriptor {
        forbids: C::NOTIFY,
        clauses: &[
            clause(C::SOURCE_TRUSTED),
            clause(C::BECAME_TRUSTED),
            clause(C::RECONSTRUCTED),
        ],
        ..descriptor(C::TRUSTED)
    },
    Descriptor {
        implies: C::SIZE_KNOWN,
        clauses: &[clause(C::EMPTY)],
        enable: Some(enable::fixed_size),
        ..descriptor(C::FIXED_SIZE)
    },
    Descriptor {
        clauses: &[Clause {
            required: C::EMPTY,
            forbidden: C::SERIALISED,
        }],
        enable: Some(enable::size_known),
        ..descriptor(C::SIZE_KNOWN)
    },
    Descriptor {
        implies: C::SIZE_KNOWN,
        clauses: &[clause(C::FIXED_SIZE), clause(C::SIZE_KNOWN)],
        enable: Some(enable::size_valid),
        ..descriptor(C::SIZE_VALID)
    },
    Descriptor {
        implies: C::SIZE_KNOWN,
        absence_implies: C::SOURCE_NATIVE,
        forbids: C::NOTIFY,
        clauses: &[clause(C::SIZE_VALID)],
        enable: Some(enable::serialised),
        ..descriptor(C::SERIALISED)
    },
    Descriptor {
        forbids: C::NOTIFY,
        clauses: &[clause(SERIALISED_AND_VALID)],
        enable: Some(enable::independent),
        ..descriptor(C::INDEPENDENT)
    },
    Descriptor {
        implies: C::NATIVE.union(C::TRUSTED).union(C::INDEPENDENT),
        forbids: C::NOTIFY,
        clauses: &[clause(SERIALISED_AND_VALID)],
        enable: Some(enable::reconstructed),
        ..descriptor(C::RECONSTRUCTED)
    },
    descriptor(C::NOTIFY),
    descriptor(C::LOCKED),
];

/// Returns the descriptor of a single condition.
pub(crate) fn describe(condition: Conditions) -> &'static Descriptor {
    debug_assert_eq!(condition.bits().count_ones(), 1);
    &TABLE[condition.bits().trailing_zeros() as usize]
}

/// Adds everything implied by `conditions`, transitively.
pub(crate) fn with_implied(mut conditions: Conditions) -> Conditions {
    loop {
        let mut next = conditions;
        for bit in conditions.iter() {
            next |= describe(bit).implies;
        }
        if next == conditions {
            return conditions;
        }
        conditions = next;
    }
}

/// Returns true if `conditions` satisfies every implication and
/// absence-implication in the table.
pub(crate) fn is_consistent(conditions: Conditions) -> bool {
    TABLE.iter().all(|d| {
        if conditions.contains(d.condition) {
            conditions.contains(d.implies)
        } else {
            conditions.contains(d.absence_implies)
        }
    })
}
