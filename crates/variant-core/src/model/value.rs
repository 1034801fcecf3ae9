//! The variant value.
//!
//! A [`Variant`] is either a tree of child values or a flat buffer of
//! serialised bytes, and moves between the two (and between byte orders,
//! and from untrusted to normal form) only when an operation needs it.
//! What is currently known about a value is recorded as a set of
//! [`Conditions`]; [`Variant::require`] establishes missing ones by walking
//! the rule table in `condition.rs`.
//!
//! The representation of a value may change behind a shared reference, but
//! its type and logical content never do.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use log::trace;
use parking_lot::{Mutex, MutexGuard};

use crate::codec::{self, byteswapped, SerialiseSource, Serialised};
use crate::model::condition::{describe, is_consistent, with_implied, Clause, Conditions};
use crate::model::enable::Snapshot;
use crate::model::{TypeInfo, VariantClass, VariantType};
use crate::util::bytes::ReleaseFn;
use crate::util::{zeros, VariantBytes};
use crate::validate;

use Conditions as C;

// =============================================================================
// LOAD OPTIONS
// =============================================================================

/// Byte order of serialised data handed to the loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrder {
    pub fn is_native(self) -> bool {
        match self {
            ByteOrder::Native => true,
            ByteOrder::Little => cfg!(target_endian = "little"),
            ByteOrder::Big => cfg!(target_endian = "big"),
        }
    }

    /// Returns the byte order that is not native on this machine.
    pub fn foreign() -> ByteOrder {
        if cfg!(target_endian = "little") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

/// Options for [`Variant::load`] and friends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadFlags {
    /// Byte order of the supplied data.
    pub byte_order: ByteOrder,

    /// The caller promises the data is in normal form.
    ///
    /// Trusted data is never validated; children are sliced out of it
    /// without checks beyond bounds.
    pub trusted: bool,

    /// Defer byte order conversion of foreign-order data until the first
    /// operation that needs native order.
    pub lazy_byteswap: bool,
}

impl LoadFlags {
    /// Creates default flags: native order, untrusted, eager conversion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates flags for trusted native-order data.
    pub fn trusted() -> Self {
        Self {
            trusted: true,
            ..Self::default()
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_lazy_byteswap(mut self) -> Self {
        self.lazy_byteswap = true;
        self
    }
}

// =============================================================================
// REPRESENTATION
// =============================================================================

/// Where the bytes of a serialised value come from.
pub(crate) enum Source {
    /// Borrowed from the buffer of another value.
    Ancestor(Variant),
    /// The shared zero pool, substituted for invalid data.
    Zeros,
    /// Owned by this value.
    Independent,
}

pub(crate) enum Payload {
    Serialised { source: Source, data: VariantBytes },
    Tree {
        children: Vec<Variant>,
        /// Children's bytes as of `SIZE_KNOWN`; flattening writes these.
        snapshots: Option<Vec<Snapshot>>,
    },
    /// Keeps externally owned bytes alive for the values wrapping them.
    Notify { bytes: VariantBytes },
}

/// Mutable part of a value, guarded by its lock.
pub(crate) struct State {
    pub payload: Payload,
    /// Serialised size; meaningful once `SIZE_KNOWN` holds.
    pub size: usize,
    /// The bytes were replaced with zeros because they could not be read.
    pub malformed: bool,
}

const FLOATING: u8 = 0;
const OWNED: u8 = 1;

struct VariantInner {
    info: Arc<TypeInfo>,
    depth: usize,
    ownership: AtomicU8,
    /// Mirror of the condition set, readable without the lock. Written only
    /// with the lock held.
    conditions: AtomicU32,
    state: Mutex<State>,
}

/// A typed, self-describing value.
///
/// Cloning is cheap and shares the value; the value is destroyed when the
/// last clone is dropped.
#[derive(Clone)]
pub struct Variant(Arc<VariantInner>);

/// Held lock on a value's state. Sets `LOCKED` in the condition mirror for
/// as long as it lives.
pub(crate) struct Locked<'a> {
    conditions: &'a AtomicU32,
    state: MutexGuard<'a, State>,
}

impl Locked<'_> {
    pub(crate) fn conditions(&self) -> Conditions {
        Conditions::from_bits_retain(self.conditions.load(Ordering::Acquire)).difference(C::LOCKED)
    }

    fn set(&mut self, conditions: Conditions) {
        self.conditions
            .fetch_or(with_implied(conditions).bits(), Ordering::AcqRel);
    }
}

impl Deref for Locked<'_> {
    type Target = State;

    fn deref(&self) -> &State {
        &self.state
    }
}

impl DerefMut for Locked<'_> {
    fn deref_mut(&mut self) -> &mut State {
        &mut self.state
    }
}

impl Drop for Locked<'_> {
    fn drop(&mut self) {
        self.conditions
            .fetch_and(!C::LOCKED.bits(), Ordering::Release);
    }
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

impl Variant {
    fn from_parts(
        info: Arc<TypeInfo>,
        depth: usize,
        conditions: Conditions,
        payload: Payload,
        size: usize,
        malformed: bool,
    ) -> Variant {
        let conditions = with_implied(conditions);
        debug_assert!(
            is_consistent(conditions),
            "inconsistent initial conditions {conditions:?}"
        );
        Variant(Arc::new(VariantInner {
            info,
            depth,
            ownership: AtomicU8::new(FLOATING),
            conditions: AtomicU32::new(conditions.bits()),
            state: Mutex::new(State {
                payload,
                size,
                malformed,
            }),
        }))
    }

    pub(crate) fn serialised(
        info: Arc<TypeInfo>,
        depth: usize,
        source: Source,
        data: VariantBytes,
        conditions: Conditions,
        malformed: bool,
    ) -> Variant {
        let mut conditions = conditions | C::SERIALISED | C::SIZE_KNOWN;
        if matches!(source, Source::Independent) {
            conditions |= C::INDEPENDENT;
        }
        let size = data.len();
        Variant::from_parts(
            info,
            depth,
            conditions,
            Payload::Serialised { source, data },
            size,
            malformed,
        )
    }

    /// Creates a floating tree value. Children are sunk.
    pub(crate) fn tree(info: Arc<TypeInfo>, children: Vec<Variant>, trusted: bool) -> Variant {
        for child in &children {
            child.sink();
        }
        let mut conditions = C::SOURCE_NATIVE;
        if trusted {
            conditions |= C::SOURCE_TRUSTED;
        }
        Variant::from_parts(info, 0, conditions, Payload::Tree { children, snapshots: None }, 0, false)
    }

    /// Creates a value from a copy of `data`.
    pub fn load(ty: &VariantType, data: &[u8], flags: LoadFlags) -> Variant {
        Variant::from_bytes(ty, VariantBytes::copy_from_slice(data), flags)
    }

    /// Creates a value that takes ownership of `data`.
    pub fn adopt(ty: &VariantType, data: Vec<u8>, flags: LoadFlags) -> Variant {
        Variant::from_bytes(ty, VariantBytes::from_vec(data), flags)
    }

    /// Creates a value viewing shared bytes.
    pub fn from_bytes(ty: &VariantType, data: VariantBytes, flags: LoadFlags) -> Variant {
        Variant::load_with_source(TypeInfo::get(ty), Source::Independent, data, flags)
    }

    /// Creates a value viewing bytes owned by `owner`, without copying.
    ///
    /// `release` runs once neither the value nor anything derived from its
    /// bytes is alive.
    pub fn wrap<T>(ty: &VariantType, owner: T, release: Option<ReleaseFn>, flags: LoadFlags) -> Variant
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
    {
        let info = TypeInfo::get(ty);
        let bytes = VariantBytes::from_owner(owner, release);
        let anchor = Variant::from_parts(
            Arc::clone(&info),
            0,
            C::NOTIFY | C::SERIALISED,
            Payload::Notify {
                bytes: bytes.clone(),
            },
            bytes.len(),
            false,
        );
        Variant::load_with_source(info, Source::Ancestor(anchor), bytes, flags)
    }

    fn load_with_source(info: Arc<TypeInfo>, source: Source, data: VariantBytes, flags: LoadFlags) -> Variant {
        let mut conditions = C::EMPTY;
        if flags.byte_order.is_native() || !info.has_byte_order() {
            conditions |= C::SOURCE_NATIVE;
        }
        if flags.trusted {
            conditions |= C::SOURCE_TRUSTED;
        }
        let value = Variant::serialised(info, 0, source, data, conditions, false);
        if !flags.lazy_byteswap && !value.has(C::NATIVE) {
            value.require(C::NATIVE);
        }
        value
    }
}

// =============================================================================
// CONDITION ENGINE
// =============================================================================

impl Variant {
    /// Returns the conditions currently established on this value.
    pub fn conditions(&self) -> Conditions {
        Conditions::from_bits_retain(self.0.conditions.load(Ordering::Acquire)).difference(C::LOCKED)
    }

    /// Returns true if every condition in `conditions` holds.
    pub fn has(&self, conditions: Conditions) -> bool {
        self.conditions().contains(conditions)
    }

    pub(crate) fn lock(&self) -> Locked<'_> {
        let state = self.0.state.lock();
        self.0
            .conditions
            .fetch_or(C::LOCKED.bits(), Ordering::AcqRel);
        Locked {
            conditions: &self.0.conditions,
            state,
        }
    }

    /// Establishes every condition in `target`, changing the representation
    /// as needed. Returns immediately if they already hold.
    ///
    /// # Panics
    ///
    /// Panics if a condition cannot be established on this value, for
    /// example `BECAME_NATIVE` on a value that was always native.
    pub fn require(&self, target: Conditions) {
        if self.has(target) {
            return;
        }

        let mut locked = self.lock();
        for bit in target.difference(locked.conditions()).iter() {
            if !self.require_one(&mut locked, bit) {
                panic!(
                    "cannot establish {} on {} value with {:?}",
                    bit.name(),
                    self.type_string(),
                    locked.conditions()
                );
            }
        }
        debug_assert!(
            is_consistent(locked.conditions()),
            "inconsistent conditions {:?}",
            locked.conditions()
        );
    }

    fn require_one(&self, locked: &mut Locked<'_>, bit: Conditions) -> bool {
        if locked.conditions().contains(bit) {
            return true;
        }
        let descriptor = describe(bit);
        if locked.conditions().intersects(descriptor.forbids) {
            return false;
        }

        // Cheapest clause first; ties keep table order.
        let have = locked.conditions();
        let mut clauses: Vec<&Clause> = descriptor.clauses.iter().collect();
        clauses.sort_by_key(|clause| clause.required.difference(have).bits().count_ones());

        for clause in clauses {
            if locked.conditions().intersects(clause.forbidden) {
                continue;
            }
            let missing = clause.required.difference(locked.conditions());
            if !missing.iter().all(|req| self.require_one(locked, req)) {
                continue;
            }

            let have = locked.conditions();
            if have.contains(bit) {
                return true;
            }
            if have.intersects(descriptor.forbids.union(clause.forbidden)) {
                continue;
            }

            let extra = match descriptor.enable {
                None => C::EMPTY,
                Some(enable) => match enable(self, &mut locked.state) {
                    Some(extra) => extra,
                    None => continue,
                },
            };
            trace!("enabled {} on {}", bit.name(), self.type_string());
            locked.set(bit | extra);
            return true;
        }

        false
    }

    /// Locks the value unless any of `conditions` already holds.
    ///
    /// The returned guard lets the caller read the current representation
    /// before anything can establish the forbidden conditions.
    pub(crate) fn forbid(&self, conditions: Conditions) -> Option<Locked<'_>> {
        if self.conditions().intersects(conditions) {
            return None;
        }
        let locked = self.lock();
        if locked.conditions().intersects(conditions) {
            return None;
        }
        Some(locked)
    }

    /// Returns the bytes of a serialised value without establishing anything.
    fn serialised_bytes(&self) -> VariantBytes {
        match &self.lock().payload {
            Payload::Serialised { data, .. } | Payload::Notify { bytes: data } => data.clone(),
            Payload::Tree { .. } => unreachable!("serialised value without bytes"),
        }
    }
}

// =============================================================================
// ACCESS
// =============================================================================

impl Variant {
    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.0.info
    }

    pub fn variant_type(&self) -> &VariantType {
        self.0.info.variant_type()
    }

    pub fn type_string(&self) -> &str {
        self.0.info.type_string()
    }

    pub fn classify(&self) -> VariantClass {
        self.0.info.class()
    }

    pub fn is_container(&self) -> bool {
        self.0.info.is_container()
    }

    /// Nesting level below the outermost serialised value.
    pub(crate) fn depth(&self) -> usize {
        self.0.depth
    }

    pub fn is_floating(&self) -> bool {
        self.0.ownership.load(Ordering::Acquire) == FLOATING
    }

    /// Marks the value owned and returns a new reference to it.
    pub fn ref_sink(&self) -> Variant {
        self.sink();
        self.clone()
    }

    pub(crate) fn sink(&self) {
        // Losing the race means another holder already sank it.
        let _ = self
            .0
            .ownership
            .compare_exchange(FLOATING, OWNED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Returns the number of live references to this value.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Returns the serialised size in bytes.
    pub fn get_size(&self) -> usize {
        self.require(C::SIZE_VALID);
        self.lock().size
    }

    /// Returns the serialised bytes in native byte order.
    ///
    /// The returned view stays valid regardless of later representation
    /// changes on this value.
    pub fn get_data(&self) -> VariantBytes {
        self.require(C::NATIVE | C::SERIALISED | C::SIZE_VALID);
        self.serialised_bytes()
    }

    /// Writes the serialised bytes into `dest`.
    ///
    /// # Panics
    ///
    /// Panics if `dest` is not exactly [`get_size`](Self::get_size) bytes.
    pub fn store(&self, dest: &mut [u8]) {
        let data = self.get_data();
        assert_eq!(
            dest.len(),
            data.len(),
            "store needs exactly {} bytes for {}",
            data.len(),
            self.type_string()
        );
        dest.copy_from_slice(&data);
    }

    /// Returns the number of children of a container.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a container.
    pub fn n_children(&self) -> usize {
        assert!(self.is_container(), "{} is not a container", self.type_string());

        if let Some(locked) = self.forbid(C::SERIALISED) {
            if let Payload::Tree { children, .. } = &locked.payload {
                return children.len();
            }
        }

        self.require(C::SERIALISED | C::SIZE_VALID);
        let data = self.serialised_bytes();
        codec::n_children(Serialised::new(&self.0.info, &data, self.0.depth))
    }

    /// Returns child `index` of a container.
    ///
    /// Children of serialised containers borrow the container's bytes.
    /// A child whose framing is invalid reads as zeros.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a container or `index` is out of range.
    pub fn get_child_value(&self, index: usize) -> Variant {
        assert!(self.is_container(), "{} is not a container", self.type_string());

        if let Some(locked) = self.forbid(C::SERIALISED) {
            if let Payload::Tree { children, .. } = &locked.payload {
                return children.get(index).cloned().unwrap_or_else(|| {
                    panic!(
                        "child index {index} out of range for {} with {} children",
                        self.type_string(),
                        children.len()
                    )
                });
            }
        }

        self.require(C::SERIALISED | C::SIZE_VALID);
        let (data, container_bits, owner) = {
            let locked = self.lock();
            let bits = locked.conditions();
            match &locked.payload {
                Payload::Serialised { source, data } => {
                    let owner = match source {
                        Source::Ancestor(ancestor) => Some(ancestor.clone()),
                        Source::Independent => Some(self.clone()),
                        Source::Zeros => None,
                    };
                    (data.clone(), bits, owner)
                }
                _ => unreachable!("serialised value without bytes"),
            }
        };

        let slice = codec::get_child(Serialised::new(&self.0.info, &data, self.0.depth), index);

        // Zeros read the same in either byte order but are never normal. An
        // anchor only keeps bytes alive and says nothing about them.
        let owner_bits = match &owner {
            None => C::NATIVE,
            Some(owner) if owner.has(C::NOTIFY) => container_bits,
            Some(owner) => owner.conditions(),
        };
        let shared = container_bits & owner_bits;
        let (source, bytes, malformed) = match (slice.range, owner) {
            (Some(range), Some(owner)) => (Source::Ancestor(owner), data.slice(range), false),
            (Some(range), None) => (Source::Zeros, data.slice(range), false),
            (None, _) => (Source::Zeros, zeros(slice.size), true),
        };

        let mut inherited = C::EMPTY;
        if shared.contains(C::NATIVE) || malformed {
            inherited |= C::SOURCE_NATIVE;
        }
        if shared.contains(C::TRUSTED) && !malformed {
            inherited |= C::SOURCE_TRUSTED;
        }

        let child = Variant::serialised(slice.info, self.0.depth + 1, source, bytes, inherited, malformed);
        child.sink();
        child
    }

    /// Returns true if the value is in normal form.
    ///
    /// Trusted values are normal by definition; others are checked.
    pub fn is_normal(&self) -> bool {
        let locked = self.lock();
        if locked.malformed {
            return false;
        }
        if locked.conditions().contains(C::TRUSTED) {
            return true;
        }
        match &locked.payload {
            Payload::Serialised { data, .. } => {
                validate::is_normal(Serialised::new(&self.0.info, data, self.0.depth))
            }
            Payload::Tree {
                snapshots: Some(snapshots),
                ..
            } => snapshots.iter().all(Snapshot::is_normal),
            Payload::Tree { children, .. } => children.iter().all(Variant::is_normal),
            Payload::Notify { .. } => false,
        }
    }

    /// Returns true if the value is known to be in normal form without
    /// checking.
    pub fn is_trusted(&self) -> bool {
        self.has(C::TRUSTED)
    }

    /// Brings the value into trusted, native, serialised form and returns
    /// it.
    ///
    /// Untrusted data that is not in normal form is rebuilt from a deep
    /// copy; its logical content is unchanged.
    pub fn get_normal_form(&self) -> Variant {
        self.require(C::TRUSTED | C::NATIVE | C::SERIALISED);
        self.clone()
    }

    /// Returns a new value with every number in the opposite byte order.
    pub fn byteswap(&self) -> Variant {
        let data = self.get_normal_form().get_data();
        let info = Arc::clone(&self.0.info);
        let swapped = if info.has_byte_order() {
            VariantBytes::from_vec(byteswapped(&info, &data, 0))
        } else {
            data
        };
        Variant::serialised(
            info,
            0,
            Source::Independent,
            swapped,
            C::SOURCE_NATIVE | C::SOURCE_TRUSTED,
            false,
        )
    }

    /// Returns a fully independent copy built from this value's content.
    ///
    /// The copy is a floating tree of trusted leaves, so it is always in
    /// normal form.
    pub fn deep_copy(&self) -> Variant {
        match self.classify() {
            VariantClass::Boolean => Variant::from_bool(self.get_bool()),
            VariantClass::Byte => Variant::from_byte(self.get_byte()),
            VariantClass::Int16 => Variant::from_i16(self.get_i16()),
            VariantClass::Uint16 => Variant::from_u16(self.get_u16()),
            VariantClass::Int32 => Variant::from_i32(self.get_i32()),
            VariantClass::Uint32 => Variant::from_u32(self.get_u32()),
            VariantClass::Int64 => Variant::from_i64(self.get_i64()),
            VariantClass::Uint64 => Variant::from_u64(self.get_u64()),
            VariantClass::Handle => Variant::from_handle(self.get_handle()),
            VariantClass::Double => Variant::from_f64(self.get_f64()),
            VariantClass::String | VariantClass::ObjectPath | VariantClass::Signature => {
                Variant::string_like(Arc::clone(&self.0.info), &self.get_str())
            }
            VariantClass::Maybe
            | VariantClass::Array
            | VariantClass::Tuple
            | VariantClass::DictEntry
            | VariantClass::Variant => {
                let children: Vec<Variant> = self.iter().map(|child| child.deep_copy()).collect();
                let trusted = children.iter().all(Variant::is_trusted);
                Variant::tree(Arc::clone(&self.0.info), children, trusted)
            }
        }
    }
}

impl SerialiseSource for Variant {
    fn type_info(&self) -> &TypeInfo {
        &self.0.info
    }

    fn serialised_size(&self) -> usize {
        self.get_size()
    }

    fn serialise_into(&self, dest: &mut [u8]) {
        self.store(dest);
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Variant) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.variant_type() == other.variant_type()
            && self.get_normal_form().get_data() == other.get_normal_form().get_data()
    }
}

impl Eq for Variant {}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("type", &self.type_string())
            .field("conditions", &self.conditions())
            .field("floating", &self.is_floating())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> VariantType {
        VariantType::new(s).unwrap()
    }

    fn foreign() -> LoadFlags {
        LoadFlags::new().with_byte_order(ByteOrder::foreign())
    }

    #[test]
    fn test_load_native_trusted() {
        let v = Variant::load(&VariantType::INT32, &7i32.to_ne_bytes(), LoadFlags::trusted());
        assert!(v.has(C::NATIVE | C::TRUSTED | C::SERIALISED | C::INDEPENDENT));
        assert!(v.is_floating());
        assert_eq!(v.get_size(), 4);
        assert_eq!(&*v.get_data(), &7i32.to_ne_bytes());
    }

    #[test]
    fn test_eager_byteswap_on_foreign_load() {
        let v = Variant::load(&VariantType::UINT32, &0x0102_0304u32.to_be_bytes(), LoadFlags::new().with_byte_order(ByteOrder::Big));
        assert!(v.has(C::NATIVE));
        assert_eq!(&*v.get_data(), &0x0102_0304u32.to_ne_bytes());
    }

    #[test]
    fn test_lazy_byteswap_defers_conversion() {
        let data = 5i64.to_ne_bytes().iter().rev().copied().collect::<Vec<_>>();
        let v = Variant::load(&VariantType::INT64, &data, foreign().with_lazy_byteswap());
        assert!(!v.has(C::NATIVE));
        assert_eq!(&*v.get_data(), &5i64.to_ne_bytes());
        assert!(v.has(C::BECAME_NATIVE | C::NATIVE));
    }

    #[test]
    fn test_byte_order_free_types_are_native() {
        let v = Variant::load(&VariantType::STRING, b"abc\0", foreign().with_lazy_byteswap());
        assert!(v.has(C::SOURCE_NATIVE));
    }

    #[test]
    fn test_wrong_size_fixed_value_reads_zeros() {
        let v = Variant::load(&VariantType::INT32, &[1, 2, 3], LoadFlags::new());
        assert_eq!(v.get_size(), 4);
        assert_eq!(&*v.get_data(), &[0, 0, 0, 0]);
        assert!(!v.is_normal());
    }

    #[test]
    fn test_require_is_idempotent() {
        let v = Variant::load(&ty("as"), b"a\0b\0\x02\x04", LoadFlags::new());
        v.require(C::TRUSTED | C::NATIVE);
        let before = v.conditions();
        let data = v.get_data();
        v.require(C::TRUSTED | C::NATIVE);
        assert_eq!(v.conditions(), before);
        assert!(v.get_data().ptr_eq(&data));
    }

    #[test]
    #[should_panic(expected = "cannot establish BECAME_NATIVE")]
    fn test_unsatisfiable_condition_panics() {
        let v = Variant::load(&VariantType::INT32, &[0; 4], LoadFlags::new());
        v.require(C::BECAME_NATIVE);
    }

    #[test]
    fn test_child_of_serialised_container_borrows_bytes() {
        let v = Variant::load(&ty("(ys)"), b"\x07hi\0", LoadFlags::trusted());
        let child = v.get_child_value(1);
        assert_eq!(child.type_string(), "s");
        assert!(child.has(C::TRUSTED | C::NATIVE));
        assert!(!child.has(C::INDEPENDENT));
        assert!(!child.is_floating());
        assert_eq!(child.get_data().as_ptr(), v.get_data()[1..].as_ptr());
    }

    #[test]
    fn test_untrusted_child_with_bad_frame_is_zero() {
        // Frame offset for the first string points past the body.
        let v = Variant::load(&ty("(ss)"), b"a\0b\0\x09", LoadFlags::new());
        let first = v.get_child_value(0);
        assert_eq!(first.get_size(), 0);
        assert!(!first.is_normal());
        assert!(!first.is_trusted());
        assert!(!v.is_normal());
    }

    #[test]
    fn test_normal_form_reconstructs_bad_data() {
        // (yi) with junk in the padding.
        let v = Variant::load(&ty("(yi)"), &[1, 9, 9, 9, 2, 0, 0, 0], LoadFlags::trusted().with_byte_order(ByteOrder::Little));
        assert!(v.is_trusted());

        let untrusted = Variant::load(&ty("(yi)"), &[1, 9, 9, 9, 2, 0, 0, 0], LoadFlags::new().with_byte_order(ByteOrder::Little));
        assert!(!untrusted.is_normal());
        let normal = untrusted.get_normal_form();
        assert!(normal.has(C::RECONSTRUCTED));
        assert_eq!(normal.get_child_value(0).get_byte(), 1);
        assert_eq!(normal.get_child_value(1).get_i32(), 2);
        assert!(normal.is_normal());
        assert_eq!(&normal.get_data()[1..4], &[0, 0, 0]);
    }

    #[test]
    fn test_normal_data_becomes_trusted_without_copy() {
        let v = Variant::load(&ty("as"), b"a\0b\0\x02\x04", LoadFlags::new());
        let data = v.get_data();
        v.get_normal_form();
        assert!(v.has(C::BECAME_TRUSTED));
        assert!(v.get_data().ptr_eq(&data));
    }

    #[test]
    fn test_byteswap_roundtrip() {
        let v = Variant::load(&ty("(nq)"), &[1, 2, 3, 4], LoadFlags::new());
        let swapped = v.byteswap();
        assert_eq!(&*swapped.get_data(), &[2, 1, 4, 3]);
        assert_eq!(swapped.byteswap(), v);
    }

    #[test]
    fn test_equality_ignores_representation() {
        let tree = Variant::new_tuple(vec![Variant::from_byte(1), Variant::new_string("x").unwrap()]);
        let flat = Variant::load(&ty("(ys)"), b"\x01x\0", LoadFlags::new());
        assert_eq!(tree, flat);
        assert_ne!(tree, Variant::load(&ty("(ys)"), b"\x02x\0", LoadFlags::new()));
    }

    #[test]
    fn test_wrap_releases_after_last_use() {
        use std::sync::atomic::AtomicBool;
        static RELEASED: AtomicBool = AtomicBool::new(false);

        let v = Variant::wrap(
            &VariantType::STRING_ARRAY,
            b"ab\0\x03".to_vec(),
            Some(Box::new(|| RELEASED.store(true, Ordering::SeqCst))),
            LoadFlags::trusted(),
        );
        let child = v.get_child_value(0);
        drop(v);
        assert!(!RELEASED.load(Ordering::SeqCst));
        assert_eq!(child.get_str(), "ab");
        drop(child);
        assert!(RELEASED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_ref_sink_once() {
        let v = Variant::from_i32(3);
        assert!(v.is_floating());
        let owned = v.ref_sink();
        assert!(!v.is_floating());
        assert_eq!(v.ref_count(), 2);
        drop(owned);
        assert_eq!(v.ref_count(), 1);
    }

    #[test]
    fn test_deep_copy_of_serialised_value() {
        let tree = Variant::new_tuple(vec![
            Variant::new_string("k").unwrap(),
            Variant::new_variant(Variant::from_u16(4)),
        ]);
        let src = Variant::load(&ty("(sv)"), &tree.get_data(), LoadFlags::new());
        let copy = src.deep_copy();
        assert!(copy.is_floating());
        assert!(copy.is_trusted());
        assert_eq!(copy, src);
    }
}
