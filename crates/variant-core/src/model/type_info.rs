//! Per-type structural facts, cached process-wide.
//!
//! The serialiser needs alignment, fixed size and member layout for every
//! type it touches. Those are computed once per type string and shared
//! through `Arc<TypeInfo>`.

use std::sync::{Arc, Weak};

use lazy_static::lazy_static;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::limits::TYPE_INFO_PRUNE_THRESHOLD;
use crate::model::{VariantClass, VariantType};

lazy_static! {
    static ref TYPE_INFO_CACHE: Mutex<FxHashMap<VariantType, Weak<TypeInfo>>> =
        Mutex::new(FxHashMap::default());
}

/// Structural facts about one definite type.
#[derive(Debug)]
pub struct TypeInfo {
    ty: VariantType,
    class: VariantClass,
    /// Alignment mask: 0, 1, 3 or 7.
    alignment: usize,
    /// Zero for variable-sized types.
    fixed_size: usize,
    element: Option<Arc<TypeInfo>>,
    members: Vec<Arc<TypeInfo>>,
}

impl TypeInfo {
    /// Returns the cached info for a definite type, creating it on first use.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is indefinite.
    pub fn get(ty: &VariantType) -> Arc<TypeInfo> {
        assert!(ty.is_definite(), "no type info for indefinite type {ty}");

        if let Some(info) = TYPE_INFO_CACHE.lock().get(ty).and_then(Weak::upgrade) {
            return info;
        }

        // Built without the cache lock: member infos recurse into `get`.
        let info = Arc::new(TypeInfo::build(ty));

        let mut cache = TYPE_INFO_CACHE.lock();
        if let Some(existing) = cache.get(ty).and_then(Weak::upgrade) {
            return existing;
        }
        if cache.len() >= TYPE_INFO_PRUNE_THRESHOLD {
            cache.retain(|_, weak| weak.strong_count() > 0);
        }
        cache.insert(ty.clone(), Arc::downgrade(&info));
        info
    }

    fn build(ty: &VariantType) -> TypeInfo {
        // Definite types always have a class.
        let class = ty.class().unwrap_or(VariantClass::Tuple);
        let (alignment, fixed_size) = match class {
            VariantClass::Boolean | VariantClass::Byte => (0, 1),
            VariantClass::Int16 | VariantClass::Uint16 => (1, 2),
            VariantClass::Int32 | VariantClass::Uint32 | VariantClass::Handle => (3, 4),
            VariantClass::Int64 | VariantClass::Uint64 | VariantClass::Double => (7, 8),
            VariantClass::String | VariantClass::ObjectPath | VariantClass::Signature => (0, 0),
            VariantClass::Variant => (7, 0),
            VariantClass::Maybe | VariantClass::Array | VariantClass::Tuple
            | VariantClass::DictEntry => (0, 0),
        };

        let mut info = TypeInfo {
            ty: ty.clone(),
            class,
            alignment,
            fixed_size,
            element: None,
            members: Vec::new(),
        };

        match class {
            VariantClass::Maybe | VariantClass::Array => {
                let element = TypeInfo::get(&ty.element());
                info.alignment = element.alignment;
                info.element = Some(element);
            }
            VariantClass::Tuple | VariantClass::DictEntry => {
                info.members = ty.items().iter().map(TypeInfo::get).collect();
                info.alignment = info.members.iter().map(|m| m.alignment).max().unwrap_or(0);
                info.fixed_size = tuple_fixed_size(&info.members, info.alignment);
            }
            _ => {}
        }

        info
    }

    /// Returns the type this info describes.
    pub fn variant_type(&self) -> &VariantType {
        &self.ty
    }

    /// Returns the type string.
    pub fn type_string(&self) -> &str {
        self.ty.as_str()
    }

    pub fn class(&self) -> VariantClass {
        self.class
    }

    pub fn is_container(&self) -> bool {
        self.class.is_container()
    }

    /// Returns the alignment mask (alignment minus one).
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Returns the serialised size shared by every value of this type, if any.
    pub fn fixed_size(&self) -> Option<usize> {
        (self.fixed_size != 0).then_some(self.fixed_size)
    }

    /// Returns the element info of an array or maybe type.
    ///
    /// # Panics
    ///
    /// Panics for other classes.
    pub fn element(&self) -> &Arc<TypeInfo> {
        self.element
            .as_ref()
            .unwrap_or_else(|| panic!("{} has no element type", self.ty))
    }

    /// Returns the key info of a dictionary entry type.
    pub fn key(&self) -> &Arc<TypeInfo> {
        assert_eq!(self.class, VariantClass::DictEntry, "{} has no key", self.ty);
        &self.members[0]
    }

    /// Returns the member infos of a tuple or dictionary entry type.
    pub fn members(&self) -> &[Arc<TypeInfo>] {
        &self.members
    }

    /// Returns true if values of this type contain multi-byte numbers
    /// whose representation depends on byte order.
    pub fn has_byte_order(&self) -> bool {
        match self.class {
            VariantClass::Int16
            | VariantClass::Uint16
            | VariantClass::Int32
            | VariantClass::Uint32
            | VariantClass::Int64
            | VariantClass::Uint64
            | VariantClass::Handle
            | VariantClass::Double
            | VariantClass::Variant => true,
            VariantClass::Boolean
            | VariantClass::Byte
            | VariantClass::String
            | VariantClass::ObjectPath
            | VariantClass::Signature => false,
            VariantClass::Maybe | VariantClass::Array => self.element().has_byte_order(),
            VariantClass::Tuple | VariantClass::DictEntry => {
                self.members.iter().any(|m| m.has_byte_order())
            }
        }
    }
}

pub(crate) fn align_up(offset: usize, alignment: usize) -> usize {
    (offset + alignment) & !alignment
}

fn tuple_fixed_size(members: &[Arc<TypeInfo>], alignment: usize) -> usize {
    let mut offset = 0;
    for member in members {
        let Some(size) = member.fixed_size() else {
            return 0;
        };
        offset = align_up(offset, member.alignment) + size;
    }
    if offset == 0 {
        // The unit tuple occupies one byte.
        1
    } else {
        align_up(offset, alignment)
    }
}
