//! Constructors and getters for basic values, boxing, maybes and
//! dictionary lookup.
//!
//! Every constructor here produces a floating, trusted, native value.
//! Getters panic when called on a value of another type.

use std::sync::Arc;

use crate::error::{BuilderError, ValueError};
use crate::model::condition::Conditions;
use crate::model::value::Source;
use crate::model::{TypeInfo, Variant, VariantBuilder, VariantClass, VariantType};
use crate::util::VariantBytes;
use crate::validate::{is_object_path, is_signature, string_contents};

macro_rules! numeric_accessors {
    ($($new:ident, $get:ident, $ty:ty, $class:ident, $type_const:ident;)*) => {
        impl Variant {
            $(
                #[doc = concat!("Creates a `", stringify!($ty), "` value of class [`VariantClass::", stringify!($class), "`].")]
                pub fn $new(value: $ty) -> Variant {
                    Variant::trusted_leaf(&VariantType::$type_const, value.to_ne_bytes().to_vec())
                }

                #[doc = concat!("Returns the value of a [`VariantClass::", stringify!($class), "`] value.")]
                pub fn $get(&self) -> $ty {
                    <$ty>::from_ne_bytes(self.fixed_bytes(VariantClass::$class))
                }
            )*
        }

        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Variant {
                    Variant::$new(value)
                }
            }
        )*
    };
}

numeric_accessors! {
    from_byte, get_byte, u8, Byte, BYTE;
    from_i16, get_i16, i16, Int16, INT16;
    from_u16, get_u16, u16, Uint16, UINT16;
    from_i32, get_i32, i32, Int32, INT32;
    from_u32, get_u32, u32, Uint32, UINT32;
    from_i64, get_i64, i64, Int64, INT64;
    from_u64, get_u64, u64, Uint64, UINT64;
    from_f64, get_f64, f64, Double, DOUBLE;
}

impl Variant {
    fn trusted_leaf(ty: &VariantType, bytes: Vec<u8>) -> Variant {
        Variant::serialised(
            TypeInfo::get(ty),
            0,
            Source::Independent,
            VariantBytes::from_vec(bytes),
            Conditions::SOURCE_NATIVE | Conditions::SOURCE_TRUSTED,
            false,
        )
    }

    /// Creates a string, object path or signature value from text already
    /// known to be valid for its type.
    pub(crate) fn string_like(info: Arc<TypeInfo>, text: &str) -> Variant {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        Variant::serialised(
            info,
            0,
            Source::Independent,
            VariantBytes::from_vec(bytes),
            Conditions::SOURCE_NATIVE | Conditions::SOURCE_TRUSTED,
            false,
        )
    }

    fn assert_class(&self, class: VariantClass) {
        assert_eq!(
            self.classify(),
            class,
            "expected a value of class '{}', found {}",
            class.as_char(),
            self.type_string()
        );
    }

    fn fixed_bytes<const N: usize>(&self, class: VariantClass) -> [u8; N] {
        self.assert_class(class);
        let data = self.get_data();
        let mut out = [0; N];
        out.copy_from_slice(&data);
        out
    }

    pub fn from_bool(value: bool) -> Variant {
        Variant::trusted_leaf(&VariantType::BOOLEAN, vec![u8::from(value)])
    }

    /// Returns the value of a boolean. Any nonzero byte reads as `true`.
    pub fn get_bool(&self) -> bool {
        self.fixed_bytes::<1>(VariantClass::Boolean)[0] != 0
    }

    /// Creates a handle: an index into an out-of-band array of file
    /// descriptors.
    pub fn from_handle(value: i32) -> Variant {
        Variant::trusted_leaf(&VariantType::HANDLE, value.to_ne_bytes().to_vec())
    }

    pub fn get_handle(&self) -> i32 {
        i32::from_ne_bytes(self.fixed_bytes(VariantClass::Handle))
    }

    pub fn new_string(text: &str) -> Result<Variant, ValueError> {
        if let Some(pos) = text.bytes().position(|b| b == 0) {
            return Err(ValueError::InteriorNul { pos });
        }
        Ok(Variant::string_like(TypeInfo::get(&VariantType::STRING), text))
    }

    pub fn new_object_path(path: &str) -> Result<Variant, ValueError> {
        if !is_object_path(path) {
            return Err(ValueError::InvalidObjectPath {
                path: path.to_owned(),
            });
        }
        Ok(Variant::string_like(TypeInfo::get(&VariantType::OBJECT_PATH), path))
    }

    pub fn new_signature(signature: &str) -> Result<Variant, ValueError> {
        if !is_signature(signature) {
            return Err(ValueError::InvalidSignature {
                signature: signature.to_owned(),
            });
        }
        Ok(Variant::string_like(TypeInfo::get(&VariantType::SIGNATURE), signature))
    }

    /// Returns the text of a string, object path or signature.
    ///
    /// Unreadable data yields a valid default: `/` for object paths and the
    /// empty string otherwise.
    pub fn get_str(&self) -> String {
        let class = self.classify();
        assert!(
            class.is_string_like(),
            "expected a string value, found {}",
            self.type_string()
        );

        let data = self.get_data();
        let trusted = self.is_trusted();
        let text = string_contents(&data).filter(|text| {
            trusted
                || match class {
                    VariantClass::ObjectPath => is_object_path(text),
                    VariantClass::Signature => is_signature(text),
                    _ => true,
                }
        });

        match text {
            Some(text) => text.to_owned(),
            None if class == VariantClass::ObjectPath => "/".to_owned(),
            None => String::new(),
        }
    }

    /// Returns the strings of an `as`, `ao` or `ag` value.
    pub fn get_strv(&self) -> Vec<String> {
        self.assert_class(VariantClass::Array);
        assert!(
            self.type_info().element().class().is_string_like(),
            "expected an array of strings, found {}",
            self.type_string()
        );
        self.iter().map(|child| child.get_str()).collect()
    }

    /// Boxes `child` in a `v` value.
    pub fn new_variant(child: Variant) -> Variant {
        let trusted = child.is_trusted();
        Variant::tree(TypeInfo::get(&VariantType::VARIANT), vec![child], trusted)
    }

    /// Unboxes a `v` value.
    pub fn get_variant(&self) -> Variant {
        self.assert_class(VariantClass::Variant);
        self.get_child_value(0)
    }

    /// Creates a maybe holding `child`, or nothing.
    ///
    /// The element type comes from `child_type` if given, else from `child`.
    pub fn new_maybe(child_type: Option<&VariantType>, child: Option<Variant>) -> Result<Variant, BuilderError> {
        let element = child_type.cloned().unwrap_or(VariantType::ANY);
        let mut builder = VariantBuilder::new(&VariantType::new_maybe(&element))?;
        if let Some(child) = child {
            builder.add_value(child)?;
        }
        builder.end()
    }

    pub fn get_maybe(&self) -> Option<Variant> {
        self.assert_class(VariantClass::Maybe);
        (self.n_children() == 1).then(|| self.get_child_value(0))
    }

    /// Creates an array of `children`, which must all have the same type.
    ///
    /// The element type comes from `child_type` if given, else from the
    /// first child; an empty array needs `child_type`.
    pub fn new_array<I>(child_type: Option<&VariantType>, children: I) -> Result<Variant, BuilderError>
    where
        I: IntoIterator<Item = Variant>,
    {
        let element = child_type.cloned().unwrap_or(VariantType::ANY);
        let mut builder = VariantBuilder::new(&VariantType::new_array(&element))?;
        for child in children {
            builder.add_value(child)?;
        }
        builder.end()
    }

    pub fn new_tuple<I>(children: I) -> Variant
    where
        I: IntoIterator<Item = Variant>,
    {
        let children: Vec<Variant> = children.into_iter().collect();
        let ty = VariantType::new_tuple(children.iter().map(Variant::variant_type));
        let trusted = children.iter().all(Variant::is_trusted);
        Variant::tree(TypeInfo::get(&ty), children, trusted)
    }

    /// Creates a dictionary entry; `key` must be of a basic type.
    pub fn new_dict_entry(key: Variant, value: Variant) -> Result<Variant, BuilderError> {
        let mut builder = VariantBuilder::new(&VariantType::DICT_ENTRY)?;
        builder.add_value(key)?;
        builder.add_value(value)?;
        builder.end()
    }

    /// Looks up `key` in a dictionary with string-like keys.
    ///
    /// Boxed values are unboxed. Returns `None` if the key is absent or the
    /// value is not of `expected` type.
    pub fn lookup_value(&self, key: &str, expected: Option<&VariantType>) -> Option<Variant> {
        let element = self.type_info().element();
        assert!(
            element.class() == VariantClass::DictEntry && element.key().class().is_string_like(),
            "lookup needs a dictionary with string keys, found {}",
            self.type_string()
        );

        let entry = self
            .iter()
            .find(|entry| entry.get_child_value(0).get_str() == key)?;
        let mut value = entry.get_child_value(1);
        if value.classify() == VariantClass::Variant {
            value = value.get_variant();
        }
        match expected {
            Some(expected) if !value.variant_type().is_subtype_of(expected) => None,
            _ => Some(value),
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Variant {
        Variant::from_bool(value)
    }
}
