//! Type strings.
//!
//! A type string describes exactly one complete type. Basic types are single
//! characters; containers nest:
//!
//! | String | Meaning |
//! |--------|---------|
//! | `b y n q i u x t h d` | fixed-size numbers and booleans |
//! | `s o g` | string, object path, signature |
//! | `v` | boxed value carrying its own type |
//! | `aT` / `mT` | array / maybe of `T` |
//! | `(T...)` | tuple |
//! | `{KT}` | dictionary entry with basic key `K` |
//! | `*` `?` `r` | indefinite: any type, any basic type, any tuple |

use std::borrow::Cow;
use std::fmt;

use crate::error::TypeError;
use crate::limits::{MAX_RECURSION_DEPTH, MAX_TYPE_STRING_LEN};

/// Class of a value, identified by the first character of its type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VariantClass {
    Boolean = b'b',
    Byte = b'y',
    Int16 = b'n',
    Uint16 = b'q',
    Int32 = b'i',
    Uint32 = b'u',
    Int64 = b'x',
    Uint64 = b't',
    Handle = b'h',
    Double = b'd',
    String = b's',
    ObjectPath = b'o',
    Signature = b'g',
    Variant = b'v',
    Maybe = b'm',
    Array = b'a',
    Tuple = b'(',
    DictEntry = b'{',
}

impl VariantClass {
    /// Creates a class from the leading character of a type string.
    ///
    /// The indefinite tuple `r` maps to [`VariantClass::Tuple`]; `*` and `?`
    /// have no class.
    pub fn from_u8(c: u8) -> Option<VariantClass> {
        match c {
            b'b' => Some(VariantClass::Boolean),
            b'y' => Some(VariantClass::Byte),
            b'n' => Some(VariantClass::Int16),
            b'q' => Some(VariantClass::Uint16),
            b'i' => Some(VariantClass::Int32),
            b'u' => Some(VariantClass::Uint32),
            b'x' => Some(VariantClass::Int64),
            b't' => Some(VariantClass::Uint64),
            b'h' => Some(VariantClass::Handle),
            b'd' => Some(VariantClass::Double),
            b's' => Some(VariantClass::String),
            b'o' => Some(VariantClass::ObjectPath),
            b'g' => Some(VariantClass::Signature),
            b'v' => Some(VariantClass::Variant),
            b'm' => Some(VariantClass::Maybe),
            b'a' => Some(VariantClass::Array),
            b'(' | b'r' => Some(VariantClass::Tuple),
            b'{' => Some(VariantClass::DictEntry),
            _ => None,
        }
    }

    /// Returns the type character for this class.
    pub fn as_char(self) -> char {
        self as u8 as char
    }

    /// Returns true for the string-like classes `s`, `o` and `g`.
    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            VariantClass::String | VariantClass::ObjectPath | VariantClass::Signature
        )
    }

    /// Returns true for classes that hold child values.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            VariantClass::Variant
                | VariantClass::Maybe
                | VariantClass::Array
                | VariantClass::Tuple
                | VariantClass::DictEntry
        )
    }
}

/// A validated type string.
///
/// Cheap to clone for the predefined constants, which borrow static strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantType(Cow<'static, str>);

macro_rules! static_types {
    ($($(#[$doc:meta])* $name:ident = $s:literal;)*) => {
        impl VariantType {
            $(
                $(#[$doc])*
                pub const $name: VariantType = VariantType(Cow::Borrowed($s));
            )*
        }
    };
}

static_types! {
    /// `b`
    BOOLEAN = "b";
    /// `y`
    BYTE = "y";
    /// `n`
    INT16 = "n";
    /// `q`
    UINT16 = "q";
    /// `i`
    INT32 = "i";
    /// `u`
    UINT32 = "u";
    /// `x`
    INT64 = "x";
    /// `t`
    UINT64 = "t";
    /// `h`
    HANDLE = "h";
    /// `d`
    DOUBLE = "d";
    /// `s`
    STRING = "s";
    /// `o`
    OBJECT_PATH = "o";
    /// `g`
    SIGNATURE = "g";
    /// `v`
    VARIANT = "v";
    /// `*`
    ANY = "*";
    /// `?`
    BASIC = "?";
    /// `m*`
    MAYBE = "m*";
    /// `a*`
    ARRAY = "a*";
    /// `r`
    TUPLE = "r";
    /// `()`
    UNIT = "()";
    /// `{?*}`
    DICT_ENTRY = "{?*}";
    /// `a{?*}`
    DICTIONARY = "a{?*}";
    /// `as`
    STRING_ARRAY = "as";
    /// `ay`
    BYTE_STRING = "ay";
    /// `a{sv}`
    VARDICT = "a{sv}";
}

impl VariantType {
    /// Parses and validates a type string.
    pub fn new(s: &str) -> Result<VariantType, TypeError> {
        if s.is_empty() {
            return Err(TypeError::Empty);
        }
        if s.len() > MAX_TYPE_STRING_LEN {
            return Err(TypeError::TooLong {
                len: s.len(),
                max: MAX_TYPE_STRING_LEN,
            });
        }
        let end = scan(s.as_bytes(), 0, 1)?;
        if end != s.len() {
            return Err(TypeError::TrailingData { pos: end });
        }
        Ok(VariantType(Cow::Owned(s.to_owned())))
    }

    /// Wraps a string already known to hold exactly one complete type.
    pub(crate) fn from_valid(s: &str) -> VariantType {
        debug_assert_eq!(scan(s.as_bytes(), 0, 1), Ok(s.len()));
        VariantType(Cow::Owned(s.to_owned()))
    }

    /// Returns the type string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    fn first_byte(&self) -> u8 {
        self.as_bytes()[0]
    }

    /// Returns the class of the type, or `None` for `*` and `?`.
    pub fn class(&self) -> Option<VariantClass> {
        VariantClass::from_u8(self.first_byte())
    }

    /// Returns true if the type contains no indefinite parts.
    pub fn is_definite(&self) -> bool {
        !self.as_bytes().iter().any(|c| matches!(c, b'*' | b'?' | b'r'))
    }

    /// Returns true for basic types, including the indefinite `?`.
    pub fn is_basic(&self) -> bool {
        self.0.len() == 1 && is_basic_char(self.first_byte())
    }

    /// Returns true for container types (`v` counts as a container).
    pub fn is_container(&self) -> bool {
        matches!(self.first_byte(), b'a' | b'm' | b'(' | b'{' | b'v' | b'r')
    }

    pub fn is_array(&self) -> bool {
        self.first_byte() == b'a'
    }

    pub fn is_maybe(&self) -> bool {
        self.first_byte() == b'm'
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.first_byte(), b'(' | b'r')
    }

    pub fn is_dict_entry(&self) -> bool {
        self.first_byte() == b'{'
    }

    pub fn is_variant(&self) -> bool {
        self.first_byte() == b'v'
    }

    /// Returns the element type of an array or maybe type.
    ///
    /// # Panics
    ///
    /// Panics if the type is not an array or maybe type.
    pub fn element(&self) -> VariantType {
        assert!(
            self.is_array() || self.is_maybe(),
            "{self} has no element type"
        );
        VariantType::from_valid(&self.0[1..])
    }

    /// Returns the member types of a definite-length tuple or a dictionary
    /// entry. The indefinite tuple `r` has no known members.
    pub fn items(&self) -> Vec<VariantType> {
        let bytes = self.as_bytes();
        if !matches!(bytes[0], b'(' | b'{') {
            return Vec::new();
        }
        let mut items = Vec::new();
        let mut pos = 1;
        while !matches!(bytes[pos], b')' | b'}') {
            // Validated at construction, so every member scans cleanly.
            let end = scan(bytes, pos, 1).unwrap_or(bytes.len() - 1);
            items.push(VariantType::from_valid(&self.0[pos..end]));
            pos = end;
        }
        items
    }

    /// Returns the number of members of a tuple or dictionary entry.
    pub fn n_items(&self) -> usize {
        self.items().len()
    }

    /// Returns the key type of a dictionary entry type.
    ///
    /// # Panics
    ///
    /// Panics if the type is not a dictionary entry type.
    pub fn key(&self) -> VariantType {
        assert!(self.is_dict_entry(), "{self} is not a dictionary entry type");
        VariantType::from_valid(&self.0[1..2])
    }

    /// Returns the value type of a dictionary entry type.
    ///
    /// # Panics
    ///
    /// Panics if the type is not a dictionary entry type.
    pub fn value(&self) -> VariantType {
        assert!(self.is_dict_entry(), "{self} is not a dictionary entry type");
        VariantType::from_valid(&self.0[2..self.0.len() - 1])
    }

    /// Returns the nesting depth; basic types and `v` have depth 1.
    pub fn depth(&self) -> usize {
        type_depth(self.as_bytes(), 0).1
    }

    /// Returns true if every value of `self` is also a value of `supertype`.
    ///
    /// Wildcards in `supertype` match: `*` any type, `?` any basic type,
    /// `r` any tuple.
    pub fn is_subtype_of(&self, supertype: &VariantType) -> bool {
        let sup = supertype.as_bytes();
        let ty = self.as_bytes();
        let mut i = 0;

        for &s in sup {
            let Some(&t) = ty.get(i) else {
                return false;
            };
            if s == t {
                i += 1;
                continue;
            }
            if t == b')' || t == b'}' {
                return false;
            }
            let Ok(end) = scan(ty, i, 1) else {
                return false;
            };
            let target = &ty[i..end];
            let matched = match s {
                b'*' => true,
                b'?' => target.len() == 1 && is_basic_char(target[0]),
                b'r' => matches!(target[0], b'(' | b'r'),
                _ => false,
            };
            if !matched {
                return false;
            }
            i = end;
        }

        i == ty.len()
    }

    /// Creates the array type `a<element>`.
    pub fn new_array(element: &VariantType) -> VariantType {
        VariantType(Cow::Owned(format!("a{element}")))
    }

    /// Creates the maybe type `m<element>`.
    pub fn new_maybe(element: &VariantType) -> VariantType {
        VariantType(Cow::Owned(format!("m{element}")))
    }

    /// Creates a tuple type from its member types.
    pub fn new_tuple<'a>(items: impl IntoIterator<Item = &'a VariantType>) -> VariantType {
        let mut s = String::from("(");
        for item in items {
            s.push_str(item.as_str());
        }
        s.push(')');
        VariantType(Cow::Owned(s))
    }

    /// Creates the dictionary entry type `{<key><value>}`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not a basic type.
    pub fn new_dict_entry(key: &VariantType, value: &VariantType) -> VariantType {
        assert!(key.is_basic(), "dictionary key {key} is not a basic type");
        VariantType(Cow::Owned(format!("{{{key}{value}}}")))
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VariantType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VariantType::new(s)
    }
}

pub(crate) fn is_basic_char(c: u8) -> bool {
    matches!(
        c,
        b'b' | b'y' | b'n' | b'q' | b'i' | b'u' | b'x' | b't' | b'h' | b'd' | b's' | b'o' | b'g'
            | b'?'
    )
}

/// Scans one complete type starting at `pos`, returning the end position.
pub(crate) fn scan(bytes: &[u8], pos: usize, depth: usize) -> Result<usize, TypeError> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(TypeError::TooDeep {
            max: MAX_RECURSION_DEPTH,
        });
    }
    let Some(&c) = bytes.get(pos) else {
        return Err(TypeError::Incomplete);
    };

    match c {
        b'v' | b'*' | b'r' => Ok(pos + 1),
        c if is_basic_char(c) => Ok(pos + 1),
        b'a' | b'm' => scan(bytes, pos + 1, depth + 1),
        b'(' => {
            let mut p = pos + 1;
            loop {
                match bytes.get(p) {
                    None => return Err(TypeError::Incomplete),
                    Some(b')') => return Ok(p + 1),
                    Some(_) => p = scan(bytes, p, depth + 1)?,
                }
            }
        }
        b'{' => {
            let key_pos = pos + 1;
            let Some(&key) = bytes.get(key_pos) else {
                return Err(TypeError::Incomplete);
            };
            if !is_basic_char(key) {
                return Err(TypeError::NonBasicDictKey { pos: key_pos });
            }
            let value_end = scan(bytes, key_pos + 1, depth + 1)?;
            match bytes.get(value_end) {
                Some(b'}') => Ok(value_end + 1),
                Some(&other) => Err(TypeError::UnexpectedChar {
                    pos: value_end,
                    found: other as char,
                }),
                None => Err(TypeError::Incomplete),
            }
        }
        other => Err(TypeError::UnexpectedChar {
            pos,
            found: other as char,
        }),
    }
}

/// Returns (end position, depth) of the complete type at `pos`.
fn type_depth(bytes: &[u8], pos: usize) -> (usize, usize) {
    match bytes[pos] {
        b'a' | b'm' => {
            let (end, depth) = type_depth(bytes, pos + 1);
            (end, depth + 1)
        }
        b'(' | b'{' => {
            let mut p = pos + 1;
            let mut max = 0;
            while !matches!(bytes[p], b')' | b'}') {
                let (end, depth) = type_depth(bytes, p);
                max = max.max(depth);
                p = end;
            }
            (p + 1, max + 1)
        }
        _ => (pos + 1, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> VariantType {
        VariantType::new(s).unwrap()
    }

    #[test]
    fn test_parse_valid() {
        for s in ["i", "as", "a{sv}", "(ii)", "()", "m(sa{sv})", "aai", "r", "a*", "{?*}", "v"] {
            assert_eq!(VariantType::new(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(VariantType::new(""), Err(TypeError::Empty));
        assert_eq!(VariantType::new("a"), Err(TypeError::Incomplete));
        assert_eq!(VariantType::new("(ii"), Err(TypeError::Incomplete));
        assert_eq!(VariantType::new("ii"), Err(TypeError::TrailingData { pos: 1 }));
        assert_eq!(
            VariantType::new("{asi}"),
            Err(TypeError::NonBasicDictKey { pos: 1 })
        );
        assert_eq!(
            VariantType::new("{sii}"),
            Err(TypeError::UnexpectedChar { pos: 3, found: 'i' })
        );
        assert!(matches!(
            VariantType::new("z"),
            Err(TypeError::UnexpectedChar { pos: 0, found: 'z' })
        ));
    }

    #[test]
    fn test_parse_too_deep() {
        let deep = "a".repeat(MAX_RECURSION_DEPTH + 1) + "i";
        assert!(matches!(
            VariantType::new(&deep),
            Err(TypeError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_definite() {
        assert!(ty("a{sv}").is_definite());
        assert!(!ty("a*").is_definite());
        assert!(!ty("(ir)").is_definite());
        assert!(!ty("{?i}").is_definite());
    }

    #[test]
    fn test_items_and_parts() {
        assert_eq!(ty("(ias)").items(), vec![ty("i"), ty("as")]);
        assert_eq!(ty("()").items(), Vec::<VariantType>::new());
        assert_eq!(ty("{sv}").key(), ty("s"));
        assert_eq!(ty("{s(ii)}").value(), ty("(ii)"));
        assert_eq!(ty("aai").element(), ty("ai"));
        assert_eq!(ty("ms").element(), ty("s"));
    }

    #[test]
    fn test_depth() {
        assert_eq!(ty("i").depth(), 1);
        assert_eq!(ty("ai").depth(), 2);
        assert_eq!(ty("(ai)").depth(), 3);
        assert_eq!(ty("a{sv}").depth(), 3);
        assert_eq!(ty("()").depth(), 1);
    }

    #[test]
    fn test_subtype() {
        assert!(ty("ai").is_subtype_of(&ty("a*")));
        assert!(ty("ai").is_subtype_of(&ty("*")));
        assert!(ty("i").is_subtype_of(&ty("?")));
        assert!(!ty("ai").is_subtype_of(&ty("?")));
        assert!(ty("(is)").is_subtype_of(&ty("r")));
        assert!(ty("(is)").is_subtype_of(&ty("(*s)")));
        assert!(!ty("(i)").is_subtype_of(&ty("(ii)")));
        assert!(!ty("(ii)").is_subtype_of(&ty("(i)")));
        assert!(ty("a{sv}").is_subtype_of(&ty("a{?*}")));
        assert!(!ty("as").is_subtype_of(&ty("ai")));
        assert!(ty("a*").is_subtype_of(&ty("a*")));
    }

    #[test]
    fn test_constructors() {
        assert_eq!(VariantType::new_array(&VariantType::INT32), ty("ai"));
        assert_eq!(VariantType::new_maybe(&VariantType::STRING), ty("ms"));
        assert_eq!(
            VariantType::new_tuple([&VariantType::INT32, &VariantType::STRING]),
            ty("(is)")
        );
        assert_eq!(
            VariantType::new_dict_entry(&VariantType::STRING, &VariantType::VARIANT),
            ty("{sv}")
        );
    }

    #[test]
    fn test_class() {
        assert_eq!(ty("a{sv}").class(), Some(VariantClass::Array));
        assert_eq!(ty("r").class(), Some(VariantClass::Tuple));
        assert_eq!(ty("*").class(), None);
        assert_eq!(VariantClass::Int32.as_char(), 'i');
        assert!(VariantClass::Variant.is_container());
    }
}
