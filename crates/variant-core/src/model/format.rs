//! Text notation for values.
//!
//! | Value | Text |
//! |---|---|
//! | boolean | `true` |
//! | byte | `0x05` |
//! | integers, doubles | `-7`, `1.5` |
//! | handle | `handle 3` |
//! | string | `'it\'s'` |
//! | object path, signature | `objectpath '/a'`, `signature 'ai'` |
//! | variant | `<5>` |
//! | maybe | `just 5`, `nothing` |
//! | array | `[1, 2]`, or `@ai []` when empty |
//! | dictionary | `{'a': 1, 'b': 2}`, or `@a{si} {}` when empty |
//! | tuple | `()`, `(1,)`, `(1, 'a')` |
//! | dictionary entry | `{'a', 1}` |

use std::fmt::{self, Write};

use crate::model::{Variant, VariantClass};

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classify() {
            VariantClass::Boolean => write!(f, "{}", self.get_bool()),
            VariantClass::Byte => write!(f, "0x{:02x}", self.get_byte()),
            VariantClass::Int16 => write!(f, "{}", self.get_i16()),
            VariantClass::Uint16 => write!(f, "{}", self.get_u16()),
            VariantClass::Int32 => write!(f, "{}", self.get_i32()),
            VariantClass::Uint32 => write!(f, "{}", self.get_u32()),
            VariantClass::Int64 => write!(f, "{}", self.get_i64()),
            VariantClass::Uint64 => write!(f, "{}", self.get_u64()),
            VariantClass::Handle => write!(f, "handle {}", self.get_handle()),
            VariantClass::Double => write!(f, "{:?}", self.get_f64()),
            VariantClass::String => write_quoted(f, &self.get_str()),
            VariantClass::ObjectPath => {
                f.write_str("objectpath ")?;
                write_quoted(f, &self.get_str())
            }
            VariantClass::Signature => {
                f.write_str("signature ")?;
                write_quoted(f, &self.get_str())
            }
            VariantClass::Variant => write!(f, "<{}>", self.get_variant()),
            VariantClass::Maybe => match self.get_maybe() {
                Some(child) => write!(f, "just {child}"),
                None => f.write_str("nothing"),
            },
            VariantClass::Array => write_array(self, f),
            VariantClass::Tuple => {
                let n = self.n_children();
                f.write_char('(')?;
                write_list(self, f)?;
                if n == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            VariantClass::DictEntry => {
                f.write_char('{')?;
                write_list(self, f)?;
                f.write_char('}')
            }
        }
    }
}

fn write_list(container: &Variant, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, child) in container.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{child}")?;
    }
    Ok(())
}

fn write_array(array: &Variant, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let is_dict = array.type_info().element().class() == VariantClass::DictEntry;

    if array.n_children() == 0 {
        let empty = if is_dict { "{}" } else { "[]" };
        return write!(f, "@{} {empty}", array.type_string());
    }

    if !is_dict {
        f.write_char('[')?;
        write_list(array, f)?;
        return f.write_char(']');
    }

    f.write_char('{')?;
    for (i, entry) in array.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", entry.get_child_value(0), entry.get_child_value(1))?;
    }
    f.write_char('}')
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_char('\'')?;
    for c in text.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('\'')
}
