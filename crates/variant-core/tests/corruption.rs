//! Untrusted input: reading must never panic, and normalising must always
//! produce trusted data in normal form.

use proptest::prelude::*;
use variant_core::{ByteOrder, LoadFlags, Variant, VariantType};

const TYPES: &[&str] = &[
    "b",
    "i",
    "s",
    "o",
    "g",
    "v",
    "ay",
    "as",
    "ai",
    "mi",
    "ms",
    "(yi)",
    "(ss)",
    "(sv)",
    "a{sv}",
    "aai",
    "a(ysx)",
    "mmv",
    "(iasmay)",
];

fn ty(s: &str) -> VariantType {
    VariantType::new(s).unwrap()
}

/// Reads every byte reachable through the value and returns a node count.
fn walk(value: &Variant) -> usize {
    let _ = value.get_size();
    let _ = value.get_data();
    let _ = value.to_string();
    if !value.is_container() {
        return 1;
    }
    1 + value.iter().map(|child| walk(&child)).sum::<usize>()
}

fn check_bytes(type_string: &str, data: &[u8], flags: LoadFlags) {
    let t = ty(type_string);
    let value = Variant::load(&t, data, flags);
    walk(&value);

    let normal = value.get_normal_form();
    assert!(normal.is_trusted());
    assert!(normal.is_normal());

    let reloaded = Variant::load(&t, &normal.get_data(), LoadFlags::new());
    assert!(reloaded.is_normal());
    assert_eq!(reloaded, normal);
}

#[test]
fn test_string_without_terminator() {
    let v = Variant::load(&VariantType::STRING, b"abc", LoadFlags::new());
    assert!(!v.is_normal());
    assert_eq!(v.get_str(), "");
    assert_eq!(&*v.get_normal_form().get_data(), b"\0");
}

#[test]
fn test_truncated_tuple() {
    let v = Variant::load(&ty("(yi)"), &[1, 0, 0], LoadFlags::new());
    assert_eq!(v.get_child_value(0).get_byte(), 0);
    assert_eq!(v.get_child_value(1).get_i32(), 0);
    assert!(!v.is_normal());
}

#[test]
fn test_array_offsets_out_of_range() {
    let v = Variant::load(&ty("as"), b"a\0b\0\x02\xff", LoadFlags::new());
    let n = v.n_children();
    for i in 0..n {
        let _ = v.get_child_value(i).get_str();
    }
    assert!(!v.is_normal());
    check_bytes("as", b"a\0b\0\x02\xff", LoadFlags::new());
}

#[test]
fn test_bad_boolean_is_not_normal() {
    let v = Variant::load(&VariantType::BOOLEAN, &[2], LoadFlags::new());
    assert!(!v.is_normal());
    assert!(v.get_bool());
    assert_eq!(&*v.get_normal_form().get_data(), &[1]);
}

#[test]
fn test_variant_with_invalid_type_reads_as_unit() {
    let v = Variant::load(&VariantType::VARIANT, b"\x01\0(z", LoadFlags::new());
    let child = v.get_variant();
    assert_eq!(child.type_string(), "()");
    assert_eq!(v.to_string(), "<()>");
    assert!(!v.is_normal());
}

#[test]
fn test_deeply_nested_variants_are_cut_off() {
    // 200 levels of `v` boxing a byte.
    let mut data = vec![7u8];
    data.extend_from_slice(b"\0y");
    for _ in 0..200 {
        data.extend_from_slice(b"\0v");
    }
    let mut value = Variant::load(&VariantType::VARIANT, &data, LoadFlags::new());
    let mut levels = 0;
    while value.classify() == variant_core::VariantClass::Variant {
        value = value.get_variant();
        levels += 1;
    }
    assert!(levels < 200);
    assert_eq!(value.type_string(), "()");
}

#[test]
fn test_zero_substitutes_share_storage() {
    let a = Variant::load(&VariantType::INT64, &[1], LoadFlags::new());
    let b = Variant::load(&VariantType::INT64, &[2, 3], LoadFlags::new());
    assert_eq!(a.get_data().as_ptr(), b.get_data().as_ptr());
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(
        index in 0..TYPES.len(),
        data in prop::collection::vec(any::<u8>(), 0..96),
    ) {
        check_bytes(TYPES[index], &data, LoadFlags::new());
    }

    #[test]
    fn arbitrary_foreign_bytes_never_panic(
        index in 0..TYPES.len(),
        data in prop::collection::vec(any::<u8>(), 0..96),
        lazy in any::<bool>(),
    ) {
        let mut flags = LoadFlags::new().with_byte_order(ByteOrder::foreign());
        if lazy {
            flags = flags.with_lazy_byteswap();
        }
        check_bytes(TYPES[index], &data, flags);
    }
}
