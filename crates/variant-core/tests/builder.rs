//! Builder contracts and text output of built values.

use variant_core::{BuilderError, ContainerClass, LoadFlags, Variant, VariantBuilder, VariantType};

fn ty(s: &str) -> VariantType {
    VariantType::new(s).unwrap()
}

fn string(s: &str) -> Variant {
    Variant::new_string(s).unwrap()
}

#[test]
fn test_dict_entry_needs_exactly_two() {
    let mut b = VariantBuilder::with_class(ContainerClass::DictEntry);
    b.add_value(string("key")).unwrap();
    assert!(matches!(b.check_end(), Err(BuilderError::TooFew { min: 2, found: 1, .. })));

    b.add_value(Variant::from_i32(1)).unwrap();
    b.check_end().unwrap();
    assert!(matches!(
        b.add_value(Variant::from_i32(2)),
        Err(BuilderError::TooMany { max: 2, .. })
    ));
    assert_eq!(b.end().unwrap().type_string(), "{si}");
}

#[test]
fn test_variant_and_maybe_cardinality() {
    let b = VariantBuilder::with_class(ContainerClass::Variant);
    assert!(matches!(b.check_end(), Err(BuilderError::TooFew { min: 1, found: 0, .. })));

    let mut b = VariantBuilder::new(&ty("mi")).unwrap();
    b.add_value(Variant::from_i32(1)).unwrap();
    assert!(matches!(
        b.check_add(&VariantType::INT32),
        Err(BuilderError::TooMany { max: 1, .. })
    ));
}

#[test]
fn test_array_rejects_second_type() {
    let mut b = VariantBuilder::with_class(ContainerClass::Array);
    b.add_value(Variant::from_i32(1)).unwrap();
    let err = b.check_add(&VariantType::STRING).unwrap_err();
    assert_eq!(
        err,
        BuilderError::TypeMismatch {
            expected: VariantType::INT32,
            found: VariantType::STRING,
        }
    );
    assert_eq!(
        err.to_string(),
        "type mismatch: expected i, found s"
    );
}

#[test]
fn test_dict_key_must_be_basic() {
    let mut b = VariantBuilder::with_class(ContainerClass::DictEntry);
    assert!(matches!(
        b.add_value(Variant::new_variant(Variant::from_i32(1))),
        Err(BuilderError::TypeMismatch { .. })
    ));
}

#[test]
fn test_nested_vardict() {
    let mut b = VariantBuilder::new(&VariantType::VARDICT).unwrap();
    for (key, value) in [("name", string("Ada")), ("age", Variant::from_u32(36))] {
        b.open(&VariantType::DICT_ENTRY).unwrap();
        b.add_value(string(key)).unwrap();
        b.add_value(Variant::new_variant(value)).unwrap();
        b.close().unwrap();
    }
    let dict = b.end().unwrap();

    assert_eq!(dict.type_string(), "a{sv}");
    assert!(dict.is_trusted());
    assert_eq!(dict.to_string(), "{'name': <'Ada'>, 'age': <36>}");
    assert_eq!(dict.lookup_value("age", None).unwrap().get_u32(), 36);

    let loaded = Variant::load(&VariantType::VARDICT, &dict.get_data(), LoadFlags::new());
    assert!(loaded.is_normal());
    assert_eq!(loaded.to_string(), dict.to_string());
}

#[test]
fn test_indefinite_tuple_members() {
    let mut b = VariantBuilder::new(&ty("(i*)")).unwrap();
    b.add_value(Variant::from_i32(4)).unwrap();
    b.open(&VariantType::new_maybe(&VariantType::STRING)).unwrap();
    b.close().unwrap();
    let value = b.end().unwrap();
    assert_eq!(value.type_string(), "(ims)");
    assert_eq!(value.to_string(), "(4, nothing)");
}

#[test]
fn test_empty_indefinite_tuple_is_unit() {
    let unit = VariantBuilder::with_class(ContainerClass::Tuple).end().unwrap();
    assert_eq!(unit.type_string(), "()");

    let mut b = VariantBuilder::new(&ty("(ir)")).unwrap();
    b.add_value(Variant::from_i32(2)).unwrap();
    b.open(&ty("r")).unwrap();
    b.close().unwrap();
    let value = b.end().unwrap();
    assert_eq!(value.type_string(), "(i())");
    assert_eq!(value.to_string(), "(2, ())");
}

#[test]
fn test_error_leaves_builder_usable() {
    let mut b = VariantBuilder::new(&ty("ay")).unwrap();
    b.add_value(Variant::from_byte(1)).unwrap();
    assert!(b.add_value(Variant::from_u16(2)).is_err());
    b.add_value(Variant::from_byte(3)).unwrap();
    assert_eq!(b.n_children(), 2);
    assert_eq!(b.end().unwrap().to_string(), "[0x01, 0x03]");
}
