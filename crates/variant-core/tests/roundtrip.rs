//! Serialise, load and byteswap round-trips.

use proptest::prelude::*;
use variant_core::{ByteOrder, LoadFlags, Variant, VariantType};

fn ty(s: &str) -> VariantType {
    VariantType::new(s).unwrap()
}

fn string(s: &str) -> Variant {
    Variant::new_string(s).unwrap()
}

/// Builds a value of type `(isaqmxa{sy})`.
fn record(n: i32, s: &str, qs: &[u16], mx: Option<i64>, dict: &[(String, u8)]) -> Variant {
    let entries = dict
        .iter()
        .map(|(k, v)| Variant::new_dict_entry(string(k), Variant::from_byte(*v)).unwrap());
    Variant::new_tuple([
        Variant::from_i32(n),
        string(s),
        Variant::new_array(Some(&VariantType::UINT16), qs.iter().copied().map(Variant::from)).unwrap(),
        Variant::new_maybe(Some(&VariantType::INT64), mx.map(Variant::from)).unwrap(),
        Variant::new_array(Some(&ty("{sy}")), entries).unwrap(),
    ])
}

fn foreign() -> LoadFlags {
    LoadFlags::new().with_byte_order(ByteOrder::foreign())
}

#[test]
fn test_known_encoding_of_vardict() {
    let entry = Variant::new_dict_entry(string("a"), Variant::new_variant(Variant::from_i32(1))).unwrap();
    let dict = Variant::new_array(None, [entry]).unwrap();

    let mut expected = b"a\0".to_vec();
    expected.extend_from_slice(&[0; 6]);
    expected.extend_from_slice(&1i32.to_ne_bytes());
    expected.extend_from_slice(b"\0i");
    expected.push(2); // end of key
    expected.push(15); // end of entry
    assert_eq!(&*dict.get_data(), &expected[..]);
}

#[test]
fn test_known_encoding_of_string_array() {
    let arr = Variant::new_array(None, [string("a"), string("b")]).unwrap();
    assert_eq!(&*arr.get_data(), b"a\0b\0\x02\x04");
}

#[test]
fn test_nothing_and_unit_sizes() {
    let nothing = Variant::new_maybe(Some(&VariantType::STRING), None).unwrap();
    assert_eq!(nothing.get_size(), 0);
    let unit = Variant::new_tuple(Vec::new());
    assert_eq!(&*unit.get_data(), &[0]);
    let just_unit = Variant::new_maybe(None, Some(unit)).unwrap();
    assert_eq!(just_unit.get_size(), 1);
}

#[test]
fn test_lazy_and_eager_foreign_loads_agree() {
    let value = record(-3, "x", &[1, 2], Some(9), &[("k".to_owned(), 1)]);
    let swapped = value.byteswap().get_data();
    let t = value.variant_type().clone();

    let eager = Variant::load(&t, &swapped, foreign());
    let lazy = Variant::load(&t, &swapped, foreign().with_lazy_byteswap());
    assert_eq!(eager, value);
    assert_eq!(lazy, value);
    assert_eq!(lazy.get_child_value(0).get_i32(), -3);
}

proptest! {
    #[test]
    fn native_roundtrip(
        n in any::<i32>(),
        s in "[a-zA-Z0-9 ]{0,12}",
        qs in prop::collection::vec(any::<u16>(), 0..16),
        mx in prop::option::of(any::<i64>()),
        dict in prop::collection::vec(("[a-z]{1,6}", any::<u8>()), 0..6),
    ) {
        let value = record(n, &s, &qs, mx, &dict);
        let data = value.get_data();
        let loaded = Variant::load(value.variant_type(), &data, LoadFlags::new());

        prop_assert!(loaded.is_normal());
        prop_assert_eq!(&loaded, &value);
        prop_assert_eq!(loaded.get_child_value(0).get_i32(), n);
        prop_assert_eq!(loaded.get_child_value(1).get_str(), s);
        prop_assert_eq!(loaded.get_child_value(2).n_children(), qs.len());
        prop_assert_eq!(
            loaded.get_child_value(3).get_maybe().map(|v| v.get_i64()),
            mx
        );
        let entries = loaded.get_child_value(4);
        for (i, (k, v)) in dict.iter().enumerate() {
            let entry = entries.get_child_value(i);
            prop_assert_eq!(&entry.get_child_value(0).get_str(), k);
            prop_assert_eq!(entry.get_child_value(1).get_byte(), *v);
        }
    }

    #[test]
    fn foreign_roundtrip(
        n in any::<i32>(),
        qs in prop::collection::vec(any::<u16>(), 0..16),
        mx in prop::option::of(any::<i64>()),
    ) {
        let value = record(n, "swap", &qs, mx, &[]);
        let swapped = value.byteswap();
        prop_assert_eq!(swapped.get_size(), value.get_size());
        prop_assert_eq!(&swapped.byteswap(), &value);

        let loaded = Variant::load(value.variant_type(), &swapped.get_data(), foreign());
        prop_assert_eq!(&loaded, &value);
        let arr = loaded.get_child_value(2);
        let got: Vec<u16> = arr.iter().map(|v| v.get_u16()).collect();
        prop_assert_eq!(got, qs);
    }
}
