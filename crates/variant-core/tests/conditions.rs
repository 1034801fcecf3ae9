//! Condition engine behaviour seen through the public API.

use std::thread;

use variant_core::{ByteOrder, Conditions, LoadFlags, Variant, VariantBytes, VariantType};

fn ty(s: &str) -> VariantType {
    VariantType::new(s).unwrap()
}

fn numbers(n: u32) -> Variant {
    Variant::new_array(None, (0..n).map(Variant::from_u32)).unwrap()
}

#[test]
fn test_require_twice_changes_nothing() {
    let v = Variant::load(&ty("a(sy)"), &numbers_as_pairs(), LoadFlags::new());
    let want = Conditions::TRUSTED | Conditions::NATIVE | Conditions::SERIALISED;
    v.require(want);
    let conditions = v.conditions();
    let data = v.get_data();

    v.require(want);
    assert_eq!(v.conditions(), conditions);
    assert!(v.get_data().ptr_eq(&data));
}

fn numbers_as_pairs() -> Vec<u8> {
    let pairs = (0..4u8).map(|i| Variant::new_tuple([Variant::new_string("k").unwrap(), Variant::from_byte(i)]));
    Variant::new_array(None, pairs).unwrap().get_data().to_vec()
}

#[test]
fn test_data_pointer_is_stable() {
    let tree = numbers(16);
    assert!(!tree.has(Conditions::SERIALISED));
    let first = tree.get_data();
    assert!(tree.has(Conditions::SERIALISED));
    let second = tree.get_data();
    assert!(first.ptr_eq(&second));

    // Trusting normal data keeps the same bytes.
    let loaded = Variant::from_bytes(&ty("au"), first.clone(), LoadFlags::new());
    let normal = loaded.get_normal_form();
    assert!(normal.get_data().ptr_eq(&first));
}

#[test]
fn test_children_view_parent_bytes() {
    let data = numbers(4).get_data();
    let v = Variant::from_bytes(&ty("au"), data.clone(), LoadFlags::trusted());
    for (i, child) in v.iter().enumerate() {
        assert_eq!(child.get_data().as_ptr(), data[i * 4..].as_ptr());
    }
}

#[test]
fn test_flattening_a_tree_keeps_child_values() {
    let tree = Variant::new_tuple([numbers(3), Variant::new_string("end").unwrap()]);
    let before = tree.to_string();
    let _ = tree.get_data();
    assert_eq!(tree.to_string(), before);
    assert_eq!(tree.get_child_value(1).get_str(), "end");
}

#[test]
fn test_concurrent_lazy_byteswap() {
    let value = numbers(1024);
    let expected = value.get_data();
    let swapped = value.byteswap().get_data();
    let flags = LoadFlags::new()
        .with_byte_order(ByteOrder::foreign())
        .with_lazy_byteswap();

    for _ in 0..50 {
        let v = Variant::load(&ty("au"), &swapped, flags);
        assert!(!v.has(Conditions::NATIVE));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let v = v.clone();
                thread::spawn(move || v.get_data())
            })
            .collect();
        let results: Vec<VariantBytes> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for data in &results {
            assert_eq!(data, &expected);
        }
        assert!(results[0].ptr_eq(&results[1]));
        assert!(v.has(Conditions::BECAME_NATIVE));
    }
}

#[test]
fn test_concurrent_children_and_normal_form() {
    let mut bytes = numbers_as_pairs();
    // Repeating the final offset adds an empty, non-normal element.
    let last = bytes.len() - 1;
    bytes.push(bytes[last]);
    let v = Variant::load(&ty("a(sy)"), &bytes, LoadFlags::new());
    assert!(!v.is_normal());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let v = v.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    v.get_normal_form().get_size()
                } else {
                    v.iter().map(|c| c.to_string().len()).sum()
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(v.is_trusted());
    assert_eq!(v.n_children(), 5);
}

#[test]
fn test_iterator_restores_ref_count() {
    let v = Variant::load(&ty("as"), b"a\0b\0c\0\x02\x04\x06", LoadFlags::new());
    let base = v.ref_count();

    let mut it = v.iter();
    let mut seen = Vec::new();
    while let Some(child) = it.next_value() {
        seen.push(child.get_str());
    }
    assert_eq!(seen, ["a", "b", "c"]);
    assert_eq!(v.ref_count(), base);
}

#[test]
fn test_floating_children_are_sunk_by_containers() {
    let child = Variant::from_i32(1);
    let boxed = Variant::new_variant(child.clone());
    assert!(!child.is_floating());
    assert!(boxed.is_floating());
    let _kept = boxed.ref_sink();
    assert!(!boxed.is_floating());
}

#[test]
fn test_wrapped_bytes_release_after_flatten() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    let data = numbers(8).get_data().to_vec();
    let v = Variant::wrap(
        &ty("au"),
        data,
        Some(Box::new(|| {
            RELEASED.fetch_add(1, Ordering::SeqCst);
        })),
        LoadFlags::trusted(),
    );
    let child = v.get_child_value(3);
    let tree = Variant::new_tuple([child]);
    drop(v);
    // The borrowed child still holds the bytes.
    assert_eq!(RELEASED.load(Ordering::SeqCst), 0);

    // Flattening copies the child and drops it.
    let data = tree.get_data();
    assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
    assert_eq!(&*data, &3u32.to_ne_bytes());
}

#[test]
fn test_tree_size_survives_child_normalisation() {
    let child = Variant::load(&VariantType::STRING, b"abcdef", LoadFlags::new());
    let tree = Variant::new_tuple([child.clone(), Variant::from_byte(1)]);
    let size = tree.get_size();
    assert_eq!(size, 8);

    // Rebuilds the child's bytes as a single NUL.
    let _ = child.get_normal_form();
    assert_eq!(child.get_size(), 1);

    assert_eq!(tree.get_size(), size);
    assert_eq!(tree.get_data().len(), size);
}

#[test]
fn test_store_into_buffer_of_reported_size() {
    let child = Variant::load(&VariantType::STRING, b"xyz", LoadFlags::new());
    let tree = Variant::new_tuple([child.clone()]);
    let mut buf = vec![0; tree.get_size()];
    let _ = child.get_normal_form();

    assert!(!tree.is_normal());
    tree.store(&mut buf);
    assert_eq!(buf, tree.get_data().to_vec());
    assert_eq!(buf, b"xyz");
}
