//! Benchmark for variant construction, flattening and loading.
//!
//! Builds a synthetic dataset of city records as an `aa{sv}` value, then
//! times serialising it, loading it back untrusted, normalising it, and
//! byteswapping it.

use std::time::Instant;

use fastrand::Rng;

use variant_core::{ByteOrder, ContainerClass, LoadFlags, Variant, VariantBuilder, VariantType};

const DEFAULT_RECORDS: usize = 50_000;
const ITERS: u32 = 10;

// =============================================================================
// SYNTHETIC DATA
// =============================================================================

const TIMEZONES: &[&str] = &["Europe/Paris", "America/Chicago", "Asia/Tokyo", "Africa/Lagos"];

/// Fixed so runs are comparable.
const SEED: u64 = 0x9e37_79b9_7f4a_7c15;

fn entry(key: &str, value: Variant) -> Variant {
    let key = Variant::new_string(key).expect("static keys contain no NUL");
    Variant::new_dict_entry(key, Variant::new_variant(value)).expect("string keys are basic")
}

fn build_record(id: u32, rng: &mut Rng) -> Variant {
    let mut builder = VariantBuilder::new(&VariantType::VARDICT).expect("a{sv} is a container");
    let name = format!("city-{id}");
    let timezone = TIMEZONES[rng.usize(..TIMEZONES.len())];

    let mut entries = vec![
        entry("id", Variant::from_u32(id)),
        entry("name", Variant::new_string(&name).expect("generated names contain no NUL")),
        entry("population", Variant::from_i64(rng.i64(0..10_000_000))),
        entry(
            "location",
            Variant::new_tuple([
                Variant::from_f64(rng.f64() * 180.0 - 90.0),
                Variant::from_f64(rng.f64() * 360.0 - 180.0),
            ]),
        ),
        entry("timezone", Variant::new_string(timezone).expect("static")),
    ];
    if rng.u32(..3) == 0 {
        entries.push(entry("capital", Variant::from_bool(true)));
    }

    for e in entries {
        builder.add_value(e).expect("entries match a{sv}");
    }
    builder.end().expect("records are complete")
}

fn build_dataset(n: usize) -> Variant {
    let mut rng = Rng::with_seed(SEED);
    let mut builder = VariantBuilder::with_class(ContainerClass::Array);
    for id in 0..n {
        builder
            .add_value(build_record(id as u32, &mut rng))
            .expect("records share one type");
    }
    builder.end().expect("dataset is not empty")
}

fn throughput(bytes: usize, secs: f64) -> f64 {
    (bytes as f64 / 1_000_000.0) / secs
}

fn main() {
    let n = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_RECORDS);

    println!("Building {n} records");

    let build_start = Instant::now();
    let dataset = build_dataset(n);
    let build_time = build_start.elapsed();
    println!("Built tree of type {} in {:?}", dataset.type_string(), build_time);

    // Flatten
    let flatten_start = Instant::now();
    let encoded = dataset.get_data();
    let flatten_time = flatten_start.elapsed();
    println!(
        "\nFlatten: {} bytes in {:?} ({:.2} MB/s)",
        encoded.len(),
        flatten_time,
        throughput(encoded.len(), flatten_time.as_secs_f64())
    );

    let ty = dataset.variant_type().clone();

    // Load untrusted and check normal form
    for _ in 0..3 {
        let _ = Variant::load(&ty, &encoded, LoadFlags::new()).get_normal_form();
    }
    let normal_start = Instant::now();
    for _ in 0..ITERS {
        let loaded = Variant::load(&ty, &encoded, LoadFlags::new());
        assert!(loaded.get_normal_form().is_trusted());
    }
    let normal_time = normal_start.elapsed() / ITERS;
    println!(
        "\nLoad + normal-form check: {:?} (avg of {} iterations)",
        normal_time, ITERS
    );
    println!(
        "  Throughput: {:.2} MB/s",
        throughput(encoded.len(), normal_time.as_secs_f64())
    );

    // Byteswap to foreign order and load back eagerly
    let swapped = Variant::load(&ty, &encoded, LoadFlags::trusted()).byteswap().get_data();
    let foreign = LoadFlags::trusted().with_byte_order(ByteOrder::foreign());
    let swap_start = Instant::now();
    for _ in 0..ITERS {
        let loaded = Variant::load(&ty, &swapped, foreign);
        assert_eq!(loaded.get_size(), encoded.len());
    }
    let swap_time = swap_start.elapsed() / ITERS;
    println!(
        "\nForeign-order load (eager byteswap): {:?} (avg of {} iterations)",
        swap_time, ITERS
    );
    println!(
        "  Throughput: {:.2} MB/s",
        throughput(encoded.len(), swap_time.as_secs_f64())
    );

    // Child access without conversion
    let loaded = Variant::load(&ty, &encoded, LoadFlags::trusted());
    let lookup_start = Instant::now();
    let mut population = 0i64;
    for record in &loaded {
        if let Some(value) = record.lookup_value("population", Some(&VariantType::INT64)) {
            population += value.get_i64();
        }
    }
    let lookup_time = lookup_start.elapsed();
    println!("\nLookup over {} records: {:?}", loaded.n_children(), lookup_time);

    // Summary
    println!("\n=== Summary ===");
    println!("Records: {n}");
    println!(
        "Serialised size: {} bytes ({:.1} MB)",
        encoded.len(),
        encoded.len() as f64 / 1_000_000.0
    );
    println!("Total population: {population}");
    println!("First record: {}", loaded.get_child_value(0));
}
