//! # Bloom Filter Property Tests
//!
//! End-to-end checks of the public API.
//!
//! ## Test Categories
//!
//! 1. **Membership** - no false negatives, bounded false positives
//! 2. **Sizing** - monotonicity of the cell formula
//! 3. **Merge** - union semantics and compatibility gates
//! 4. **Serialization** - round trips, truncation, corrupt input
//! 5. **Counting** - multiplicity and saturation

use bloom_filters::domain::hash_functions::{DefaultHashing, DoubleHashing, SipHash};
use bloom_filters::domain::parameters::{optimal_cells, optimal_hash_count};
use bloom_filters::{
    BasicBloomFilter, BloomConfig, BloomConfigBuilder, BloomFilter, CountingBloomFilter,
    FilterError, FilterKind, HashPolicy, HashPolicyRegistry,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// TEST HELPERS
// =============================================================================

fn sized_basic(fpr: f64, capacity: usize) -> BasicBloomFilter {
    let cells = optimal_cells(fpr, capacity).unwrap();
    let k = optimal_hash_count(cells, capacity).unwrap();
    BasicBloomFilter::new(Box::new(DefaultHashing::new(k)), cells).unwrap()
}

fn siphash_policy(k: usize) -> Box<dyn HashPolicy> {
    Box::new(DoubleHashing::<SipHash>::new(k))
}

const PROBES: [&[u8]; 6] = [
    b"never-1",
    b"never-2",
    b"0xdeadbeef",
    b"",
    b"a longer probe element that was never inserted",
    b"zz",
];

// =============================================================================
// MEMBERSHIP
// =============================================================================

#[test]
fn test_added_elements_always_counted_in_both_variants() {
    let mut basic = BasicBloomFilter::with_fpr(0.01, 500).unwrap();
    let mut counting = CountingBloomFilter::with_fpr(0.01, 500, 4).unwrap();

    for i in 0..500 {
        let element = format!("member-{i}");
        basic.add(element.as_bytes());
        counting.add(element.as_bytes());
    }

    for i in 0..500 {
        let element = format!("member-{i}");
        assert!(basic.count(element.as_bytes()) > 0, "basic false negative: {element}");
        assert!(counting.count(element.as_bytes()) > 0, "counting false negative: {element}");
    }
}

#[test]
fn test_false_positive_rate_near_design_target() {
    let capacity = 1000;
    let mut filter = sized_basic(0.01, capacity);
    assert_eq!(filter.cells(), 9586);
    assert_eq!(filter.hash_count(), 7);

    for i in 0..capacity {
        filter.add(format!("member-{i}").as_bytes());
    }

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let trials = 100_000;
    let false_positives = (0..trials)
        .filter(|_| {
            let probe = format!("probe-{:016x}", rng.gen::<u64>());
            filter.contains(probe.as_bytes())
        })
        .count();

    let actual_fpr = false_positives as f64 / trials as f64;
    assert!(
        actual_fpr <= 0.01 * 1.5,
        "Actual FPR {} exceeds 1.5 * target 0.01",
        actual_fpr
    );
}

// =============================================================================
// SIZING
// =============================================================================

#[test]
fn test_sizing_monotonicity() {
    assert!(optimal_cells(0.001, 1000).unwrap() > optimal_cells(0.01, 1000).unwrap());
    for fpr in [0.2, 0.05, 0.01, 0.0001] {
        assert!(optimal_cells(fpr, 2000).unwrap() > optimal_cells(fpr, 1000).unwrap());
    }
}

#[test]
fn test_construction_errors_fail_fast() {
    let err = BasicBloomFilter::with_fpr(0.01, 0).unwrap_err();
    assert!(err.is_construction());

    for fpr in [0.0, 1.0, f64::NAN, -1.0] {
        let err = CountingBloomFilter::with_fpr(fpr, 10, 4).unwrap_err();
        assert!(err.is_construction(), "fpr={fpr} gave {err:?}");
    }
}

// =============================================================================
// MERGE
// =============================================================================

#[test]
fn test_merge_reports_elements_of_both_operands() {
    let mut x = sized_basic(0.01, 2);
    let mut y = sized_basic(0.01, 2);
    x.add(b"a");
    x.add(b"b");
    y.add(b"c");

    let merged = BasicBloomFilter::merge(&x, &y).unwrap();
    for element in [b"a", b"b", b"c"] {
        assert!(merged.count(element) > 0);
    }
}

#[test]
fn test_merge_does_not_set_bits_beyond_operands() {
    let mut x = sized_basic(0.01, 100);
    let mut y = sized_basic(0.01, 100);
    for i in 0..50 {
        x.add(format!("x-{i}").as_bytes());
        y.add(format!("y-{i}").as_bytes());
    }

    let merged = BasicBloomFilter::merge(&x, &y).unwrap();
    assert!(merged.bits_set() <= x.bits_set() + y.bits_set());
    assert!(merged.bits_set() >= x.bits_set().max(y.bits_set()));
}

#[test]
fn test_merge_with_different_policy_is_rejected() {
    let x = BasicBloomFilter::new(Box::new(DefaultHashing::new(4)), 256).unwrap();
    let y = BasicBloomFilter::new(Box::new(DoubleHashing::<SipHash>::new(4)), 256).unwrap();

    assert!(matches!(
        BasicBloomFilter::merge(&x, &y),
        Err(FilterError::IncompatibleMerge(_))
    ));
}

#[test]
fn test_counting_merge_adds_multiplicities() {
    let mut x = CountingBloomFilter::with_fpr(0.01, 100, 8).unwrap();
    let mut y = CountingBloomFilter::with_fpr(0.01, 100, 8).unwrap();
    for _ in 0..3 {
        x.add(b"shared");
    }
    for _ in 0..4 {
        y.add(b"shared");
    }

    let merged = CountingBloomFilter::merge(&x, &y).unwrap();
    assert!(merged.count(b"shared") >= 7);
}

// =============================================================================
// SERIALIZATION
// =============================================================================

#[test]
fn test_round_trip_answers_identically() {
    let mut filter = BasicBloomFilter::with_fpr(0.01, 100).unwrap();
    for element in [b"x", b"y", b"z"] {
        filter.add(element);
    }
    let before: Vec<u64> = PROBES.iter().map(|p| filter.count(p)).collect();

    let bytes = filter.to_bytes().unwrap();
    let restored = BloomFilter::from_bytes(&bytes).unwrap();

    for element in [b"x", b"y", b"z"] {
        assert!(restored.count(element) > 0);
    }
    let after: Vec<u64> = PROBES.iter().map(|p| restored.count(p)).collect();
    assert_eq!(before, after);
}

#[test]
fn test_counting_round_trip_keeps_counts() {
    let mut filter = CountingBloomFilter::with_fpr(0.01, 100, 4).unwrap();
    for element in [b"x", b"y", b"z", b"x"] {
        filter.add(element);
    }

    let bytes = filter.to_bytes().unwrap();
    let restored = CountingBloomFilter::from_bytes(&bytes).unwrap();

    for element in [b"x", b"y", b"z"].iter().map(|e| e.as_slice()).chain(PROBES) {
        assert_eq!(restored.count(element), filter.count(element));
    }
}

#[test]
fn test_truncated_after_k_fails() {
    let mut filter = BasicBloomFilter::with_fpr(0.01, 10).unwrap();
    filter.add(b"x");
    let bytes = filter.to_bytes().unwrap();

    // tag (1 byte) + k (2 bytes)
    let err = BloomFilter::from_bytes(&bytes[..3]).unwrap_err();
    assert!(err.is_serialization(), "got {err:?}");
}

#[test]
fn test_every_strict_prefix_fails() {
    let mut basic = BasicBloomFilter::with_fpr(0.1, 20).unwrap();
    let mut counting = CountingBloomFilter::with_fpr(0.1, 20, 3).unwrap();
    basic.add(b"x");
    counting.add(b"x");

    for bytes in [basic.to_bytes().unwrap(), counting.to_bytes().unwrap()] {
        for len in 0..bytes.len() {
            assert!(
                BloomFilter::from_bytes(&bytes[..len]).is_err(),
                "prefix of {len}/{} bytes decoded",
                bytes.len()
            );
        }
        assert!(BloomFilter::from_bytes(&bytes).is_ok());
    }
}

#[test]
fn test_nonzero_padding_bits_fail_load() {
    // 13 cells leave 3 unused high bits in the last byte
    let filter = BasicBloomFilter::new(Box::new(DefaultHashing::new(3)), 13).unwrap();
    let mut bytes = filter.to_bytes().unwrap();
    assert!(BloomFilter::from_bytes(&bytes).unwrap().is_empty());

    if let Some(last) = bytes.last_mut() {
        *last |= 0xE0;
    }
    let err = BloomFilter::from_bytes(&bytes).unwrap_err();
    assert!(err.is_serialization(), "got {err:?}");
}

#[test]
fn test_decoding_is_canonical() {
    let mut filter = CountingBloomFilter::new(Box::new(DefaultHashing::new(3)), 7, 3).unwrap();
    filter.add(b"x");
    let bytes = filter.to_bytes().unwrap();

    let restored = BloomFilter::from_bytes(&bytes).unwrap();
    assert_eq!(restored.to_bytes().unwrap(), bytes);
}

#[test]
fn test_unregistered_policy_fails_load() {
    let filter = BasicBloomFilter::new(Box::new(DoubleHashing::<SipHash>::new(3)), 64).unwrap();
    let bytes = filter.to_bytes().unwrap();

    let mut registry = HashPolicyRegistry::empty();
    assert!(matches!(
        BloomFilter::from_bytes_with_registry(&bytes, &registry),
        Err(FilterError::UnsupportedPolicy { ref name }) if name == "double-siphash"
    ));

    registry.register("double-siphash", siphash_policy);
    let restored = BloomFilter::from_bytes_with_registry(&bytes, &registry).unwrap();
    assert_eq!(restored.kind(), FilterKind::Basic);
}

#[test]
fn test_variant_entry_points_check_the_tag() {
    let counting = CountingBloomFilter::with_fpr(0.1, 10, 4).unwrap();
    let bytes = counting.to_bytes().unwrap();

    assert!(matches!(
        BasicBloomFilter::from_bytes(&bytes),
        Err(FilterError::UnexpectedFilterType { .. })
    ));
    assert!(CountingBloomFilter::from_bytes(&bytes).is_ok());
}

// =============================================================================
// COUNTING
// =============================================================================

#[test]
fn test_counting_multiplicity() {
    let mut filter = CountingBloomFilter::with_fpr(0.01, 100, 4).unwrap();
    filter.add(b"dup");
    filter.add(b"dup");
    assert!(filter.count(b"dup") >= 2);
}

#[test]
fn test_counting_saturates_at_width_max() {
    for width in [1u8, 2, 4, 8] {
        let mut filter = CountingBloomFilter::with_fpr(0.01, 100, width).unwrap();
        let max = (1u64 << width) - 1;
        for _ in 0..(max + 5) {
            filter.add(b"hot");
        }
        assert_eq!(filter.count(b"hot"), max, "width={width}");
    }
}

// =============================================================================
// CONFIGURATION & AMBIENT
// =============================================================================

#[test]
fn test_config_round_trips_through_json() {
    let config = BloomConfigBuilder::new()
        .kind(FilterKind::Counting)
        .target_fpr(0.02)
        .capacity(250)
        .counter_width(6)
        .hash_policy("double-sha256")
        .build()
        .unwrap();

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"kind\":\"counting\""));
    let decoded: BloomConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, config);
}

#[test]
fn test_partial_json_config_uses_defaults() {
    let config: BloomConfig = serde_json::from_str(r#"{"capacity": 50}"#).unwrap();
    assert_eq!(config.capacity, 50);
    assert_eq!(config.kind, FilterKind::Basic);
    assert_eq!(config.hash_policy, "double-murmur3");

    let filter = config.build_filter().unwrap();
    assert_eq!(filter.cells(), optimal_cells(0.01, 50).unwrap());
}

#[test]
fn test_filters_can_be_moved_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BloomFilter>();
    assert_send_sync::<HashPolicyRegistry>();
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    #[test]
    fn prop_no_false_negatives(elements in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 1..64)) {
        let mut filter = BasicBloomFilter::with_fpr(0.05, elements.len()).unwrap();
        for e in &elements {
            filter.add(e);
        }
        for e in &elements {
            prop_assert_eq!(filter.count(e), 1);
        }
    }

    #[test]
    fn prop_counting_never_undercounts(element in prop::collection::vec(any::<u8>(), 0..32), times in 1u64..20) {
        let mut filter = CountingBloomFilter::with_fpr(0.01, 50, 8).unwrap();
        for _ in 0..times {
            filter.add(&element);
        }
        prop_assert!(filter.count(&element) >= times);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = BloomFilter::from_bytes(&bytes);
    }

    #[test]
    fn prop_merge_is_superset(a in prop::collection::vec(any::<u32>(), 0..32), b in prop::collection::vec(any::<u32>(), 0..32)) {
        let mut x = sized_basic(0.01, 64);
        let mut y = sized_basic(0.01, 64);
        for v in &a {
            x.add(&v.to_le_bytes());
        }
        for v in &b {
            y.add(&v.to_le_bytes());
        }

        let merged = BasicBloomFilter::merge(&x, &y).unwrap();
        for v in a.iter().chain(&b) {
            prop_assert!(merged.contains(&v.to_le_bytes()));
        }
    }
}
