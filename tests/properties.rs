//! Property tests for the codec laws and the count-accounting guarantees of
//! the index.

use std::collections::HashMap;

use kmerdb::{decode, encode, Key, KmerExtractor, KmerIndex, Symbol};
use proptest::prelude::*;

fn base() -> impl Strategy<Value = Symbol> {
    prop_oneof![
        Just(Symbol::A),
        Just(Symbol::C),
        Just(Symbol::G),
        Just(Symbol::T),
    ]
}

fn base_char() -> impl Strategy<Value = char> {
    proptest::sample::select(vec!['A', 'C', 'G', 'T', 'a', 'c', 'g', 't'])
}

proptest! {
    #[test]
    fn encode_decode_round_trips(window in prop::collection::vec(base(), 1..=32)) {
        let key = encode(&window).unwrap();
        prop_assert_eq!(decode(key, window.len()), window);
    }

    #[test]
    fn unambiguous_input_yields_len_minus_k_plus_one(
        k in 1usize..=8,
        chars in prop::collection::vec(base_char(), 0..200),
    ) {
        let extractor = KmerExtractor::new(k).unwrap();
        let produced = extractor.keys(chars.iter().copied()).count();
        let expected = chars.len().saturating_sub(k - 1);
        prop_assert_eq!(produced, expected);
    }

    #[test]
    fn extractor_agrees_with_batch_encode(
        k in 1usize..=6,
        chars in prop::collection::vec(base_char(), 0..100),
    ) {
        let extractor = KmerExtractor::new(k).unwrap();
        let streamed: Vec<Key> = extractor.keys(chars.iter().copied()).collect();

        let symbols: Vec<Symbol> = chars.iter().map(|&c| Symbol::classify(c)).collect();
        let batch: Vec<Key> = symbols
            .windows(k)
            .map(|w| encode(w).unwrap())
            .collect();

        prop_assert_eq!(streamed, batch);
    }
}

proptest! {
    // Each case builds an on-disk tree; keep the case count moderate.
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn lookup_returns_exact_upsert_counts(
        keys in prop::collection::vec(0u64..500, 1..400),
        degree in 2u32..8,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut index = KmerIndex::open(dir.path().join("index.kdx"), 16, degree).unwrap();

        let mut reference: HashMap<Key, u64> = HashMap::new();
        for &key in &keys {
            index.upsert(key).unwrap();
            *reference.entry(key).or_default() += 1;
        }

        index.verify().unwrap();

        for (&key, &count) in &reference {
            prop_assert_eq!(index.lookup(key).unwrap(), Some(count));
        }
        // A key never upserted returns nothing.
        prop_assert_eq!(index.lookup(1_000_000).unwrap(), None);

        // Full scan: strictly increasing keys, no duplicates, counts match.
        let mut expected: Vec<(Key, u64)> = reference.into_iter().collect();
        expected.sort_unstable();
        let scanned: Vec<(Key, u64)> = index
            .scan_all()
            .map(|r| r.unwrap())
            .map(|e| (e.key, e.count))
            .collect();
        prop_assert_eq!(scanned, expected);
    }

    #[test]
    fn range_scan_matches_filtered_full_scan(
        keys in prop::collection::vec(0u64..300, 1..200),
        low in 0u64..300,
        width in 0u64..300,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut index = KmerIndex::open(dir.path().join("index.kdx"), 16, 2).unwrap();
        for &key in &keys {
            index.upsert(key).unwrap();
        }

        let high = low.saturating_add(width);
        let ranged: Vec<Key> = index
            .range_scan(low, high)
            .map(|r| r.unwrap().key)
            .collect();
        let filtered: Vec<Key> = index
            .scan_all()
            .map(|r| r.unwrap().key)
            .filter(|&k| k >= low && k <= high)
            .collect();

        prop_assert_eq!(ranged, filtered);
    }
}
