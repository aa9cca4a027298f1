// crates/slugmap-core/tests/proptest_mapping.rs
// ============================================================================
// Module: Mapping Service Property Tests
// Description: Property-based checks for create-or-get and resolve.
// Purpose: Validate idempotence, round trips, and identifier uniqueness.
// Dependencies: slugmap-core, proptest
// ============================================================================

//! ## Overview
//! Generates sets of `(slug, kind)` pairs and checks that identifiers are
//! stable across repeated calls, resolve back to their pair, and never repeat
//! across distinct pairs.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use proptest::prelude::*;
use slugmap_core::InMemoryMappingStore;
use slugmap_core::MappingPolicy;
use slugmap_core::MappingService;
use slugmap_core::SharedMappingStore;

fn pair_strategy() -> impl Strategy<Value = (String, String)> {
    ("[a-z0-9][a-z0-9-]{0,24}", prop_oneof![Just("series".to_string()), Just("chapter".to_string())])
}

proptest! {
    #[test]
    fn identifiers_are_stable_unique_and_resolvable(
        pairs in proptest::collection::vec(pair_strategy(), 1 .. 24)
    ) {
        let store = InMemoryMappingStore::new();
        let service = MappingService::new(
            SharedMappingStore::from_store(store.clone()),
            MappingPolicy::default(),
        );
        let mut issued = BTreeMap::new();
        for (slug, kind) in &pairs {
            let id = service.create_or_get(slug, kind).expect("create_or_get");
            if let Some(previous) = issued.insert((slug.clone(), kind.clone()), id) {
                prop_assert_eq!(previous, id);
            }
        }
        let distinct: BTreeSet<_> = issued.values().copied().collect();
        prop_assert_eq!(distinct.len(), issued.len());
        prop_assert_eq!(store.len().expect("len"), issued.len());
        for ((slug, kind), id) in &issued {
            let record = service.resolve(&id.to_string()).expect("resolve");
            prop_assert_eq!(record.slug.as_str(), slug.as_str());
            prop_assert_eq!(record.kind.as_str(), kind.as_str());
            prop_assert_eq!(service.create_or_get(slug, kind).expect("again"), *id);
        }
    }
}
