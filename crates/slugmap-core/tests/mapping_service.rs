// crates/slugmap-core/tests/mapping_service.rs
// ============================================================================
// Module: Mapping Service Tests
// Description: Scenario and concurrency tests for the identifier mapping service.
// Purpose: Validate create-or-get, resolve, and health semantics end to end.
// Dependencies: slugmap-core
// ============================================================================

//! ## Overview
//! Exercises the mapping service against the in-memory store: idempotent
//! create-or-get, round-trip resolve, validation failures that persist
//! nothing, and concurrent creators converging on a single record.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use slugmap_core::InMemoryMappingStore;
use slugmap_core::Kind;
use slugmap_core::MappingError;
use slugmap_core::MappingPolicy;
use slugmap_core::MappingService;
use slugmap_core::SharedMappingStore;
use slugmap_core::Slug;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn service_with_store() -> (MappingService, InMemoryMappingStore) {
    let store = InMemoryMappingStore::new();
    let service =
        MappingService::new(SharedMappingStore::from_store(store.clone()), MappingPolicy::default());
    (service, store)
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

#[test]
fn series_identifier_is_stable_and_resolves_back() {
    let (service, _) = service_with_store();
    let first = service.create_or_get("one-piece", "series").expect("create");
    let again = service.create_or_get("one-piece", "series").expect("get");
    assert_eq!(first, again);

    let record = service.resolve(&first.to_string()).expect("resolve");
    assert_eq!(record.identifier, first);
    assert_eq!(record.slug, Slug::new("one-piece"));
    assert_eq!(record.kind, Kind::series());
}

#[test]
fn chapter_identifier_differs_from_series_identifier() {
    let (service, _) = service_with_store();
    let series = service.create_or_get("one-piece", "series").expect("series");
    let chapter = service.create_or_get("one-piece-ch-1", "chapter").expect("chapter");
    assert_ne!(series, chapter);
}

#[test]
fn same_slug_with_different_kind_gets_its_own_identifier() {
    let (service, store) = service_with_store();
    let series = service.create_or_get("one-piece", "series").expect("series");
    let chapter = service.create_or_get("one-piece", "chapter").expect("chapter");
    assert_ne!(series, chapter);
    assert_eq!(store.len().expect("len"), 2);
}

#[test]
fn resolve_unknown_identifier_is_not_found() {
    let (service, _) = service_with_store();
    service.create_or_get("one-piece", "series").expect("create");
    assert_eq!(
        service.resolve("00000000-0000-0000-0000-000000000000"),
        Err(MappingError::NotFound)
    );
}

#[test]
fn resolve_non_identifier_text_is_not_found() {
    let (service, _) = service_with_store();
    service.create_or_get("one-piece", "series").expect("create");
    assert_eq!(service.resolve("one-piece"), Err(MappingError::NotFound));
}

#[test]
fn resolve_rejects_uppercase_rendering_of_issued_identifier() {
    let (service, _) = service_with_store();
    let id = service.create_or_get("one-piece", "series").expect("create");
    assert_eq!(service.resolve(&id.to_string().to_uppercase()), Err(MappingError::NotFound));
}

#[test]
fn empty_slug_is_rejected_without_persisting() {
    let (service, store) = service_with_store();
    let err = service.create_or_get("", "series").expect_err("validation");
    assert!(matches!(err, MappingError::Validation(_)));
    assert!(store.is_empty().expect("is_empty"));
}

#[test]
fn empty_kind_is_rejected_without_persisting() {
    let (service, store) = service_with_store();
    let err = service.create_or_get("one-piece", "").expect_err("validation");
    assert!(matches!(err, MappingError::Validation(_)));
    assert!(store.is_empty().expect("is_empty"));
}

#[test]
fn allow_listed_kinds_reject_unknown_kind() {
    let store = InMemoryMappingStore::new();
    let policy = MappingPolicy {
        allowed_kinds: [Kind::SERIES.to_string(), Kind::CHAPTER.to_string()].into_iter().collect(),
        ..MappingPolicy::default()
    };
    let service = MappingService::new(SharedMappingStore::from_store(store.clone()), policy);
    assert!(service.create_or_get("one-piece", "series").is_ok());
    let err = service.create_or_get("action", "genre").expect_err("not allowed");
    assert!(matches!(err, MappingError::Validation(_)));
    assert_eq!(store.len().expect("len"), 1);
}

#[test]
fn health_check_reports_closed_store() {
    let (service, _) = service_with_store();
    assert!(service.health_check().is_ok());
    service.close().expect("close");
    assert!(matches!(service.health_check(), Err(MappingError::StorageUnavailable(_))));
    assert!(matches!(
        service.create_or_get("one-piece", "series"),
        Err(MappingError::StorageUnavailable(_))
    ));
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn concurrent_creators_converge_on_one_record() {
    const CALLERS: usize = 16;
    let (service, store) = service_with_store();
    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0 .. CALLERS)
        .map(|_| {
            let service = service.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.create_or_get("never-seen", "series").expect("create_or_get")
            })
        })
        .collect();
    let ids: Vec<_> = handles.into_iter().map(|handle| handle.join().expect("join")).collect();
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(store.len().expect("len"), 1);
}
