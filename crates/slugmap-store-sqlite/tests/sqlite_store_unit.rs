// crates/slugmap-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Mapping Store Unit Tests
// Description: Targeted integrity tests for the SQLite mapping store.
// Purpose: Validate path safety, schema versioning, natural key uniqueness,
//          corruption detection, listing, and shutdown.
// ============================================================================

//! ## Overview
//! Unit-level tests for `SQLite` store invariants:
//! - Path safety checks (directory rejection)
//! - Schema version validation
//! - Insert-or-fetch under constraint violations and concurrency
//! - Row validation on read
//! - Listing order and cursors
//! - Close semantics

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

use std::path::Path;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use rusqlite::Connection;
use rusqlite::params;
use slugmap_core::Kind;
use slugmap_core::MappingError;
use slugmap_core::MappingId;
use slugmap_core::MappingPolicy;
use slugmap_core::MappingRecord;
use slugmap_core::MappingService;
use slugmap_core::MappingStore;
use slugmap_core::SharedMappingStore;
use slugmap_core::Slug;
use slugmap_core::StoreError;
use slugmap_store_sqlite::SqliteMappingStore;
use slugmap_store_sqlite::SqliteStoreConfig;
use slugmap_store_sqlite::SqliteStoreError;
use slugmap_store_sqlite::SqliteStoreMode;
use slugmap_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn config_for(path: &Path) -> SqliteStoreConfig {
    SqliteStoreConfig {
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Normal,
        ..SqliteStoreConfig::for_path(path)
    }
}

fn open_store(dir: &TempDir) -> SqliteMappingStore {
    SqliteMappingStore::new(config_for(&dir.path().join("store.db"))).expect("open store")
}

fn record(slug: &str, kind: &str) -> MappingRecord {
    MappingRecord::new(MappingId::generate(), Slug::new(slug), Kind::new(kind))
}

// ============================================================================
// SECTION: Path And Schema
// ============================================================================

#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let result = SqliteMappingStore::new(config_for(dir.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn missing_parent_directory_is_created() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("nested").join("deeper").join("store.db");
    SqliteMappingStore::new(config_for(&path)).expect("open store");
    assert!(path.exists());
}

#[test]
fn unknown_schema_version_fails_closed() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("store.db");
    {
        let connection = Connection::open(&path).expect("open raw");
        connection
            .execute_batch("CREATE TABLE store_meta (version INTEGER NOT NULL);")
            .expect("create meta");
        connection.execute("INSERT INTO store_meta (version) VALUES (?1)", params![99]).expect("v");
    }
    let result = SqliteMappingStore::new(config_for(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn records_survive_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let stored = {
        let store = open_store(&dir);
        let stored = store.insert_or_fetch(record("one-piece", "series")).expect("insert");
        store.close().expect("close");
        stored
    };
    let store = open_store(&dir);
    assert_eq!(store.find_by_id(&stored.identifier).expect("find"), Some(stored.clone()));
    assert_eq!(
        store.find_by_natural_key(&Slug::new("one-piece"), &Kind::series()).expect("find"),
        Some(stored)
    );
}

// ============================================================================
// SECTION: Insert Or Fetch
// ============================================================================

#[test]
fn insert_or_fetch_returns_winner_for_same_pair() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let first = store.insert_or_fetch(record("one-piece", "series")).expect("insert");
    let second = store.insert_or_fetch(record("one-piece", "series")).expect("fetch");
    assert_eq!(first, second);
    assert_eq!(store.list(10, None).expect("list").len(), 1);
}

#[test]
fn same_slug_different_kind_is_a_distinct_record() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let series = store.insert_or_fetch(record("one-piece", "series")).expect("series");
    let chapter = store.insert_or_fetch(record("one-piece", "chapter")).expect("chapter");
    assert_ne!(series.identifier, chapter.identifier);
}

#[test]
fn identifier_collision_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let first = store.insert_or_fetch(record("a", "series")).expect("insert");
    let clash = MappingRecord::new(first.identifier, Slug::new("b"), Kind::series());
    assert_eq!(
        store.insert_or_fetch(clash),
        Err(StoreError::IdentifierCollision(first.identifier))
    );
    assert_eq!(store.find_by_natural_key(&Slug::new("b"), &Kind::series()).expect("find"), None);
}

#[test]
fn concurrent_service_calls_persist_one_record() {
    const CALLERS: usize = 12;
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let service =
        MappingService::new(SharedMappingStore::from_store(store.clone()), MappingPolicy::default());
    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0 .. CALLERS)
        .map(|_| {
            let service = service.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.create_or_get("never-seen", "chapter").expect("create_or_get")
            })
        })
        .collect();
    let ids: Vec<MappingId> = handles.into_iter().map(|h| h.join().expect("join")).collect();
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    let listed = store.list(100, None).expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].record.identifier, ids[0]);
}

#[test]
fn service_scenarios_hold_against_sqlite() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let service =
        MappingService::new(SharedMappingStore::from_store(store.clone()), MappingPolicy::default());
    let series = service.create_or_get("one-piece", "series").expect("series");
    assert_eq!(service.create_or_get("one-piece", "series").expect("again"), series);
    let chapter = service.create_or_get("one-piece-ch-1", "chapter").expect("chapter");
    assert_ne!(series, chapter);
    let resolved = service.resolve(&series.to_string()).expect("resolve");
    assert_eq!(resolved.slug.as_str(), "one-piece");
    assert_eq!(resolved.kind.as_str(), "series");
    assert_eq!(
        service.resolve("00000000-0000-0000-0000-000000000000"),
        Err(MappingError::NotFound)
    );
    assert!(matches!(service.create_or_get("", "series"), Err(MappingError::Validation(_))));
    assert_eq!(store.list(10, None).expect("list").len(), 2);
}

// ============================================================================
// SECTION: Integrity
// ============================================================================

#[test]
fn corrupt_rows_fail_closed() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("store.db");
    let store = SqliteMappingStore::new(config_for(&path)).expect("open store");
    {
        let connection = Connection::open(&path).expect("open raw");
        connection
            .execute(
                "INSERT INTO mappings (identifier, slug, kind, created_at) VALUES (?1, ?2, ?3, ?4)",
                params!["NOT-A-UUID", "tampered", "series", 1_i64],
            )
            .expect("tamper");
    }
    let result = store.find_by_natural_key(&Slug::new("tampered"), &Kind::series());
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

// ============================================================================
// SECTION: Listing
// ============================================================================

#[test]
fn list_pages_in_creation_order() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let mut inserted = Vec::new();
    for index in 0 .. 5 {
        inserted.push(store.insert_or_fetch(record(&format!("slug-{index}"), "series")).expect("insert"));
    }
    let first_page = store.list(2, None).expect("page 1");
    assert_eq!(first_page.len(), 2);
    let second_page =
        store.list(2, Some(&first_page[1].record.identifier)).expect("page 2");
    let third_page =
        store.list(2, Some(&second_page[1].record.identifier)).expect("page 3");
    assert_eq!(third_page.len(), 1);

    let all: Vec<_> = first_page.iter().chain(&second_page).chain(&third_page).collect();
    assert_eq!(all.len(), 5);
    assert!(all.windows(2).all(|pair| {
        (pair[0].created_at_ms, pair[0].record.identifier)
            < (pair[1].created_at_ms, pair[1].record.identifier)
    }));
    for stored in &inserted {
        assert!(all.iter().any(|listed| listed.record == *stored));
    }
}

#[test]
fn list_rejects_bad_limits_and_unknown_cursor() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    assert!(matches!(store.list(0, None), Err(SqliteStoreError::Invalid(_))));
    assert!(matches!(store.list(1_001, None), Err(SqliteStoreError::Invalid(_))));
    let unknown = MappingId::generate();
    assert!(matches!(store.list(10, Some(&unknown)), Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn listed_records_serialize_with_wire_names() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    store.insert_or_fetch(record("one-piece", "series")).expect("insert");
    let listed = store.list(1, None).expect("list");
    let value = serde_json::to_value(&listed[0]).expect("json");
    assert_eq!(value["slug"], "one-piece");
    assert_eq!(value["type"], "series");
    assert!(value["uuid"].is_string());
    assert!(value["created_at_ms"].is_i64());
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[test]
fn readiness_and_close() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    store.readiness().expect("ready");
    store.close().expect("close");
    store.close().expect("close is idempotent");
    assert_eq!(store.readiness(), Err(StoreError::Closed));
    assert_eq!(store.find_by_id(&MappingId::generate()), Err(StoreError::Closed));
    assert_eq!(store.insert_or_fetch(record("a", "series")), Err(StoreError::Closed));
    assert!(matches!(store.list(1, None), Err(SqliteStoreError::Closed)));
}
