// crates/slugmap-store-sqlite/src/lib.rs
// ============================================================================
// Module: Slugmap SQLite Store Library
// Description: Durable mapping store backed by SQLite.
// Purpose: Persist slug/identifier mappings across restarts.
// Dependencies: slugmap-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! Slugmap SQLite Store provides [`SqliteMappingStore`], a durable
//! [`slugmap_core::MappingStore`] implementation.
//! Invariants:
//! - `(slug, kind)` is unique at the schema level.
//! - Rows read back are validated before they reach the service.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_LIST_LIMIT;
pub use store::SqliteMappingStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::StoredMapping;
