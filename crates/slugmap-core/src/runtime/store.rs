// crates/slugmap-core/src/runtime/store.rs
// ============================================================================
// Module: Slugmap In-Memory Store
// Description: In-memory mapping store and shared store wrapper.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`MappingStore`] for
//! tests and local demos, plus [`SharedMappingStore`], the clonable wrapper
//! injected into the service. Records do not survive a restart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Kind;
use crate::core::MappingId;
use crate::core::MappingRecord;
use crate::core::Slug;
use crate::interfaces::MappingStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory mapping store for tests and examples.
///
/// # Invariants
/// - Both indexes are updated under one mutex guard.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMappingStore {
    /// Indexed records protected by a mutex.
    state: Arc<Mutex<InMemoryState>>,
}

/// Indexes held by the in-memory store.
#[derive(Debug, Default)]
struct InMemoryState {
    /// Records keyed by identifier.
    by_id: BTreeMap<MappingId, MappingRecord>,
    /// Identifiers keyed by natural key.
    by_key: BTreeMap<(Slug, Kind), MappingId>,
    /// Whether the store has been closed.
    closed: bool,
}

impl InMemoryMappingStore {
    /// Creates a new in-memory mapping store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.by_id.len())
    }

    /// Returns true when no records are stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.by_id.is_empty())
    }

    /// Locks the store state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Store("mapping store mutex poisoned".to_string()))
    }

    /// Locks the store state, failing when the store is closed.
    fn lock_open(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StoreError> {
        let guard = self.lock()?;
        if guard.closed {
            return Err(StoreError::Closed);
        }
        Ok(guard)
    }
}

impl MappingStore for InMemoryMappingStore {
    fn find_by_natural_key(
        &self,
        slug: &Slug,
        kind: &Kind,
    ) -> Result<Option<MappingRecord>, StoreError> {
        let guard = self.lock_open()?;
        let record = guard
            .by_key
            .get(&(slug.clone(), kind.clone()))
            .and_then(|identifier| guard.by_id.get(identifier))
            .cloned();
        drop(guard);
        Ok(record)
    }

    fn find_by_id(&self, identifier: &MappingId) -> Result<Option<MappingRecord>, StoreError> {
        let guard = self.lock_open()?;
        Ok(guard.by_id.get(identifier).cloned())
    }

    fn insert_or_fetch(&self, record: MappingRecord) -> Result<MappingRecord, StoreError> {
        let mut guard = self.lock_open()?;
        let key = (record.slug.clone(), record.kind.clone());
        if let Some(existing) = guard.by_key.get(&key).and_then(|id| guard.by_id.get(id)) {
            return Ok(existing.clone());
        }
        if guard.by_id.contains_key(&record.identifier) {
            return Err(StoreError::IdentifierCollision(record.identifier));
        }
        guard.by_key.insert(key, record.identifier);
        guard.by_id.insert(record.identifier, record.clone());
        drop(guard);
        Ok(record)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.lock_open().map(|_| ())
    }

    fn close(&self) -> Result<(), StoreError> {
        self.lock()?.closed = true;
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared mapping store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedMappingStore {
    /// Inner store implementation.
    inner: Arc<dyn MappingStore + Send + Sync>,
}

impl SharedMappingStore {
    /// Wraps a mapping store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl MappingStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn MappingStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl MappingStore for SharedMappingStore {
    fn find_by_natural_key(
        &self,
        slug: &Slug,
        kind: &Kind,
    ) -> Result<Option<MappingRecord>, StoreError> {
        self.inner.find_by_natural_key(slug, kind)
    }

    fn find_by_id(&self, identifier: &MappingId) -> Result<Option<MappingRecord>, StoreError> {
        self.inner.find_by_id(identifier)
    }

    fn insert_or_fetch(&self, record: MappingRecord) -> Result<MappingRecord, StoreError> {
        self.inner.insert_or_fetch(record)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }

    fn close(&self) -> Result<(), StoreError> {
        self.inner.close()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
