// crates/slugmap-core/src/interfaces/mod.rs
// ============================================================================
// Module: Slugmap Interfaces
// Description: Backend-agnostic storage interface for mapping records.
// Purpose: Define the contract surface used by the mapping service.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The [`MappingStore`] trait is the only seam between the mapping service and
//! persistence. Implementations must make [`MappingStore::insert_or_fetch`]
//! atomic per `(slug, kind)` so concurrent creators converge on one record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Kind;
use crate::core::MappingId;
use crate::core::MappingRecord;
use crate::core::Slug;

// ============================================================================
// SECTION: Mapping Store
// ============================================================================

/// Mapping store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages avoid embedding raw slug payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store I/O error.
    #[error("mapping store io error: {0}")]
    Io(String),
    /// Store backend error.
    #[error("mapping store error: {0}")]
    Store(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("mapping store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("mapping store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("mapping store invalid data: {0}")]
    Invalid(String),
    /// The identifier is already held by a different `(slug, kind)` pair.
    #[error("mapping identifier collision: {0}")]
    IdentifierCollision(MappingId),
    /// The store has been closed.
    #[error("mapping store closed")]
    Closed,
}

/// Persistent store for mapping records.
pub trait MappingStore {
    /// Looks up a record by its natural key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_by_natural_key(
        &self,
        slug: &Slug,
        kind: &Kind,
    ) -> Result<Option<MappingRecord>, StoreError>;

    /// Looks up a record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_by_id(&self, identifier: &MappingId) -> Result<Option<MappingRecord>, StoreError>;

    /// Inserts the record, or returns the record already holding its
    /// `(slug, kind)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IdentifierCollision`] when only the identifier is
    /// taken, and other [`StoreError`] variants when the write fails.
    fn insert_or_fetch(&self, record: MappingRecord) -> Result<MappingRecord, StoreError>;

    /// Reports store readiness for health probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Closes the store. Later calls fail with [`StoreError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when shutdown work fails.
    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
