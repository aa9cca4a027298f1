// crates/slugmap-core/src/runtime/service.rs
// ============================================================================
// Module: Slugmap Mapping Service
// Description: Create-or-get, resolve, and health operations over a store.
// Purpose: Issue stable identifiers for (slug, kind) pairs and resolve them back.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! [`MappingService`] validates caller input against a [`MappingPolicy`],
//! then delegates to the injected [`SharedMappingStore`]. Creation relies on
//! [`MappingStore::insert_or_fetch`] so a creator that loses a race receives
//! the winner's identifier instead of writing a duplicate. Storage failures
//! are surfaced as [`MappingError::StorageUnavailable`] without retry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::Kind;
use crate::core::MappingId;
use crate::core::MappingRecord;
use crate::core::Slug;
use crate::interfaces::MappingStore;
use crate::interfaces::StoreError;
use crate::runtime::store::SharedMappingStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum slug length in bytes.
pub const DEFAULT_MAX_SLUG_BYTES: usize = 1024;
/// Default maximum kind length in bytes.
pub const DEFAULT_MAX_KIND_BYTES: usize = 64;
/// Fresh identifiers tried before giving up on a collision streak.
const MAX_IDENTIFIER_ATTEMPTS: usize = 3;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Mapping service errors.
///
/// # Invariants
/// - Every operation returns a result or exactly one of these outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Caller input is missing or invalid.
    #[error("{0}")]
    Validation(String),
    /// No record holds the requested identifier.
    #[error("identifier not found")]
    NotFound,
    /// The store could not complete the operation.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<StoreError> for MappingError {
    fn from(error: StoreError) -> Self {
        Self::StorageUnavailable(error.to_string())
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Input rules applied before create-or-get reaches the store.
///
/// # Invariants
/// - An empty `allowed_kinds` set accepts any non-empty kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingPolicy {
    /// Optional kind allow-list.
    pub allowed_kinds: BTreeSet<String>,
    /// Maximum slug length in bytes.
    pub max_slug_bytes: usize,
    /// Maximum kind length in bytes.
    pub max_kind_bytes: usize,
}

impl Default for MappingPolicy {
    fn default() -> Self {
        Self {
            allowed_kinds: BTreeSet::new(),
            max_slug_bytes: DEFAULT_MAX_SLUG_BYTES,
            max_kind_bytes: DEFAULT_MAX_KIND_BYTES,
        }
    }
}

impl MappingPolicy {
    /// Validates a create-or-get request.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Validation`] when either input is rejected.
    pub fn validate(&self, slug: &str, kind: &str) -> Result<(), MappingError> {
        if slug.is_empty() {
            return Err(MappingError::Validation("slug must be non-empty".to_string()));
        }
        if kind.is_empty() {
            return Err(MappingError::Validation("type must be non-empty".to_string()));
        }
        if slug.len() > self.max_slug_bytes {
            return Err(MappingError::Validation(format!(
                "slug exceeds {} bytes",
                self.max_slug_bytes
            )));
        }
        if kind.len() > self.max_kind_bytes {
            return Err(MappingError::Validation(format!(
                "type exceeds {} bytes",
                self.max_kind_bytes
            )));
        }
        if !self.allowed_kinds.is_empty() && !self.allowed_kinds.contains(kind) {
            return Err(MappingError::Validation("type is not allowed".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Identifier mapping service.
///
/// # Invariants
/// - At most one record is created per `(slug, kind)` pair.
/// - Resolve never fabricates a record.
#[derive(Clone)]
pub struct MappingService {
    /// Backing store.
    store: SharedMappingStore,
    /// Input validation policy.
    policy: MappingPolicy,
    /// Identifier source for new records.
    id_source: fn() -> MappingId,
}

impl MappingService {
    /// Creates a mapping service over the provided store.
    #[must_use]
    pub fn new(store: SharedMappingStore, policy: MappingPolicy) -> Self {
        Self {
            store,
            policy,
            id_source: MappingId::generate,
        }
    }

    /// Replaces the identifier source used for new records.
    #[must_use]
    pub fn with_id_source(mut self, id_source: fn() -> MappingId) -> Self {
        self.id_source = id_source;
        self
    }

    /// Returns the identifier for `(slug, kind)`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Validation`] for rejected input (no record is
    /// created) and [`MappingError::StorageUnavailable`] when the store fails.
    pub fn create_or_get(&self, slug: &str, kind: &str) -> Result<MappingId, MappingError> {
        self.policy.validate(slug, kind)?;
        let slug = Slug::new(slug);
        let kind = Kind::new(kind);
        if let Some(existing) = self.store.find_by_natural_key(&slug, &kind)? {
            return Ok(existing.identifier);
        }
        for _ in 0 .. MAX_IDENTIFIER_ATTEMPTS {
            let candidate = MappingRecord::new((self.id_source)(), slug.clone(), kind.clone());
            match self.store.insert_or_fetch(candidate) {
                Ok(record) => return Ok(record.identifier),
                Err(StoreError::IdentifierCollision(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Err(MappingError::StorageUnavailable(
            "identifier generation kept colliding".to_string(),
        ))
    }

    /// Resolves identifier text to its record.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::NotFound`] when the text is not a canonical
    /// identifier or no record holds it, and
    /// [`MappingError::StorageUnavailable`] when the store fails.
    pub fn resolve(&self, identifier: &str) -> Result<MappingRecord, MappingError> {
        let identifier = MappingId::parse_canonical(identifier).ok_or(MappingError::NotFound)?;
        self.resolve_id(&identifier)
    }

    /// Resolves a parsed identifier to its record.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::NotFound`] when no record holds the identifier
    /// and [`MappingError::StorageUnavailable`] when the store fails.
    pub fn resolve_id(&self, identifier: &MappingId) -> Result<MappingRecord, MappingError> {
        self.store.find_by_id(identifier)?.ok_or(MappingError::NotFound)
    }

    /// Verifies store connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::StorageUnavailable`] when the store is not ready.
    pub fn health_check(&self) -> Result<(), MappingError> {
        self.store.readiness().map_err(MappingError::from)
    }

    /// Closes the backing store.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::StorageUnavailable`] when shutdown fails.
    pub fn close(&self) -> Result<(), MappingError> {
        self.store.close().map_err(MappingError::from)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
