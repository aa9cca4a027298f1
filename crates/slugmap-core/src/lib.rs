// crates/slugmap-core/src/lib.rs
// ============================================================================
// Module: Slugmap Core Library
// Description: Public API surface for the slug mapping core.
// Purpose: Expose mapping types, storage interfaces, and the mapping service.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Slugmap core owns the bidirectional relation between `(slug, kind)` pairs
//! and opaque identifiers used in shareable URLs. It is storage-agnostic and
//! integrates through the [`MappingStore`] interface; transports (HTTP, CLI)
//! call into [`MappingService`] so create-or-get and resolve semantics live in
//! one place.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::MappingStore;
pub use interfaces::StoreError;
pub use runtime::DEFAULT_MAX_KIND_BYTES;
pub use runtime::DEFAULT_MAX_SLUG_BYTES;
pub use runtime::InMemoryMappingStore;
pub use runtime::MappingError;
pub use runtime::MappingPolicy;
pub use runtime::MappingService;
pub use runtime::SharedMappingStore;
