// crates/slugmap-core/src/runtime/mod.rs
// ============================================================================
// Module: Slugmap Runtime
// Description: Mapping service and in-process store implementations.
// Purpose: Execute create-or-get, resolve, and health operations.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the mapping service and the in-memory and shared
//! store wrappers. Every transport calls the same service so validation and
//! create-or-get semantics cannot drift between surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod service;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use service::DEFAULT_MAX_KIND_BYTES;
pub use service::DEFAULT_MAX_SLUG_BYTES;
pub use service::MappingError;
pub use service::MappingPolicy;
pub use service::MappingService;
pub use store::InMemoryMappingStore;
pub use store::SharedMappingStore;
