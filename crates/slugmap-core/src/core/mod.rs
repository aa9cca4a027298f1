// crates/slugmap-core/src/core/mod.rs
// ============================================================================
// Module: Slugmap Core Types
// Description: Canonical mapping identifiers and records.
// Purpose: Provide stable, serializable types shared by stores and transports.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Core types define the slug, kind, and identifier newtypes plus the
//! [`MappingRecord`] that binds them. These types are the canonical source of
//! truth for the HTTP wire format and the storage layout.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod record;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::Kind;
pub use identifiers::MappingId;
pub use identifiers::Slug;
pub use record::MappingRecord;
