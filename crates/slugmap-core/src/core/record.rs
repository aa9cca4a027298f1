// crates/slugmap-core/src/core/record.rs
// ============================================================================
// Module: Slugmap Mapping Record
// Description: Durable association between an identifier and a slug/kind pair.
// Purpose: Define the record shape shared by stores and the HTTP surface.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`MappingRecord`] is created once per `(slug, kind)` pair and never
//! mutated. On the wire the identifier is named `uuid` and the kind `type`,
//! matching the shape the front end reads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Kind;
use crate::core::identifiers::MappingId;
use crate::core::identifiers::Slug;

// ============================================================================
// SECTION: Record
// ============================================================================

/// Mapping between an opaque identifier and a `(slug, kind)` pair.
///
/// # Invariants
/// - `(slug, kind)` is unique across the store.
/// - `identifier` is unique across the store regardless of `kind`.
/// - Records are append-only; no field changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Issued identifier.
    #[serde(rename = "uuid")]
    pub identifier: MappingId,
    /// Content slug supplied by the caller.
    pub slug: Slug,
    /// Content kind supplied by the caller.
    #[serde(rename = "type")]
    pub kind: Kind,
}

impl MappingRecord {
    /// Creates a new mapping record.
    #[must_use]
    pub const fn new(identifier: MappingId, slug: Slug, kind: Kind) -> Self {
        Self {
            identifier,
            slug,
            kind,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use serde_json::json;

    use super::MappingRecord;
    use crate::core::identifiers::Kind;
    use crate::core::identifiers::MappingId;
    use crate::core::identifiers::Slug;

    #[test]
    fn record_serializes_with_wire_field_names() {
        let id = MappingId::parse_canonical("0b8e8c1a-3f4d-4a57-9c39-1f0b6f1d2e3a").expect("id");
        let record = MappingRecord::new(id, Slug::new("one-piece"), Kind::series());
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(
            value,
            json!({
                "uuid": "0b8e8c1a-3f4d-4a57-9c39-1f0b6f1d2e3a",
                "slug": "one-piece",
                "type": "series",
            })
        );
        let decoded: MappingRecord = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, record);
    }
}
