// crates/slugmap-core/src/core/identifiers.rs
// ============================================================================
// Module: Slugmap Identifiers
// Description: Slug, kind, and opaque mapping identifier newtypes.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Slugs and kinds are caller-supplied opaque strings; no normalization is
//! applied by these types. Mapping identifiers are random 128-bit values
//! rendered in canonical lowercase hyphenated UUID form on the wire and in
//! storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Human-readable content key from the upstream catalog.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Creates a new slug.
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Slug {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Slug {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Discriminator describing what a slug refers to.
///
/// # Invariants
/// - Opaque UTF-8 string from an open set; allow-listing is a policy concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(String);

impl Kind {
    /// Kind used by the front end for series-level pages.
    pub const SERIES: &'static str = "series";
    /// Kind used by the front end for chapter-level pages.
    pub const CHAPTER: &'static str = "chapter";

    /// Creates a new kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Returns the series kind.
    #[must_use]
    pub fn series() -> Self {
        Self::new(Self::SERIES)
    }

    /// Returns the chapter kind.
    #[must_use]
    pub fn chapter() -> Self {
        Self::new(Self::CHAPTER)
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Kind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Kind {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Opaque identifier issued for a `(slug, kind)` pair.
///
/// # Invariants
/// - Displays and serializes as a lowercase hyphenated UUID.
/// - Generated identifiers are random (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingId(Uuid);

impl MappingId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier that is exactly in canonical form.
    ///
    /// Returns `None` for anything else, including uppercase, braced, URN, or
    /// unhyphenated renderings of an otherwise valid UUID. Only canonical text
    /// is ever issued, so non-canonical input cannot name an issued identifier.
    #[must_use]
    pub fn parse_canonical(text: &str) -> Option<Self> {
        let uuid = Uuid::parse_str(text).ok()?;
        let id = Self(uuid);
        (id.to_string() == text).then_some(id)
    }
}

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
