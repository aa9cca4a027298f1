// crates/slugmap-config/src/lib.rs
// ============================================================================
// Module: Slugmap Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for slugmap.toml semantics.
// Dependencies: slugmap-core, slugmap-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `slugmap-config` defines the configuration model shared by the HTTP server
//! and the CLI. Loading is strict and fail-closed: oversized, non-UTF-8, or
//! inconsistent files are rejected before any store is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
