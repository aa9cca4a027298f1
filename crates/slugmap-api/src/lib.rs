// crates/slugmap-api/src/lib.rs
// ============================================================================
// Module: Slugmap API Library
// Description: HTTP surface for the identifier mapping service.
// Purpose: Expose create-or-get, resolve, and health over JSON.
// Dependencies: slugmap-core, slugmap-config, slugmap-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! Slugmap API serves three JSON routes backed by
//! [`slugmap_core::MappingService`]:
//! - `POST /api/get-id` returns `{uuid}` for a `{slug, type}` pair.
//! - `GET /api/get-slug/{uuid}` returns `{uuid, slug, type}`.
//! - `GET /api/health` reports store connectivity.
//!
//! It can also host the front-end build, with client-side routes answered by
//! `index.html`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod routes;
pub mod server;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ApiAuditEvent;
pub use audit::ApiAuditSink;
pub use audit::ApiFileAuditSink;
pub use audit::ApiNoopAuditSink;
pub use audit::ApiStderrAuditSink;
pub use audit::LifecycleAuditEvent;
pub use routes::ApiError;
pub use routes::AppState;
pub use routes::api_router;
pub use server::ServerError;
pub use server::SlugmapServer;
pub use server::build_mapping_service;
pub use server::build_mapping_store;
pub use telemetry::API_LATENCY_BUCKETS_MS;
pub use telemetry::ApiMetricEvent;
pub use telemetry::ApiMetrics;
pub use telemetry::ApiOutcome;
pub use telemetry::ApiRoute;
pub use telemetry::NoopMetrics;
