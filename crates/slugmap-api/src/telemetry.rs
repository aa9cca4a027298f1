// crates/slugmap-api/src/telemetry.rs
// ============================================================================
// Module: API Telemetry
// Description: Observability hooks for the HTTP mapping routes.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for request counters and
//! latency histograms. Deployments plug in a backend by implementing
//! [`ApiMetrics`]; the default [`NoopMetrics`] discards everything. Labels
//! never carry slugs or identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for request histograms.
pub const API_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// API route classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApiRoute {
    /// `POST /api/get-id`.
    #[serde(rename = "/api/get-id")]
    GetId,
    /// `GET /api/get-slug/{uuid}`.
    #[serde(rename = "/api/get-slug")]
    GetSlug,
    /// `GET /api/health`.
    #[serde(rename = "/api/health")]
    Health,
}

impl ApiRoute {
    /// Returns a stable label for the route.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetId => "/api/get-id",
            Self::GetSlug => "/api/get-slug",
            Self::Health => "/api/health",
        }
    }

    /// Returns the HTTP method served by the route.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::GetId => "POST",
            Self::GetSlug | Self::Health => "GET",
        }
    }
}

/// Request outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiOutcome {
    /// Successful request.
    Ok,
    /// Failed request.
    Error,
}

impl ApiOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Request metric event payload.
#[derive(Debug, Clone)]
pub struct ApiMetricEvent {
    /// Route classification.
    pub route: ApiRoute,
    /// Request outcome.
    pub outcome: ApiOutcome,
    /// HTTP status code.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for API requests and latencies.
pub trait ApiMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: ApiMetricEvent);
    /// Records a latency observation for the request.
    fn record_latency(&self, event: ApiMetricEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl ApiMetrics for NoopMetrics {
    fn record_request(&self, _event: ApiMetricEvent) {}

    fn record_latency(&self, _event: ApiMetricEvent, _latency: Duration) {}
}

/// Returns the index of the first bucket that holds `latency`.
///
/// Observations above the last bound land in the overflow slot at
/// `API_LATENCY_BUCKETS_MS.len()`.
#[must_use]
pub fn latency_bucket_index(latency: Duration) -> usize {
    let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    API_LATENCY_BUCKETS_MS
        .iter()
        .position(|bound| millis <= *bound)
        .unwrap_or(API_LATENCY_BUCKETS_MS.len())
}
