// crates/slugmap-api/src/audit.rs
// ============================================================================
// Module: API Audit Logging
// Description: Structured audit events for HTTP request handling.
// Purpose: Emit JSON-line request and lifecycle logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for request logging.
//! Events are JSON lines so deployments can route them to any log pipeline.
//! Request events carry routing metadata and sizes only; slugs are never
//! written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::telemetry::ApiOutcome;
use crate::telemetry::ApiRoute;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ApiAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Route classification.
    pub route: ApiRoute,
    /// HTTP method.
    pub method: &'static str,
    /// HTTP status code.
    pub status: u16,
    /// Request outcome.
    pub outcome: ApiOutcome,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
    /// Handling latency in milliseconds.
    pub latency_ms: u128,
}

/// Inputs required to construct a request audit event.
pub struct ApiAuditEventParams {
    /// Route classification.
    pub route: ApiRoute,
    /// HTTP status code.
    pub status: u16,
    /// Request outcome.
    pub outcome: ApiOutcome,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
    /// Handling latency in milliseconds.
    pub latency_ms: u128,
}

/// Server lifecycle audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleAuditEvent {
    /// Event identifier (`server_started`, `server_stopped`, `store_closed`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Optional detail, such as the bound address or a shutdown error.
    pub message: Option<String>,
}

impl ApiAuditEvent {
    /// Creates a new request audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ApiAuditEventParams) -> Self {
        Self {
            event: "api_request",
            timestamp_ms: now_millis(),
            route: params.route,
            method: params.route.method(),
            status: params.status,
            outcome: params.outcome,
            error_kind: params.error_kind,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
            latency_ms: params.latency_ms,
        }
    }
}

impl LifecycleAuditEvent {
    /// Creates a new lifecycle audit event with a consistent timestamp.
    #[must_use]
    pub fn new(event: &'static str, message: Option<String>) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            message,
        }
    }
}

/// Returns milliseconds since the unix epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for API events.
pub trait ApiAuditSink: Send + Sync {
    /// Record a request audit event.
    fn record(&self, event: &ApiAuditEvent);

    /// Record a lifecycle audit event.
    fn record_lifecycle(&self, _event: &LifecycleAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct ApiStderrAuditSink;

impl ApiAuditSink for ApiStderrAuditSink {
    fn record(&self, event: &ApiAuditEvent) {
        write_stderr(event);
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        write_stderr(event);
    }
}

/// Writes one JSON line to stderr.
fn write_stderr(event: &impl Serialize) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(std::io::stderr(), "{payload}");
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct ApiFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl ApiFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one JSON line.
    fn write_line(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl ApiAuditSink for ApiFileAuditSink {
    fn record(&self, event: &ApiAuditEvent) {
        self.write_line(event);
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        self.write_line(event);
    }
}

/// No-op audit sink.
pub struct ApiNoopAuditSink;

impl ApiAuditSink for ApiNoopAuditSink {
    fn record(&self, _event: &ApiAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
