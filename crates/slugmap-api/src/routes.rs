// crates/slugmap-api/src/routes.rs
// ============================================================================
// Module: API Routes
// Description: HTTP handlers for create-or-get, resolve, and health.
// Purpose: Translate JSON requests into mapping service calls.
// Dependencies: slugmap-core, axum, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! Handlers parse explicit request payloads, run the blocking mapping service
//! on the tokio blocking pool under a per-request timeout, and map
//! [`MappingError`] onto HTTP statuses with `{error}` bodies. Every request is
//! reported to the audit sink and the metrics hook exactly once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use slugmap_core::MappingError;
use slugmap_core::MappingId;
use slugmap_core::MappingService;
use thiserror::Error;

use crate::audit::ApiAuditEvent;
use crate::audit::ApiAuditEventParams;
use crate::audit::ApiAuditSink;
use crate::telemetry::ApiMetricEvent;
use crate::telemetry::ApiMetrics;
use crate::telemetry::ApiOutcome;
use crate::telemetry::ApiRoute;

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// `POST /api/get-id` request body.
#[derive(Debug, Deserialize)]
pub struct GetIdRequest {
    /// Content slug.
    pub slug: Option<String>,
    /// Content kind.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// `POST /api/get-id` response body.
#[derive(Debug, Serialize)]
pub struct GetIdResponse {
    /// Identifier for the pair.
    pub uuid: MappingId,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Short error message.
    pub error: String,
}

/// `GET /api/health` response body.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    /// `OK` or `Error`.
    pub status: &'static str,
    /// `Connected` when the store is reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,
    /// Failure detail when the store is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Request-level failures mapped to HTTP statuses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Body could not be parsed as a request payload.
    #[error("{0}")]
    Malformed(String),
    /// Request body exceeded the configured limit.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
    /// Service-level failure.
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl ApiError {
    /// Returns the HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) | Self::Mapping(MappingError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Mapping(MappingError::NotFound) => StatusCode::NOT_FOUND,
            Self::Mapping(MappingError::StorageUnavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a stable error kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Mapping(MappingError::Validation(_)) => "validation",
            Self::Mapping(MappingError::NotFound) => "not_found",
            Self::Mapping(MappingError::StorageUnavailable(_)) => "storage_unavailable",
        }
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    /// Mapping service.
    service: MappingService,
    /// Audit sink for request events.
    audit: Arc<dyn ApiAuditSink>,
    /// Metrics hook.
    metrics: Arc<dyn ApiMetrics>,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
    /// Upper bound on a single storage call.
    request_timeout: Duration,
}

impl AppState {
    /// Builds handler state.
    #[must_use]
    pub fn new(
        service: MappingService,
        audit: Arc<dyn ApiAuditSink>,
        metrics: Arc<dyn ApiMetrics>,
        max_body_bytes: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            service,
            audit,
            metrics,
            max_body_bytes,
            request_timeout,
        }
    }

    /// Returns the mapping service.
    #[must_use]
    pub const fn service(&self) -> &MappingService {
        &self.service
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn audit(&self) -> Arc<dyn ApiAuditSink> {
        Arc::clone(&self.audit)
    }

    /// Runs a service call on the blocking pool, bounded by the request timeout.
    ///
    /// A timeout only abandons the wait: the blocking task keeps running and
    /// may still persist a record after the caller has answered 500. Retries
    /// stay safe because create-or-get is idempotent.
    async fn run_blocking<T>(
        &self,
        op: impl FnOnce(&MappingService) -> Result<T, MappingError> + Send + 'static,
    ) -> Result<T, MappingError>
    where
        T: Send + 'static,
    {
        let service = self.service.clone();
        let task = tokio::task::spawn_blocking(move || op(&service));
        match tokio::time::timeout(self.request_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(MappingError::StorageUnavailable("storage task failed".to_string())),
            Err(_) => Err(MappingError::StorageUnavailable(
                "storage operation timed out".to_string(),
            )),
        }
    }

    /// Serializes the body, reports the request, and builds the response.
    fn complete(
        &self,
        route: ApiRoute,
        started: Instant,
        request_bytes: usize,
        status: StatusCode,
        error_kind: Option<&'static str>,
        body: &impl Serialize,
    ) -> Response {
        let payload = serde_json::to_vec(body)
            .unwrap_or_else(|_| br#"{"error":"response serialization failed"}"#.to_vec());
        let latency = started.elapsed();
        let outcome = if status.is_success() { ApiOutcome::Ok } else { ApiOutcome::Error };
        let metric = ApiMetricEvent {
            route,
            outcome,
            status: status.as_u16(),
            error_kind,
            request_bytes,
            response_bytes: payload.len(),
        };
        self.metrics.record_request(metric.clone());
        self.metrics.record_latency(metric, latency);
        self.audit.record(&ApiAuditEvent::new(ApiAuditEventParams {
            route,
            status: status.as_u16(),
            outcome,
            error_kind,
            request_bytes,
            response_bytes: payload.len(),
            latency_ms: latency.as_millis(),
        }));
        (status, [(CONTENT_TYPE, HeaderValue::from_static("application/json"))], payload)
            .into_response()
    }

    /// Builds an `{error}` response for a failed request.
    fn fail(
        &self,
        route: ApiRoute,
        started: Instant,
        request_bytes: usize,
        error: &ApiError,
    ) -> Response {
        let body = ErrorBody {
            error: error.to_string(),
        };
        self.complete(route, started, request_bytes, error.status(), Some(error.kind()), &body)
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the `/api` router.
pub fn api_router(state: Arc<AppState>) -> Router {
    let limit = state.max_body_bytes;
    Router::new()
        .route("/api/get-id", post(get_id))
        .route("/api/get-slug/{uuid}", get(get_slug))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `POST /api/get-id`: returns the identifier for `(slug, type)`.
async fn get_id(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let bytes = match body {
        Ok(bytes) => bytes,
        Err(rejection) => {
            let error = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge(state.max_body_bytes)
            } else {
                ApiError::Malformed("request body could not be read".to_string())
            };
            return state.fail(ApiRoute::GetId, started, 0, &error);
        }
    };
    let request_bytes = bytes.len();
    match create_or_get(&state, &bytes).await {
        Ok(uuid) => state.complete(
            ApiRoute::GetId,
            started,
            request_bytes,
            StatusCode::OK,
            None,
            &GetIdResponse {
                uuid,
            },
        ),
        Err(error) => state.fail(ApiRoute::GetId, started, request_bytes, &error),
    }
}

/// Parses a get-id body and runs create-or-get.
async fn create_or_get(state: &AppState, bytes: &[u8]) -> Result<MappingId, ApiError> {
    if bytes.len() > state.max_body_bytes {
        return Err(ApiError::PayloadTooLarge(state.max_body_bytes));
    }
    let request = parse_get_id_request(bytes)?;
    let (Some(slug), Some(kind)) = (request.slug, request.kind) else {
        return Err(ApiError::Malformed("slug and type are required".to_string()));
    };
    Ok(state.run_blocking(move |service| service.create_or_get(&slug, &kind)).await?)
}

/// Decodes a get-id body, accepting only a JSON object.
///
/// Derived struct deserialization also accepts arrays in field order, so the
/// body is read as a map before it is converted.
fn parse_get_id_request(bytes: &[u8]) -> Result<GetIdRequest, ApiError> {
    let malformed = || ApiError::Malformed("request body must be a JSON object".to_string());
    let object: Map<String, Value> = serde_json::from_slice(bytes).map_err(|_| malformed())?;
    serde_json::from_value(Value::Object(object)).map_err(|_| malformed())
}

/// `GET /api/get-slug/{uuid}`: returns the record for an identifier.
async fn get_slug(State(state): State<Arc<AppState>>, Path(uuid): Path<String>) -> Response {
    let started = Instant::now();
    match state.run_blocking(move |service| service.resolve(&uuid)).await {
        Ok(record) => state.complete(ApiRoute::GetSlug, started, 0, StatusCode::OK, None, &record),
        Err(error) => state.fail(ApiRoute::GetSlug, started, 0, &ApiError::from(error)),
    }
}

/// `GET /api/health`: reports store connectivity.
async fn health(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    match state.run_blocking(MappingService::health_check).await {
        Ok(()) => state.complete(
            ApiRoute::Health,
            started,
            0,
            StatusCode::OK,
            None,
            &HealthBody {
                status: "OK",
                database: Some("Connected"),
                message: None,
            },
        ),
        Err(error) => {
            let error = ApiError::from(error);
            state.complete(
                ApiRoute::Health,
                started,
                0,
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(error.kind()),
                &HealthBody {
                    status: "Error",
                    database: None,
                    message: Some(error.to_string()),
                },
            )
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, reason = "Test-only assertions.")]

    use axum::http::StatusCode;
    use slugmap_core::MappingError;

    use super::ApiError;
    use super::parse_get_id_request;

    #[test]
    fn get_id_body_must_be_an_object() {
        let request = parse_get_id_request(br#"{"slug":"one-piece","type":"series"}"#)
            .unwrap_or_else(|err| panic!("object rejected: {err}"));
        assert_eq!(request.slug.as_deref(), Some("one-piece"));
        assert_eq!(request.kind.as_deref(), Some("series"));
        let bodies: [&[u8]; 4] = [br#"["one-piece","series"]"#, b"\"one-piece\"", b"null", b"7"];
        for body in bodies {
            assert!(matches!(parse_get_id_request(body), Err(ApiError::Malformed(_))));
        }
    }

    #[test]
    fn errors_map_to_statuses_and_kinds() {
        let cases = [
            (ApiError::Malformed("x".to_string()), StatusCode::BAD_REQUEST, "malformed_request"),
            (ApiError::PayloadTooLarge(1), StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            (
                ApiError::Mapping(MappingError::Validation("x".to_string())),
                StatusCode::BAD_REQUEST,
                "validation",
            ),
            (ApiError::Mapping(MappingError::NotFound), StatusCode::NOT_FOUND, "not_found"),
            (
                ApiError::Mapping(MappingError::StorageUnavailable("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_unavailable",
            ),
        ];
        for (error, status, kind) in cases {
            assert_eq!(error.status(), status);
            assert_eq!(error.kind(), kind);
        }
    }
}
