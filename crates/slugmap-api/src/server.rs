// crates/slugmap-api/src/server.rs
// ============================================================================
// Module: Slugmap Server
// Description: HTTP server assembly, static hosting, and lifecycle.
// Purpose: Serve the mapping API and the front-end build from one process.
// Dependencies: slugmap-config, slugmap-core, slugmap-store-sqlite, axum,
//               tokio, tower-http
// ============================================================================

//! ## Overview
//! [`SlugmapServer`] opens the configured store, wires the mapping service
//! into the `/api` router, and optionally serves a static front end with
//! client-side routes falling back to `index.html`. Shutdown is graceful: the
//! listener drains in-flight requests before the store is closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::Method;
use axum::http::header::CONTENT_TYPE;
use slugmap_config::AuditConfig;
use slugmap_config::SlugmapConfig;
use slugmap_config::StoreConfig;
use slugmap_config::StoreType;
use slugmap_core::InMemoryMappingStore;
use slugmap_core::MappingService;
use slugmap_core::SharedMappingStore;
use slugmap_store_sqlite::SqliteMappingStore;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::services::ServeFile;

use crate::audit::ApiAuditSink;
use crate::audit::ApiFileAuditSink;
use crate::audit::ApiNoopAuditSink;
use crate::audit::ApiStderrAuditSink;
use crate::audit::LifecycleAuditEvent;
use crate::routes::AppState;
use crate::routes::api_router;
use crate::telemetry::ApiMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Client-side routes answered with the front end's `index.html`.
///
/// The bare `/series/` and `/chapter/` paths are listed because the wildcard
/// segment needs at least one character.
pub const SPA_ROUTES: &[&str] = &[
    "/series/",
    "/series/{*rest}",
    "/chapter/",
    "/chapter/{*rest}",
    "/ongoing",
    "/completed",
];
/// Preflight cache lifetime for CORS responses.
const CORS_MAX_AGE: Duration = Duration::from_secs(60 * 60);

// ============================================================================
// SECTION: Server
// ============================================================================

/// Slugmap HTTP server instance.
pub struct SlugmapServer {
    /// Server configuration.
    config: SlugmapConfig,
    /// Shared handler state.
    state: Arc<AppState>,
}

impl SlugmapServer {
    /// Builds a new server from configuration, opening the configured store.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or the store or
    /// audit log cannot be opened.
    pub fn from_config(config: SlugmapConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config.server.audit)?;
        Self::with_sinks(config, audit, Arc::new(NoopMetrics))
    }

    /// Builds a new server with explicit audit and metrics sinks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or the store
    /// cannot be opened.
    pub fn with_sinks(
        config: SlugmapConfig,
        audit: Arc<dyn ApiAuditSink>,
        metrics: Arc<dyn ApiMetrics>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let service = build_mapping_service(&config)?;
        let state = Arc::new(AppState::new(
            service,
            audit,
            metrics,
            config.server.max_body_bytes,
            Duration::from_millis(config.server.request_timeout_ms),
        ));
        Ok(Self {
            config,
            state,
        })
    }

    /// Returns the full application router.
    #[must_use]
    pub fn router(&self) -> Router {
        let mut app = api_router(Arc::clone(&self.state));
        if let Some(dir) = &self.config.server.static_dir {
            app = app.merge(static_router(dir));
        }
        if self.config.server.cors.enabled {
            app = app.layer(cors_layer());
        }
        app
    }

    /// Binds the configured address and serves until Ctrl-C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self
            .config
            .server
            .bind_addr()
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serves on an already-bound listener until `shutdown` resolves, then
    /// closes the store.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when serving fails or the store does not close.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let audit = self.state.audit();
        let local: Option<SocketAddr> = listener.local_addr().ok();
        audit.record_lifecycle(&LifecycleAuditEvent::new(
            "server_started",
            local.map(|addr| addr.to_string()),
        ));
        let app = self.router();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")));
        audit.record_lifecycle(&LifecycleAuditEvent::new(
            "server_stopped",
            served.as_ref().err().map(ToString::to_string),
        ));
        let service = self.state.service().clone();
        let closed = tokio::task::spawn_blocking(move || service.close())
            .await
            .map_err(|err| ServerError::Transport(format!("store close task failed: {err}")))?
            .map_err(|err| ServerError::Init(format!("store close failed: {err}")));
        audit.record_lifecycle(&LifecycleAuditEvent::new(
            "store_closed",
            closed.as_ref().err().map(ToString::to_string),
        ));
        served?;
        closed
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Opens the configured mapping store.
///
/// # Errors
///
/// Returns [`ServerError::Init`] when the `SQLite` store cannot be opened.
pub fn build_mapping_store(config: &StoreConfig) -> Result<SharedMappingStore, ServerError> {
    match config.store_type {
        StoreType::Memory => Ok(SharedMappingStore::from_store(InMemoryMappingStore::new())),
        StoreType::Sqlite => {
            let sqlite_config = config
                .sqlite_config()
                .ok_or_else(|| ServerError::Config("sqlite store requires path".to_string()))?;
            let store = SqliteMappingStore::new(sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(SharedMappingStore::from_store(store))
        }
    }
}

/// Builds the mapping service for the configured store and policy.
///
/// # Errors
///
/// Returns [`ServerError`] when the store cannot be opened.
pub fn build_mapping_service(config: &SlugmapConfig) -> Result<MappingService, ServerError> {
    let store = build_mapping_store(&config.store)?;
    Ok(MappingService::new(store, config.mapping.policy()))
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn ApiAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(ApiNoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = ApiFileAuditSink::new(Path::new(path.trim()))
                .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(ApiStderrAuditSink)),
    }
}

/// Builds the static front-end router with client-side route fallbacks.
fn static_router(dir: &Path) -> Router {
    let index = dir.join("index.html");
    let mut router = Router::new();
    for route in SPA_ROUTES {
        router = router.route_service(route, ServeFile::new(&index));
    }
    router.fallback_service(ServeDir::new(dir))
}

/// Builds the permissive CORS layer.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(CORS_MAX_AGE)
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
