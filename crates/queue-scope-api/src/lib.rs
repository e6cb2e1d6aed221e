//! # Queue-Scope HTTP Service
//!
//! HTTP and WebSocket transport for the Queue-Scope debugging console.
//!
//! This service provides:
//! - Queue listing, message browsing, send, delete and retry endpoints
//! - Queue statistics including dead-letter sampling
//! - A live-tail WebSocket endpoint with heartbeat
//! - Backend context and liveness endpoints

pub mod backend_selection;
pub mod config;
pub mod errors;
pub mod live_tail_ws;
pub mod queue_path;
pub mod responses;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use queue_scope_core::{DirectoryService, LiveTailManager, MessageService, Queue};
use queue_scope_runtime::{BackendContext, QueueBackend};
use serde::de::DeserializeOwned;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

pub use backend_selection::{select_backend, SelectedBackend};
pub use config::ServiceConfig;
pub use errors::{ApiError, ConfigError, ProtocolError, ServiceError};
pub use queue_path::{QueuePath, QueueResource};
pub use responses::*;

/// Largest page `GET /api/queues` accepts.
const MAX_QUEUE_LIMIT: u32 = 1000;

/// Default page size for message browsing.
const DEFAULT_MESSAGE_LIMIT: u32 = 10;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Queue listing
    pub directory: Arc<DirectoryService>,

    /// Message browsing and mutation
    pub messages: Arc<MessageService>,

    /// Live-tail sessions
    pub live_tail: Arc<LiveTailManager>,

    /// Description of the selected backend
    pub context: Arc<BackendContext>,

    /// Cancelled when the server starts shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the services over `backend`.
    pub fn new(
        config: ServiceConfig,
        backend: Arc<dyn QueueBackend>,
        context: BackendContext,
    ) -> Self {
        let directory = DirectoryService::new(Arc::clone(&backend), config.directory.tag_filter());
        let messages =
            MessageService::new(Arc::clone(&backend), config.messages.receive_wait_seconds);
        let live_tail = LiveTailManager::new(backend, config.live_tail.poller_config());

        Self {
            config: Arc::new(config),
            directory: Arc::new(directory),
            messages: Arc::new(messages),
            live_tail: Arc::new(live_tail),
            context: Arc::new(context),
            shutdown: CancellationToken::new(),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let queue_routes = Router::new()
        .route("/api/queues", get(list_queues))
        .route(
            "/api/queues/{*path}",
            get(handle_queue_get)
                .post(handle_queue_post)
                .delete(handle_queue_delete),
        )
        .route("/api/aws-context", get(get_aws_context));

    let health_routes = Router::new().route("/health", get(handle_health_check));

    let live_tail_routes = Router::new().route("/ws", get(live_tail_ws::live_tail_handler));

    let mut router = Router::new()
        .merge(queue_routes)
        .merge(health_routes)
        .merge(live_tail_routes);

    if state.config.server.enable_compression {
        router = router.layer(CompressionLayer::new());
    }
    if state.config.server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

// ============================================================================
// Server
// ============================================================================

/// Start HTTP server
///
/// Runs until SIGINT or SIGTERM, then drains in-flight requests and closes
/// live-tail connections.
pub async fn start_server(
    config: ServiceConfig,
    selected: SelectedBackend,
) -> Result<(), ServiceError> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %address, mode = ?selected.context.mode, "Starting HTTP server");

    let state = AppState::new(config, selected.backend, selected.context);

    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    serve(listener, state).await
}

/// Serve the router on `listener` until `state.shutdown` is cancelled.
///
/// After cancellation, in-flight requests get
/// `server.shutdown_timeout_seconds` to finish.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), ServiceError> {
    let shutdown = state.shutdown.clone();
    let grace = Duration::from_secs(state.config.server.shutdown_timeout_seconds);
    let app = create_router(state);

    let graceful = {
        let shutdown = shutdown.clone();
        async move { shutdown.cancelled().await }
    };
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(graceful)
        .into_future();

    let grace_expired = async {
        shutdown.cancelled().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = grace_expired => {
            warn!(
                timeout_seconds = grace.as_secs(),
                "Graceful shutdown timed out, abandoning open connections"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

// ============================================================================
// Queue Handlers
// ============================================================================

/// GET /api/queues
#[instrument(skip(state, query))]
async fn list_queues(
    State(state): State<AppState>,
    query: Result<Query<ListQueuesQuery>, QueryRejection>,
) -> Result<Json<Vec<Queue>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidQuery {
        message: e.body_text(),
    })?;

    let limit = query.limit.unwrap_or(state.config.directory.default_limit);
    if limit == 0 || limit > MAX_QUEUE_LIMIT {
        return Err(ApiError::InvalidQuery {
            message: format!("limit must be between 1 and {}", MAX_QUEUE_LIMIT),
        });
    }

    let queues = state.directory.list_queues(limit).await?;
    Ok(Json(queues))
}

/// GET /api/queues/{queueUrl}/messages and /api/queues/{queueUrl}/statistics
#[instrument(skip(state, query))]
async fn handle_queue_get(
    State(state): State<AppState>,
    Path(path): Path<String>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let route = parse_queue_path(&path)?;

    match route.resource {
        QueueResource::Messages => {
            let Query(query) = query.map_err(|e| ApiError::InvalidQuery {
                message: e.body_text(),
            })?;
            let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
            if limit == 0 {
                return Err(ApiError::InvalidQuery {
                    message: "limit must be at least 1".to_string(),
                });
            }

            let messages = state
                .messages
                .get_messages(&route.queue_url, limit, query.offset.unwrap_or(0))
                .await?;
            Ok(Json(messages).into_response())
        }
        QueueResource::Statistics => {
            let statistics = state
                .messages
                .get_queue_statistics(&route.queue_url)
                .await?;
            Ok(Json(statistics).into_response())
        }
        resource => Err(method_not_allowed("GET", &resource)),
    }
}

/// POST /api/queues/{queueUrl}/messages and /api/queues/{queueUrl}/retry
#[instrument(skip(state, body))]
async fn handle_queue_post(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let route = parse_queue_path(&path)?;

    match route.resource {
        QueueResource::Messages => {
            let request: SendMessageRequest = parse_json(&body)?;
            let message_id = state
                .messages
                .send_message(&route.queue_url, &request.body)
                .await?;
            Ok(Json(SendMessageResponse { message_id }).into_response())
        }
        QueueResource::Retry => {
            let request: RetryRequest = parse_json(&body)?;
            let target_queue_url = match request
                .target_queue_url
                .filter(|url| !url.trim().is_empty())
            {
                Some(url) => url,
                None => infer_retry_target(&state, &route.queue_url).await?,
            };

            let outcome = state
                .messages
                .retry_message(&route.queue_url, &request.message, &target_queue_url)
                .await?;

            Ok(Json(RetryResponse {
                message_id: outcome.message_id,
                status: "retried".to_string(),
                target_queue_url,
                source_deleted: outcome.source_deleted,
            })
            .into_response())
        }
        resource => Err(method_not_allowed("POST", &resource)),
    }
}

/// DELETE /api/queues/{queueUrl}/messages/{receiptHandle}
#[instrument(skip(state))]
async fn handle_queue_delete(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<StatusCode, ApiError> {
    let route = match QueuePath::parse_message(&path) {
        Some(route) => route,
        None => parse_queue_path(&path)?,
    };

    match route.resource {
        QueueResource::Message { receipt_handle } => {
            state
                .messages
                .delete_message(&route.queue_url, &receipt_handle)
                .await?;
            Ok(StatusCode::NO_CONTENT)
        }
        resource => Err(method_not_allowed("DELETE", &resource)),
    }
}

/// The source queue that redrives into `dlq_url`.
async fn infer_retry_target(state: &AppState, dlq_url: &str) -> Result<String, ApiError> {
    match state.directory.find_source_queue(dlq_url).await? {
        Some(source) => {
            info!(dlq_url = %dlq_url, target_queue_url = %source.url, "Inferred retry target");
            Ok(source.url)
        }
        None => Err(ApiError::RetryTargetUnknown {
            queue_url: dlq_url.to_string(),
        }),
    }
}

fn parse_queue_path(path: &str) -> Result<QueuePath, ApiError> {
    QueuePath::parse(path).ok_or_else(|| ApiError::NotFound {
        path: format!("/api/queues/{}", path.trim_start_matches('/')),
    })
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidJson {
        message: e.to_string(),
    })
}

fn method_not_allowed(method: &str, resource: &QueueResource) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: format!("{{queueUrl}}/{}", resource),
    }
}

// ============================================================================
// Context and Health Handlers
// ============================================================================

/// GET /api/aws-context
async fn get_aws_context(State(state): State<AppState>) -> Json<BackendContext> {
    Json(state.context.as_ref().clone())
}

/// GET /health
async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: state.context.mode,
        live_tail_sessions: state.live_tail.session_count(),
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware
///
/// - Logs request start and completion with structured fields
/// - Propagates correlation ID through response headers
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}
