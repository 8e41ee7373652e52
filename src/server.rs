//! HTTP server.
//!
//! Serves the tool registry as a plain JSON API and, at `/mcp`, as an MCP
//! Streamable HTTP endpoint backed by the same [`McpBridge`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call any registered tool by name |
//! | `GET`  | `/resources/read?uri=wayback://…` | Resolve the archived-page resource |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `*`    | `/mcp` | MCP Streamable HTTP transport |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "url must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `timeout` (408),
//! `upstream_error` (502), `tool_error` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::ArchiveError;
use crate::mcp::McpBridge;
use crate::models::ResourceContent;
use crate::traits::{validate_params, ToolContext, ToolInfo, ToolRegistry};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    tools: Arc<ToolRegistry>,
}

/// Start the server with the built-in tools.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_extensions(config, ToolRegistry::new()).await
}

/// Start the server with additional Rust tools.
///
/// `extra_tools` are registered after the built-ins; a tool with a built-in
/// name replaces the built-in.
///
/// ```rust,no_run
/// use wayback_mcp::server::run_server_with_extensions;
/// use wayback_mcp::traits::ToolRegistry;
///
/// # async fn example(config: &wayback_mcp::config::Config) -> anyhow::Result<()> {
/// let mut tools = ToolRegistry::new();
/// // tools.register(Box::new(MyTool));
/// run_server_with_extensions(config, tools).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server_with_extensions(
    config: &Config,
    extra_tools: ToolRegistry,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(config, merge_tools(extra_tools));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("HTTP server listening on http://{}", bind_addr);
    tracing::info!("MCP endpoint at http://{}/mcp", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Built-ins followed by `extra`.
pub fn merge_tools(extra: ToolRegistry) -> ToolRegistry {
    let mut registry = ToolRegistry::with_builtins();
    for tool in extra.into_tools() {
        registry.register(tool);
    }
    registry
}

/// The full router, without binding a socket.
pub fn build_router(config: &Config, tools: ToolRegistry) -> Router {
    let config = Arc::new(config.clone());
    let tools = Arc::new(tools);

    for t in tools.tools() {
        tracing::debug!("POST /tools/{}: {}", t.name(), t.description());
    }

    let bridge = McpBridge::new(config.clone(), tools.clone());
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let state = AppState { config, tools };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/resources/read", get(handle_read_resource))
        .route("/health", get(handle_health))
        .with_state(state)
        .nest_service("/mcp", mcp_service)
        .layer(cors)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"timeout"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code,
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    app_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Map an execution error to a status code. Typed archive errors are
/// classified by variant; anything else raised before the network call
/// (argument decoding, empty inputs) is a client error.
fn classify_error(scope: &str, err: anyhow::Error) -> AppError {
    let message = format!("{}: {:#}", scope, err);

    match err.downcast_ref::<ArchiveError>() {
        Some(ArchiveError::InvalidArgument(_)) => bad_request(message),
        Some(ArchiveError::Timeout { .. }) => {
            app_error(StatusCode::REQUEST_TIMEOUT, "timeout", message)
        }
        Some(_) => app_error(StatusCode::BAD_GATEWAY, "upstream_error", message),
        None => {
            let msg = err.to_string();
            if msg.contains("invalid arguments") || msg.contains("must not be empty") {
                bad_request(message)
            } else {
                app_error(StatusCode::INTERNAL_SERVER_ERROR, "tool_error", message)
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let tools = state
        .tools
        .tools()
        .iter()
        .map(|t| ToolInfo::of(t.as_ref()))
        .collect();
    Json(ToolListResponse { tools })
}

// ============ POST /tools/{name} ============

/// Unified tool dispatch.
///
/// Returns `404` for an unknown tool, `400` for parameter errors, `408` on
/// upstream timeout, `502` for other upstream failures.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let validated = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| bad_request(e.to_string()))?;

    let ctx = ToolContext::new(state.config.clone());
    let result = tool
        .execute(validated, &ctx)
        .await
        .map_err(|e| classify_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}

// ============ GET /resources/read ============

#[derive(Deserialize)]
struct ResourceQuery {
    uri: String,
}

async fn handle_read_resource(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Result<Json<Vec<ResourceContent>>, AppError> {
    let ctx = ToolContext::new(state.config.clone());
    let contents = ctx
        .resource(&query.uri)
        .await
        .map_err(|e| classify_error("resource", e))?;
    Ok(Json(contents))
}
