//! Webhook routes and server startup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use super::auth::require_basic_auth;
use super::types::{ErrorResponse, HealthResponse, PostPromptRequest, SwaigRequest};
use crate::agent::AgentDefinition;
use crate::config::{BasicAuth, Config};
use crate::swml;
use crate::tools::{CallContext, FunctionResult, RegistryError};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub agent: AgentDefinition,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the router. Everything but `/health` requires basic auth.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", get(swml_document).post(swml_document))
        .route("/swaig", post(swaig))
        .route("/post_prompt", post(post_prompt))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_basic_auth,
        ));

    Router::new()
        .merge(protected)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the webhook server and run until Ctrl-C.
pub async fn serve(config: Config, agent: AgentDefinition) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let tls = config.tls.clone();

    tracing::info!("{}", auth_banner(&config.auth));

    let state = Arc::new(AppState { config, agent });
    let app = router(state);

    if tls.enabled {
        let (Some(cert), Some(key)) = (tls.cert_path, tls.key_path) else {
            anyhow::bail!("TLS is enabled but certificate or key path is missing");
        };
        let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await?;

        let handle = axum_server::Handle::new();
        let shutdown = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        tracing::info!("Listening on https://{}", addr);
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Startup line describing the credentials. Only a generated password is shown.
fn auth_banner(auth: &BasicAuth) -> String {
    if auth.generated {
        format!(
            "Basic auth user: {} password: {} (generated)",
            auth.username, auth.password
        )
    } else {
        format!("Basic auth user: {}", auth.username)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        agent: state.agent.name.clone(),
        tools: state.agent.tools.len(),
    })
}

/// `GET|POST /`: the SWML document.
async fn swml_document(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<Value> {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let base = swml::base_url(&state.config, host);
    Json(swml::render(&state.agent, &state.config, &base))
}

/// `POST /swaig`: run one function and return its result.
async fn swaig(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: SwaigRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid SWAIG request: {}", e),
            )
        }
    };

    let call = CallContext {
        call_id: req.call_id.clone(),
        global_data: req.global_data.clone().unwrap_or(Value::Null),
    };
    tracing::info!(function = %req.function, call_id = ?call.call_id, "SWAIG call");

    match state.agent.tools.execute(&req.function, req.args(), &call).await {
        Ok(result) => Json(result).into_response(),
        Err(RegistryError::UnknownTool(name)) => {
            error_response(StatusCode::NOT_FOUND, format!("Unknown function: {}", name))
        }
        Err(e) => {
            tracing::error!("{}", e);
            Json(FunctionResult::new(
                "Sorry, I wasn't able to do that right now. Let's try something else.",
            ))
            .into_response()
        }
    }
}

/// `POST /post_prompt`: log the conversation summary.
async fn post_prompt(State(_state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: PostPromptRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid post prompt request: {}", e),
            )
        }
    };

    match req.summary() {
        Some(summary) => tracing::info!(call_id = ?req.call_id, %summary, "Conversation summary"),
        None => tracing::info!(call_id = ?req.call_id, "Conversation ended without a summary"),
    }
    Json(json!({ "status": "ok" })).into_response()
}
