//! HTTP surface of the qanun service.
//!
//! Routes:
//! - `POST /ask` answers one question
//! - `GET /health` reports index and gateway status
//!
//! SIGHUP reloads the corpus/index pair without dropping connections.

use crate::state::ServeState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use qanun_core::{AppError, AppResult};
use qanun_retrieval::AskOutcome;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Debug, Deserialize)]
struct AskRequest {
    query: String,
}

/// Binds the listener, installs the routes and serves until shutdown.
pub async fn serve(state: Arc<ServeState>) -> AppResult<()> {
    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);

    let app = Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", bind_addr, e)))?;

    tracing::info!("Listening on http://{}", bind_addr);
    tracing::info!("  POST /ask");
    tracing::info!("  GET  /health");

    spawn_reload_listener(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}

#[cfg(unix)]
fn spawn_reload_listener(state: Arc<ServeState>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Failed to install the SIGHUP handler: {}", e);
                return;
            }
        };
        while hangups.recv().await.is_some() {
            tracing::info!("SIGHUP received, reloading corpus and index");
            if let Err(e) = state.reload().await {
                tracing::error!("Reload failed, keeping the current snapshot: {}", e);
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_listener(_state: Arc<ServeState>) {}

async fn handle_ask(
    State(state): State<Arc<ServeState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let request_id = uuid::Uuid::new_v4();
    let preview: String = request.query.chars().take(80).collect();
    tracing::info!(%request_id, "POST /ask: {}", preview);

    let _permit = state
        .ask_permits
        .acquire()
        .await
        .map_err(|_| error_response(StatusCode::SERVICE_UNAVAILABLE, "service shutting down"))?;

    let snapshot = state.snapshot().await;
    match state.pipeline.ask(&snapshot, &request.query).await {
        Ok(AskOutcome::Answered {
            answer,
            context_articles,
            truncated_context,
        }) => {
            tracing::info!(
                %request_id,
                "Answered from articles [{}]{}",
                context_articles.join(", "),
                if truncated_context {
                    " (context truncated)"
                } else {
                    ""
                }
            );
            Ok(Json(json!({
                "answer": answer.text,
                "related_questions": answer.related_questions,
            })))
        }
        Ok(AskOutcome::NoInformation { language }) => {
            tracing::info!(%request_id, "No covering articles found");
            Ok(Json(json!({
                "answer": language.no_information_message(),
                "related_questions": [],
            })))
        }
        Err(error) => {
            tracing::error!(%request_id, "Ask failed: {}", error);
            Err(ask_error_response(&error))
        }
    }
}

/// Maps pipeline failures to HTTP replies. Gateway details stay in the
/// logs; callers get a generic 503.
fn ask_error_response(error: &AppError) -> (StatusCode, Json<Value>) {
    match error {
        AppError::InvalidQuery(detail) => error_response(StatusCode::BAD_REQUEST, detail),
        AppError::GatewayTimeout { .. }
        | AppError::GatewayMalformed { .. }
        | AppError::Gateway { .. } => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "service temporarily unavailable",
        ),
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    }
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

async fn handle_health(State(state): State<Arc<ServeState>>) -> (StatusCode, Json<Value>) {
    let snapshot = state.snapshot().await;
    let gateway_ok = state.gateway.is_reachable().await;
    health_response(gateway_ok, snapshot.corpus.len(), snapshot.index.dim())
}

/// Maps gateway reachability to the health reply. An unreachable
/// gateway degrades the status to 503; the index counts are reported
/// either way.
fn health_response(gateway_ok: bool, chunks: usize, dimension: usize) -> (StatusCode, Json<Value>) {
    let code = if gateway_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": if gateway_ok { "ok" } else { "degraded" },
            "index": {
                "chunks": chunks,
                "dimension": dimension,
            },
            "gateway": if gateway_ok { "ok" } else { "unreachable" },
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use qanun_core::GatewayStage;

    #[test]
    fn invalid_query_maps_to_bad_request() {
        let (status, body) =
            ask_error_response(&AppError::InvalidQuery("Query is empty".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["error"], "Query is empty");
    }

    #[test]
    fn gateway_failures_map_to_a_generic_service_unavailable() {
        let (status, body) = ask_error_response(&AppError::GatewayTimeout {
            stage: GatewayStage::Rerank,
        });
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.0["error"], "service temporarily unavailable");

        let (status, _) = ask_error_response(&AppError::Gateway {
            stage: GatewayStage::Generation,
            status: Some(502),
            detail: "bad gateway".to_string(),
        });
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn internal_failures_stay_generic() {
        let (status, body) = ask_error_response(&AppError::IndexNotReady("gone".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.0["error"], "internal error");
    }

    #[test]
    fn ask_request_deserializes_from_json() {
        let request: AskRequest =
            serde_json::from_str(r#"{"query": "ما هي مدة الإجازة السنوية؟"}"#).unwrap();
        assert_eq!(request.query, "ما هي مدة الإجازة السنوية؟");
    }

    #[test]
    fn health_reports_ok_when_the_gateway_answers() {
        let (status, body) = health_response(true, 245, 768);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["status"], "ok");
        assert_eq!(body.0["gateway"], "ok");
        assert_eq!(body.0["index"]["chunks"], 245);
        assert_eq!(body.0["index"]["dimension"], 768);
    }

    #[test]
    fn health_degrades_to_service_unavailable_without_the_gateway() {
        let (status, body) = health_response(false, 245, 768);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.0["status"], "degraded");
        assert_eq!(body.0["gateway"], "unreachable");
        assert_eq!(body.0["index"]["chunks"], 245);
    }
}
