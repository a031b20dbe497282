//! HTTP server handing graph JSON to an external renderer.
//!
//! Every request runs a fresh pipeline over the current store contents, so
//! each response has its own color registry and reflects the latest import.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use cm_core::{GraphExport, PipelineConfig, Record, run};
use cm_store::Store;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
    config: Arc<PipelineConfig>,
}

impl AppState {
    pub fn new(store: Store, config: PipelineConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            config: Arc::new(config),
        }
    }
}

/// Per-request overrides of the clustering parameters.
#[derive(Debug, Default, Deserialize)]
pub struct GraphParams {
    eps: Option<f64>,
    min_pts: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/graph", get(graph_handler))
        .route("/api/records", get(records_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid bind address {addr}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("serving graph on http://{addr}/api/graph");
    eprintln!("cm listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn graph_handler(
    State(state): State<AppState>,
    Query(params): Query<GraphParams>,
) -> Result<Json<GraphExport>, ApiError> {
    let mut config = (*state.config).clone();
    if let Some(eps) = params.eps {
        config.clustering.eps = eps;
    }
    if let Some(min_pts) = params.min_pts {
        config.clustering.min_pts = min_pts;
    }
    config.validate().map_err(|e| bad_request(e.to_string()))?;

    let records = load(&state).await?;
    let output = run(&records, &config).map_err(|e| bad_request(e.to_string()))?;
    for diagnostic in &output.diagnostics {
        tracing::warn!("{diagnostic}");
    }
    tracing::debug!(
        "graph: {} nodes, {} links",
        output.graph.nodes.len(),
        output.graph.links.len()
    );
    Ok(Json(GraphExport::from_output(&output, &config)))
}

async fn records_handler(State(state): State<AppState>) -> Result<Json<Vec<Record>>, ApiError> {
    load(&state).await.map(Json)
}

async fn load(state: &AppState) -> Result<Vec<Record>, ApiError> {
    let store = state.store.lock().await;
    store
        .load_records()
        .map_err(|e| internal_error(anyhow::Error::new(e).context("failed to load records")))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn internal_error(err: anyhow::Error) -> ApiError {
    tracing::error!("{err:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: format!("{err:#}"),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDS: &str = r#"[
        {"id": "1", "trigger": "late", "thought": "careless", "response": "apologized",
         "trigger_embedding": [1.0, 0.0], "thought_embedding": [0.0, 1.0],
         "response_embedding": [1.0, 1.0]},
        {"id": "2", "trigger": "late", "thought": "unlucky", "response": "shrugged",
         "trigger_embedding": [1.0, 0.0], "thought_embedding": [1.0, 0.0],
         "response_embedding": [-1.0, 1.0]}
    ]"#;

    fn state() -> AppState {
        let store = Store::open_in_memory().unwrap();
        store.import_json_str(RECORDS).unwrap();
        AppState::new(store, PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_graph_handler_builds_graph() {
        let Json(export) = graph_handler(State(state()), Query(GraphParams::default()))
            .await
            .unwrap();
        assert_eq!(export.nodes.len(), 6);
        assert_eq!(export.links.len(), 4);
        assert_eq!(export.clusters[0].clusters, vec![vec![0, 1]]);
    }

    #[tokio::test]
    async fn test_graph_handler_applies_overrides() {
        let params = GraphParams {
            eps: Some(0.5),
            min_pts: Some(3),
        };
        let Json(export) = graph_handler(State(state()), Query(params)).await.unwrap();
        assert_eq!(export.params.min_pts, 3);
        // nothing is dense at min_pts 3, so every trigger is its own cluster
        assert_eq!(export.clusters[0].dense_count, 0);
        assert_eq!(export.clusters[0].noise_count, 2);
    }

    #[tokio::test]
    async fn test_graph_handler_rejects_bad_eps() {
        let params = GraphParams {
            eps: Some(-1.0),
            min_pts: None,
        };
        let (status, Json(body)) = graph_handler(State(state()), Query(params))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("eps"));
    }

    #[tokio::test]
    async fn test_records_handler_returns_store_order() {
        let Json(records) = records_handler(State(state())).await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
