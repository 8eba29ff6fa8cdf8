//! REST API for sales.
//!
//! Endpoints:
//! - `GET /api/Sale`: every sale
//! - `GET /api/Sale/{id}`: one sale
//! - `POST /api/Sale`: create from a name-keyed view
//! - `PUT /api/Sale/{id}`: full replacement
//! - `DELETE /api/Sale/{id}`: remove
//! - `GET /api/health`: health check

mod error;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::model::{SaleId, SaleView};
use crate::services::{SaleQuery, SaleReconciler};

pub use error::ApiError;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<SaleReconciler>,
    pub query: Arc<SaleQuery>,
}

impl AppState {
    pub fn new(reconciler: SaleReconciler, query: SaleQuery) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            query: Arc::new(query),
        }
    }
}

/// Start the REST server on `addr`.
///
/// When the port is 0, the OS assigns an ephemeral port. The actual bound
/// port is always logged so it can be discovered.
pub async fn serve(
    state: AppState,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(address = %local, "sales REST API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/Sale", get(list_sales).post(create_sale))
        .route(
            "/api/Sale/{id}",
            get(get_sale).put(update_sale).delete(delete_sale),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_sales(State(state): State<AppState>) -> Result<Json<Vec<SaleView>>, ApiError> {
    Ok(Json(state.query.get_all().await?))
}

async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SaleView>, ApiError> {
    Ok(Json(state.query.get_by_id(SaleId(id)).await?))
}

async fn create_sale(
    State(state): State<AppState>,
    Json(view): Json<SaleView>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.reconciler.create(&view).await?;
    let location = format!("/api/Sale/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created),
    ))
}

async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(view): Json<SaleView>,
) -> Result<Json<SaleView>, ApiError> {
    Ok(Json(state.reconciler.update(SaleId(id), &view).await?))
}

async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.reconciler.delete(SaleId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
