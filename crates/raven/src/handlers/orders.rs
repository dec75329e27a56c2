//! Order CRUD handlers.
//!
//! Created and updated orders are handed to the broadcaster after they are
//! stored, so stream subscribers only ever see persisted state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use raven_core::orders::{apply_create_defaults, parse_status, validate_order, Order};
use raven_core::storage::RepositoryError;

use crate::{handlers::AppError, state::AppState};

/// Body of `PATCH /api/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: String,
}

fn not_found(id: String) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: "Order",
        id,
    }
}

/// List all orders (GET /api/orders).
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.orders.find_all().await?;
    Ok(Json(orders))
}

/// Create an order (POST /api/orders).
///
/// Blank status, source and channel take their defaults before validation.
/// The status is stored under its canonical upper-case name.
pub async fn create_order(
    State(state): State<AppState>,
    Json(mut order): Json<Order>,
) -> Result<impl IntoResponse, AppError> {
    apply_create_defaults(&mut order);
    validate_order(&order)?;
    order.status = parse_status(&order.status)?.as_str().to_string();

    let created = state.orders.create(order).await?;
    let delivered = state.broadcaster.broadcast(&created);
    tracing::info!(order_id = %created.id, delivered, "created order");

    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a single order by ID (GET /api/orders/{id}).
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .find_by_id(&id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(order))
}

/// Replace an order (PUT /api/orders/{id}).
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut order): Json<Order>,
) -> Result<Json<Order>, AppError> {
    validate_order(&order)?;
    order.status = parse_status(&order.status)?.as_str().to_string();

    let updated = state.orders.update(&id, order).await?;
    state.broadcaster.broadcast(&updated);
    tracing::info!(order_id = %id, "updated order");

    Ok(Json(updated))
}

/// Change only the status of an order (PATCH /api/orders/{id}/status).
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<Order>, AppError> {
    let status = parse_status(&payload.status)?;

    let updated = state.orders.update_status(&id, status.as_str()).await?;
    state.broadcaster.broadcast(&updated);

    Ok(Json(updated))
}

/// Delete an order (DELETE /api/orders/{id}).
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.orders.delete(&id).await? {
        tracing::info!(order_id = %id, "deleted order");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id).into())
    }
}
