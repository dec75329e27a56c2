//! Health and diagnostic endpoints.
//!
//! - `/healthz` - liveness plus the number of open order streams
//! - `/api/diagnostic/tables` - describes every configured table

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use raven_core::storage::{RepositoryError, TableDescription};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub subscribers: usize,
}

/// GET /healthz - Basic liveness probe.
#[axum::debug_handler]
pub async fn healthz(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        subscribers: state.broadcaster.subscriber_count(),
    })
}

/// Outcome of describing one table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCheck {
    pub entity: &'static str,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<TableDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableCheck {
    fn new(
        entity: &'static str,
        table: &str,
        result: Result<TableDescription, RepositoryError>,
    ) -> Self {
        let (description, error) = match result {
            Ok(description) => (Some(description), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            entity,
            table: table.to_string(),
            description,
            error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Diagnostics {
    pub region: String,
    pub healthy: bool,
    pub tables: Vec<TableCheck>,
}

/// GET /api/diagnostic/tables - Describes each configured table.
///
/// Uses table-scoped describe calls, so it only needs permissions on the
/// tables themselves. Returns 503 when any table cannot be described.
#[axum::debug_handler]
pub async fn diagnostic_tables(State(state): State<AppState>) -> Response {
    let (orders, categories, products) = tokio::join!(
        state.orders.describe(),
        state.categories.describe(),
        state.products.describe(),
    );

    let tables = vec![
        TableCheck::new("Order", state.orders.table(), orders),
        TableCheck::new("Category", state.categories.table(), categories),
        TableCheck::new("Product", state.products.table(), products),
    ];
    let healthy = tables.iter().all(|check| check.error.is_none());

    for check in tables.iter().filter(|check| check.error.is_some()) {
        tracing::warn!(table = %check.table, error = ?check.error, "table check failed");
    }

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(Diagnostics {
            region: state.config.aws_region.clone(),
            healthy,
            tables,
        }),
    )
        .into_response()
}
