use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use raven_core::catalog::{validate_product, Product};
use raven_core::storage::RepositoryError;

use crate::{handlers::AppError, state::AppState};

/// Query parameters for listing products.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
    /// Restrict the listing to one category (served from the category index).
    pub category_id: Option<String>,
}

fn not_found(id: String) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: "Product",
        id,
    }
}

/// List products, optionally by category (GET /api/products).
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = match query.category_id.as_deref().map(str::trim) {
        Some(category_id) if !category_id.is_empty() => {
            state.products.find_by_category(category_id).await?
        }
        _ => state.products.find_all().await?,
    };
    Ok(Json(products))
}

/// Create a product (POST /api/products).
pub async fn create_product(
    State(state): State<AppState>,
    Json(product): Json<Product>,
) -> Result<impl IntoResponse, AppError> {
    validate_product(&product)?;
    let created = state.products.create(product).await?;
    tracing::info!(product_id = %created.id, category_id = %created.category_id, "created product");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a single product by ID (GET /api/products/{id}).
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    let product = state
        .products
        .find_by_id(&id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(product))
}

/// Replace a product (PUT /api/products/{id}).
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(product): Json<Product>,
) -> Result<Json<Product>, AppError> {
    validate_product(&product)?;
    let updated = state.products.update(&id, product).await?;
    Ok(Json(updated))
}

/// Delete a product (DELETE /api/products/{id}).
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.products.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id).into())
    }
}
