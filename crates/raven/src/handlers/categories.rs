use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use raven_core::catalog::{sort_categories, validate_category, Category};
use raven_core::storage::RepositoryError;

use crate::{handlers::AppError, state::AppState};

fn not_found(id: String) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: "Category",
        id,
    }
}

/// List all categories in display order (GET /api/categories).
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    let mut categories = state.categories.find_all().await?;
    sort_categories(&mut categories);
    Ok(Json(categories))
}

/// Create a category (POST /api/categories).
pub async fn create_category(
    State(state): State<AppState>,
    Json(category): Json<Category>,
) -> Result<impl IntoResponse, AppError> {
    validate_category(&category)?;
    let created = state.categories.create(category).await?;
    tracing::info!(category_id = %created.id, name = %created.name, "created category");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a single category by ID (GET /api/categories/{id}).
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Category>, AppError> {
    let category = state
        .categories
        .find_by_id(&id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(category))
}

/// Replace a category (PUT /api/categories/{id}).
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(category): Json<Category>,
) -> Result<Json<Category>, AppError> {
    validate_category(&category)?;
    let updated = state.categories.update(&id, category).await?;
    Ok(Json(updated))
}

/// Delete a category (DELETE /api/categories/{id}).
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.categories.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id).into())
    }
}
